//! Backend loader
//!
//! Owns the factory registry and the selection catalog for one resource
//! kind. Create-and-record runs under the loader mutex so concurrent
//! provisioning of the same resource cannot race; an already-backed
//! resource fails before any backend object is constructed.

use std::sync::{Arc, Mutex};

use crate::observability::Logger;
use crate::term::FullyQualifiedClauseIndicator;

use super::catalog::SelectionCatalog;
use super::errors::{SelectionError, SelectionResult};
use super::selection::select_implementation;
use super::{BackendFactory, Feature, FeatureSupport, ImplementationId};

/// Provisioning front-end for one kind of pluggable backend
pub struct BackendLoader<B> {
    factories: Vec<Arc<dyn BackendFactory<B>>>,
    catalog: Arc<dyn SelectionCatalog>,
    provision_lock: Mutex<()>,
}

impl<B> BackendLoader<B> {
    pub fn new(catalog: Arc<dyn SelectionCatalog>) -> Self {
        Self {
            factories: Vec::new(),
            catalog,
            provision_lock: Mutex::new(()),
        }
    }

    /// Registers a factory. Registration order is the residual tie-break
    /// order, which is implementation-defined and not to be relied upon.
    pub fn register(&mut self, factory: Arc<dyn BackendFactory<B>>) {
        self.factories.push(factory);
    }

    /// Selects an implementation by features, creates the backend and
    /// records the winner, atomically with respect to other provisioning
    /// calls for the same loader.
    pub fn create(
        &self,
        scope: &FullyQualifiedClauseIndicator,
        required: &[Feature],
        desired: &[Feature],
    ) -> SelectionResult<B> {
        let _guard = self.provision_lock.lock().unwrap();
        self.ensure_unbacked(scope)?;

        let candidates: Vec<&dyn BackendFactory<B>> =
            self.factories.iter().map(|f| f.as_ref()).collect();
        let winner = select_implementation(&candidates, required, desired)?;

        let backend = winner.create(scope)?;
        self.catalog.record(scope, winner.implementation_id())?;
        Logger::info(
            "BACKEND_SELECTED",
            &[
                ("scope", &scope.to_string()),
                ("implementation", winner.implementation_id().as_str()),
            ],
        );
        Ok(backend)
    }

    /// Creates a backend from one fixed implementation, bypassing selection
    pub fn create_fixed(
        &self,
        scope: &FullyQualifiedClauseIndicator,
        id: &ImplementationId,
    ) -> SelectionResult<B> {
        let _guard = self.provision_lock.lock().unwrap();
        self.ensure_unbacked(scope)?;

        let factory = self.factory_by_id(id)?;
        let backend = factory.create(scope)?;
        self.catalog.record(scope, id)?;
        Ok(backend)
    }

    /// Reloads the backend recorded for a scope, if any. The recorded
    /// implementation id guarantees the same implementation is chosen.
    pub fn load(&self, scope: &FullyQualifiedClauseIndicator) -> SelectionResult<Option<B>> {
        let Some(id) = self.catalog.lookup(scope) else {
            return Ok(None);
        };
        let factory = self.factory_by_id(&id)?;
        factory.load(scope).map(Some)
    }

    /// Destroys the backend recorded for a scope and forgets the record
    pub fn destroy(&self, scope: &FullyQualifiedClauseIndicator) -> SelectionResult<()> {
        let _guard = self.provision_lock.lock().unwrap();
        if let Some(id) = self.catalog.lookup(scope) {
            let factory = self.factory_by_id(&id)?;
            factory.destroy(scope)?;
            self.catalog.remove(scope)?;
        }
        Ok(())
    }

    fn ensure_unbacked(&self, scope: &FullyQualifiedClauseIndicator) -> SelectionResult<()> {
        if self.catalog.lookup(scope).is_some() {
            return Err(SelectionError::AlreadyProvisioned(scope.clone()));
        }
        Ok(())
    }

    fn factory_by_id(
        &self,
        id: &ImplementationId,
    ) -> SelectionResult<&Arc<dyn BackendFactory<B>>> {
        self.factories
            .iter()
            .find(|f| f.implementation_id() == id)
            .ok_or_else(|| SelectionError::UnknownImplementation(id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryCatalog;
    use crate::term::ClauseIndicator;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Factory counting constructions, used to prove atomicity of failure
    struct CountingFactory {
        id: ImplementationId,
        features: Vec<Feature>,
        created: AtomicUsize,
    }

    impl CountingFactory {
        fn new(id: &str, features: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                id: ImplementationId::new(id),
                features: features.iter().copied().map(Feature::new).collect(),
                created: AtomicUsize::new(0),
            })
        }
    }

    impl FeatureSupport for CountingFactory {
        fn implementation_id(&self) -> &ImplementationId {
            &self.id
        }

        fn supported_features(&self) -> &[Feature] {
            &self.features
        }
    }

    impl BackendFactory<String> for CountingFactory {
        fn create(&self, scope: &FullyQualifiedClauseIndicator) -> SelectionResult<String> {
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(format!("{}@{}", self.id, scope))
        }

        fn load(&self, scope: &FullyQualifiedClauseIndicator) -> SelectionResult<String> {
            Ok(format!("{}@{}", self.id, scope))
        }

        fn destroy(&self, _scope: &FullyQualifiedClauseIndicator) -> SelectionResult<()> {
            Ok(())
        }
    }

    fn scope(name: &str) -> FullyQualifiedClauseIndicator {
        FullyQualifiedClauseIndicator::new("user", ClauseIndicator::new(name, 2))
    }

    fn loader_with(factories: Vec<Arc<CountingFactory>>) -> BackendLoader<String> {
        let mut loader = BackendLoader::new(Arc::new(MemoryCatalog::new()));
        for f in factories {
            loader.register(f);
        }
        loader
    }

    #[test]
    fn test_create_records_winner_and_reloads_same() {
        let durable = CountingFactory::new("durable-btree", &["durable", "ordered"]);
        let fast = CountingFactory::new("heap", &["fast"]);
        let loader = loader_with(vec![fast, durable.clone()]);

        let backend = loader
            .create(&scope("p"), &[Feature::new("durable")], &[])
            .unwrap();
        assert!(backend.starts_with("durable-btree@"));

        let reloaded = loader.load(&scope("p")).unwrap().unwrap();
        assert!(reloaded.starts_with("durable-btree@"));
        assert_eq!(durable.created.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_double_create_fails_before_instantiation() {
        let factory = CountingFactory::new("heap", &[]);
        let loader = loader_with(vec![factory.clone()]);

        loader.create(&scope("p"), &[], &[]).unwrap();
        let err = loader.create(&scope("p"), &[], &[]).unwrap_err();
        assert!(matches!(err, SelectionError::AlreadyProvisioned(_)));
        // the second call must not have constructed anything
        assert_eq!(factory.created.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_load_unprovisioned_is_none() {
        let loader = loader_with(vec![CountingFactory::new("heap", &[])]);
        assert!(loader.load(&scope("p")).unwrap().is_none());
    }

    #[test]
    fn test_create_fixed_bypasses_selection() {
        let a = CountingFactory::new("a", &["x"]);
        let b = CountingFactory::new("b", &[]);
        let loader = loader_with(vec![a, b]);

        let backend = loader
            .create_fixed(&scope("p"), &ImplementationId::new("b"))
            .unwrap();
        assert!(backend.starts_with("b@"));

        let err = loader
            .create_fixed(&scope("q"), &ImplementationId::new("missing"))
            .unwrap_err();
        assert!(matches!(err, SelectionError::UnknownImplementation(_)));
    }

    #[test]
    fn test_destroy_forgets_record() {
        let loader = loader_with(vec![CountingFactory::new("heap", &[])]);
        loader.create(&scope("p"), &[], &[]).unwrap();
        loader.destroy(&scope("p")).unwrap();
        assert!(loader.load(&scope("p")).unwrap().is_none());
        // scope can be provisioned again after destroy
        loader.create(&scope("p"), &[], &[]).unwrap();
    }
}
