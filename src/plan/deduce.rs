//! Rule deduction
//!
//! Activates each rule of the goal's predicate against the goal instance
//! and re-enters proof search for the rule body.
//!
//! ## Invariants
//! - Goal and rule variables are renamed from one shared arena with
//!   disjoint maps, so a goal can never capture a rule's variables and two
//!   activations can never interfere
//! - Rules activate in program order; body solutions stream in their own
//!   order, so the overall order is deterministic
//! - Activation is pull-driven: a rule is activated only once every
//!   solution of the previous rules has been demanded
//! - The last rule of the last input row hands its solution stream over
//!   in tail position, so recursive rules do not stack a producer per
//!   recursion level

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::engine::{ProofSearchContext, Rule};
use crate::errors::{EvalResult, PermissionError};
use crate::sequence::{LazySequence, Producer, Step};
use crate::term::{
    map_variables, rename_term, substitute, unify, Bindings, FullyQualifiedClauseIndicator,
    RenamingArena, Term, Variable,
};

use super::{PlanOperator, Row, RowSequence};

/// Solves a goal through the rules registered for its predicate
pub struct Deduction {
    indicator: FullyQualifiedClauseIndicator,
    goal: Term,
}

impl Deduction {
    pub fn new(indicator: FullyQualifiedClauseIndicator, goal: Term) -> Self {
        Self { indicator, goal }
    }
}

impl PlanOperator for Deduction {
    type In = ();
    type Out = ();

    fn invoke(
        &self,
        ctx: Arc<dyn ProofSearchContext>,
        input: RowSequence<()>,
    ) -> RowSequence<()> {
        let principal = input.principal();
        if !ctx.authorization().may_read(&self.indicator) {
            drop(input);
            return LazySequence::failed(
                principal,
                PermissionError::read(self.indicator.clone(), self.goal.to_string()).into(),
            );
        }
        LazySequence::new(
            principal,
            DeduceProducer {
                ctx,
                indicator: self.indicator.clone(),
                goal: self.goal.clone(),
                input,
                input_done: false,
                pending: None,
                frame: None,
            },
        )
    }

    fn explanation(&self) -> Term {
        Term::compound("deduce_from", vec![self.goal.clone()])
    }
}

/// One rule activated against one goal instance
struct Activation {
    body_solutions: LazySequence<Bindings>,
    head_unifier: Bindings,
    goal_renaming: HashMap<Variable, Variable>,
}

/// One input row being solved: its goal instance and remaining rules
struct Frame {
    env: Bindings,
    goal_instance: Term,
    rules: std::vec::IntoIter<Rule>,
    activation: Option<Activation>,
}

struct DeduceProducer {
    ctx: Arc<dyn ProofSearchContext>,
    indicator: FullyQualifiedClauseIndicator,
    goal: Term,
    input: RowSequence<()>,
    input_done: bool,
    // one row of lookahead, taken so the last rule of the last row can
    // hand its stream over instead of staying framed
    pending: Option<Bindings>,
    frame: Option<Frame>,
}

impl Producer<Row<()>> for DeduceProducer {
    fn next(&mut self) -> BoxFuture<'_, EvalResult<Step<Row<()>>>> {
        Box::pin(async move {
            loop {
                if let Some(frame) = &mut self.frame {
                    if let Some(activation) = &mut frame.activation {
                        match activation.body_solutions.try_advance().await? {
                            Some(solution) => {
                                let merged = reconstruct(
                                    &frame.env,
                                    &activation.head_unifier,
                                    &activation.goal_renaming,
                                    &solution,
                                );
                                match merged {
                                    Some(merged) => return Ok(Step::Item((merged, ()))),
                                    None => continue,
                                }
                            }
                            None => {
                                frame.activation = None;
                                continue;
                            }
                        }
                    }

                    match frame.rules.next() {
                        Some(rule) => {
                            let final_rule = frame.rules.len() == 0;
                            if final_rule && !self.input_done && self.pending.is_none() {
                                // one row of lookahead tells the last rule
                                // whether anything can still follow it
                                match self.input.try_advance().await? {
                                    Some((env, ())) => self.pending = Some(env),
                                    None => self.input_done = true,
                                }
                            }
                            if final_rule && self.input_done {
                                // nothing follows this activation: hand its
                                // solution stream over instead of framing it
                                let Some(taken) = self.frame.take() else {
                                    continue;
                                };
                                let Some(activation) =
                                    activate(&self.ctx, &rule, &taken.goal_instance)
                                else {
                                    return Ok(Step::Done);
                                };
                                let Activation {
                                    body_solutions,
                                    head_unifier,
                                    goal_renaming,
                                } = activation;
                                let env = taken.env;
                                return Ok(Step::Become(body_solutions.filter_map(
                                    move |solution| {
                                        reconstruct(
                                            &env,
                                            &head_unifier,
                                            &goal_renaming,
                                            &solution,
                                        )
                                        .map(|merged| (merged, ()))
                                    },
                                )));
                            }
                            frame.activation = activate(&self.ctx, &rule, &frame.goal_instance);
                            continue;
                        }
                        None => {
                            self.frame = None;
                            continue;
                        }
                    }
                }

                let row = if let Some(env) = self.pending.take() {
                    Some(env)
                } else if self.input_done {
                    None
                } else {
                    match self.input.try_advance().await? {
                        Some((env, ())) => Some(env),
                        None => {
                            self.input_done = true;
                            None
                        }
                    }
                };
                match row {
                    Some(env) => {
                        let goal_instance = substitute(&self.goal, &env);
                        let rules = self.ctx.rules(&self.indicator);
                        self.frame = Some(Frame {
                            env,
                            goal_instance,
                            rules: rules.into_iter(),
                            activation: None,
                        });
                    }
                    None => return Ok(Step::Done),
                }
            }
        })
    }

    fn close(&mut self) {
        self.input.close();
        if let Some(frame) = &mut self.frame {
            if let Some(activation) = &mut frame.activation {
                activation.body_solutions.close();
            }
        }
    }
}

/// Renames goal and rule apart, unifies the heads and starts the body.
/// `None` when the rule's head cannot apply to this goal instance.
fn activate(
    ctx: &Arc<dyn ProofSearchContext>,
    rule: &Rule,
    goal_instance: &Term,
) -> Option<Activation> {
    let mut arena = RenamingArena::new();
    let mut goal_renaming: HashMap<Variable, Variable> = HashMap::new();
    let renamed_goal = rename_term(goal_instance, &mut arena, &mut goal_renaming);

    let mut rule_renaming: HashMap<Variable, Variable> = HashMap::new();
    let renamed_head = rename_term(rule.head(), &mut arena, &mut rule_renaming);
    let renamed_body = rule.body().rename(&mut arena, &mut rule_renaming);

    let head_unifier = unify(&renamed_head, &renamed_goal)?;
    let body = renamed_body.substitute(&head_unifier);
    let body_solutions = ctx.clone().fulfill_attach(body, Bindings::new());

    Some(Activation {
        body_solutions,
        head_unifier,
        goal_renaming,
    })
}

/// Maps one body solution back onto the original goal's variables and
/// merges it with the row's environment
fn reconstruct(
    env: &Bindings,
    head_unifier: &Bindings,
    goal_renaming: &HashMap<Variable, Variable>,
    solution: &Bindings,
) -> Option<Bindings> {
    let combined = head_unifier.combined_with(solution).ok()?;
    let inverse: HashMap<Variable, Variable> = goal_renaming
        .iter()
        .map(|(original, fresh)| (fresh.clone(), original.clone()))
        .collect();

    let mut delta = Bindings::new();
    for (original, fresh) in goal_renaming {
        let value = match combined.get(fresh) {
            Some(term) => substitute(term, &combined),
            None => continue,
        };
        let restored = map_variables(&value, &inverse);
        if restored == Term::Variable(original.clone()) {
            continue;
        }
        delta.bind(original.clone(), restored).ok()?;
    }
    env.combined_with(&delta).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::KnowledgeBaseContext;
    use crate::query::Query;
    use crate::sequence::Principal;
    use crate::term::ClauseIndicator;

    fn goal1(name: &str, arg: Term) -> Term {
        Term::compound(name, vec![arg])
    }

    fn unit_input() -> RowSequence<()> {
        LazySequence::once(Principal::new(), (Bindings::new(), ()))
    }

    async fn solutions_for(
        ctx: Arc<KnowledgeBaseContext>,
        goal: Term,
    ) -> Vec<Bindings> {
        let indicator = ctx.qualify(ClauseIndicator::of(&goal).unwrap());
        let deduce = Deduction::new(indicator, goal);
        let mut seq = deduce.invoke(ctx, unit_input());
        let mut out = Vec::new();
        while let Some((env, ())) = seq.try_advance().await.unwrap() {
            out.push(env);
        }
        out
    }

    #[tokio::test]
    async fn test_ground_rule_heads_answer_in_program_order() {
        let ctx = Arc::new(
            KnowledgeBaseContext::new("user")
                .with_rule(Rule::fact(goal1("p", Term::int(1))).unwrap())
                .with_rule(Rule::fact(goal1("p", Term::int(2))).unwrap()),
        );
        let x = Variable::new("X");
        let envs = solutions_for(ctx, goal1("p", Term::var("X"))).await;
        let values: Vec<_> = envs.iter().map(|e| e.get(&x).cloned()).collect();
        assert_eq!(values, vec![Some(Term::int(1)), Some(Term::int(2))]);
    }

    #[tokio::test]
    async fn test_rule_body_drives_the_answer() {
        // p(X) :- q(X).  q(1). q(2).
        let ctx = Arc::new(
            KnowledgeBaseContext::new("user")
                .with_rule(
                    Rule::new(
                        goal1("p", Term::var("X")),
                        Query::goal(goal1("q", Term::var("X"))),
                    )
                    .unwrap(),
                )
                .with_rule(Rule::fact(goal1("q", Term::int(1))).unwrap())
                .with_rule(Rule::fact(goal1("q", Term::int(2))).unwrap()),
        );
        let x = Variable::new("X");
        let envs = solutions_for(ctx, goal1("p", Term::var("X"))).await;
        let values: Vec<_> = envs.iter().map(|e| e.get(&x).cloned()).collect();
        assert_eq!(values, vec![Some(Term::int(1)), Some(Term::int(2))]);
    }

    #[tokio::test]
    async fn test_caller_variable_name_never_captured() {
        // the rule uses the same variable name as the caller's goal
        let ctx = Arc::new(
            KnowledgeBaseContext::new("user")
                .with_rule(
                    Rule::new(
                        goal1("p", Term::var("X")),
                        Query::goal(goal1("q", Term::var("X"))),
                    )
                    .unwrap(),
                )
                .with_rule(Rule::fact(goal1("q", Term::int(9))).unwrap()),
        );
        let y = Variable::new("Y");
        let envs = solutions_for(ctx, goal1("p", Term::var("Y"))).await;
        assert_eq!(envs.len(), 1);
        assert_eq!(envs[0].get(&y), Some(&Term::int(9)));
    }

    #[tokio::test]
    async fn test_ground_goal_checks_rather_than_binds() {
        let ctx = Arc::new(
            KnowledgeBaseContext::new("user")
                .with_rule(Rule::fact(goal1("p", Term::int(1))).unwrap())
                .with_rule(Rule::fact(goal1("p", Term::int(2))).unwrap()),
        );
        let envs = solutions_for(ctx.clone(), goal1("p", Term::int(2))).await;
        assert_eq!(envs.len(), 1);
        assert!(envs[0].is_empty());

        let none = solutions_for(ctx, goal1("p", Term::int(3))).await;
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_no_rules_means_no_solutions() {
        let ctx = Arc::new(KnowledgeBaseContext::new("user"));
        let envs = solutions_for(ctx, goal1("p", Term::var("X"))).await;
        assert!(envs.is_empty());
    }

    #[tokio::test]
    async fn test_unbound_body_variable_leaves_goal_variable_free() {
        // p(X) :- q(_Any). X stays unbound in the answer
        let ctx = Arc::new(
            KnowledgeBaseContext::new("user")
                .with_rule(
                    Rule::new(
                        goal1("p", Term::var("X")),
                        Query::goal(goal1("q", Term::var("Z"))),
                    )
                    .unwrap(),
                )
                .with_rule(Rule::fact(goal1("q", Term::int(1))).unwrap()),
        );
        let x = Variable::new("X");
        let envs = solutions_for(ctx, goal1("p", Term::var("X"))).await;
        assert_eq!(envs.len(), 1);
        assert_eq!(envs[0].get(&x), None);
    }

    #[tokio::test]
    async fn test_structural_answer_is_reconstructed() {
        // count(0). count(s(N)) :- count(N).
        let s = |t: Term| Term::compound("s", vec![t]);
        let ctx = Arc::new(
            KnowledgeBaseContext::new("user")
                .with_rule(Rule::fact(goal1("count", Term::int(0))).unwrap())
                .with_rule(
                    Rule::new(
                        goal1("count", s(Term::var("N"))),
                        Query::goal(goal1("count", Term::var("N"))),
                    )
                    .unwrap(),
                ),
        );

        let x = Variable::new("X");
        let indicator = ctx.qualify(ClauseIndicator::new("count", 1));
        let deduce = Deduction::new(indicator, goal1("count", Term::var("X")));
        let mut seq = deduce.invoke(ctx, unit_input());

        let mut answers = Vec::new();
        for _ in 0..3 {
            let (env, ()) = seq.try_advance().await.unwrap().unwrap();
            answers.push(env.get(&x).cloned().unwrap());
        }
        seq.close();

        assert_eq!(answers[0], Term::int(0));
        assert_eq!(answers[1], s(Term::int(0)));
        assert_eq!(answers[2], s(s(Term::int(0))));
    }

    #[tokio::test]
    async fn test_final_rule_hands_over_its_solution_stream() {
        let ctx: Arc<dyn ProofSearchContext> = Arc::new(
            KnowledgeBaseContext::new("user")
                .with_rule(
                    Rule::new(
                        goal1("p", Term::var("X")),
                        Query::goal(goal1("q", Term::var("X"))),
                    )
                    .unwrap(),
                )
                .with_rule(Rule::fact(goal1("q", Term::int(1))).unwrap())
                .with_rule(Rule::fact(goal1("q", Term::int(2))).unwrap()),
        );
        let mut producer = DeduceProducer {
            ctx: ctx.clone(),
            indicator: FullyQualifiedClauseIndicator::new("user", ClauseIndicator::new("p", 1)),
            goal: goal1("p", Term::var("X")),
            input: unit_input(),
            input_done: false,
            pending: None,
            frame: None,
        };

        // p has exactly one rule, so the first pull hands the stream over
        let step = producer.next().await.unwrap();
        let Step::Become(mut handed) = step else {
            panic!("expected the stream to be handed over");
        };

        let x = Variable::new("X");
        let mut values = Vec::new();
        while let Some((env, ())) = handed.try_advance().await.unwrap() {
            values.push(env.get(&x).cloned());
        }
        assert_eq!(values, vec![Some(Term::int(1)), Some(Term::int(2))]);
    }

    #[tokio::test]
    async fn test_earlier_rules_stay_framed_until_the_last() {
        let ctx: Arc<dyn ProofSearchContext> = Arc::new(
            KnowledgeBaseContext::new("user")
                .with_rule(Rule::fact(goal1("p", Term::int(1))).unwrap())
                .with_rule(Rule::fact(goal1("p", Term::int(2))).unwrap()),
        );
        let mut producer = DeduceProducer {
            ctx: ctx.clone(),
            indicator: FullyQualifiedClauseIndicator::new("user", ClauseIndicator::new("p", 1)),
            goal: goal1("p", Term::var("X")),
            input: unit_input(),
            input_done: false,
            pending: None,
            frame: None,
        };

        let x = Variable::new("X");
        match producer.next().await.unwrap() {
            Step::Item((env, ())) => assert_eq!(env.get(&x), Some(&Term::int(1))),
            _ => panic!("first rule should answer through the frame"),
        }

        // the second and last rule hands over instead
        let step = producer.next().await.unwrap();
        let Step::Become(mut handed) = step else {
            panic!("expected the stream to be handed over");
        };
        let (env, ()) = handed.try_advance().await.unwrap().unwrap();
        assert_eq!(env.get(&x), Some(&Term::int(2)));
        assert_eq!(handed.try_advance().await.unwrap(), None);
    }
}
