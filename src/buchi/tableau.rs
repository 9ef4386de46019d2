//! The satisfiability tableau: enumerating locally consistent subsets of the
//! doubled closure as automaton states, then deriving initial states, the
//! per-Until accepting sets, and the obligation-checked transitions.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use itertools::iproduct;

use crate::ltl::{ArcFormula, Formula};

use super::closure::negated;
use super::{StateLabel, Transition};

/// The formulas claimed true by a state, keyed by canonical rendering.
pub(crate) type Members = BTreeMap<String, ArcFormula>;

/// Three-valued truth: the result of evaluating a closure formula against a
/// partial assignment or a still-growing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tri {
    True,
    False,
    Unknown,
}

impl Tri {
    fn from_bool(b: bool) -> Self {
        if b { Tri::True } else { Tri::False }
    }

    fn negate(self) -> Self {
        match self {
            Tri::True => Tri::False,
            Tri::False => Tri::True,
            Tri::Unknown => Tri::Unknown,
        }
    }

    fn and(self, rhs: Self) -> Self {
        match (self, rhs) {
            (Tri::False, _) | (_, Tri::False) => Tri::False,
            (Tri::True, Tri::True) => Tri::True,
            _ => Tri::Unknown,
        }
    }

    fn or(self, rhs: Self) -> Self {
        match (self, rhs) {
            (Tri::True, _) | (_, Tri::True) => Tri::True,
            (Tri::False, Tri::False) => Tri::False,
            _ => Tri::Unknown,
        }
    }
}

/// The membership key of a formula's negation. Matches the `Display` form of
/// [`Formula::Not`].
fn negated_key(f: &Formula) -> String {
    format!("!{f}")
}

/// Evaluate under a truth assignment to the independent variables, keyed by
/// canonical rendering. Each `X` chain is its own variable, independent of
/// the atom at its bottom: `X p` says nothing about `p` now, only about `p`
/// one step later, and the transition obligations enforce that link. Only
/// the propositional fragment is decidable here; Until and the
/// pre-normalization operators are `Unknown`.
fn eval_under(f: &Formula, assignment: &BTreeMap<String, bool>) -> Tri {
    match f {
        Formula::Atom(p) if p == "true" => Tri::True,
        Formula::Atom(p) if p == "false" => Tri::False,
        Formula::Atom(_) => {
            Tri::from_bool(assignment.get(&f.to_string()).copied().unwrap_or(false))
        }
        Formula::Next(_) => match f.x_chain_prop() {
            // X over a constant is the constant
            Some("true") => Tri::True,
            Some("false") => Tri::False,
            Some(_) => Tri::from_bool(assignment.get(&f.to_string()).copied().unwrap_or(false)),
            None => Tri::Unknown,
        },
        Formula::Not(a) => eval_under(a, assignment).negate(),
        Formula::And(a, b) => eval_under(a, assignment).and(eval_under(b, assignment)),
        Formula::Or(a, b) => eval_under(a, assignment).or(eval_under(b, assignment)),
        Formula::Until(..)
        | Formula::Implies(..)
        | Formula::Globally(..)
        | Formula::Eventually(..)
        | Formula::Release(..) => Tri::Unknown,
    }
}

/// Evaluate against the membership of a tentative state. Literals were fixed
/// at seeding time. An Until that is not yet claimed either way is `True`
/// when its right operand holds, `False` when neither operand holds, and
/// `Unknown` when only the left operand holds — the case that forces a fork.
fn eval_in(f: &Formula, members: &Members) -> Tri {
    match f {
        Formula::Atom(p) if p == "true" => Tri::True,
        Formula::Atom(p) if p == "false" => Tri::False,
        Formula::Atom(_) | Formula::Next(_) => {
            Tri::from_bool(members.contains_key(&f.to_string()))
        }
        Formula::Not(a) => eval_in(a, members).negate(),
        Formula::And(a, b) => eval_in(a, members).and(eval_in(b, members)),
        Formula::Or(a, b) => eval_in(a, members).or(eval_in(b, members)),
        Formula::Until(a, b) => {
            if members.contains_key(&f.to_string()) {
                return Tri::True;
            }
            if members.contains_key(&negated_key(f)) {
                return Tri::False;
            }
            match eval_in(b, members) {
                Tri::True => Tri::True,
                Tri::Unknown => Tri::Unknown,
                Tri::False => match eval_in(a, members) {
                    Tri::True => Tri::Unknown,
                    Tri::Unknown => Tri::Unknown,
                    Tri::False => Tri::False,
                },
            }
        }
        Formula::Implies(..)
        | Formula::Globally(..)
        | Formula::Eventually(..)
        | Formula::Release(..) => Tri::Unknown,
    }
}

/// The independent variables of the doubled closure: every atom and every
/// `X`-chain element, each under its own canonical key, minus the constants.
/// `p` and `X p` are distinct variables; assignments range over all their
/// combinations.
fn variables(doubled: &[ArcFormula]) -> BTreeSet<String> {
    doubled
        .iter()
        .filter(|f| f.is_x_chain())
        .filter(|f| !matches!(f.x_chain_prop(), Some("true") | Some("false")))
        .map(|f| f.to_string())
        .collect()
}

/// A state still under construction. Forking abandons its label; both
/// successors get fresh ones.
struct Tentative {
    label: StateLabel,
    members: Members,
}

enum Expansion {
    Complete,
    Forked(ArcFormula),
}

/// Add every doubled-closure formula that three-valued evaluation proves,
/// until either nothing changes (the state is maximal) or an Until comes out
/// `Unknown` and the caller must fork. Closure order lists subformulas
/// before their parents, so the Until returned here always has decided
/// operands.
fn expand(members: &mut Members, doubled: &[ArcFormula]) -> Expansion {
    loop {
        let mut changed = false;
        for f in doubled {
            let key = f.to_string();
            if members.contains_key(&key) {
                continue;
            }
            match eval_in(f, members) {
                Tri::True => {
                    members.insert(key, f.clone());
                    changed = true;
                }
                Tri::False => {}
                Tri::Unknown => {
                    if matches!(**f, Formula::Until(..)) {
                        return Expansion::Forked(f.clone());
                    }
                    // resolves once the Until it depends on is decided
                }
            }
        }
        if !changed {
            return Expansion::Complete;
        }
    }
}

/// Enumerate every maximal locally consistent subset of the doubled closure.
///
/// One seed state per truth assignment to the independent variables, holding
/// exactly the literals the assignment makes true; a worklist then expands
/// each seed to a fixpoint, forking on every undecided Until. Labels are
/// allocated from a single counter threaded through all assignments, so they
/// are globally unique and monotonically increasing. Semantically identical
/// states reached under different assignments are *not* merged.
pub(crate) fn generate_states(doubled: &[ArcFormula]) -> BTreeMap<StateLabel, Members> {
    let vars: Vec<String> = variables(doubled).into_iter().collect();
    let mut counter = 0u32;
    let mut states = BTreeMap::new();

    for mask in 0..(1u64 << vars.len()) {
        let assignment: BTreeMap<String, bool> = vars
            .iter()
            .enumerate()
            .map(|(i, v)| (v.clone(), mask & (1u64 << i) != 0))
            .collect();

        let mut seed = Members::new();
        for f in doubled {
            if f.is_literal() && eval_under(f, &assignment) == Tri::True {
                seed.insert(f.to_string(), f.clone());
            }
        }

        counter += 1;
        let mut work = VecDeque::new();
        work.push_back(Tentative {
            label: StateLabel::from(counter),
            members: seed,
        });

        while let Some(mut tentative) = work.pop_front() {
            match expand(&mut tentative.members, doubled) {
                Expansion::Complete => {
                    states.insert(tentative.label, tentative.members);
                }
                Expansion::Forked(u) => {
                    tracing::trace!(until = %u, state = %tentative.label, "forking on undecided Until");

                    let mut with = tentative.members.clone();
                    with.insert(u.to_string(), u.clone());
                    counter += 1;
                    work.push_back(Tentative {
                        label: StateLabel::from(counter),
                        members: with,
                    });

                    let mut without = tentative.members;
                    let neg = negated(&u);
                    without.insert(neg.to_string(), neg);
                    counter += 1;
                    work.push_back(Tentative {
                        label: StateLabel::from(counter),
                        members: without,
                    });
                }
            }
        }
    }

    states
}

/// Initial states: those claiming the (normalized, Next-pushed) target
/// formula. There may be several; none is privileged.
pub(crate) fn initial_states(
    states: &BTreeMap<StateLabel, Members>,
    target: &Formula,
) -> BTreeSet<StateLabel> {
    let key = target.to_string();
    states
        .iter()
        .filter(|(_, members)| members.contains_key(&key))
        .map(|(label, _)| *label)
        .collect()
}

/// One accepting set per Until in the closure, in closure order: the states
/// where the obligation is not pending, i.e. the Until is not claimed or its
/// right operand already holds.
pub(crate) fn final_sets(
    states: &BTreeMap<StateLabel, Members>,
    closure: &[ArcFormula],
) -> BTreeMap<usize, BTreeSet<StateLabel>> {
    closure
        .iter()
        .filter_map(|f| match f.as_ref() {
            Formula::Until(_, b) => Some((f.to_string(), b.to_string())),
            _ => None,
        })
        .enumerate()
        .map(|(index, (u_key, b_key))| {
            let accepting = states
                .iter()
                .filter(|(_, m)| !m.contains_key(&u_key) || m.contains_key(&b_key))
                .map(|(label, _)| *label)
                .collect();
            (index, accepting)
        })
        .collect()
}

/// All admissible transitions, grouped by source. A transition between an
/// ordered pair of states exists iff every `X` and `U` formula in the
/// closure has its unfolding obligation respected:
///
/// * `X p` holds at the source iff `p` holds at the target;
/// * `(a U b)` holds at the source iff `b` holds there, or `a` holds there
///   and the Until still holds at the target.
///
/// The transition symbol is the source state's positive atoms.
pub(crate) fn transitions(
    states: &BTreeMap<StateLabel, Members>,
    closure: &[ArcFormula],
) -> BTreeMap<StateLabel, Vec<Transition>> {
    let mut out: BTreeMap<StateLabel, Vec<Transition>> = BTreeMap::new();
    for ((from, fm), (to, _)) in
        iproduct!(states.iter(), states.iter()).filter(|((_, fm), (_, tm))| {
            admissible(fm, tm, closure)
        })
    {
        out.entry(*from)
            .or_default()
            .push(Transition::new(*from, state_symbol(fm), *to));
    }
    out
}

fn admissible(from: &Members, to: &Members, closure: &[ArcFormula]) -> bool {
    closure.iter().all(|f| match f.as_ref() {
        Formula::Next(p) => {
            from.contains_key(&f.to_string()) == to.contains_key(&p.to_string())
        }
        Formula::Until(a, b) => {
            let holds = from.contains_key(&f.to_string());
            let unfolded = from.contains_key(&b.to_string())
                || (from.contains_key(&a.to_string()) && to.contains_key(&f.to_string()));
            holds == unfolded
        }
        _ => true,
    })
}

/// The positive atoms of a state, excluding the constants.
fn state_symbol(members: &Members) -> BTreeSet<String> {
    members
        .values()
        .filter_map(|f| f.atom_name())
        .filter(|p| *p != "true" && *p != "false")
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buchi::closure::{build_closure, double_closure};

    #[test]
    fn kleene_connectives() {
        assert_eq!(Tri::True.and(Tri::Unknown), Tri::Unknown);
        assert_eq!(Tri::False.and(Tri::Unknown), Tri::False);
        assert_eq!(Tri::True.or(Tri::Unknown), Tri::True);
        assert_eq!(Tri::False.or(Tri::Unknown), Tri::Unknown);
        assert_eq!(Tri::Unknown.negate(), Tri::Unknown);
    }

    #[test]
    fn assignment_eval_is_propositional_only() {
        let assignment = BTreeMap::from([("p".to_string(), true)]);
        let p = Formula::prop("p");

        assert_eq!(eval_under(&p, &assignment), Tri::True);
        assert_eq!(eval_under(&p.clone().not(), &assignment), Tri::False);
        assert_eq!(eval_under(&Formula::tt(), &assignment), Tri::True);
        assert_eq!(eval_under(&Formula::ff().not(), &assignment), Tri::True);
        assert_eq!(
            eval_under(&Formula::tt().until(p), &assignment),
            Tri::Unknown
        );
    }

    #[test]
    fn next_chain_is_its_own_variable() {
        // X p has its own entry in the assignment; the value of p is
        // irrelevant to it, and vice versa
        let p = Formula::prop("p");
        let assignment = BTreeMap::from([("p".to_string(), true)]);
        assert_eq!(eval_under(&p.clone().next(), &assignment), Tri::False);

        let assignment = BTreeMap::from([("X p".to_string(), true)]);
        assert_eq!(eval_under(&p.clone().next(), &assignment), Tri::True);
        assert_eq!(eval_under(&p, &assignment), Tri::False);

        // constants stay constant under X
        assert_eq!(eval_under(&Formula::tt().next(), &assignment), Tri::True);
        assert_eq!(
            eval_under(&Formula::ff().next().next(), &assignment),
            Tri::False
        );
    }

    #[test]
    fn variables_keep_next_chains_distinct() {
        let target = Formula::prop("p").next();
        let doubled = double_closure(&build_closure(&target));
        let vars = variables(&doubled);
        assert_eq!(
            vars,
            BTreeSet::from(["X p".to_string(), "p".to_string()])
        );
    }

    #[test]
    fn until_eval_forks_only_when_pending() {
        let u = Formula::tt().until(Formula::prop("p"));

        let with_p = Members::from([
            ("true".to_string(), ArcFormula::new(Formula::tt())),
            ("p".to_string(), ArcFormula::new(Formula::prop("p"))),
        ]);
        assert_eq!(eval_in(&u, &with_p), Tri::True);

        let without_p = Members::from([
            ("true".to_string(), ArcFormula::new(Formula::tt())),
            ("!p".to_string(), ArcFormula::new(Formula::prop("p").not())),
        ]);
        assert_eq!(eval_in(&u, &without_p), Tri::Unknown);

        let mut claimed_false = without_p.clone();
        claimed_false.insert(
            "!(true U p)".to_string(),
            ArcFormula::new(u.clone().not()),
        );
        assert_eq!(eval_in(&u, &claimed_false), Tri::False);
    }

    #[test]
    fn single_atom_generates_two_states() {
        let doubled = double_closure(&build_closure(&Formula::prop("p")));
        let states = generate_states(&doubled);

        assert_eq!(states.len(), 2);
        let mut members = states.values();
        assert!(members.next().unwrap().contains_key("!p"));
        assert!(members.next().unwrap().contains_key("p"));
    }

    #[test]
    fn eventually_forks_the_pending_assignment() {
        // (true U p): the p-false assignment is the only one left pending
        let target = Formula::prop("p").eventually().normalize();
        let closure = build_closure(&target);
        let states = generate_states(&double_closure(&closure));

        assert_eq!(states.len(), 3);

        let claiming: Vec<_> = states
            .values()
            .filter(|m| m.contains_key("(true U p)"))
            .collect();
        assert_eq!(claiming.len(), 2);

        // every state decides the Until one way or the other
        for m in states.values() {
            assert!(m.contains_key("(true U p)") ^ m.contains_key("!(true U p)"));
        }
    }

    #[test]
    fn next_obligation_restricts_pairs() {
        let target = Formula::prop("p").next();
        let closure = build_closure(&target);
        let states = generate_states(&double_closure(&closure));
        let transitions = transitions(&states, &closure);

        // four states, one per combination of the independent variables p
        // and X p; a source may step only to targets that agree with its
        // X p claim on p
        assert_eq!(states.len(), 4);
        assert_eq!(transitions.len(), 4);
        for (source, outgoing) in transitions {
            let from = &states[&source];
            assert_eq!(outgoing.len(), 2);
            for t in &outgoing {
                assert_eq!(
                    from.contains_key("X p"),
                    states[&t.target()].contains_key("p")
                );
            }
        }
    }

    #[test]
    fn until_acceptance_excludes_pending_states() {
        let target = Formula::prop("p").eventually().normalize();
        let closure = build_closure(&target);
        let states = generate_states(&double_closure(&closure));
        let finals = final_sets(&states, &closure);

        assert_eq!(finals.len(), 1);
        for label in &finals[&0] {
            let m = &states[label];
            assert!(!m.contains_key("(true U p)") || m.contains_key("p"));
        }
        // the pending state (Until claimed, p false) is excluded
        let pending: Vec<_> = states
            .iter()
            .filter(|(_, m)| m.contains_key("(true U p)") && !m.contains_key("p"))
            .map(|(label, _)| *label)
            .collect();
        assert_eq!(pending.len(), 1);
        assert!(!finals[&0].contains(&pending[0]));
    }
}
