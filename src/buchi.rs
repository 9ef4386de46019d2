//! Generalized Büchi automata built from LTL formulas by the classical
//! tableau construction.

pub mod closure;
pub mod parse;
mod tableau;

use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;

use crate::ltl::{ArcFormula, Formula};
use closure::{build_closure, double_closure};

/// A state label: `s1`, `s2`, … Labels are allocated monotonically during
/// state generation; tentative states abandoned by a fork never surrender
/// theirs, so the final sequence may have gaps.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    derive_more::Display,
    derive_more::From,
)]
#[display("s{_0}")]
pub struct StateLabel(u32);

/// A tableau state: the subset of the doubled closure claimed true there,
/// keyed by each formula's canonical rendering.
///
/// Identity is the label. Two states with different labels are different
/// states even when they claim the same formulas — the generator does not
/// merge semantically identical states found under different assignments.
#[derive(Debug, Clone)]
pub struct State {
    label: StateLabel,
    formulas: BTreeMap<String, ArcFormula>,
}

impl State {
    pub fn label(&self) -> StateLabel {
        self.label
    }

    /// Whether this state claims the formula with the given canonical key.
    pub fn contains(&self, key: &str) -> bool {
        self.formulas.contains_key(key)
    }

    /// The claimed formulas, in key order.
    pub fn formulas(&self) -> impl Iterator<Item = &ArcFormula> {
        self.formulas.values()
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label
    }
}

impl Eq for State {}

/// A labeled transition. The symbol is the set of atomic propositions true
/// in the source state; it is derived from the source, never chosen
/// independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    source: StateLabel,
    symbol: BTreeSet<String>,
    target: StateLabel,
}

impl Transition {
    pub(crate) fn new(source: StateLabel, symbol: BTreeSet<String>, target: StateLabel) -> Self {
        Self {
            source,
            symbol,
            target,
        }
    }

    pub fn source(&self) -> StateLabel {
        self.source
    }

    pub fn target(&self) -> StateLabel {
        self.target
    }

    pub fn symbol(&self) -> &BTreeSet<String> {
        &self.symbol
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} --[{}]--> {}",
            self.source,
            self.symbol.iter().join(", "),
            self.target
        )
    }
}

/// A generalized Büchi automaton: explicit states, a set of initial states,
/// one accepting set per Until subformula of the closure, and the admissible
/// transitions grouped by source.
///
/// Assembled in one pass by [`build_automaton`]; read-only afterwards. Every
/// label referenced by the initial set, the accepting sets, or a transition
/// exists in the state map.
#[derive(Debug, Clone, Default)]
pub struct Automaton {
    states: BTreeMap<StateLabel, State>,
    initial: BTreeSet<StateLabel>,
    finals: BTreeMap<usize, BTreeSet<StateLabel>>,
    transitions: BTreeMap<StateLabel, Vec<Transition>>,
}

impl Automaton {
    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.states.values()
    }

    pub fn state(&self, label: StateLabel) -> Option<&State> {
        self.states.get(&label)
    }

    pub fn initial_states(&self) -> impl Iterator<Item = StateLabel> + '_ {
        self.initial.iter().copied()
    }

    /// The accepting sets, indexed per Until subformula in closure order. A
    /// run is accepting iff it visits every set infinitely often.
    pub fn final_sets(&self) -> impl Iterator<Item = (usize, &BTreeSet<StateLabel>)> {
        self.finals.iter().map(|(index, labels)| (*index, labels))
    }

    /// Outgoing transitions, grouped by source label.
    pub fn transitions(&self) -> impl Iterator<Item = (StateLabel, &[Transition])> {
        self.transitions
            .iter()
            .map(|(label, transitions)| (*label, transitions.as_slice()))
    }
}

/// Deterministic rendering: `S0 = {…}`, one `F<i> = {…}` line per accepting
/// set, then the transition block. An automaton with no transitions renders
/// the block as `T = {` immediately followed by `}` on the next line, with
/// no blank line between them; [`parse::parse_automaton`] relies on exactly
/// this shape.
impl std::fmt::Display for Automaton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "S0 = {{{}}}", self.initial.iter().join(", "))?;
        for (index, labels) in &self.finals {
            writeln!(f, "F{} = {{{}}}", index, labels.iter().join(", "))?;
        }
        writeln!(f, "T = {{")?;
        for transition in self.transitions.values().flatten() {
            writeln!(f, "  {}", transition)?;
        }
        write!(f, "}}")
    }
}

/// Build the generalized Büchi automaton accepting exactly the infinite
/// symbol sequences that satisfy `f`.
///
/// Composes the whole pipeline: normalize, push `X` down to the atoms,
/// compute the doubled closure, enumerate the tableau states, extract the
/// initial and accepting sets, and admit every transition whose `X`/`U`
/// obligations hold.
pub fn build_automaton(f: &Formula) -> Automaton {
    let target = f.normalize().push_next_inside();
    let closure = build_closure(&target);
    let doubled = double_closure(&closure);
    tracing::debug!(formula = %target, closure = closure.len(), "built closure");

    let members = tableau::generate_states(&doubled);
    let initial = tableau::initial_states(&members, &target);
    let finals = tableau::final_sets(&members, &closure);
    let transitions = tableau::transitions(&members, &closure);
    tracing::debug!(
        states = members.len(),
        initial = initial.len(),
        finals = finals.len(),
        transitions = transitions.values().map(Vec::len).sum::<usize>(),
        "assembled automaton"
    );

    let states = members
        .into_iter()
        .map(|(label, formulas)| (label, State { label, formulas }))
        .collect();

    Automaton {
        states,
        initial,
        finals,
        transitions,
    }
}
