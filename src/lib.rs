//! LTL-to-Büchi translation by the classical tableau construction.
//!
//! An arbitrary [`ltl::Formula`] is rewritten into the reduced operator set
//! {atom, `!`, `&`, `|`, `X`, `U`}, its subformula closure is computed,
//! every locally consistent subset of the doubled closure becomes an
//! automaton state, and the `X`/`U` unfolding obligations decide the
//! transitions. The result is a generalized Büchi automaton with one
//! accepting set per Until subformula: a run satisfies the formula iff it
//! visits every accepting set infinitely often.
//!
//! ```
//! use ltl2buchi::{build_automaton, Formula};
//!
//! let automaton = build_automaton(&Formula::prop("p").eventually());
//! assert_eq!(automaton.final_sets().count(), 1);
//! println!("{automaton}");
//! ```

pub mod buchi;
pub mod ltl;

pub use buchi::{build_automaton, Automaton, State, StateLabel, Transition};
pub use ltl::{ArcFormula, Formula};
