//! Closure computation: the finite set of subformulas that can appear as
//! tableau facts for a normalized formula.

use std::sync::Arc;

use crate::ltl::{ArcFormula, Formula};

/// The closure of a normalized, Next-pushed formula: every syntactic
/// subformula that can hold at a state, in insertion order, duplicate-free
/// under structural equality (first occurrence wins).
///
/// Negations are never closure elements; [`double_closure`] synthesizes them.
///
/// ```
/// use ltl2buchi::ltl::Formula;
/// use ltl2buchi::buchi::closure::build_closure;
///
/// let f = Formula::prop("p")
///     .implies(Formula::prop("q").next())
///     .until(Formula::prop("p").not().and("q".into()))
///     .normalize()
///     .push_next_inside();
/// let keys: Vec<String> = build_closure(&f).iter().map(|c| c.to_string()).collect();
/// assert_eq!(
///     keys,
///     ["p", "q", "X q", "(!p | X q)", "(!p & q)", "((!p | X q) U (!p & q))"]
/// );
/// ```
pub fn build_closure(f: &Formula) -> Vec<ArcFormula> {
    debug_assert!(f.is_reduced(), "closure requires a normalized formula");
    let mut closure = Vec::new();
    collect(f, &mut closure);
    closure
}

fn collect(f: &Formula, out: &mut Vec<ArcFormula>) {
    match f {
        Formula::Atom(_) => push_unique(out, f),
        Formula::Not(a) => collect(a, out),
        Formula::Next(a) => {
            collect(a, out);
            push_unique(out, f);
        }
        Formula::And(a, b) | Formula::Or(a, b) | Formula::Until(a, b) => {
            collect(a, out);
            collect(b, out);
            push_unique(out, f);
        }
        // unreachable on reduced input
        Formula::Implies(..)
        | Formula::Globally(..)
        | Formula::Eventually(..)
        | Formula::Release(..) => {}
    }
}

// O(n²) over the closure, which is small by construction.
fn push_unique(out: &mut Vec<ArcFormula>, f: &Formula) {
    if !out.iter().any(|c| **c == *f) {
        out.push(Arc::new(f.clone()));
    }
}

/// The doubled closure: each element immediately followed by its negation.
/// States draw their membership keys from this sequence, and the pairing
/// order keeps a formula adjacent to its negation.
pub fn double_closure(closure: &[ArcFormula]) -> Vec<ArcFormula> {
    closure
        .iter()
        .flat_map(|c| [c.clone(), negated(c)])
        .collect()
}

/// Wrap a shared formula in a negation without cloning the subtree.
pub(crate) fn negated(f: &ArcFormula) -> ArcFormula {
    Arc::new(Formula::Not(f.clone()))
}
