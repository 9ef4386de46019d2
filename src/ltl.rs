//! Immutable LTL formula trees, and the rewrites that bring an arbitrary
//! formula into the reduced operator set used by the tableau construction.

use std::sync::Arc;

/// A Linear Temporal Logic formula.
///
/// Operands are reference-counted and never mutated after construction, so
/// subtrees are freely shared by every downstream stage. Equality and hashing
/// are structural (deep), which the closure builder relies on for
/// deduplication.
///
/// The reserved atom names `"true"` and `"false"` denote the boolean
/// constants; see [`Formula::tt`] and [`Formula::ff`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Formula {
    Atom(String),

    Not(ArcFormula),
    And(ArcFormula, ArcFormula),
    Or(ArcFormula, ArcFormula),
    Implies(ArcFormula, ArcFormula),

    Next(ArcFormula),
    Globally(ArcFormula),
    Eventually(ArcFormula),

    Until(ArcFormula, ArcFormula),
    Release(ArcFormula, ArcFormula),
}

/// A shared LTL formula.
pub type ArcFormula = Arc<Formula>;

impl Formula {
    pub fn prop(name: impl Into<String>) -> Self {
        Formula::Atom(name.into())
    }

    /// The constant ⊤, spelled as the reserved atom `"true"`.
    pub fn tt() -> Self {
        Formula::Atom("true".to_string())
    }

    /// The constant ⊥, spelled as the reserved atom `"false"`.
    pub fn ff() -> Self {
        Formula::Atom("false".to_string())
    }

    pub fn not(self) -> Self {
        Formula::Not(Arc::new(self))
    }

    pub fn and(self, rhs: Self) -> Self {
        Formula::And(Arc::new(self), Arc::new(rhs))
    }

    pub fn or(self, rhs: Self) -> Self {
        Formula::Or(Arc::new(self), Arc::new(rhs))
    }

    pub fn implies(self, rhs: Self) -> Self {
        Formula::Implies(Arc::new(self), Arc::new(rhs))
    }

    pub fn next(self) -> Self {
        Formula::Next(Arc::new(self))
    }

    pub fn globally(self) -> Self {
        Formula::Globally(Arc::new(self))
    }

    pub fn eventually(self) -> Self {
        Formula::Eventually(Arc::new(self))
    }

    pub fn until(self, rhs: Self) -> Self {
        Formula::Until(Arc::new(self), Arc::new(rhs))
    }

    pub fn release(self, rhs: Self) -> Self {
        Formula::Release(Arc::new(self), Arc::new(rhs))
    }

    /// The proposition name, for atoms.
    pub fn atom_name(&self) -> Option<&str> {
        match self {
            Formula::Atom(p) => Some(p),
            _ => None,
        }
    }

    /// True if only the reduced operator set {Atom, Not, And, Or, Next,
    /// Until} appears. [`Formula::normalize`] establishes this;
    /// [`Formula::push_next_inside`] and the closure builder require it.
    pub fn is_reduced(&self) -> bool {
        match self {
            Formula::Atom(_) => true,
            Formula::Not(a) | Formula::Next(a) => a.is_reduced(),
            Formula::And(a, b) | Formula::Or(a, b) | Formula::Until(a, b) => {
                a.is_reduced() && b.is_reduced()
            }
            Formula::Implies(..)
            | Formula::Globally(..)
            | Formula::Eventually(..)
            | Formula::Release(..) => false,
        }
    }

    /// A literal is an atom or a chain of `X`s ending in an atom, under at
    /// most one negation. Only literals are decided directly by a truth
    /// assignment during state generation.
    pub(crate) fn is_literal(&self) -> bool {
        match self {
            Formula::Not(a) => a.is_x_chain(),
            _ => self.is_x_chain(),
        }
    }

    pub(crate) fn is_x_chain(&self) -> bool {
        match self {
            Formula::Atom(_) => true,
            Formula::Next(a) => a.is_x_chain(),
            _ => false,
        }
    }

    /// The proposition at the bottom of an atom or `X` chain.
    pub(crate) fn x_chain_prop(&self) -> Option<&str> {
        match self {
            Formula::Atom(p) => Some(p),
            Formula::Next(a) => a.x_chain_prop(),
            _ => None,
        }
    }

    /// Rewrite into the reduced operator set {Atom, Not, And, Or, Next,
    /// Until} using the fixed equivalences
    ///
    /// ```text
    /// a -> b  =  !a | b
    /// G a     =  !(true U !a)
    /// F a     =  true U a
    /// a R b   =  !(!a U !b)
    /// ```
    ///
    /// Total and pure; the result is semantically equivalent to `self` over
    /// all infinite symbol sequences.
    pub fn normalize(&self) -> Formula {
        match self {
            Formula::Atom(p) => Formula::Atom(p.clone()),
            Formula::Not(a) => a.normalize().not(),
            Formula::Next(a) => a.normalize().next(),
            Formula::And(a, b) => a.normalize().and(b.normalize()),
            Formula::Or(a, b) => a.normalize().or(b.normalize()),
            Formula::Until(a, b) => a.normalize().until(b.normalize()),
            Formula::Implies(a, b) => a.normalize().not().or(b.normalize()),
            Formula::Globally(a) => Formula::tt().until(a.normalize().not()).not(),
            Formula::Eventually(a) => Formula::tt().until(a.normalize()),
            Formula::Release(a, b) => a.normalize().not().until(b.normalize().not()).not(),
        }
    }

    /// Push every `X` down to the atoms, so that each `Next` in the result
    /// wraps either another `Next` or an atom. `X` distributes over `!`,
    /// `&`, `|` and `U`; the accumulated depth is re-applied at the atoms.
    ///
    /// The input must already be in the reduced operator set.
    pub fn push_next_inside(&self) -> Formula {
        debug_assert!(
            self.is_reduced(),
            "push_next_inside requires a normalized formula"
        );
        self.push_next(0)
    }

    fn push_next(&self, depth: usize) -> Formula {
        match self {
            Formula::Atom(_) => {
                let mut f = self.clone();
                for _ in 0..depth {
                    f = f.next();
                }
                f
            }
            Formula::Not(a) => a.push_next(depth).not(),
            Formula::Next(a) => a.push_next(depth + 1),
            Formula::And(a, b) => a.push_next(depth).and(b.push_next(depth)),
            Formula::Or(a, b) => a.push_next(depth).or(b.push_next(depth)),
            Formula::Until(a, b) => a.push_next(depth).until(b.push_next(depth)),
            // unreachable on reduced input
            Formula::Implies(..)
            | Formula::Globally(..)
            | Formula::Eventually(..)
            | Formula::Release(..) => self.clone(),
        }
    }
}

impl From<&str> for Formula {
    fn from(s: &str) -> Self {
        Formula::prop(s)
    }
}

/// The canonical rendering. Binary operators are always parenthesized, so
/// distinct formulas render distinctly; the string doubles as the membership
/// key for closure sets and states.
impl std::fmt::Display for Formula {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Formula::Atom(p) => write!(f, "{}", p),
            Formula::Not(a) => write!(f, "!{}", a),
            Formula::Next(a) => write!(f, "X {}", a),
            Formula::Globally(a) => write!(f, "G {}", a),
            Formula::Eventually(a) => write!(f, "F {}", a),
            Formula::And(a, b) => write!(f, "({} & {})", a, b),
            Formula::Or(a, b) => write!(f, "({} | {})", a, b),
            Formula::Implies(a, b) => write!(f, "({} -> {})", a, b),
            Formula::Until(a, b) => write!(f, "({} U {})", a, b),
            Formula::Release(a, b) => write!(f, "({} R {})", a, b),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::strategy::arb_formula;
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn display_is_canonical() {
        let f = Formula::prop("p").implies(Formula::prop("q").next());
        assert_eq!(f.to_string(), "(p -> X q)");

        let f = Formula::prop("p").not().and("q".into());
        assert_eq!(f.to_string(), "(!p & q)");

        let f = Formula::prop("p").next().not();
        assert_eq!(f.to_string(), "!X p");
    }

    #[test]
    fn structural_equality_is_deep() {
        let a = Formula::prop("p").until(Formula::prop("q"));
        let b = Formula::prop("p").until(Formula::prop("q"));
        assert_eq!(a, b);
        assert_ne!(a, Formula::prop("q").until(Formula::prop("p")));
    }

    #[test]
    fn normalize_rewrites_sugar() {
        assert_eq!(
            Formula::prop("p").globally().normalize().to_string(),
            "!(true U !p)"
        );
        assert_eq!(
            Formula::prop("p").eventually().normalize().to_string(),
            "(true U p)"
        );
        assert_eq!(
            Formula::prop("p").implies("q".into()).normalize().to_string(),
            "(!p | q)"
        );
        assert_eq!(
            Formula::prop("p").release("q".into()).normalize().to_string(),
            "!(!p U !q)"
        );
    }

    #[test]
    fn normalize_preserves_reduced_operators() {
        let f = Formula::prop("p")
            .not()
            .until(Formula::prop("q").next().and(Formula::prop("r")));
        assert_eq!(f.normalize(), f);
    }

    #[test]
    fn push_next_distributes() {
        let f = Formula::prop("p").and("q".into()).next();
        assert_eq!(f.push_next_inside().to_string(), "(X p & X q)");

        let f = Formula::prop("p").not().next();
        assert_eq!(f.push_next_inside().to_string(), "!X p");

        let f = Formula::prop("p").next().next();
        assert_eq!(f.push_next_inside().to_string(), "X X p");

        let f = Formula::prop("p").until("q".into()).next();
        assert_eq!(f.push_next_inside().to_string(), "(X p U X q)");
    }

    /// Every `Next` in a pushed formula sits directly on an atom or another
    /// `Next`.
    fn next_targets_atoms(f: &Formula) -> bool {
        match f {
            Formula::Atom(_) => true,
            Formula::Next(_) => f.is_x_chain(),
            Formula::Not(a) => next_targets_atoms(a),
            Formula::And(a, b) | Formula::Or(a, b) | Formula::Until(a, b) => {
                next_targets_atoms(a) && next_targets_atoms(b)
            }
            _ => false,
        }
    }

    proptest! {
        #[test]
        fn normalize_reaches_reduced_set(f in arb_formula()) {
            prop_assert!(f.normalize().is_reduced());
        }

        #[test]
        fn normalize_is_idempotent(f in arb_formula()) {
            let once = f.normalize();
            prop_assert_eq!(once.normalize(), once);
        }

        #[test]
        fn push_next_lands_on_literals(f in arb_formula()) {
            let pushed = f.normalize().push_next_inside();
            prop_assert!(pushed.is_reduced());
            prop_assert!(next_targets_atoms(&pushed));
        }
    }
}
