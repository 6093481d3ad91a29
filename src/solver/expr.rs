//! Linear constraint algebra
//!
//! Typed wrappers around the kasuari primitives. Every value here keeps enough
//! information (variable names, normalized expressions) to be printed in
//! diagnostics and to be duplicated through a [`DupMap`](super::DupMap).
//!
//! Constraints are written with the kasuari pipe syntax:
//!
//! ```rust
//! use diagram_animator::solver::{Strength, Variable, WeightedRelation::*};
//!
//! let x = Variable::new("x");
//! let w = Variable::new("w");
//! let c = x.clone() + w * 0.5 | EQ(Strength::REQUIRED) | 100.0;
//! assert_eq!(c.variables().count(), 2);
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::Sum;
use std::ops::{Add, BitOr, Div, Mul, Neg, Sub};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use kasuari::WeightedRelation::{EQ, GE, LE};

pub use kasuari::{Strength, WeightedRelation};

/// A named solver variable
///
/// Two variables are equal when they wrap the same kasuari variable; the name is
/// only used for display and diagnostic lookups.
#[derive(Clone)]
pub struct Variable {
    raw: kasuari::Variable,
    name: Arc<str>,
}

impl Variable {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            raw: kasuari::Variable::new(),
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn raw(&self) -> kasuari::Variable {
        self.raw
    }

    /// A new, unrelated variable carrying the same name
    pub(crate) fn fresh_copy(&self) -> Self {
        Self {
            raw: kasuari::Variable::new(),
            name: Arc::clone(&self.name),
        }
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Variable {}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Variable({})", self.name)
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A variable scaled by a constant coefficient
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub(crate) variable: Variable,
    pub(crate) coefficient: f64,
}

impl Term {
    pub fn new(variable: Variable, coefficient: f64) -> Self {
        Self {
            variable,
            coefficient,
        }
    }

    pub fn variable(&self) -> &Variable {
        &self.variable
    }

    pub fn coefficient(&self) -> f64 {
        self.coefficient
    }
}

/// A sum of terms plus a constant
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expression {
    pub(crate) terms: Vec<Term>,
    pub(crate) constant: f64,
}

impl Expression {
    pub fn new(terms: Vec<Term>, constant: f64) -> Self {
        Self { terms, constant }
    }

    pub fn from_constant(constant: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant,
        }
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }

    /// True when no term has a non-zero coefficient
    pub fn is_constant(&self) -> bool {
        self.terms.iter().all(|t| t.coefficient == 0.0)
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.terms.iter().map(|t| &t.variable)
    }

    /// Evaluate with the given variable values
    pub fn evaluate(&self, value_of: impl Fn(&Variable) -> f64) -> f64 {
        self.terms
            .iter()
            .map(|t| t.coefficient * value_of(&t.variable))
            .sum::<f64>()
            + self.constant
    }

    /// Merge repeated variables and drop zero coefficients
    pub fn simplified(self) -> Self {
        let mut terms: Vec<Term> = Vec::with_capacity(self.terms.len());
        for term in self.terms {
            match terms.iter_mut().find(|t| t.variable == term.variable) {
                Some(existing) => existing.coefficient += term.coefficient,
                None => terms.push(term),
            }
        }
        terms.retain(|t| t.coefficient != 0.0);
        Self {
            terms,
            constant: self.constant,
        }
    }

    fn scaled(mut self, factor: f64) -> Self {
        for term in &mut self.terms {
            term.coefficient *= factor;
        }
        self.constant *= factor;
        self
    }

    fn plus(mut self, other: Expression) -> Self {
        self.terms.extend(other.terms);
        self.constant += other.constant;
        self
    }

    pub(crate) fn to_raw(&self) -> kasuari::Expression {
        kasuari::Expression::new(
            self.terms
                .iter()
                .map(|t| kasuari::Term::new(t.variable.raw(), t.coefficient))
                .collect(),
            self.constant,
        )
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for term in &self.terms {
            let (sign, magnitude) = if term.coefficient < 0.0 {
                ("-", -term.coefficient)
            } else {
                ("+", term.coefficient)
            };
            match (first, sign) {
                (true, "-") => f.write_str("-")?,
                (true, _) => {}
                (false, _) => write!(f, " {sign} ")?,
            }
            if magnitude != 1.0 {
                write!(f, "{magnitude} * ")?;
            }
            write!(f, "{}", term.variable)?;
            first = false;
        }
        if first {
            write!(f, "{}", self.constant)
        } else if self.constant < 0.0 {
            write!(f, " - {}", -self.constant)
        } else if self.constant > 0.0 {
            write!(f, " + {}", self.constant)
        } else {
            Ok(())
        }
    }
}

impl From<f64> for Expression {
    fn from(constant: f64) -> Self {
        Self::from_constant(constant)
    }
}

impl From<Variable> for Expression {
    fn from(variable: Variable) -> Self {
        Term::new(variable, 1.0).into()
    }
}

impl From<&Variable> for Expression {
    fn from(variable: &Variable) -> Self {
        variable.clone().into()
    }
}

impl From<Term> for Expression {
    fn from(term: Term) -> Self {
        Self::new(vec![term], 0.0)
    }
}

impl From<&Expression> for Expression {
    fn from(expr: &Expression) -> Self {
        expr.clone()
    }
}

impl Sum for Expression {
    fn sum<I: Iterator<Item = Expression>>(iter: I) -> Self {
        iter.fold(Expression::default(), Expression::plus)
    }
}

macro_rules! linear_ops {
    ($($ty:ty),*) => {$(
        impl<T: Into<Expression>> Add<T> for $ty {
            type Output = Expression;
            fn add(self, rhs: T) -> Expression {
                Expression::from(self).plus(rhs.into())
            }
        }

        impl<T: Into<Expression>> Sub<T> for $ty {
            type Output = Expression;
            fn sub(self, rhs: T) -> Expression {
                Expression::from(self).plus(rhs.into().scaled(-1.0))
            }
        }

        impl Add<$ty> for f64 {
            type Output = Expression;
            fn add(self, rhs: $ty) -> Expression {
                Expression::from(rhs) + self
            }
        }

        impl Sub<$ty> for f64 {
            type Output = Expression;
            fn sub(self, rhs: $ty) -> Expression {
                Expression::from(rhs).scaled(-1.0) + self
            }
        }

        impl Mul<$ty> for f64 {
            type Output = Expression;
            fn mul(self, rhs: $ty) -> Expression {
                Expression::from(rhs).scaled(self)
            }
        }

        impl BitOr<WeightedRelation> for $ty {
            type Output = PartialConstraint;
            fn bitor(self, relation: WeightedRelation) -> PartialConstraint {
                PartialConstraint::new(Expression::from(self), relation)
            }
        }
    )*};
}

linear_ops!(Variable, &Variable, Term, Expression);

impl Mul<f64> for Variable {
    type Output = Term;
    fn mul(self, rhs: f64) -> Term {
        Term::new(self, rhs)
    }
}

impl Mul<f64> for &Variable {
    type Output = Term;
    fn mul(self, rhs: f64) -> Term {
        Term::new(self.clone(), rhs)
    }
}

impl Mul<f64> for Term {
    type Output = Term;
    fn mul(mut self, rhs: f64) -> Term {
        self.coefficient *= rhs;
        self
    }
}

impl Mul<f64> for Expression {
    type Output = Expression;
    fn mul(self, rhs: f64) -> Expression {
        self.scaled(rhs)
    }
}

impl Div<f64> for Variable {
    type Output = Term;
    fn div(self, rhs: f64) -> Term {
        Term::new(self, 1.0 / rhs)
    }
}

impl Div<f64> for &Variable {
    type Output = Term;
    fn div(self, rhs: f64) -> Term {
        Term::new(self.clone(), 1.0 / rhs)
    }
}

impl Div<f64> for Term {
    type Output = Term;
    fn div(mut self, rhs: f64) -> Term {
        self.coefficient /= rhs;
        self
    }
}

impl Div<f64> for Expression {
    type Output = Expression;
    fn div(self, rhs: f64) -> Expression {
        self.scaled(1.0 / rhs)
    }
}

impl Neg for Variable {
    type Output = Term;
    fn neg(self) -> Term {
        Term::new(self, -1.0)
    }
}

impl Neg for Term {
    type Output = Term;
    fn neg(mut self) -> Term {
        self.coefficient = -self.coefficient;
        self
    }
}

impl Neg for Expression {
    type Output = Expression;
    fn neg(self) -> Expression {
        self.scaled(-1.0)
    }
}

/// Comparison operator of a constraint, after moving everything to the left
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Equal,
    LessOrEqual,
    GreaterOrEqual,
}

impl Relation {
    fn split(relation: WeightedRelation) -> (Self, Strength) {
        match relation {
            EQ(strength) => (Self::Equal, strength),
            LE(strength) => (Self::LessOrEqual, strength),
            GE(strength) => (Self::GreaterOrEqual, strength),
        }
    }

    fn weighted(self, strength: Strength) -> WeightedRelation {
        match self {
            Self::Equal => EQ(strength),
            Self::LessOrEqual => LE(strength),
            Self::GreaterOrEqual => GE(strength),
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Equal => "==",
            Self::LessOrEqual => "<=",
            Self::GreaterOrEqual => ">=",
        })
    }
}

/// Left-hand side and relation of a constraint under construction
pub struct PartialConstraint {
    lhs: Expression,
    relation: Relation,
    strength: Strength,
}

impl PartialConstraint {
    fn new(lhs: Expression, relation: WeightedRelation) -> Self {
        let (relation, strength) = Relation::split(relation);
        Self {
            lhs,
            relation,
            strength,
        }
    }
}

impl<T: Into<Expression>> BitOr<T> for PartialConstraint {
    type Output = Constraint;
    fn bitor(self, rhs: T) -> Constraint {
        Constraint::new(self.lhs - rhs, self.relation, self.strength)
    }
}

static NEXT_CONSTRAINT: AtomicU64 = AtomicU64::new(1);

/// Process-unique constraint identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintId(u64);

impl ConstraintId {
    fn next() -> Self {
        Self(NEXT_CONSTRAINT.fetch_add(1, Ordering::Relaxed))
    }
}

/// `expression <relation> 0` with a strength
#[derive(Clone)]
pub struct Constraint {
    id: ConstraintId,
    expression: Expression,
    relation: Relation,
    strength: Strength,
    raw: kasuari::Constraint,
}

impl Constraint {
    pub fn new(expression: Expression, relation: Relation, strength: Strength) -> Self {
        let expression = expression.simplified();
        let raw = expression.to_raw() | relation.weighted(strength) | 0.0;
        Self {
            id: ConstraintId::next(),
            expression,
            relation,
            strength,
            raw,
        }
    }

    pub fn id(&self) -> ConstraintId {
        self.id
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    pub fn relation(&self) -> Relation {
        self.relation
    }

    pub fn strength(&self) -> Strength {
        self.strength
    }

    pub fn is_required(&self) -> bool {
        self.strength == Strength::REQUIRED
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.expression.variables()
    }

    /// True if any variable of this constraint carries `name`
    pub fn mentions(&self, name: &str) -> bool {
        self.variables().any(|v| v.name() == name)
    }

    /// Check the constraint against concrete values
    pub fn is_satisfied(&self, value_of: impl Fn(&Variable) -> f64, tolerance: f64) -> bool {
        let v = self.expression.evaluate(value_of);
        match self.relation {
            Relation::Equal => v.abs() <= tolerance,
            Relation::LessOrEqual => v <= tolerance,
            Relation::GreaterOrEqual => v >= -tolerance,
        }
    }

    pub(crate) fn raw(&self) -> &kasuari::Constraint {
        &self.raw
    }
}

impl PartialEq for Constraint {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Constraint {}

impl Hash for Constraint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

fn strength_label(strength: Strength) -> &'static str {
    if strength == Strength::REQUIRED {
        "required"
    } else if strength == Strength::STRONG {
        "strong"
    } else if strength == Strength::MEDIUM {
        "medium"
    } else if strength == Strength::WEAK {
        "weak"
    } else {
        "custom"
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} 0 [{}]",
            self.expression,
            self.relation,
            strength_label(self.strength)
        )
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Constraint#{}({self})", self.id.0)
    }
}
