//! Identity-preserving duplication
//!
//! Duplicating a constraint-bearing value must map every variable it mentions
//! to the *same* copy that every other value duplicated in the same pass sees.
//! A [`DupMap`] is that shared memo.

use std::collections::HashMap;

use super::expr::{Constraint, Expression, Term, Variable};

/// Memo from source variables to their duplicates
#[derive(Debug, Default)]
pub struct DupMap {
    variables: HashMap<Variable, Variable>,
    keep_unmapped: bool,
}

impl DupMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// A map that only copies seeded variables and passes others through
    pub fn keeping_unmapped() -> Self {
        Self {
            variables: HashMap::new(),
            keep_unmapped: true,
        }
    }

    /// Register `variable` for copying and return its duplicate
    pub fn seed(&mut self, variable: &Variable) -> Variable {
        self.variables
            .entry(variable.clone())
            .or_insert_with(|| variable.fresh_copy())
            .clone()
    }

    /// The duplicate of `variable`
    ///
    /// Unknown variables are copied on first request, or returned unchanged
    /// by a [`DupMap::keeping_unmapped`] map.
    pub fn variable(&mut self, variable: &Variable) -> Variable {
        match self.variables.get(variable) {
            Some(copy) => copy.clone(),
            None if self.keep_unmapped => variable.clone(),
            None => self.seed(variable),
        }
    }

    /// The duplicate of `variable`, if it was already mapped
    pub fn get(&self, variable: &Variable) -> Option<&Variable> {
        self.variables.get(variable)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

/// Values that can be copied through a [`DupMap`]
pub trait Duplicate: Sized {
    fn duplicate(&self, map: &mut DupMap) -> Self;
}

impl Duplicate for Variable {
    fn duplicate(&self, map: &mut DupMap) -> Self {
        map.variable(self)
    }
}

impl Duplicate for Term {
    fn duplicate(&self, map: &mut DupMap) -> Self {
        Term::new(map.variable(&self.variable), self.coefficient)
    }
}

impl Duplicate for Expression {
    fn duplicate(&self, map: &mut DupMap) -> Self {
        Expression::new(
            self.terms.iter().map(|t| t.duplicate(map)).collect(),
            self.constant,
        )
    }
}

impl Duplicate for Constraint {
    fn duplicate(&self, map: &mut DupMap) -> Self {
        Constraint::new(
            self.expression().duplicate(map),
            self.relation(),
            self.strength(),
        )
    }
}

impl<T: Duplicate> Duplicate for Vec<T> {
    fn duplicate(&self, map: &mut DupMap) -> Self {
        self.iter().map(|item| item.duplicate(map)).collect()
    }
}

impl<T: Duplicate> Duplicate for Option<T> {
    fn duplicate(&self, map: &mut DupMap) -> Self {
        self.as_ref().map(|item| item.duplicate(map))
    }
}
