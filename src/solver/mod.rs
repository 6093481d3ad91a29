//! Constraint solver integration
//!
//! [`Solver`] wraps a kasuari solver and keeps its own record of the active
//! constraint set, so that adds and removes are idempotent, values can be read
//! back by variable, and an infeasible add can be explained in terms of the
//! other constraints touching the same variables.

mod duplicate;
mod error;
mod expr;

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

use tracing::{debug, trace};

pub use duplicate::{DupMap, Duplicate};
pub use error::SolverError;
pub use expr::{
    Constraint, ConstraintId, Expression, PartialConstraint, Relation, Strength, Term, Variable,
    WeightedRelation,
};

/// One variable implicated in a failure, with everything that constrains it
#[derive(Debug, Clone)]
pub struct VariableReport {
    pub variable: Variable,
    pub value: f64,
    pub constraints: Vec<Constraint>,
}

/// Incremental constraint set for one canvas
pub struct Solver {
    inner: kasuari::Solver,
    constraints: Vec<Constraint>,
    values: HashMap<kasuari::Variable, f64>,
}

impl Solver {
    pub fn new() -> Self {
        Self {
            inner: kasuari::Solver::new(),
            constraints: Vec::new(),
            values: HashMap::new(),
        }
    }

    pub fn contains(&self, constraint: &Constraint) -> bool {
        self.constraints.iter().any(|c| c == constraint)
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Add a constraint; adding one that is already present does nothing
    pub fn add(&mut self, constraint: Constraint) -> Result<(), SolverError> {
        if self.contains(&constraint) {
            return Ok(());
        }
        trace!(%constraint, "add constraint");
        self.inner
            .add_constraint(constraint.raw().clone())
            .map_err(|e| convert_add_error(e, &constraint))?;
        self.constraints.push(constraint);
        Ok(())
    }

    pub fn add_all(
        &mut self,
        constraints: impl IntoIterator<Item = Constraint>,
    ) -> Result<(), SolverError> {
        constraints.into_iter().try_for_each(|c| self.add(c))
    }

    /// Remove a constraint; removing one that is absent does nothing
    pub fn remove(&mut self, constraint: &Constraint) -> Result<(), SolverError> {
        let Some(index) = self.constraints.iter().position(|c| c == constraint) else {
            return Ok(());
        };
        trace!(%constraint, "remove constraint");
        self.inner
            .remove_constraint(constraint.raw())
            .map_err(|e| SolverError::internal(format!("removing `{constraint}`: {e:?}")))?;
        let removed = self.constraints.remove(index);

        // kasuari forgets variables no constraint refers to; so do we
        for variable in removed.variables() {
            let still_used = self
                .constraints
                .iter()
                .any(|c| c.variables().any(|v| v == variable));
            if !still_used {
                self.values.remove(&variable.raw());
            }
        }
        Ok(())
    }

    pub fn remove_all<'a>(
        &mut self,
        constraints: impl IntoIterator<Item = &'a Constraint>,
    ) -> Result<(), SolverError> {
        constraints.into_iter().try_for_each(|c| self.remove(c))
    }

    /// Pull the latest solution from kasuari
    pub fn update(&mut self) {
        let mut changed = 0usize;
        for &(variable, value) in self.inner.fetch_changes() {
            self.values.insert(variable, value);
            changed += 1;
        }
        debug!(changed, constraints = self.constraints.len(), "solver updated");
    }

    /// Last resolved value of `variable` (0 if the solver never assigned one)
    pub fn value(&self, variable: &Variable) -> f64 {
        self.values.get(&variable.raw()).copied().unwrap_or(0.0)
    }

    pub fn evaluate(&self, expression: &Expression) -> f64 {
        expression.evaluate(|v| self.value(v))
    }

    /// Every distinct variable referenced by the active set, in first-seen order
    pub fn variables(&self) -> Vec<Variable> {
        let mut seen = HashSet::new();
        self.constraints
            .iter()
            .flat_map(|c| c.variables())
            .filter(|v| seen.insert((*v).clone()))
            .cloned()
            .collect()
    }

    /// Constraints with a variable named `name`
    pub fn constraints_mentioning(&self, name: &str) -> Vec<&Constraint> {
        self.constraints.iter().filter(|c| c.mentions(name)).collect()
    }

    /// For an infeasibility, report each variable of the offending constraint
    /// with its value and every active constraint sharing its name
    pub fn analyze(&self, error: &SolverError) -> Vec<VariableReport> {
        let Some(offending) = error.offending_constraint() else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        offending
            .variables()
            .filter(|v| seen.insert(v.name().to_string()))
            .map(|variable| VariableReport {
                variable: variable.clone(),
                value: self.value(variable),
                constraints: self
                    .constraints_mentioning(variable.name())
                    .into_iter()
                    .cloned()
                    .collect(),
            })
            .collect()
    }

    /// Human-readable explanation of `error` in terms of the active set
    pub fn diagnose(&self, error: &SolverError) -> String {
        let mut out = format!("{error}\n");
        for report in self.analyze(error) {
            let _ = writeln!(out, "  {} = {}", report.variable, report.value);
            for constraint in &report.constraints {
                let _ = writeln!(out, "    {constraint}");
            }
        }
        out
    }

    /// Full dump of constraints and resolved values
    pub fn dumps(&self) -> String {
        let mut out = String::from("constraints:\n");
        for constraint in &self.constraints {
            let _ = writeln!(out, "  {constraint}");
        }
        out.push_str("variables:\n");
        for variable in self.variables() {
            let _ = writeln!(out, "  {} = {}", variable, self.value(&variable));
        }
        out
    }

    /// Copy the whole set into a fresh kasuari solver
    ///
    /// Variables go through `map`, so other values duplicated with the same
    /// map refer to the same copies. The returned table maps each source
    /// constraint id to its copy.
    pub fn duplicate(
        &self,
        map: &mut DupMap,
    ) -> Result<(Solver, HashMap<ConstraintId, Constraint>), SolverError> {
        let mut copy = Solver::new();
        let mut remap = HashMap::with_capacity(self.constraints.len());
        for constraint in &self.constraints {
            let duplicate = constraint.duplicate(map);
            copy.add(duplicate.clone())?;
            remap.insert(constraint.id(), duplicate);
        }
        copy.update();
        debug!(constraints = copy.len(), "solver duplicated");
        Ok((copy, remap))
    }
}

impl Default for Solver {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Solver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Solver")
            .field("constraints", &self.constraints)
            .finish_non_exhaustive()
    }
}

fn convert_add_error(e: kasuari::AddConstraintError, constraint: &Constraint) -> SolverError {
    match e {
        kasuari::AddConstraintError::UnsatisfiableConstraint => SolverError::unsatisfiable(
            constraint.clone(),
            "conflicts with existing constraints",
        ),
        kasuari::AddConstraintError::DuplicateConstraint => SolverError::Duplicate {
            constraint: constraint.to_string(),
        },
        kasuari::AddConstraintError::InternalSolverError(msg) => {
            SolverError::internal(format!("adding `{constraint}`: {msg}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::WeightedRelation::*;
    use super::*;

    #[test]
    fn test_solve_simple_chain() {
        let mut solver = Solver::new();
        let a = Variable::new("a");
        let b = Variable::new("b");
        solver.add(&a | EQ(Strength::REQUIRED) | 10.0).unwrap();
        solver.add(&b | EQ(Strength::REQUIRED) | a.clone() + 5.0).unwrap();
        solver.update();
        assert_eq!(solver.value(&a), 10.0);
        assert_eq!(solver.value(&b), 15.0);
    }

    #[test]
    fn test_add_and_remove_are_idempotent() {
        let mut solver = Solver::new();
        let a = Variable::new("a");
        let c = &a | GE(Strength::REQUIRED) | 3.0;
        solver.add(c.clone()).unwrap();
        solver.add(c.clone()).unwrap();
        assert_eq!(solver.len(), 1);
        solver.remove(&c).unwrap();
        solver.remove(&c).unwrap();
        assert!(solver.is_empty());
    }

    #[test]
    fn test_removed_variable_reads_zero() {
        let mut solver = Solver::new();
        let a = Variable::new("a");
        let c = &a | EQ(Strength::REQUIRED) | 7.0;
        solver.add(c.clone()).unwrap();
        solver.update();
        assert_eq!(solver.value(&a), 7.0);
        solver.remove(&c).unwrap();
        solver.update();
        assert_eq!(solver.value(&a), 0.0);
    }

    #[test]
    fn test_weak_preference_yields_to_required() {
        let mut solver = Solver::new();
        let w = Variable::new("w");
        solver.add(&w | GE(Strength::REQUIRED) | 40.0).unwrap();
        solver.add(&w | GE(Strength::REQUIRED) | 25.0).unwrap();
        solver.add(&w | EQ(Strength::WEAK) | 0.0).unwrap();
        solver.update();
        assert_eq!(solver.value(&w), 40.0);
    }

    #[test]
    fn test_unsatisfiable_is_diagnosable() {
        let mut solver = Solver::new();
        let x = Variable::new("node#1.x");
        let y = Variable::new("node#1.y");
        solver.add(&x | EQ(Strength::REQUIRED) | 10.0).unwrap();
        solver.add(&y | EQ(Strength::REQUIRED) | 0.0).unwrap();

        let err = solver
            .add(&x | EQ(Strength::REQUIRED) | y.clone() + 20.0)
            .unwrap_err();
        assert!(matches!(err, SolverError::Unsatisfiable { .. }));

        let reports = solver.analyze(&err);
        let names: Vec<_> = reports.iter().map(|r| r.variable.name()).collect();
        assert_eq!(names, vec!["node#1.x", "node#1.y"]);
        assert_eq!(reports[0].constraints.len(), 1);
        assert!(solver.diagnose(&err).contains("node#1.x - 10 == 0"));
    }

    #[test]
    fn test_duplicate_is_independent() {
        let mut solver = Solver::new();
        let a = Variable::new("a");
        let original = &a | EQ(Strength::REQUIRED) | 4.0;
        solver.add(original.clone()).unwrap();
        solver.update();

        let mut map = DupMap::new();
        let (mut copy, remap) = solver.duplicate(&mut map).unwrap();
        let a2 = map.get(&a).cloned().unwrap();
        assert_eq!(copy.value(&a2), 4.0);

        copy.remove(&remap[&original.id()]).unwrap();
        copy.add(&a2 | EQ(Strength::REQUIRED) | 9.0).unwrap();
        copy.update();
        assert_eq!(copy.value(&a2), 9.0);
        assert_eq!(solver.value(&a), 4.0);
        assert_eq!(solver.len(), 1);
    }

    #[test]
    fn test_dumps_lists_everything() {
        let mut solver = Solver::new();
        let a = Variable::new("a");
        solver.add(&a | EQ(Strength::REQUIRED) | 2.0).unwrap();
        solver.update();
        let dump = solver.dumps();
        assert!(dump.contains("a - 2 == 0 [required]"));
        assert!(dump.contains("a = 2"));
    }
}
