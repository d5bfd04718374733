//! The optimizer loop that drives the SAT oracle towards the cheapest
//! feasible transaction.

pub(crate) mod encoding;
pub(crate) mod oracle;
pub(crate) mod transaction;

use thiserror::Error;

use crate::{
    catalog::Catalog,
    internal::id::PackageId,
    request::Request,
    solver::{
        encoding::Formula,
        oracle::{Assignment, OracleError, SatOracle},
        transaction::Transaction,
    },
};

/// Tuning knobs for [`Solver::solve`].
#[derive(Debug, Clone)]
pub struct SolveOptions {
    /// Catalogs holding more packages than this are solved in
    /// first-feasible mode: the loop stops at the first candidate that can
    /// be ordered instead of enumerating towards the optimum.
    pub optimize_threshold: usize,

    /// Enumerate exhaustively regardless of catalog size.
    pub always_optimize: bool,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            optimize_threshold: 50_000,
            always_optimize: false,
        }
    }
}

/// Errors returned by [`Solver::solve`].
#[derive(Debug, Error)]
pub enum SolveError {
    /// No package selection satisfies the user's constraints together with
    /// the catalog's dependencies and conflicts.
    #[error("the constraints cannot be satisfied by any package selection")]
    Unsolvable,

    /// The oracle failed before a verdict was reached.
    #[error(transparent)]
    Oracle(#[from] OracleError),
}

/// Drives the SAT oracle towards the cheapest feasible transaction.
///
/// The solver encodes the request as CNF and asks the oracle for a
/// satisfying assignment. Every assignment is ordered into a
/// [`Transaction`] and scored; a blocking clause over its install set is
/// then appended so the next query must produce a different selection.
/// When the oracle finally reports unsatisfiable the search space is
/// exhausted and the cheapest transaction seen wins. Blocking on the
/// install set alone is enough because cost and commands depend only on
/// the installed packages relative to the initial state.
pub struct Solver<O> {
    oracle: O,
    options: SolveOptions,
}

impl<O: SatOracle> Solver<O> {
    /// Creates a solver with default options.
    pub fn new(oracle: O) -> Self {
        Self::with_options(oracle, SolveOptions::default())
    }

    /// Creates a solver with explicit options.
    pub fn with_options(oracle: O, options: SolveOptions) -> Self {
        Self { oracle, options }
    }

    /// Computes the cheapest command list that takes the initial state to
    /// one satisfying the request.
    ///
    /// Candidates that cannot be ordered (a dependency group without a
    /// usable supplier, or a cycle among the affected packages) are
    /// blocked and skipped rather than failing the run.
    pub fn solve(
        &mut self,
        catalog: &Catalog,
        request: &Request,
    ) -> Result<Transaction, SolveError> {
        let mut formula = Formula::encode(catalog, request);
        let optimize =
            self.options.always_optimize || catalog.len() <= self.options.optimize_threshold;
        if !optimize {
            tracing::debug!(
                "catalog holds {} packages, stopping at the first feasible transaction",
                catalog.len()
            );
        }

        let mut best: Option<Transaction> = None;
        loop {
            let reply = self.oracle.solve(&formula.to_dimacs())?;
            let Some(assignment) = Assignment::from_oracle_output(&reply, formula.num_vars())?
            else {
                tracing::debug!("oracle reports unsatisfiable after {} clauses", formula.len());
                break;
            };
            debug_assert!(
                formula.is_satisfied_by(&assignment),
                "oracle returned an assignment that violates the formula"
            );

            let installed: Vec<PackageId> = assignment.installed().collect();
            match Transaction::from_assignment(catalog, &assignment, &request.initial) {
                Ok(candidate) => {
                    tracing::debug!(
                        "candidate installs {} packages for cost {}",
                        installed.len(),
                        candidate.cost
                    );
                    let improved = best
                        .as_ref()
                        .map_or(true, |current| candidate.cost < current.cost);
                    if improved {
                        best = Some(candidate);
                    }
                    if !optimize {
                        break;
                    }
                }
                Err(error) => {
                    tracing::debug!("skipping candidate that cannot be ordered: {error}");
                }
            }

            // Forbid this exact install set before asking again.
            formula.block(installed);
        }

        best.ok_or(SolveError::Unsolvable)
    }
}
