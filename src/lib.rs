//! Computes minimum-cost package state transitions by reduction to SAT.
//!
//! Given a catalog of package variants, an initial installed set and a
//! list of install/uninstall constraints, the crate encodes the
//! dependency-resolution problem as a CNF formula over package variables
//! ([`Formula`]), asks a SAT solver behind the [`SatOracle`] boundary for
//! satisfying assignments, and turns each one into a topologically ordered
//! command list ([`Transaction`]). Assignments are enumerated through
//! blocking clauses until the oracle reports unsatisfiable; the cheapest
//! feasible transaction wins. Removing an installed package costs
//! 1,000,000, installing one costs its declared size.
//!
//! The clause shapes follow the classic dependency-resolution encoding
//! also used by [libsolv](https://github.com/openSUSE/libsolv):
//! dependency groups become implications towards a disjunction of
//! candidates, and conflicts become pairwise exclusions.

#![deny(missing_docs)]

mod catalog;
pub(crate) mod internal;
mod request;
pub mod schema;
mod solver;
mod version;

pub use catalog::{Catalog, DisplayPackage, Package};
pub use internal::id::{NameId, PackageId};
pub use request::Request;
pub use schema::PackageRecord;
pub use solver::{
    encoding::Formula,
    oracle::{Assignment, ExternalSolver, OracleError, SatOracle},
    transaction::{Command, DisplayCommand, Transaction, TransactionError, REMOVE_COST},
    SolveError, SolveOptions, Solver,
};
pub use version::{Operator, ParseError, Reference, Version};
