//! Lowers a catalog and a request to a CNF formula over package variables.

use itertools::Itertools;

use crate::{catalog::Catalog, internal::id::PackageId, request::Request};

/// A positive or negated occurrence of a package variable in a clause.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct Literal {
    package: PackageId,
    negate: bool,
}

impl Literal {
    fn positive(package: PackageId) -> Self {
        Self {
            package,
            negate: false,
        }
    }

    fn negative(package: PackageId) -> Self {
        Self {
            package,
            negate: true,
        }
    }

    pub(crate) fn package(self) -> PackageId {
        self.package
    }

    pub(crate) fn is_negated(self) -> bool {
        self.negate
    }

    /// The signed DIMACS form of this literal.
    pub(crate) fn to_dimacs(self) -> i32 {
        if self.negate {
            -self.package.to_dimacs()
        } else {
            self.package.to_dimacs()
        }
    }
}

/// Represents a single clause of the encoded problem.
///
/// # SAT terminology
///
/// Clauses are disjunctions of literals: package variables, potentially
/// negated, joined by the logical "or" operator. A positive literal means
/// the package is installed in the final state, a negative one that it is
/// not. Since the encoding targets dependency resolution rather than
/// general SAT solving, only a handful of clause shapes exist and each
/// variant of this enum captures one of them together with the ids it
/// ranges over.
#[derive(Clone, Debug)]
pub(crate) enum Clause {
    /// Two packages that must never be co-installed.
    ///
    /// In SAT terms: (¬p ∨ ¬q)
    Conflict(PackageId, PackageId),

    /// Requires at least one member of one of a package's dependency
    /// groups whenever the package itself is installed.
    ///
    /// In SAT terms: (¬p ∨ q1 ∨ q2 ∨ ... ∨ qn)
    Requires(PackageId, Vec<PackageId>),

    /// A user uninstall requirement.
    ///
    /// In SAT terms: (¬u)
    Forbid(PackageId),

    /// A user install requirement: at least one of the packages matching
    /// the reference must be installed. A reference matching nothing
    /// produces the empty clause, which makes the whole formula
    /// unsatisfiable.
    ///
    /// In SAT terms: (q1 ∨ q2 ∨ ... ∨ qn)
    Install(Vec<PackageId>),

    /// Forbids an install set that has already been enumerated, forcing
    /// the oracle to produce a different one.
    ///
    /// In SAT terms: (¬p1 ∨ ¬p2 ∨ ... ∨ ¬pk)
    Block(Vec<PackageId>),
}

impl Clause {
    /// The literals of this clause, negated occurrences first.
    pub(crate) fn literals(&self) -> impl Iterator<Item = Literal> + '_ {
        let (negated_pair, negated, positive): ([Option<PackageId>; 2], &[PackageId], &[PackageId]) =
            match self {
                Clause::Conflict(p, q) => ([Some(*p), Some(*q)], &[], &[]),
                Clause::Requires(p, group) => ([Some(*p), None], &[], group.as_slice()),
                Clause::Forbid(u) => ([Some(*u), None], &[], &[]),
                Clause::Install(matches) => ([None, None], &[], matches.as_slice()),
                Clause::Block(installed) => ([None, None], installed.as_slice(), &[]),
            };

        negated_pair
            .into_iter()
            .flatten()
            .chain(negated.iter().copied())
            .map(Literal::negative)
            .chain(positive.iter().copied().map(Literal::positive))
    }
}

/// A CNF formula over the package variables of a catalog.
///
/// Clause order is fully determined by catalog and request iteration
/// order, so identical inputs produce byte-identical DIMACS documents even
/// as the optimizer keeps extending the formula with blocking clauses.
#[derive(Clone, Debug)]
pub struct Formula {
    num_vars: usize,
    clauses: Vec<Clause>,
}

impl Formula {
    /// Encodes the dependency, conflict and user-requirement clauses for
    /// the given catalog and request.
    ///
    /// Clauses are emitted per package in id order, conflicts before
    /// dependency groups, followed by the uninstall unit clauses and one
    /// disjunction per install requirement. The initial state is not
    /// encoded; it only enters cost accounting and command synthesis.
    pub fn encode(catalog: &Catalog, request: &Request) -> Self {
        let mut clauses = Vec::new();

        for package in catalog.packages() {
            for &conflict in &package.conflicts {
                clauses.push(Clause::Conflict(package.id, conflict));
            }
            for group in &package.dep_groups {
                clauses.push(Clause::Requires(package.id, group.clone()));
            }
        }

        for &uninstall in &request.uninstall {
            clauses.push(Clause::Forbid(uninstall));
        }

        for reference in &request.install {
            clauses.push(Clause::Install(
                catalog.matching_packages(reference).collect(),
            ));
        }

        tracing::trace!(
            "encoded {} clauses over {} package variables",
            clauses.len(),
            catalog.len()
        );
        Self {
            num_vars: catalog.len(),
            clauses,
        }
    }

    /// The number of package variables the formula ranges over.
    pub fn num_vars(&self) -> usize {
        self.num_vars
    }

    /// The number of clauses currently in the formula.
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// Whether the formula contains no clauses.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Appends a blocking clause over the given install set.
    pub(crate) fn block(&mut self, installed: Vec<PackageId>) {
        self.clauses.push(Clause::Block(installed));
    }

    /// Renders the formula as a DIMACS CNF document.
    pub fn to_dimacs(&self) -> String {
        let mut out = format!("p cnf {} {}\n", self.num_vars, self.clauses.len());
        for clause in &self.clauses {
            let literals = clause.literals().map(Literal::to_dimacs).format(" ");
            out.push_str(&format!("{literals} 0\n"));
        }
        out
    }

    /// Whether the assignment satisfies every clause of the formula.
    pub fn is_satisfied_by(&self, assignment: &crate::solver::oracle::Assignment) -> bool {
        self.clauses.iter().all(|clause| {
            clause
                .literals()
                .any(|literal| assignment.is_installed(literal.package()) != literal.is_negated())
        })
    }
}
