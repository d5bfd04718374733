//! Turns a chosen assignment into an ordered command list with a cost.

use std::{
    collections::VecDeque,
    fmt::{Display, Formatter},
};

use ahash::{HashMap, HashSet};
use thiserror::Error;

use crate::{catalog::Catalog, internal::id::PackageId, solver::oracle::Assignment};

/// The cost of removing one installed package.
pub const REMOVE_COST: u64 = 1_000_000;

/// Why an assignment could not be turned into an ordered command list.
///
/// Neither case fails the whole run: the optimizer blocks the candidate
/// and asks the oracle for another one.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransactionError {
    /// A dependency group of a package to be installed has no member that
    /// stays installed or is itself scheduled for installation.
    #[error("dependency group {group} of package {package:?} has no usable supplier")]
    MissingSupplier {
        /// The package whose group cannot be supplied.
        package: PackageId,
        /// The index of the unsupplied group.
        group: usize,
    },

    /// The dependency edges between the affected packages form a cycle, so
    /// no linear command order exists.
    #[error("dependency cycle among the affected packages")]
    Cycle,
}

/// A single step of a [`Transaction`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Command {
    /// Install the package.
    Install(PackageId),
    /// Remove the package.
    Remove(PackageId),
}

impl Command {
    /// Returns an object that formats the command as `+name=version` or
    /// `-name=version`.
    pub fn display<'c>(&self, catalog: &'c Catalog) -> DisplayCommand<'c> {
        DisplayCommand {
            catalog,
            command: *self,
        }
    }
}

/// A helper struct to visualize a command. See [`Command::display`].
pub struct DisplayCommand<'c> {
    catalog: &'c Catalog,
    command: Command,
}

impl Display for DisplayCommand<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let (sign, package) = match self.command {
            Command::Install(id) => ('+', id),
            Command::Remove(id) => ('-', id),
        };
        write!(f, "{}{}", sign, self.catalog.display_package(package))
    }
}

/// An ordered command list together with its total cost.
#[derive(Debug, Clone)]
pub struct Transaction {
    /// The commands in application order: all removals, then all installs.
    pub commands: Vec<Command>,
    /// [`REMOVE_COST`] per removal plus the size of every installed
    /// package.
    pub cost: u64,
}

impl Transaction {
    /// Orders the state change described by `assignment` relative to the
    /// `initial` installed set.
    ///
    /// Removals are ordered so that a package goes away only after every
    /// other removed package that depends on it; installs are ordered so
    /// that each dependency group of a package is supplied before the
    /// package itself appears. A group counts as supplied by a member that
    /// is initially installed *and* retained by the assignment (removals
    /// all run first, so a member scheduled for removal cannot carry the
    /// group); otherwise the first group member that is itself being
    /// installed becomes the supplier.
    pub fn from_assignment(
        catalog: &Catalog,
        assignment: &Assignment,
        initial: &HashSet<PackageId>,
    ) -> Result<Self, TransactionError> {
        let to_install: Vec<PackageId> = catalog
            .package_ids()
            .filter(|id| assignment.is_installed(*id) && !initial.contains(id))
            .collect();
        let to_remove: Vec<PackageId> = catalog
            .package_ids()
            .filter(|id| !assignment.is_installed(*id) && initial.contains(id))
            .collect();

        let removals = removal_order(catalog, &to_remove)?;
        let installs = install_order(catalog, assignment, initial, &to_install)?;

        let cost = removals.len() as u64 * REMOVE_COST
            + installs
                .iter()
                .map(|&id| catalog.package(id).size)
                .sum::<u64>();

        let commands = removals
            .into_iter()
            .map(Command::Remove)
            .chain(installs.into_iter().map(Command::Install))
            .collect();

        Ok(Self { commands, cost })
    }

    /// Renders every command with the catalog's names and raw versions.
    pub fn render(&self, catalog: &Catalog) -> Vec<String> {
        self.commands
            .iter()
            .map(|command| command.display(catalog).to_string())
            .collect()
    }
}

/// Orders removals dependents-first: a removed package that depends on
/// another removed package is placed before it.
fn removal_order(
    catalog: &Catalog,
    to_remove: &[PackageId],
) -> Result<Vec<PackageId>, TransactionError> {
    let removing: HashSet<PackageId> = to_remove.iter().copied().collect();
    let mut graph = DependencyGraph::new(to_remove);

    for &package in to_remove {
        for group in &catalog.package(package).dep_groups {
            for &dependency in group {
                if dependency != package && removing.contains(&dependency) {
                    graph.add_edge(package, dependency);
                }
            }
        }
    }

    graph.sort()
}

/// Orders installs suppliers-first: every dependency group of a package
/// must be supplied before the package itself is placed.
fn install_order(
    catalog: &Catalog,
    assignment: &Assignment,
    initial: &HashSet<PackageId>,
    to_install: &[PackageId],
) -> Result<Vec<PackageId>, TransactionError> {
    let installing: HashSet<PackageId> = to_install.iter().copied().collect();
    let mut graph = DependencyGraph::new(to_install);

    for &package in to_install {
        for (index, group) in catalog.package(package).dep_groups.iter().enumerate() {
            // A group listing the package itself is satisfied the moment
            // the package lands.
            if group.contains(&package) {
                continue;
            }
            if group
                .iter()
                .any(|member| initial.contains(member) && assignment.is_installed(*member))
            {
                continue;
            }
            match group.iter().find(|member| installing.contains(member)) {
                Some(&supplier) => graph.add_edge(supplier, package),
                None => {
                    return Err(TransactionError::MissingSupplier {
                        package,
                        group: index,
                    })
                }
            }
        }
    }

    graph.sort()
}

/// An explicit adjacency-list and incoming-count representation for Kahn's
/// algorithm. An edge `a -> b` places `a` before `b` in the output. Nodes
/// are seeded in the order given, which keeps the output deterministic.
struct DependencyGraph {
    nodes: Vec<PackageId>,
    edges: HashMap<PackageId, Vec<PackageId>>,
    incoming: HashMap<PackageId, usize>,
}

impl DependencyGraph {
    fn new(nodes: &[PackageId]) -> Self {
        Self {
            nodes: nodes.to_vec(),
            edges: HashMap::default(),
            incoming: nodes.iter().map(|&node| (node, 0)).collect(),
        }
    }

    fn add_edge(&mut self, from: PackageId, to: PackageId) {
        self.edges.entry(from).or_default().push(to);
        *self.incoming.entry(to).or_default() += 1;
    }

    fn sort(mut self) -> Result<Vec<PackageId>, TransactionError> {
        let mut ready: VecDeque<PackageId> = self
            .nodes
            .iter()
            .copied()
            .filter(|node| self.incoming[node] == 0)
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(node) = ready.pop_front() {
            order.push(node);
            for successor in self.edges.remove(&node).unwrap_or_default() {
                let count = self
                    .incoming
                    .get_mut(&successor)
                    .expect("edge to a node outside the graph");
                *count -= 1;
                if *count == 0 {
                    ready.push_back(successor);
                }
            }
        }

        if order.len() == self.nodes.len() {
            Ok(order)
        } else {
            Err(TransactionError::Cycle)
        }
    }
}
