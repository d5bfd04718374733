//! End-to-end tests driving the full pipeline against a small built-in
//! DPLL solver, so no external SAT binary is needed.

use transiro::{
    Assignment, Catalog, Command, OracleError, PackageRecord, Request, SatOracle, SolveError,
    SolveOptions, Solver, Transaction, TransactionError, REMOVE_COST,
};

/// Builds a catalog record by record, in the order the records are given.
/// `depends` and `conflicts` apply to the most recently added package.
#[derive(Default)]
struct CatalogBuilder {
    records: Vec<PackageRecord>,
}

impl CatalogBuilder {
    fn package(mut self, name: &str, version: &str, size: u64) -> Self {
        self.records.push(PackageRecord {
            name: name.to_string(),
            version: version.to_string(),
            size,
            depends: Vec::new(),
            conflicts: Vec::new(),
        });
        self
    }

    fn depends(mut self, groups: &[&[&str]]) -> Self {
        let record = self.records.last_mut().expect("add a package first");
        record.depends = groups
            .iter()
            .map(|group| group.iter().map(|s| s.to_string()).collect())
            .collect();
        self
    }

    fn conflicts(mut self, references: &[&str]) -> Self {
        let record = self.records.last_mut().expect("add a package first");
        record.conflicts = references.iter().map(|s| s.to_string()).collect();
        self
    }

    fn build(self) -> Catalog {
        Catalog::from_records(self.records).unwrap()
    }
}

/// A tiny complete DPLL solver speaking the oracle protocol: DIMACS in,
/// `SAT <literals> 0` or `UNSAT` out.
struct DpllOracle;

impl SatOracle for DpllOracle {
    fn solve(&mut self, dimacs: &str) -> Result<String, OracleError> {
        let (num_vars, clauses) = parse_dimacs(dimacs);
        match dpll(&clauses, &mut vec![None; num_vars]) {
            Some(model) => {
                let literals = model
                    .iter()
                    .enumerate()
                    .map(|(index, value)| {
                        let variable = index as i64 + 1;
                        if value.unwrap_or(false) {
                            variable.to_string()
                        } else {
                            (-variable).to_string()
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(" ");
                Ok(format!("SAT\n{literals} 0\n"))
            }
            None => Ok("UNSAT\n".to_string()),
        }
    }
}

fn parse_dimacs(dimacs: &str) -> (usize, Vec<Vec<i64>>) {
    let mut lines = dimacs.lines();
    let header = lines.next().expect("missing DIMACS header");
    let num_vars = header
        .split_whitespace()
        .nth(2)
        .expect("malformed DIMACS header")
        .parse()
        .unwrap();
    let clauses = lines
        .map(|line| {
            line.split_whitespace()
                .map(|token| token.parse::<i64>().unwrap())
                .take_while(|&literal| literal != 0)
                .collect()
        })
        .collect();
    (num_vars, clauses)
}

fn literal_value(literal: i64, assignment: &[Option<bool>]) -> Option<bool> {
    let value = assignment[literal.unsigned_abs() as usize - 1]?;
    Some(if literal > 0 { value } else { !value })
}

fn dpll(clauses: &[Vec<i64>], assignment: &mut Vec<Option<bool>>) -> Option<Vec<Option<bool>>> {
    // Unit propagation until fixpoint.
    loop {
        let mut changed = false;
        for clause in clauses {
            let mut satisfied = false;
            let mut unassigned = None;
            let mut unassigned_count = 0;
            for &literal in clause {
                match literal_value(literal, assignment) {
                    Some(true) => {
                        satisfied = true;
                        break;
                    }
                    Some(false) => {}
                    None => {
                        unassigned_count += 1;
                        unassigned = Some(literal);
                    }
                }
            }
            if satisfied {
                continue;
            }
            match unassigned_count {
                0 => return None,
                1 => {
                    let literal = unassigned.unwrap();
                    assignment[literal.unsigned_abs() as usize - 1] = Some(literal > 0);
                    changed = true;
                }
                _ => {}
            }
        }
        if !changed {
            break;
        }
    }

    let Some(variable) = assignment.iter().position(Option::is_none) else {
        return Some(assignment.clone());
    };
    for value in [true, false] {
        let mut attempt = assignment.clone();
        attempt[variable] = Some(value);
        if let Some(model) = dpll(clauses, &mut attempt) {
            return Some(model);
        }
    }
    None
}

fn request(catalog: &Catalog, initial: &[&str], constraints: &[&str]) -> Request {
    let initial: Vec<String> = initial.iter().map(|s| s.to_string()).collect();
    let constraints: Vec<String> = constraints.iter().map(|s| s.to_string()).collect();
    Request::parse(catalog, &initial, &constraints).unwrap()
}

fn solve(
    catalog: &Catalog,
    initial: &[&str],
    constraints: &[&str],
) -> Result<Transaction, SolveError> {
    let request = request(catalog, initial, constraints);
    let transaction = Solver::new(DpllOracle).solve(catalog, &request);
    if let Ok(transaction) = &transaction {
        verify(catalog, &request, transaction);
    }
    transaction
}

/// Replays the transaction from the initial state and checks every
/// consistency guarantee the command order is supposed to give: removals
/// precede installs, no conflicting pair is ever co-installed, every
/// dependency group is supplied before its owner lands, the final state
/// honors all constraints, and the cost matches the command list.
fn verify(catalog: &Catalog, request: &Request, transaction: &Transaction) {
    let mut installed = request.initial.clone();
    let mut removals = 0u64;
    let mut install_size = 0u64;
    let mut seen_install = false;

    for command in &transaction.commands {
        match *command {
            Command::Remove(id) => {
                assert!(!seen_install, "removals must precede installs");
                assert!(
                    installed.remove(&id),
                    "removed {} but it was not installed",
                    catalog.display_package(id)
                );
                removals += 1;
            }
            Command::Install(id) => {
                seen_install = true;
                let package = catalog.package(id);
                for group in &package.dep_groups {
                    assert!(
                        group.contains(&id) || group.iter().any(|m| installed.contains(m)),
                        "installed {} before any supplier of one of its groups",
                        catalog.display_package(id)
                    );
                }
                for other in &installed {
                    assert!(
                        !package.conflicts.contains(other)
                            && !catalog.package(*other).conflicts.contains(&id),
                        "conflicting pair {} / {} co-installed",
                        catalog.display_package(id),
                        catalog.display_package(*other)
                    );
                }
                assert!(installed.insert(id), "installed a package twice");
                install_size += package.size;
            }
        }
    }

    for &id in &installed {
        for group in &catalog.package(id).dep_groups {
            assert!(
                group.iter().any(|m| installed.contains(m)),
                "final state leaves a dependency group of {} unsatisfied",
                catalog.display_package(id)
            );
        }
        for conflict in &catalog.package(id).conflicts {
            assert!(!installed.contains(conflict), "conflict in the final state");
        }
    }
    for reference in &request.install {
        assert!(
            catalog
                .matching_packages(reference)
                .any(|id| installed.contains(&id)),
            "install constraint {reference} not satisfied"
        );
    }
    for id in &request.uninstall {
        assert!(!installed.contains(id), "uninstall constraint not honored");
    }

    assert_eq!(transaction.cost, removals * REMOVE_COST + install_size);
}

#[test]
fn installs_a_single_requested_package() {
    let catalog = CatalogBuilder::default().package("A", "1", 10).build();
    let transaction = solve(&catalog, &[], &["+A=1"]).unwrap();
    assert_eq!(transaction.render(&catalog), ["+A=1"]);
    assert_eq!(transaction.cost, 10);
}

#[test]
fn removes_a_single_forbidden_package() {
    let catalog = CatalogBuilder::default().package("A", "1", 10).build();
    let transaction = solve(&catalog, &["A=1"], &["-A=1"]).unwrap();
    assert_eq!(transaction.render(&catalog), ["-A=1"]);
    assert_eq!(transaction.cost, REMOVE_COST);
}

#[test]
fn installs_dependencies_before_dependents() {
    let catalog = CatalogBuilder::default()
        .package("A", "1", 5)
        .depends(&[&["B"]])
        .package("B", "1", 3)
        .build();
    let transaction = solve(&catalog, &[], &["+A=1"]).unwrap();
    assert_eq!(transaction.render(&catalog), ["+B=1", "+A=1"]);
    assert_eq!(transaction.cost, 8);
}

#[test]
fn picks_the_cheaper_member_of_a_dependency_group() {
    let catalog = CatalogBuilder::default()
        .package("A", "1", 5)
        .depends(&[&["B", "C"]])
        .package("B", "1", 100)
        .package("C", "1", 2)
        .build();
    let transaction = solve(&catalog, &[], &["+A=1"]).unwrap();
    assert_eq!(transaction.render(&catalog), ["+C=1", "+A=1"]);
    assert_eq!(transaction.cost, 7);
}

#[test]
fn picks_the_cheaper_variant_of_an_unbounded_reference() {
    let catalog = CatalogBuilder::default()
        .package("A", "1", 10)
        .package("A", "2", 5)
        .build();
    let transaction = solve(&catalog, &[], &["+A"]).unwrap();
    assert_eq!(transaction.render(&catalog), ["+A=2"]);
    assert_eq!(transaction.cost, 5);
}

#[test]
fn removes_a_conflicting_package_to_make_room() {
    let catalog = CatalogBuilder::default()
        .package("A", "1", 10)
        .conflicts(&["C"])
        .package("B", "1", 20)
        .package("C", "1", 30)
        .build();
    let transaction = solve(&catalog, &["A=1", "B=1"], &["+C=1"]).unwrap();
    assert_eq!(transaction.render(&catalog), ["-A=1", "+C=1"]);
    assert_eq!(transaction.cost, REMOVE_COST + 30);
}

#[test]
fn orders_a_dependency_chain_end_to_end() {
    let catalog = CatalogBuilder::default()
        .package("A", "1", 1)
        .depends(&[&["B"]])
        .package("B", "1", 1)
        .depends(&[&["C"]])
        .package("C", "1", 1)
        .build();
    let transaction = solve(&catalog, &[], &["+A"]).unwrap();
    assert_eq!(transaction.render(&catalog), ["+C=1", "+B=1", "+A=1"]);
}

#[test]
fn removes_dependents_before_their_dependencies() {
    let catalog = CatalogBuilder::default()
        .package("A", "1", 1)
        .depends(&[&["B"]])
        .package("B", "1", 1)
        .depends(&[&["C"]])
        .package("C", "1", 1)
        .build();
    let transaction = solve(&catalog, &["A", "B", "C"], &["-C"]).unwrap();
    assert_eq!(transaction.render(&catalog), ["-A=1", "-B=1", "-C=1"]);
    assert_eq!(transaction.cost, 3 * REMOVE_COST);
}

#[test]
fn a_removed_group_member_cannot_supply_the_group() {
    // A's group can be carried by B (initially installed, but forced out)
    // or by C. The replacement must land before A does.
    let catalog = CatalogBuilder::default()
        .package("A", "1", 5)
        .depends(&[&["B", "C"]])
        .package("B", "1", 1)
        .package("C", "1", 2)
        .build();
    let transaction = solve(&catalog, &["B"], &["+A", "-B"]).unwrap();
    assert_eq!(transaction.render(&catalog), ["-B=1", "+C=1", "+A=1"]);
    assert_eq!(transaction.cost, REMOVE_COST + 7);
}

#[test]
fn keeps_unrelated_initial_packages_installed() {
    let catalog = CatalogBuilder::default()
        .package("A", "1", 10)
        .package("B", "1", 1)
        .build();
    let transaction = solve(&catalog, &["B"], &["+A"]).unwrap();
    // Dropping B would add a million to the bill for nothing.
    assert_eq!(transaction.render(&catalog), ["+A=1"]);
    assert_eq!(transaction.cost, 10);
}

#[test]
fn no_constraints_means_an_empty_transaction() {
    let catalog = CatalogBuilder::default().package("A", "1", 10).build();
    let transaction = solve(&catalog, &[], &[]).unwrap();
    assert!(transaction.commands.is_empty());
    assert_eq!(transaction.cost, 0);
}

#[test]
fn uninstall_constraints_cover_every_matching_variant() {
    let catalog = CatalogBuilder::default()
        .package("A", "1", 1)
        .package("A", "2", 1)
        .build();
    let transaction = solve(&catalog, &["A=1", "A=2"], &["-A"]).unwrap();
    assert_eq!(transaction.render(&catalog), ["-A=1", "-A=2"]);
    assert_eq!(transaction.cost, 2 * REMOVE_COST);
}

#[test]
fn version_bounds_compare_numerically() {
    let catalog = CatalogBuilder::default()
        .package("A", "9", 1)
        .package("A", "10", 1)
        .build();
    let transaction = solve(&catalog, &[], &["+A>9"]).unwrap();
    assert_eq!(transaction.render(&catalog), ["+A=10"]);
}

#[test]
fn padded_version_forms_match_each_other() {
    let catalog = CatalogBuilder::default().package("A", "1.0.0", 3).build();
    let transaction = solve(&catalog, &[], &["+A=1"]).unwrap();
    // Commands carry the raw version, not the canonical form.
    assert_eq!(transaction.render(&catalog), ["+A=1.0.0"]);
}

#[test]
fn contradictory_constraints_are_unsolvable() {
    let catalog = CatalogBuilder::default().package("A", "1", 10).build();
    assert!(matches!(
        solve(&catalog, &[], &["+A", "-A"]),
        Err(SolveError::Unsolvable)
    ));
}

#[test]
fn install_references_matching_nothing_are_unsolvable() {
    let catalog = CatalogBuilder::default().package("A", "1", 10).build();
    assert!(matches!(
        solve(&catalog, &[], &["+ghost"]),
        Err(SolveError::Unsolvable)
    ));
}

#[test]
fn solver_output_is_deterministic() {
    let catalog = CatalogBuilder::default()
        .package("A", "1", 10)
        .conflicts(&["C"])
        .package("B", "1", 20)
        .package("C", "1", 30)
        .build();

    let render = || {
        let transaction = solve(&catalog, &["A=1", "B=1"], &["+C=1"]).unwrap();
        serde_json::to_string(&transaction.render(&catalog)).unwrap()
    };
    assert_eq!(render(), render());
}

#[test]
fn first_feasible_mode_skips_the_enumeration() {
    let catalog = CatalogBuilder::default()
        .package("A", "1", 10)
        .package("A", "2", 5)
        .build();
    let request = request(&catalog, &[], &["+A"]);

    let options = SolveOptions {
        optimize_threshold: 0,
        always_optimize: false,
    };
    let first = Solver::with_options(DpllOracle, options)
        .solve(&catalog, &request)
        .unwrap();
    verify(&catalog, &request, &first);
    // The DPLL oracle's first model installs both variants; the loop keeps
    // it instead of enumerating towards the 5-cost optimum.
    assert_eq!(first.cost, 15);

    let options = SolveOptions {
        optimize_threshold: 0,
        always_optimize: true,
    };
    let optimal = Solver::with_options(DpllOracle, options)
        .solve(&catalog, &request)
        .unwrap();
    assert_eq!(optimal.cost, 5);
}

#[test]
fn unorderable_assignments_are_rejected() {
    let catalog = CatalogBuilder::default()
        .package("A", "1", 1)
        .depends(&[&["B"]])
        .package("B", "1", 1)
        .build();
    let empty = request(&catalog, &[], &[]);

    // A marked installed without its only supplier.
    let assignment = Assignment::from_oracle_output("SAT\n1 -2 0\n", 2)
        .unwrap()
        .unwrap();
    assert!(matches!(
        Transaction::from_assignment(&catalog, &assignment, &empty.initial),
        Err(TransactionError::MissingSupplier { .. })
    ));
}

#[test]
fn cyclic_install_orders_are_rejected() {
    let catalog = CatalogBuilder::default()
        .package("A", "1", 1)
        .depends(&[&["B"]])
        .package("B", "1", 1)
        .depends(&[&["A"]])
        .build();
    let empty = request(&catalog, &[], &[]);

    let assignment = Assignment::from_oracle_output("SAT\n1 2 0\n", 2)
        .unwrap()
        .unwrap();
    assert!(matches!(
        Transaction::from_assignment(&catalog, &assignment, &empty.initial),
        Err(TransactionError::Cycle)
    ));
}

#[test]
fn mutually_dependent_packages_are_still_solvable() {
    // The cycle only exists in the ordering graph; the solver recovers by
    // blocking the unorderable candidate and the request itself stays
    // solvable through the acyclic alternative.
    let catalog = CatalogBuilder::default()
        .package("A", "1", 1)
        .depends(&[&["B", "S"]])
        .package("B", "1", 1)
        .depends(&[&["A"]])
        .package("S", "1", 50)
        .build();
    let transaction = solve(&catalog, &[], &["+A"]).unwrap();
    assert_eq!(transaction.render(&catalog), ["+S=1", "+A=1"]);
    assert_eq!(transaction.cost, 51);
}
