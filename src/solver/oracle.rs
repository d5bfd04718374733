//! The boundary to the SAT solver, treated as a one-shot oracle.

use std::{
    io::Write,
    process::{Command, Stdio},
};

use thiserror::Error;

use crate::internal::id::PackageId;

/// Errors raised while talking to the SAT oracle.
#[derive(Debug, Error)]
pub enum OracleError {
    /// The solver process could not be spawned.
    #[error("failed to launch SAT solver `{command}`")]
    Spawn {
        /// The command that failed to start.
        command: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Reading from or writing to the solver process failed.
    #[error("failed to exchange the formula with the SAT solver")]
    Io(#[from] std::io::Error),

    /// The solver answered `SAT` but a literal could not be parsed.
    #[error("malformed literal {token:?} in SAT solver output")]
    MalformedOutput {
        /// The token that is not a signed integer.
        token: String,
    },
}

/// A one-shot SAT solver.
///
/// The oracle receives a DIMACS CNF document and replies with its raw
/// output: a line beginning with `SAT` followed by signed literals
/// terminated by `0`, or anything else to signal unsatisfiability. The
/// caller interprets the reply through [`Assignment::from_oracle_output`],
/// so implementations never need to understand package semantics.
pub trait SatOracle {
    /// Solves the given DIMACS document, returning the solver's raw output.
    fn solve(&mut self, dimacs: &str) -> Result<String, OracleError>;
}

/// Runs an external SAT solver process for every query.
///
/// The DIMACS document is written to the child's stdin and the reply is
/// read from its stdout. The child's exit status is ignored; solvers
/// commonly exit non-zero for unsatisfiable formulas and the reply text
/// already carries the verdict.
#[derive(Debug, Clone)]
pub struct ExternalSolver {
    program: String,
    args: Vec<String>,
}

impl ExternalSolver {
    /// Creates an oracle that runs `program` for every query.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Adds an argument passed to every solver invocation.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl SatOracle for ExternalSolver {
    fn solve(&mut self, dimacs: &str) -> Result<String, OracleError> {
        tracing::trace!("handing {} bytes of CNF to `{}`", dimacs.len(), self.program);
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| OracleError::Spawn {
                command: self.program.clone(),
                source,
            })?;

        child
            .stdin
            .take()
            .expect("stdin was configured as piped")
            .write_all(dimacs.as_bytes())?;

        let output = child.wait_with_output()?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// A total assignment of every package variable to installed or
/// not-installed.
#[derive(Debug, Clone)]
pub struct Assignment {
    installed: Vec<bool>,
}

impl Assignment {
    /// Parses a solver reply.
    ///
    /// Returns `Ok(None)` when the reply does not start with `SAT`, which
    /// per the oracle protocol means the formula is unsatisfiable.
    /// Variables missing from the reply are treated as not installed;
    /// literals for variables the formula never declared are ignored.
    pub fn from_oracle_output(output: &str, num_vars: usize) -> Result<Option<Self>, OracleError> {
        let Some(rest) = output.trim_start().strip_prefix("SAT") else {
            return Ok(None);
        };

        let mut installed = vec![false; num_vars];
        for token in rest.split_whitespace() {
            let literal: i64 = token.parse().map_err(|_| OracleError::MalformedOutput {
                token: token.to_string(),
            })?;
            if literal == 0 {
                break;
            }
            if literal > 0 {
                let index = literal as usize - 1;
                if index < num_vars {
                    installed[index] = true;
                }
            }
        }

        Ok(Some(Self { installed }))
    }

    /// Whether the assignment installs the given package.
    pub fn is_installed(&self, package: PackageId) -> bool {
        self.installed
            .get(package.to_index())
            .copied()
            .unwrap_or(false)
    }

    /// Iterates the installed packages in ascending id order.
    pub fn installed(&self) -> impl Iterator<Item = PackageId> + '_ {
        self.installed
            .iter()
            .enumerate()
            .filter(|&(_, &installed)| installed)
            .map(|(index, _)| PackageId::from_index(index))
    }
}
