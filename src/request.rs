//! Turns the user's initial state and constraint documents into concrete
//! package-id sets.

use ahash::HashSet;

use crate::{
    catalog::Catalog,
    internal::id::PackageId,
    version::{ParseError, Reference},
};

/// The fully parsed user request: where the system starts and what must
/// hold in the final state.
#[derive(Debug, Clone)]
pub struct Request {
    /// Packages installed before any command runs.
    pub initial: HashSet<PackageId>,

    /// Install requirements. Each reference must be satisfied by at least
    /// one installed package in the final state; any matching package will
    /// do, so these stay unresolved until encoding.
    pub install: Vec<Reference>,

    /// Packages that must not be installed in the final state, in first-use
    /// order and without duplicates.
    pub uninstall: Vec<PackageId>,
}

impl Request {
    /// Parses the initial-state and constraints documents against a
    /// catalog.
    ///
    /// Every initial reference resolves to the first matching variant of
    /// its name; references matching nothing are skipped. Constraints must
    /// start with `+` (install) or `-` (uninstall): a `-` resolves to every
    /// matching variant, a `+` keeps the [`Reference`] as a disjunction
    /// over whatever matches at encoding time.
    pub fn parse(
        catalog: &Catalog,
        initial: &[String],
        constraints: &[String],
    ) -> Result<Self, ParseError> {
        let mut request = Self {
            initial: HashSet::default(),
            install: Vec::new(),
            uninstall: Vec::new(),
        };

        for raw in initial {
            let reference: Reference = raw.parse()?;
            let matched = catalog.matching_packages(&reference).next();
            if let Some(id) = matched {
                request.initial.insert(id);
            }
        }

        let mut seen_uninstall = HashSet::default();
        for raw in constraints {
            if let Some(rest) = raw.strip_prefix('+') {
                request.install.push(rest.parse()?);
            } else if let Some(rest) = raw.strip_prefix('-') {
                let reference: Reference = rest.parse()?;
                for id in catalog.matching_packages(&reference) {
                    if seen_uninstall.insert(id) {
                        request.uninstall.push(id);
                    }
                }
            } else {
                return Err(ParseError::MissingPrefix(raw.clone()));
            }
        }

        tracing::debug!(
            "request: {} initially installed, {} install constraints, {} uninstalls",
            request.initial.len(),
            request.install.len(),
            request.uninstall.len()
        );
        Ok(request)
    }
}
