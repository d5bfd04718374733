//! The package catalog: every known package variant with a stable id, plus
//! the resolution of textual references to concrete id sets.

use std::fmt::{Display, Formatter};

use ahash::HashSet;
use indexmap::IndexMap;

use crate::{
    internal::id::{NameId, PackageId},
    schema::PackageRecord,
    version::{ParseError, Reference, Version},
};

/// A single package variant held by a [`Catalog`].
pub struct Package {
    /// The id of this package, unique across the catalog.
    pub id: PackageId,
    /// The interned name of this package.
    pub name: NameId,
    /// The version of this package.
    pub version: Version,
    /// The declared size. Installing the package costs this much.
    pub size: u64,
    /// Resolved dependency groups. Each group is a disjunction: at least
    /// one member must be installed alongside this package. Groups that
    /// resolved to no candidates are not kept.
    pub dep_groups: Vec<Vec<PackageId>>,
    /// Packages that must never be co-installed with this one.
    pub conflicts: Vec<PackageId>,
}

/// The universe of known packages.
///
/// A catalog is built in two passes. Every record is first interned and
/// assigned the next [`PackageId`]; only then are the textual dependency
/// and conflict references of each package resolved against the full
/// catalog, a name lookup followed by a version filter. An id that shows up
/// both in a conflict and in a dependency group of the same package is
/// stripped from the group, and a group left (or found) empty is dropped.
pub struct Catalog {
    packages: Vec<Package>,
    variants: IndexMap<String, Vec<PackageId>>,
}

impl Catalog {
    /// Builds a catalog from raw document records.
    pub fn from_records(records: Vec<PackageRecord>) -> Result<Self, ParseError> {
        let mut packages = Vec::with_capacity(records.len());
        let mut variants: IndexMap<String, Vec<PackageId>> = IndexMap::new();

        for (index, record) in records.iter().enumerate() {
            let id = PackageId::from_index(index);
            let entry = variants.entry(record.name.clone());
            let name = NameId::from_index(entry.index());
            entry.or_default().push(id);
            packages.push(Package {
                id,
                name,
                version: Version::parse(&record.version)?,
                size: record.size,
                dep_groups: Vec::new(),
                conflicts: Vec::new(),
            });
        }

        let mut catalog = Self { packages, variants };
        for (index, record) in records.iter().enumerate() {
            let mut conflicts = Vec::new();
            let mut conflict_set = HashSet::default();
            for raw in &record.conflicts {
                let reference: Reference = raw.parse()?;
                for conflict in catalog.matching_packages(&reference) {
                    if conflict_set.insert(conflict) {
                        conflicts.push(conflict);
                    }
                }
            }

            let mut dep_groups = Vec::new();
            for group in &record.depends {
                let mut resolved = Vec::new();
                let mut seen = HashSet::default();
                for raw in group {
                    let reference: Reference = raw.parse()?;
                    for candidate in catalog.matching_packages(&reference) {
                        if !conflict_set.contains(&candidate) && seen.insert(candidate) {
                            resolved.push(candidate);
                        }
                    }
                }
                if !resolved.is_empty() {
                    dep_groups.push(resolved);
                }
            }

            catalog.packages[index].dep_groups = dep_groups;
            catalog.packages[index].conflicts = conflicts;
        }

        tracing::debug!(
            "catalog holds {} packages under {} names",
            catalog.packages.len(),
            catalog.variants.len()
        );
        Ok(catalog)
    }

    /// The number of packages in the catalog.
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Whether the catalog holds no packages at all.
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Returns the package with the given id.
    ///
    /// Panics if the id was not handed out by this catalog.
    pub fn package(&self, id: PackageId) -> &Package {
        &self.packages[id.to_index()]
    }

    /// Iterates all packages in ascending id order.
    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.packages.iter()
    }

    /// Iterates all package ids in ascending order.
    pub fn package_ids(&self) -> impl Iterator<Item = PackageId> {
        (0..self.packages.len()).map(PackageId::from_index)
    }

    /// The variants registered under `name`, in insertion order.
    pub fn variants(&self, name: &str) -> &[PackageId] {
        self.variants.get(name).map_or(&[], Vec::as_slice)
    }

    /// Resolves a reference to the matching packages: the variants of the
    /// referenced name filtered by the version bound, in variant order.
    pub fn matching_packages<'a>(
        &'a self,
        reference: &'a Reference,
    ) -> impl Iterator<Item = PackageId> + 'a {
        self.variants(&reference.name)
            .iter()
            .copied()
            .filter(move |&id| reference.matches_version(&self.package(id).version))
    }

    /// Returns the package name interned under the given id.
    ///
    /// Panics if the name id was not handed out by this catalog.
    pub fn resolve_name(&self, name: NameId) -> &str {
        self.variants
            .get_index(name.to_index())
            .map(|(name, _)| name.as_str())
            .expect("name id not found in the catalog")
    }

    /// Returns an object that formats the package as `name=version`, using
    /// the raw version string.
    pub fn display_package(&self, id: PackageId) -> DisplayPackage<'_> {
        DisplayPackage { catalog: self, id }
    }
}

/// A helper struct to visualize a package. See [`Catalog::display_package`].
pub struct DisplayPackage<'c> {
    catalog: &'c Catalog,
    id: PackageId,
}

impl Display for DisplayPackage<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let package = self.catalog.package(self.id);
        write!(
            f,
            "{}={}",
            self.catalog.resolve_name(package.name),
            package.version.raw()
        )
    }
}
