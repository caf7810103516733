// SPDX-License-Identifier: MIT

//! Hard-coded knowledge about packages whose binary ABI is pinned to a
//! narrow numpy version range. Applied when resolving a dependency closure
//! so a bubble never links against a numpy build that will segfault it.

use semver::{Version, VersionReq};

/// One `(package, version range, numpy requirement)` entry.
struct NumpyConstraint {
    package: &'static str,
    min: (u64, u64, u64),
    max: (u64, u64, u64),
    requirement: &'static str,
}

const NUMPY_CONSTRAINTS: &[NumpyConstraint] = &[
    NumpyConstraint { package: "pandas", min: (2, 0, 0), max: (2, 1, 99), requirement: ">=1.21.0, <2.0" },
    NumpyConstraint { package: "pandas", min: (2, 2, 0), max: (2, 2, 99), requirement: ">=1.23.5, <2.3" },
    NumpyConstraint { package: "pandas", min: (2, 3, 0), max: (2, 9, 99), requirement: ">=1.26.0, <2.3" },
    NumpyConstraint { package: "scipy", min: (1, 10, 0), max: (1, 10, 99), requirement: ">=1.21.0, <1.28" },
    NumpyConstraint { package: "scipy", min: (1, 11, 0), max: (1, 13, 99), requirement: ">=1.21.6, <2.1" },
    NumpyConstraint { package: "scikit-learn", min: (1, 3, 0), max: (1, 3, 99), requirement: ">=1.17.3, <2.0" },
    NumpyConstraint { package: "scikit-learn", min: (1, 4, 0), max: (1, 5, 99), requirement: ">=1.19.5, <2.1" },
    NumpyConstraint { package: "numba", min: (0, 50, 0), max: (0, 60, 99), requirement: ">=1.18.0, <1.25" },
    NumpyConstraint { package: "numba", min: (0, 61, 0), max: (0, 61, 99), requirement: ">=1.24.0, <2.3" },
];

fn in_range(version: &Version, min: (u64, u64, u64), max: (u64, u64, u64)) -> bool {
    let min = Version::new(min.0, min.1, min.2);
    let max = Version::new(max.0, max.1, max.2);
    *version >= min && *version <= max
}

/// The numpy `VersionReq` a dependency closure must satisfy when `package`
/// at `version` is present, canonicalizing `package` the same way
/// [`bh_core::PackageName`] does.
pub fn numpy_constraint_for(package: &str, version: &Version) -> Option<VersionReq> {
    matching_constraint(package, version).and_then(|c| VersionReq::parse(c.requirement).ok())
}

/// The floor of the matched constraint's own numpy range — used when a
/// dependency closure is missing a numpy entry outright and one must be
/// synthesized to carry the requirement; it's the smallest version that is
/// itself guaranteed to satisfy the requirement it's paired with.
pub fn numpy_floor_for(package: &str, version: &Version) -> Option<Version> {
    matching_constraint(package, version).map(|c| Version::new(c.min.0, c.min.1, c.min.2))
}

fn matching_constraint(package: &str, version: &Version) -> Option<&'static NumpyConstraint> {
    let canonical = package.trim().to_lowercase().replace('_', "-");
    NUMPY_CONSTRAINTS.iter().find(|c| c.package == canonical && in_range(version, c.min, c.max))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pandas_2_0_pins_numpy_below_2() {
        let req = numpy_constraint_for("pandas", &Version::new(2, 0, 3)).unwrap();
        assert!(req.matches(&Version::new(1, 26, 4)));
        assert!(!req.matches(&Version::new(2, 0, 0)));
    }

    #[test]
    fn pandas_2_2_allows_numpy_2() {
        let req = numpy_constraint_for("pandas", &Version::new(2, 2, 1)).unwrap();
        assert!(req.matches(&Version::new(2, 0, 0)));
    }

    #[test]
    fn underscored_name_still_matches() {
        let req = numpy_constraint_for("Scikit_Learn", &Version::new(1, 3, 0));
        assert!(req.is_some());
    }

    #[test]
    fn unconstrained_package_returns_none() {
        assert!(numpy_constraint_for("rich", &Version::new(13, 5, 3)).is_none());
    }

    #[test]
    fn version_outside_any_known_range_returns_none() {
        assert!(numpy_constraint_for("pandas", &Version::new(1, 5, 0)).is_none());
    }
}
