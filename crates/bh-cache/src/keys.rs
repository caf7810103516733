// SPDX-License-Identifier: MIT

//! Keyspace conventions shared by both backends, so a bubble built against
//! the embedded cache and later migrated to a networked one resolves to the
//! same keys.

use bh_core::Spec;

pub fn package_record(spec: &Spec) -> String {
    format!("pkg:{}:{}", spec.name, spec.version)
}

pub fn package_versions(name: &str) -> String {
    format!("pkg:{name}:versions")
}

pub fn package_active(name: &str) -> String {
    format!("pkg:{name}:active")
}

pub fn bubble_file(bubble_id: &str, relpath: &str) -> String {
    format!("file:{bubble_id}:{relpath}")
}

#[cfg(test)]
mod tests {
    use semver::Version;

    use super::*;

    #[test]
    fn package_record_key_is_stable() {
        let spec = Spec::new("numpy", Version::new(1, 26, 4));
        assert_eq!(package_record(&spec), "pkg:numpy:1.26.4");
    }

    #[test]
    fn bubble_file_key_includes_relpath() {
        assert_eq!(bubble_file("numpy-1.26.4", "numpy/__init__.py"), "file:numpy-1.26.4:numpy/__init__.py");
    }
}
