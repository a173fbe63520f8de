//! Scenario registry
//!
//! In-memory mapping from scenario name to descriptor, loaded once at
//! startup from a directory of YAML files. Registration order is the
//! authoritative report order, so descriptors live in a Vec with a name
//! index on the side.

use std::collections::HashMap;
use std::path::Path;

use crate::common::{Error, Result};
use crate::scenario::ScenarioDescriptor;

/// Registry of scenarios for one run
#[derive(Debug, Default)]
pub struct ScenarioRegistry {
    /// Descriptors in registration order
    entries: Vec<ScenarioDescriptor>,
    /// Name to position in `entries`
    index: HashMap<String, usize>,
}

impl ScenarioRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.yaml`/`*.yml` file in a directory, in file-name order
    ///
    /// File-name order keeps registration order stable across runs
    /// regardless of directory iteration order.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut registry = Self::new();

        let mut paths: Vec<_> = std::fs::read_dir(dir)
            .map_err(|e| Error::FileRead {
                path: dir.display().to_string(),
                error: e.to_string(),
            })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                matches!(
                    p.extension().and_then(|e| e.to_str()),
                    Some("yaml") | Some("yml")
                )
            })
            .collect();
        paths.sort();

        for path in paths {
            let content = std::fs::read_to_string(&path).map_err(|e| Error::FileRead {
                path: path.display().to_string(),
                error: e.to_string(),
            })?;
            let descriptor: ScenarioDescriptor = serde_yaml::from_str(&content)
                .map_err(|e| Error::scenario_parse(&path, e))?;
            tracing::debug!(scenario = %descriptor.name, file = %path.display(), "registered scenario");
            registry.register(descriptor)?;
        }

        Ok(registry)
    }

    /// Register a descriptor, rejecting duplicate names
    pub fn register(&mut self, descriptor: ScenarioDescriptor) -> Result<()> {
        if self.index.contains_key(&descriptor.name) {
            return Err(Error::DuplicateScenario {
                name: descriptor.name,
            });
        }
        self.index
            .insert(descriptor.name.clone(), self.entries.len());
        self.entries.push(descriptor);
        Ok(())
    }

    /// Look up a scenario by name
    pub fn lookup(&self, name: &str) -> Result<&ScenarioDescriptor> {
        self.index
            .get(name)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| Error::ScenarioNotFound {
                name: name.to_string(),
            })
    }

    /// Iterate descriptors in registration order
    ///
    /// The iterator is restartable: call again for a fresh pass.
    pub fn list_all(&self) -> impl Iterator<Item = &ScenarioDescriptor> {
        self.entries.iter()
    }

    /// Descriptors whose name contains `pattern`, in registration order
    pub fn filtered(&self, pattern: Option<&str>) -> Vec<&ScenarioDescriptor> {
        match pattern {
            Some(p) => self
                .entries
                .iter()
                .filter(|d| d.name.contains(p))
                .collect(),
            None => self.entries.iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Scenario names in registration order, used by the report
    /// aggregator to sort results
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|d| d.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str) -> ScenarioDescriptor {
        serde_yaml::from_str(&format!(
            "name: {name}\nsteps:\n  - action: assert_state\n    query: chain.height\n    exists: true\n"
        ))
        .unwrap()
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = ScenarioRegistry::new();
        registry.register(descriptor("a")).unwrap();
        assert_eq!(registry.lookup("a").unwrap().name, "a");
        assert!(matches!(
            registry.lookup("missing"),
            Err(Error::ScenarioNotFound { .. })
        ));
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = ScenarioRegistry::new();
        registry.register(descriptor("a")).unwrap();
        let err = registry.register(descriptor("a")).unwrap_err();
        assert!(matches!(err, Error::DuplicateScenario { .. }));
        // Length counts successful registrations only
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_list_all_preserves_registration_order() {
        let mut registry = ScenarioRegistry::new();
        for name in ["charlie", "alpha", "bravo"] {
            registry.register(descriptor(name)).unwrap();
        }
        let names: Vec<_> = registry.list_all().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["charlie", "alpha", "bravo"]);

        // Restartable: a second pass yields the same sequence
        let again: Vec<_> = registry.list_all().map(|d| d.name.as_str()).collect();
        assert_eq!(names, again);
    }

    #[test]
    fn test_filtered_by_substring() {
        let mut registry = ScenarioRegistry::new();
        for name in ["transfer-basic", "transfer-rejected", "sync-catchup"] {
            registry.register(descriptor(name)).unwrap();
        }
        let matched = registry.filtered(Some("transfer"));
        assert_eq!(matched.len(), 2);
        assert_eq!(matched[0].name, "transfer-basic");
        assert_eq!(registry.filtered(None).len(), 3);
    }

    #[test]
    fn test_load_dir_sorted_by_file_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("20-second.yaml"),
            "name: second\nsteps:\n  - action: assert_state\n    query: q\n    exists: true\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("10-first.yaml"),
            "name: first\nsteps:\n  - action: assert_state\n    query: q\n    exists: true\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let registry = ScenarioRegistry::load_dir(dir.path()).unwrap();
        let names: Vec<_> = registry.list_all().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["first", "second"]);
    }
}
