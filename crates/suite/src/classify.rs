//! Splits candidate test files into unit and integration buckets by path

use std::path::{Component, Path, PathBuf};

use crate::result::TestCategory;

/// Directory segments that mark a file as an integration test
pub const INTEGRATION_MARKER: [&str; 2] = ["test", "integration"];

/// Files partitioned by category, each bucket in input order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub integration: Vec<PathBuf>,
    pub unit: Vec<PathBuf>,
}

impl Classification {
    pub fn is_empty(&self) -> bool {
        self.integration.is_empty() && self.unit.is_empty()
    }

    pub fn len(&self) -> usize {
        self.integration.len() + self.unit.len()
    }
}

/// Category of a single path. Only directory segments count, never the file name.
pub fn category_of(path: &Path) -> TestCategory {
    let dirs: Vec<&str> = match path.parent() {
        Some(parent) => parent
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => s.to_str(),
                _ => None,
            })
            .collect(),
        None => Vec::new(),
    };

    if dirs.windows(INTEGRATION_MARKER.len()).any(|w| w == &INTEGRATION_MARKER[..]) {
        TestCategory::Integration
    } else {
        TestCategory::Unit
    }
}

/// Partition `files`; every input lands in exactly one bucket
pub fn classify<P: AsRef<Path>>(files: &[P]) -> Classification {
    let mut classification = Classification::default();
    for file in files {
        let file = file.as_ref();
        match category_of(file) {
            TestCategory::Integration => classification.integration.push(file.to_path_buf()),
            TestCategory::Unit => classification.unit.push(file.to_path_buf()),
        }
    }
    classification
}
