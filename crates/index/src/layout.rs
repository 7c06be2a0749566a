use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{DocumentKind, IndexError};

/// One on-disk collection family: every file sharing `suffix` holds vectors
/// of `dimension` components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSpec {
    pub dimension: usize,
    #[serde(default)]
    pub suffix: String,
}

impl CollectionSpec {
    pub fn new(dimension: usize, suffix: impl Into<String>) -> Self {
        Self {
            dimension,
            suffix: suffix.into(),
        }
    }
}

/// Where the static collections live and how their file names map to
/// dimensionalities.
///
/// ```
/// use index::{CollectionLayout, DocumentKind};
///
/// let layout = CollectionLayout::new("data");
/// let files = layout.files_for(1024).unwrap();
/// assert_eq!(files[0].0, DocumentKind::Insight);
/// assert!(files[0].1.ends_with("insights_embedded_1024.json"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionLayout {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default = "default_specs")]
    pub specs: Vec<CollectionSpec>,
}

impl Default for CollectionLayout {
    fn default() -> Self {
        Self {
            root: default_root(),
            specs: default_specs(),
        }
    }
}

impl CollectionLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Replaces the suffix for `dimension`, or registers it.
    pub fn with_spec(mut self, dimension: usize, suffix: impl Into<String>) -> Self {
        let spec = CollectionSpec::new(dimension, suffix);
        match self.specs.iter_mut().find(|s| s.dimension == dimension) {
            Some(existing) => *existing = spec,
            None => self.specs.push(spec),
        }
        self
    }

    pub fn with_specs(mut self, specs: Vec<CollectionSpec>) -> Self {
        self.specs = specs;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn spec(&self, dimension: usize) -> Option<&CollectionSpec> {
        self.specs.iter().find(|s| s.dimension == dimension)
    }

    pub fn file_path(&self, spec: &CollectionSpec, kind: DocumentKind) -> PathBuf {
        self.root
            .join(format!("{}{}.json", kind.file_stem(), spec.suffix))
    }

    /// The three collection files for `dimension`, insights first.
    pub fn files_for(&self, dimension: usize) -> Result<Vec<(DocumentKind, PathBuf)>, IndexError> {
        let spec = self
            .spec(dimension)
            .ok_or(IndexError::UnknownDimension(dimension))?;
        Ok(DocumentKind::ALL
            .iter()
            .map(|&kind| (kind, self.file_path(spec, kind)))
            .collect())
    }

    /// Dimensionalities whose insights file is present on disk.
    pub fn available_dimensions(&self) -> BTreeSet<usize> {
        self.specs
            .iter()
            .filter(|spec| self.file_path(spec, DocumentKind::Insight).is_file())
            .map(|spec| spec.dimension)
            .collect()
    }
}

fn default_root() -> PathBuf {
    PathBuf::from("./data")
}

fn default_specs() -> Vec<CollectionSpec> {
    vec![
        CollectionSpec::new(384, ""),
        CollectionSpec::new(1024, "_1024"),
        CollectionSpec::new(1536, "_1536"),
        CollectionSpec::new(3072, "_3072"),
    ]
}
