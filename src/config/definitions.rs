//! Ordered record of successful loads, used to replay them on reload.

use std::fmt;
use std::path::PathBuf;

use super::files::{Origin, ResourceRoot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionKind {
    AbsolutePath,
    ResourceRelative,
}

impl fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefinitionKind::AbsolutePath => write!(f, "path"),
            DefinitionKind::ResourceRelative => write!(f, "resource"),
        }
    }
}

/// Where one successful load came from.
#[derive(Debug, Clone)]
pub struct LoadDefinition {
    pub kind: DefinitionKind,
    /// Identifier: the path itself, or the resource root's name.
    pub name: String,
    /// File path, or file name relative to the resource root.
    pub path: String,
    /// Anchor for resource-relative definitions.
    pub root: Option<ResourceRoot>,
}

impl LoadDefinition {
    pub fn absolute(path: impl Into<PathBuf>) -> Self {
        let path = path.into().to_string_lossy().to_string();
        Self {
            kind: DefinitionKind::AbsolutePath,
            name: path.clone(),
            path,
            root: None,
        }
    }

    pub fn resource(root: ResourceRoot, file_name: impl Into<String>) -> Self {
        Self {
            kind: DefinitionKind::ResourceRelative,
            name: root.name().to_string(),
            path: file_name.into(),
            root: Some(root),
        }
    }

    pub fn from_origin(origin: &Origin) -> Self {
        match origin {
            Origin::Path(path) => Self::absolute(path.clone()),
            Origin::Resource { root, file_name } => Self::resource(root.clone(), file_name.clone()),
        }
    }
}

impl fmt::Display for LoadDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DefinitionKind::AbsolutePath => write!(f, "{} {}", self.kind, self.path),
            DefinitionKind::ResourceRelative => {
                write!(f, "{} {}:{}", self.kind, self.name, self.path)
            }
        }
    }
}

/// Append-only log of load definitions.
#[derive(Debug, Clone, Default)]
pub struct LoadDefinitionLog {
    entries: Vec<LoadDefinition>,
}

impl LoadDefinitionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, definition: LoadDefinition) {
        self.entries.push(definition);
    }

    /// Ordered copy of all entries.
    pub fn snapshot(&self) -> Vec<LoadDefinition> {
        self.entries.clone()
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// Move all entries out, leaving the log empty.
    pub fn take(&mut self) -> Vec<LoadDefinition> {
        std::mem::take(&mut self.entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_preserves_order() {
        let mut log = LoadDefinitionLog::new();
        log.record(LoadDefinition::absolute("/etc/app/defaults-ee.properties"));
        log.record(LoadDefinition::resource(
            ResourceRoot::embedded("bundled", &[]),
            "development-ee.properties",
        ));

        let entries = log.snapshot();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, DefinitionKind::AbsolutePath);
        assert_eq!(entries[0].path, "/etc/app/defaults-ee.properties");
        assert_eq!(entries[1].kind, DefinitionKind::ResourceRelative);
        assert_eq!(entries[1].name, "bundled");
        assert!(entries[1].root.is_some());
    }

    #[test]
    fn test_take_empties_log() {
        let mut log = LoadDefinitionLog::new();
        log.record(LoadDefinition::absolute("/a"));
        let taken = log.take();
        assert_eq!(taken.len(), 1);
        assert!(log.is_empty());
    }

    #[test]
    fn test_reset() {
        let mut log = LoadDefinitionLog::new();
        log.record(LoadDefinition::absolute("/a"));
        log.record(LoadDefinition::absolute("/b"));
        log.reset();
        assert_eq!(log.len(), 0);
    }

    #[test]
    fn test_display() {
        assert_eq!(LoadDefinition::absolute("/a/b").to_string(), "path /a/b");
        let def = LoadDefinition::resource(ResourceRoot::embedded("app", &[]), "x.properties");
        assert_eq!(def.to_string(), "resource app:x.properties");
    }
}
