//! Locating configuration files.
//!
//! A logical file name is looked up in order:
//! 1. Directly, if it is an absolute path
//! 2. In each search directory, as `{dir}/{package}/{name}` then `{dir}/{name}`
//! 3. Relative to the caller's [`ResourceRoot`]
//!
//! The first hit wins. Exhausting every location is not an error.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::LoadError;

/// Embedded resource table: `(file name, content)` pairs.
pub type EmbeddedFiles = &'static [(&'static str, &'static str)];

const BUILTIN_FILES: EmbeddedFiles = &[
    (
        super::BOOTSTRAP_FILE_NAME,
        include_str!("../defaults/eeprops-bootstrap.properties"),
    ),
    (
        super::BOOTSTRAP_LOGGING_FILE_NAME,
        include_str!("../defaults/eeprops-logging-bootstrap.properties"),
    ),
];

/// Where a resource root's files live.
#[derive(Debug, Clone)]
pub enum ResourceSource {
    /// Files under a directory on disk.
    Directory(PathBuf),
    /// Files compiled into the binary.
    Embedded(EmbeddedFiles),
}

/// Named anchor for resource-relative lookups.
///
/// `package` is a slash-separated sub-path (e.g. `net/example/app`) used both
/// for directory-backed resource lookups and as the first candidate layout
/// inside each search directory.
#[derive(Debug, Clone)]
pub struct ResourceRoot {
    name: String,
    package: String,
    source: ResourceSource,
}

impl ResourceRoot {
    pub fn directory(name: impl Into<String>, base: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            package: String::new(),
            source: ResourceSource::Directory(base.into()),
        }
    }

    pub fn embedded(name: impl Into<String>, files: EmbeddedFiles) -> Self {
        Self {
            name: name.into(),
            package: String::new(),
            source: ResourceSource::Embedded(files),
        }
    }

    /// The crate's own resources (bootstrap defaults).
    pub fn builtin() -> Self {
        Self::embedded(env!("CARGO_PKG_NAME"), BUILTIN_FILES)
    }

    /// Set the package sub-path.
    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = package.into().trim_matches('/').to_string();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn source(&self) -> &ResourceSource {
        &self.source
    }

    /// Read a resource by file name. `Ok(None)` when it does not exist.
    pub fn read(&self, file_name: &str) -> Result<Option<String>, LoadError> {
        match &self.source {
            ResourceSource::Embedded(files) => Ok(files
                .iter()
                .find(|(name, _)| *name == file_name)
                .map(|(_, content)| content.to_string())),
            ResourceSource::Directory(base) => {
                let path = base.join(&self.package).join(file_name);
                if !path.is_file() {
                    return Ok(None);
                }
                read_file(&path).map(Some)
            }
        }
    }
}

/// Where a located file came from.
#[derive(Debug, Clone)]
pub enum Origin {
    /// A file on disk.
    Path(PathBuf),
    /// A file resolved relative to a resource root.
    Resource { root: ResourceRoot, file_name: String },
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Path(path) => write!(f, "{}", path.display()),
            Origin::Resource { root, file_name } => {
                write!(f, "{}:{}", root.name(), file_name)
            }
        }
    }
}

/// A located file with its full content.
#[derive(Debug, Clone)]
pub struct Located {
    pub origin: Origin,
    pub content: String,
}

/// Three-way lookup result.
#[derive(Debug)]
pub enum Lookup {
    Found(Located),
    NotFound,
    Failed(LoadError),
}

fn read_file(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|e| LoadError::io(path, e))
}

fn read_path(path: PathBuf) -> Lookup {
    if !path.is_file() {
        return Lookup::NotFound;
    }
    match read_file(&path) {
        Ok(content) => Lookup::Found(Located {
            origin: Origin::Path(std::path::absolute(&path).unwrap_or(path)),
            content,
        }),
        Err(e) => Lookup::Failed(e),
    }
}

fn read_resource(root: &ResourceRoot, file_name: &str) -> Lookup {
    match root.read(file_name) {
        Ok(Some(content)) => Lookup::Found(Located {
            origin: Origin::Resource {
                root: root.clone(),
                file_name: file_name.to_string(),
            },
            content,
        }),
        Ok(None) => Lookup::NotFound,
        Err(e) => Lookup::Failed(e),
    }
}

/// Candidate paths for `file_name` inside one search directory.
pub fn candidates(dir: &str, package: &str, file_name: &str) -> Vec<PathBuf> {
    let dir = Path::new(dir);
    let mut paths = Vec::with_capacity(2);
    if !package.is_empty() {
        paths.push(dir.join(package).join(file_name));
    }
    paths.push(dir.join(file_name));
    paths
}

/// Load a single file: absolute paths from disk, anything else from `root`.
pub fn locate_file_or_resource(file_name: &str, root: Option<&ResourceRoot>) -> Lookup {
    if Path::new(file_name).is_absolute() {
        return read_path(PathBuf::from(file_name));
    }
    match root {
        Some(root) => read_resource(root, file_name),
        None => Lookup::NotFound,
    }
}

/// Find `file_name` in the search directories, falling back to `root`.
///
/// A candidate that exists but cannot be read does not stop the search; its
/// error is reported only if nothing later is found.
pub fn locate(file_name: &str, search_dirs: &[String], root: Option<&ResourceRoot>) -> Lookup {
    if Path::new(file_name).is_absolute() {
        return read_path(PathBuf::from(file_name));
    }

    let package = root.map(ResourceRoot::package).unwrap_or_default();
    let mut last_failure = None;

    for dir in search_dirs {
        for candidate in candidates(dir, package, file_name) {
            match read_path(candidate) {
                Lookup::Found(located) => return Lookup::Found(located),
                Lookup::NotFound => {}
                Lookup::Failed(e) => last_failure = Some(e),
            }
        }
    }

    if let Some(root) = root {
        match read_resource(root, file_name) {
            Lookup::NotFound => {}
            other => return other,
        }
    }

    match last_failure {
        Some(e) => Lookup::Failed(e),
        None => Lookup::NotFound,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn found_content(lookup: Lookup) -> String {
        match lookup {
            Lookup::Found(located) => located.content,
            other => panic!("expected a hit, got {other:?}"),
        }
    }

    #[test]
    fn test_candidates_with_and_without_package() {
        assert_eq!(
            candidates("/etc/app", "net/example", "x.properties"),
            vec![
                PathBuf::from("/etc/app/net/example/x.properties"),
                PathBuf::from("/etc/app/x.properties"),
            ]
        );
        assert_eq!(
            candidates("/etc/app", "", "x.properties"),
            vec![PathBuf::from("/etc/app/x.properties")]
        );
    }

    #[test]
    fn test_package_layout_wins_within_directory() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("net/example")).unwrap();
        std::fs::write(temp.path().join("net/example/f.properties"), "k=pkg").unwrap();
        std::fs::write(temp.path().join("f.properties"), "k=flat").unwrap();

        let root = ResourceRoot::embedded("test", &[]).with_package("net/example");
        let dirs = vec![temp.path().to_string_lossy().to_string()];
        assert_eq!(found_content(locate("f.properties", &dirs, Some(&root))), "k=pkg");
    }

    #[test]
    fn test_first_directory_wins() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        std::fs::write(first.path().join("f.properties"), "k=first").unwrap();
        std::fs::write(second.path().join("f.properties"), "k=second").unwrap();

        let dirs = vec![
            first.path().to_string_lossy().to_string(),
            second.path().to_string_lossy().to_string(),
        ];
        assert_eq!(found_content(locate("f.properties", &dirs, None)), "k=first");
    }

    #[test]
    fn test_search_directory_beats_resource_root() {
        let search = TempDir::new().unwrap();
        let resources = TempDir::new().unwrap();
        std::fs::write(search.path().join("f.properties"), "k=external").unwrap();
        std::fs::write(resources.path().join("f.properties"), "k=bundled").unwrap();

        let root = ResourceRoot::directory("bundled", resources.path());
        let dirs = vec![search.path().to_string_lossy().to_string()];

        let lookup = locate("f.properties", &dirs, Some(&root));
        match lookup {
            Lookup::Found(located) => {
                assert_eq!(located.content, "k=external");
                assert!(matches!(located.origin, Origin::Path(_)));
            }
            other => panic!("expected a hit, got {other:?}"),
        }
    }

    #[test]
    fn test_falls_back_to_resource_root() {
        let resources = TempDir::new().unwrap();
        std::fs::create_dir_all(resources.path().join("pkg")).unwrap();
        std::fs::write(resources.path().join("pkg/f.properties"), "k=bundled").unwrap();

        let root = ResourceRoot::directory("bundled", resources.path()).with_package("pkg");
        let lookup = locate("f.properties", &["/nonexistent/dir".to_string()], Some(&root));
        match lookup {
            Lookup::Found(located) => {
                assert_eq!(located.content, "k=bundled");
                assert_eq!(located.origin.to_string(), "bundled:f.properties");
            }
            other => panic!("expected a hit, got {other:?}"),
        }
    }

    #[test]
    fn test_not_found_is_not_an_error() {
        let root = ResourceRoot::embedded("empty", &[]);
        assert!(matches!(
            locate("missing.properties", &[], Some(&root)),
            Lookup::NotFound
        ));
    }

    #[test]
    fn test_absolute_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("abs.properties");
        std::fs::write(&path, "k=abs").unwrap();

        let lookup = locate_file_or_resource(&path.to_string_lossy(), None);
        assert_eq!(found_content(lookup), "k=abs");
    }

    #[test]
    fn test_builtin_root_has_bootstrap() {
        let root = ResourceRoot::builtin();
        assert!(root.read(crate::config::BOOTSTRAP_FILE_NAME).unwrap().is_some());
    }

    #[test]
    fn test_unreadable_candidate_reports_failure() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("bad.properties"), [0xff, 0xfe, 0x00]).unwrap();
        let dirs = vec![temp.path().to_string_lossy().to_string()];
        assert!(matches!(
            locate("bad.properties", &dirs, None),
            Lookup::Failed(LoadError::Io { .. })
        ));
    }
}
