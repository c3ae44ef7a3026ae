//! Fixture directory resolution
//!
//! An explicit location always wins. Without one, the directory is derived from
//! the identity of the test being prepared: a per-test directory first, then the
//! suite-wide directory shared through scenario markers.

use std::env;
use std::path::{Path, PathBuf};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::LoadError;
use crate::reader::ReaderRegistry;

/// Scheme for paths relative to the working directory
pub const FILE_SCHEME: &str = "file:";

/// Scheme for paths relative to the resource root
pub const RESOURCE_SCHEME: &str = "resource:";

/// Identity of the test a fixture phase runs for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestIdentity {
    /// Suite, module or class path, e.g. `app::users` or `com.example.UserTest`
    pub suite: String,

    /// Test function or method name
    pub name: String,
}

impl TestIdentity {
    /// Create a test identity
    pub fn new(suite: impl Into<String>, name: impl Into<String>) -> Self {
        TestIdentity {
            suite: suite.into(),
            name: name.into(),
        }
    }

    /// Suite split into path segments on `::`, `.` and `/`
    pub fn suite_segments(&self) -> Vec<&str> {
        self.suite
            .split("::")
            .flat_map(|part| part.split(['.', '/']))
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .collect()
    }
}

/// Directory location derived from a test identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConventionPath {
    identity: TestIdentity,
    suffix: Option<String>,
}

impl ConventionPath {
    /// Convention path for a test
    pub fn new(identity: TestIdentity) -> Self {
        ConventionPath {
            identity,
            suffix: None,
        }
    }

    /// Append `suffix` to the final path segment, e.g. `-expected`
    pub fn with_suffix(mut self, suffix: Option<String>) -> Self {
        self.suffix = suffix.filter(|s| !s.is_empty());
        self
    }

    /// Identity the path is derived from
    pub fn identity(&self) -> &TestIdentity {
        &self.identity
    }

    /// Candidate directories under `root`, most specific first
    pub fn candidates(&self, root: &Path) -> Vec<PathBuf> {
        let suffix = self.suffix.as_deref().unwrap_or("");
        let segments = self.identity.suite_segments();
        let name = self.identity.name.trim();

        let mut suite_dir = root.to_path_buf();
        for segment in &segments {
            suite_dir.push(segment);
        }

        let mut candidates = Vec::with_capacity(2);
        if !name.is_empty() {
            candidates.push(suite_dir.join(format!("{}{}", name, suffix)));
        }
        if let Some((last, parents)) = segments.split_last() {
            let mut shared = root.to_path_buf();
            for segment in parents {
                shared.push(segment);
            }
            shared.push(format!("{}{}", last, suffix));
            candidates.push(shared);
        }
        candidates
    }
}

/// Resolves fixture locations to existing directories with loadable files
#[derive(Debug, Clone)]
pub struct DirectoryResolver {
    resource_root: PathBuf,
    readers: ReaderRegistry,
}

impl DirectoryResolver {
    /// Create a resolver rooted at `resource_root`
    pub fn new(resource_root: impl Into<PathBuf>, readers: ReaderRegistry) -> Self {
        DirectoryResolver {
            resource_root: resource_root.into(),
            readers,
        }
    }

    /// Root for resource and convention paths
    pub fn resource_root(&self) -> &Path {
        &self.resource_root
    }

    /// Resolve the fixture directory for a phase
    pub fn resolve(
        &self,
        explicit: Option<&str>,
        convention: Option<&ConventionPath>,
    ) -> Result<PathBuf, LoadError> {
        let candidates = match (explicit, convention) {
            (Some(location), _) => vec![self.explicit_path(location)?],
            (None, Some(convention)) => convention.candidates(&self.resource_root),
            (None, None) => return Err(LoadError::NoLocation),
        };

        let found = candidates.iter().find(|path| path.exists()).cloned();
        let Some(path) = found else {
            return Err(LoadError::DirectoryNotFound {
                attempted: candidates,
            });
        };

        if !path.is_dir() {
            return Err(LoadError::NotADirectory { path });
        }
        if !self.has_loadable_files(&path)? {
            return Err(LoadError::NoLoadableFiles { path });
        }

        debug!("Resolved fixture directory {}", path.display());
        Ok(path)
    }

    /// Turn an explicit location into a path
    pub fn explicit_path(&self, location: &str) -> Result<PathBuf, LoadError> {
        let location = location.trim();
        if let Some(rest) = location.strip_prefix(FILE_SCHEME) {
            let path = PathBuf::from(rest.trim_start_matches("//"));
            if path.is_absolute() {
                return Ok(path);
            }
            let cwd = env::current_dir().map_err(|e| LoadError::io(".", e))?;
            return Ok(cwd.join(path));
        }
        if let Some(rest) = location.strip_prefix(RESOURCE_SCHEME) {
            return Ok(self.resource_root.join(rest.trim_start_matches('/')));
        }

        let path = PathBuf::from(location);
        if path.is_absolute() {
            return Ok(path);
        }
        if has_scheme(location) {
            return Err(LoadError::UnsupportedLocation {
                location: location.to_string(),
            });
        }
        Ok(self.resource_root.join(path))
    }

    fn has_loadable_files(&self, dir: &Path) -> Result<bool, LoadError> {
        let entries = std::fs::read_dir(dir).map_err(|e| LoadError::io(dir, e))?;
        for entry in entries {
            let path = entry.map_err(|e| LoadError::io(dir, e))?.path();
            if path.is_file() && self.readers.is_loadable(&path) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Whether a location starts with a URI-style scheme such as `http:`
fn has_scheme(location: &str) -> bool {
    match location.split_once(':') {
        // Single letters are drive prefixes, not schemes
        Some((scheme, _)) => {
            scheme.len() > 1
                && scheme
                    .chars()
                    .next()
                    .map(|c| c.is_ascii_alphabetic())
                    .unwrap_or(false)
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;

    fn resolver(root: &Path) -> DirectoryResolver {
        DirectoryResolver::new(root, ReaderRegistry::with_defaults())
    }

    fn fixture_dir(root: &Path, relative: &str) -> PathBuf {
        let dir = root.join(relative);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("USERS.csv"), "ID\n1\n").unwrap();
        dir
    }

    #[rstest]
    #[case("app::users", vec!["app", "users"])]
    #[case("com.example.UserTest", vec!["com", "example", "UserTest"])]
    #[case("tests/users", vec!["tests", "users"])]
    #[case("", vec![])]
    fn test_suite_segments(#[case] suite: &str, #[case] expected: Vec<&str>) {
        assert_eq!(TestIdentity::new(suite, "t").suite_segments(), expected);
    }

    #[test]
    fn test_convention_candidates() {
        let convention = ConventionPath::new(TestIdentity::new("app::users", "should_save"))
            .with_suffix(Some("-expected".to_string()));
        let root = Path::new("/fixtures");

        assert_eq!(
            convention.candidates(root),
            vec![
                PathBuf::from("/fixtures/app/users/should_save-expected"),
                PathBuf::from("/fixtures/app/users-expected"),
            ]
        );
    }

    #[test]
    fn test_per_test_directory_wins_over_suite_directory() {
        let root = tempfile::tempdir().unwrap();
        fixture_dir(root.path(), "app/users");
        let per_test = fixture_dir(root.path(), "app/users/should_save");

        let convention = ConventionPath::new(TestIdentity::new("app::users", "should_save"));
        let resolved = resolver(root.path()).resolve(None, Some(&convention)).unwrap();
        assert_eq!(resolved, per_test);
    }

    #[test]
    fn test_falls_back_to_suite_directory() {
        let root = tempfile::tempdir().unwrap();
        let suite = fixture_dir(root.path(), "app/users");

        let convention = ConventionPath::new(TestIdentity::new("app::users", "should_save"));
        let resolved = resolver(root.path()).resolve(None, Some(&convention)).unwrap();
        assert_eq!(resolved, suite);
    }

    #[test]
    fn test_explicit_location_wins() {
        let root = tempfile::tempdir().unwrap();
        fixture_dir(root.path(), "app/users");
        let shared = fixture_dir(root.path(), "shared");

        let convention = ConventionPath::new(TestIdentity::new("app::users", "t"));
        let r = resolver(root.path());

        assert_eq!(r.resolve(Some("shared"), Some(&convention)).unwrap(), shared);
        assert_eq!(r.resolve(Some("resource:shared"), None).unwrap(), shared);
        assert_eq!(
            r.resolve(Some(shared.to_str().unwrap()), None).unwrap(),
            shared
        );
        let file_uri = format!("file:{}", shared.display());
        assert_eq!(r.resolve(Some(&file_uri), None).unwrap(), shared);
    }

    #[test]
    fn test_not_found_lists_attempted_paths() {
        let root = tempfile::tempdir().unwrap();
        let convention = ConventionPath::new(TestIdentity::new("app", "missing"));

        let err = resolver(root.path()).resolve(None, Some(&convention)).unwrap_err();
        match err {
            LoadError::DirectoryNotFound { attempted } => {
                assert_eq!(
                    attempted,
                    vec![root.path().join("app/missing"), root.path().join("app")]
                );
            }
            other => panic!("Expected DirectoryNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_explicit_location_not_found() {
        let root = tempfile::tempdir().unwrap();
        let err = resolver(root.path()).resolve(Some("nowhere"), None).unwrap_err();
        assert!(matches!(err, LoadError::DirectoryNotFound { attempted } if attempted.len() == 1));
    }

    #[test]
    fn test_file_instead_of_directory() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("USERS.csv"), "ID\n").unwrap();

        let err = resolver(root.path()).resolve(Some("USERS.csv"), None).unwrap_err();
        assert!(matches!(err, LoadError::NotADirectory { .. }));
    }

    #[test]
    fn test_directory_without_loadable_files() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("empty");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("notes.txt"), "hi").unwrap();

        let err = resolver(root.path()).resolve(Some("empty"), None).unwrap_err();
        assert!(matches!(err, LoadError::NoLoadableFiles { path } if path == dir));
    }

    #[test]
    fn test_no_location_at_all() {
        let root = tempfile::tempdir().unwrap();
        assert!(matches!(
            resolver(root.path()).resolve(None, None),
            Err(LoadError::NoLocation)
        ));
    }

    #[rstest]
    #[case("http://example.com/fixtures")]
    #[case("classpath:users")]
    fn test_unsupported_scheme(#[case] location: &str) {
        let r = resolver(Path::new("/fixtures"));
        assert!(matches!(
            r.explicit_path(location),
            Err(LoadError::UnsupportedLocation { .. })
        ));
    }
}
