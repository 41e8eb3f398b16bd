//! Path syntax
//!
//! The namespace service itself only resolves one name at a time. These
//! helpers split absolute paths for callers that walk a tree through
//! repeated lookups.

use thiserror::Error;

/// Errors that can occur while parsing a path
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    /// Path is empty or malformed
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// A component is not a legal entry name
    #[error("Invalid name: {0}")]
    InvalidName(String),
}

/// Path resolver
///
/// Handles splitting paths into components and validating syntax.
pub struct PathResolver;

impl PathResolver {
    /// Splits a path into components
    ///
    /// The root path (`/` or empty) yields no components.
    ///
    /// # Examples
    ///
    /// ```
    /// use fs_view::PathResolver;
    ///
    /// let components = PathResolver::split_path("/docs/notes/todo.txt").unwrap();
    /// assert_eq!(components, vec!["docs", "notes", "todo.txt"]);
    ///
    /// assert!(PathResolver::split_path("/").unwrap().is_empty());
    /// ```
    pub fn split_path(path: &str) -> Result<Vec<&str>, PathError> {
        let path = path.trim_matches('/');
        if path.is_empty() {
            return Ok(Vec::new());
        }

        let components: Vec<&str> = path.split('/').collect();
        for component in &components {
            if component.is_empty() {
                return Err(PathError::InvalidPath(
                    "Path contains empty component".to_string(),
                ));
            }
            if *component == "." {
                return Err(PathError::InvalidPath(
                    "Relative component . is not supported".to_string(),
                ));
            }
        }

        Ok(components)
    }

    /// Splits a path into its parent components and final name
    pub fn split_parent(path: &str) -> Result<(Vec<&str>, &str), PathError> {
        let mut components = Self::split_path(path)?;
        let name = components
            .pop()
            .ok_or_else(|| PathError::InvalidPath("Path has no final component".to_string()))?;
        if !Self::is_valid_name(name) {
            return Err(PathError::InvalidName(name.to_string()));
        }
        Ok((components, name))
    }

    /// Validates a single entry name
    ///
    /// Returns true if the name may be used for a new directory entry.
    pub fn is_valid_name(name: &str) -> bool {
        !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains('/')
            && !name.contains('\0')
    }
}
