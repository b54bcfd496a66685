//! Build targets and Bazel labels

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors parsing a build label.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LabelError {
    #[error("label must start with `//`: {0}")]
    NotAbsolute(String),

    #[error("labels in external repositories are not supported: {0}")]
    ExternalRepository(String),

    #[error("label has an empty target name: {0}")]
    EmptyName(String),

    #[error("label has an invalid package path: {0}")]
    InvalidPackage(String),
}

/// A parsed `//package/path:name` label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// Package path relative to the workspace root (may be empty)
    pub package: String,
    /// Target name within the package
    pub name: String,
}

impl Label {
    /// Parse a label.
    ///
    /// `//A/B` is shorthand for `//A/B:B`, and `@//` names the main
    /// repository.
    pub fn parse(label: &str) -> Result<Self, LabelError> {
        let trimmed = label.trim();
        let body = if let Some(rest) = trimmed.strip_prefix("@//") {
            rest
        } else if trimmed.starts_with('@') {
            return Err(LabelError::ExternalRepository(label.to_string()));
        } else if let Some(rest) = trimmed.strip_prefix("//") {
            rest
        } else {
            return Err(LabelError::NotAbsolute(label.to_string()));
        };

        let (package, name) = match body.split_once(':') {
            Some((package, name)) => (package, name.to_string()),
            None => {
                let implicit = body.rsplit('/').next().unwrap_or(body);
                (body, implicit.to_string())
            }
        };

        if name.is_empty() || name.contains(':') {
            return Err(LabelError::EmptyName(label.to_string()));
        }
        if package.starts_with('/')
            || package.ends_with('/')
            || package.split('/').any(|seg| seg == ".." || seg == ".")
        {
            return Err(LabelError::InvalidPackage(label.to_string()));
        }

        Ok(Self {
            package: package.to_string(),
            name,
        })
    }

    /// Filesystem path of the target relative to an output root:
    /// `//A/B:C` → `A/B/C`.
    pub fn relative_path(&self) -> PathBuf {
        let mut path = PathBuf::new();
        for segment in self.package.split('/').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path.push(&self.name);
        path
    }

    /// Canonical `//package:name` form.
    pub fn canonical(&self) -> String {
        format!("//{}:{}", self.package, self.name)
    }
}

/// What a target produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// A runnable application
    Application,
    Library,
    Test,
}

/// A buildable unit selected by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildTarget {
    /// Build label as given (`//Apps/Demo:Demo`)
    pub label: String,
    /// Absolute package directory
    pub package_path: PathBuf,
    /// Human-readable name
    pub name: String,
    pub kind: ArtifactKind,
}

impl BuildTarget {
    /// Runnable application target named after the label's target name.
    pub fn application(label: &str, package_path: impl AsRef<Path>) -> Result<Self, LabelError> {
        let parsed = Label::parse(label)?;
        Ok(Self {
            label: label.to_string(),
            package_path: package_path.as_ref().to_path_buf(),
            name: parsed.name,
            kind: ArtifactKind::Application,
        })
    }

    /// Parsed form of `label`.
    pub fn parsed_label(&self) -> Result<Label, LabelError> {
        Label::parse(&self.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_explicit_name() {
        let label = Label::parse("//Apps/Demo:Demo").unwrap();
        assert_eq!(label.package, "Apps/Demo");
        assert_eq!(label.name, "Demo");
        assert_eq!(label.relative_path(), PathBuf::from("Apps/Demo/Demo"));
    }

    #[test]
    fn test_parse_implicit_name() {
        let label = Label::parse("//Apps/Demo").unwrap();
        assert_eq!(label.name, "Demo");
        assert_eq!(label.canonical(), "//Apps/Demo:Demo");
    }

    #[test]
    fn test_parse_root_package() {
        let label = Label::parse("//:App").unwrap();
        assert_eq!(label.package, "");
        assert_eq!(label.relative_path(), PathBuf::from("App"));
    }

    #[test]
    fn test_parse_main_repository_prefix() {
        let label = Label::parse("@//Apps/Demo:Demo").unwrap();
        assert_eq!(label.relative_path(), PathBuf::from("Apps/Demo/Demo"));
    }

    #[test]
    fn test_parse_rejections() {
        assert!(matches!(Label::parse("Apps/Demo:Demo"), Err(LabelError::NotAbsolute(_))));
        assert!(matches!(
            Label::parse("@rules_apple//x:y"),
            Err(LabelError::ExternalRepository(_))
        ));
        assert!(matches!(Label::parse("//Apps/Demo:"), Err(LabelError::EmptyName(_))));
        assert!(matches!(
            Label::parse("//Apps/../Demo:Demo"),
            Err(LabelError::InvalidPackage(_))
        ));
    }

    #[test]
    fn test_application_target() {
        let target = BuildTarget::application("//Apps/Demo:Demo", "/ws/Apps/Demo").unwrap();
        assert_eq!(target.name, "Demo");
        assert_eq!(target.kind, ArtifactKind::Application);
        assert_eq!(target.package_path, PathBuf::from("/ws/Apps/Demo"));
    }
}
