//! Plugin manifest declaration and validation.

use crate::error::KernelError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Declarative plugin manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Stable plugin identifier, e.g. `builtin.formatter`.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Semantic version string (`major.minor.patch`).
    pub version: String,
    #[serde(default)]
    pub description: String,
    /// Plugin ids that must be active before this one is enabled.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl PluginManifest {
    pub fn new(id: &str, name: &str, version: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            version: version.to_string(),
            description: String::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_dependency(mut self, plugin_id: &str) -> Self {
        self.dependencies.push(plugin_id.to_string());
        self
    }

    /// Validates declaration-level manifest invariants.
    pub fn validate(&self) -> Result<(), ManifestValidationError> {
        let id = self.id.trim();
        if id.is_empty() {
            return Err(ManifestValidationError::EmptyId);
        }
        if !is_valid_plugin_id(id) {
            return Err(ManifestValidationError::InvalidId(self.id.clone()));
        }
        if self.name.trim().is_empty() {
            return Err(ManifestValidationError::EmptyName);
        }

        let version = self.version.trim();
        if version.is_empty() {
            return Err(ManifestValidationError::EmptyVersion);
        }
        if !is_semver_triplet(version) {
            return Err(ManifestValidationError::InvalidVersion(self.version.clone()));
        }

        let mut seen = BTreeSet::new();
        for dependency in &self.dependencies {
            let dependency = dependency.trim();
            if !is_valid_plugin_id(dependency) {
                return Err(ManifestValidationError::InvalidDependency(
                    dependency.to_string(),
                ));
            }
            if dependency == id {
                return Err(ManifestValidationError::SelfDependency);
            }
            if !seen.insert(dependency) {
                return Err(ManifestValidationError::DuplicateDependency(
                    dependency.to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Lowercase ascii/digits separated by single `.`, `_` or `-`.
fn is_valid_plugin_id(value: &str) -> bool {
    let Some(first) = value.chars().next() else {
        return false;
    };
    if !first.is_ascii_lowercase() && !first.is_ascii_digit() {
        return false;
    }

    let mut after_separator = false;
    for c in value.chars().skip(1) {
        match c {
            'a'..='z' | '0'..='9' => after_separator = false,
            '.' | '_' | '-' if !after_separator => after_separator = true,
            _ => return false,
        }
    }
    !after_separator
}

fn is_semver_triplet(value: &str) -> bool {
    let parts: Vec<&str> = value.split('.').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestValidationError {
    EmptyId,
    InvalidId(String),
    EmptyName,
    EmptyVersion,
    InvalidVersion(String),
    InvalidDependency(String),
    SelfDependency,
    DuplicateDependency(String),
}

impl Display for ManifestValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "manifest id must not be empty"),
            Self::InvalidId(value) => write!(f, "manifest id is invalid: {value}"),
            Self::EmptyName => write!(f, "manifest name must not be empty"),
            Self::EmptyVersion => write!(f, "manifest version must not be empty"),
            Self::InvalidVersion(value) => write!(
                f,
                "manifest version is invalid: {value} (expected major.minor.patch)"
            ),
            Self::InvalidDependency(value) => {
                write!(f, "manifest dependency id is invalid: {value}")
            }
            Self::SelfDependency => write!(f, "manifest must not depend on itself"),
            Self::DuplicateDependency(value) => {
                write!(f, "manifest dependency is duplicated: {value}")
            }
        }
    }
}

impl Error for ManifestValidationError {}

impl From<ManifestValidationError> for KernelError {
    fn from(err: ManifestValidationError) -> Self {
        KernelError::validation(err.to_string())
    }
}
