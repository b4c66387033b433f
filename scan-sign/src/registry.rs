//! Turning dispatch errors into something a human can read.
//!
//! Module errors arrive as a pair of indexes. A chain client's metadata
//! registry maps them to `section.name` plus documentation; anything else is
//! surfaced as the chain reported it.

use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fmt::{Display, Formatter},
    str::FromStr,
};

use crate::{
    lifecycle::{DispatchError, ModuleError},
    ScanSignError,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMetadata {
    pub section: String,
    pub name: String,
    #[serde(default)]
    pub documentation: Vec<String>,
}

impl ErrorMetadata {
    pub fn new(section: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            name: name.into(),
            documentation: Vec::new(),
        }
    }

    pub fn with_documentation<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.documentation = lines.into_iter().map(Into::into).collect();
        self
    }
}

/// Looks up metadata for module-indexed errors.
pub trait ErrorRegistry: Send + Sync {
    fn find_meta_error(&self, error: &ModuleError) -> Option<ErrorMetadata>;
}

/// An [`ErrorRegistry`] backed by a fixed table.
///
/// The table can be built in code or loaded from TOML:
/// ```toml
/// [[error]]
/// index = 4
/// error = 2
/// section = "balances"
/// name = "InsufficientBalance"
/// documentation = ["Balance too low to send value."]
/// ```
#[derive(Clone, Debug, Default)]
pub struct StaticErrorRegistry {
    errors: HashMap<ModuleError, ErrorMetadata>,
}

impl StaticErrorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error(mut self, error: ModuleError, metadata: ErrorMetadata) -> Self {
        self.insert(error, metadata);
        self
    }

    /// Add an entry, replacing any previous metadata for the same indexes.
    pub fn insert(&mut self, error: ModuleError, metadata: ErrorMetadata) {
        let _ = self.errors.insert(error, metadata);
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl ErrorRegistry for StaticErrorRegistry {
    fn find_meta_error(&self, error: &ModuleError) -> Option<ErrorMetadata> {
        self.errors.get(error).cloned()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RegistryFile {
    #[serde(default, rename = "error")]
    errors: Vec<RegistryEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RegistryEntry {
    index: u8,
    error: u8,
    section: String,
    name: String,
    #[serde(default)]
    documentation: Vec<String>,
}

impl FromStr for StaticErrorRegistry {
    type Err = ScanSignError;

    fn from_str(registry_string: &str) -> Result<Self, Self::Err> {
        let file: RegistryFile = toml::from_str(registry_string)?;
        let mut registry = Self::new();
        for entry in file.errors {
            registry.insert(
                ModuleError {
                    index: entry.index,
                    error: entry.error,
                },
                ErrorMetadata {
                    section: entry.section,
                    name: entry.name,
                    documentation: entry.documentation,
                },
            );
        }
        Ok(registry)
    }
}

/// A dispatch error ready to show to a user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DescribedDispatchError {
    Module(ErrorMetadata),
    /// Errors with no extra info (`BadOrigin`, `Other`, unknown module
    /// errors), as reported by the chain.
    Other(String),
}

impl Display for DescribedDispatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DescribedDispatchError::Module(meta) => write!(
                f,
                "{}.{}: {}",
                meta.section,
                meta.name,
                meta.documentation.join(" ")
            ),
            DescribedDispatchError::Other(human) => f.write_str(human),
        }
    }
}

pub fn describe_dispatch_error(
    registry: &dyn ErrorRegistry,
    error: &DispatchError,
) -> DescribedDispatchError {
    match error {
        DispatchError::Module(module_error) => match registry.find_meta_error(module_error) {
            Some(meta) => DescribedDispatchError::Module(meta),
            None => DescribedDispatchError::Other(error.to_human()),
        },
        DispatchError::BadOrigin | DispatchError::CannotLookup | DispatchError::Other(_) => {
            DescribedDispatchError::Other(error.to_human())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTRY: &str = r#"
        [[error]]
        index = 4
        error = 2
        section = "balances"
        name = "InsufficientBalance"
        documentation = ["Balance too low to send value."]

        [[error]]
        index = 4
        error = 3
        section = "balances"
        name = "ExistentialDeposit"
    "#;

    #[test]
    fn registry_from_str() {
        let registry = StaticErrorRegistry::from_str(REGISTRY).unwrap();
        assert_eq!(registry.len(), 2);

        let meta = registry
            .find_meta_error(&ModuleError { index: 4, error: 3 })
            .unwrap();
        assert_eq!(meta, ErrorMetadata::new("balances", "ExistentialDeposit"));
        assert!(registry
            .find_meta_error(&ModuleError { index: 5, error: 0 })
            .is_none());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let bad = r#"
            [[error]]
            index = 1
            error = 1
            section = "a"
            name = "b"
            severity = "high"
        "#;
        assert!(StaticErrorRegistry::from_str(bad).is_err());
    }

    #[test]
    fn describes_module_and_other_errors() {
        let registry = StaticErrorRegistry::from_str(REGISTRY).unwrap();

        let known = DispatchError::Module(ModuleError { index: 4, error: 2 });
        assert_eq!(
            describe_dispatch_error(&registry, &known).to_string(),
            "balances.InsufficientBalance: Balance too low to send value."
        );

        let unknown = DispatchError::Module(ModuleError { index: 9, error: 9 });
        assert_eq!(
            describe_dispatch_error(&registry, &unknown).to_string(),
            r#"{"Module":{"index":9,"error":9}}"#
        );

        assert_eq!(
            describe_dispatch_error(&registry, &DispatchError::CannotLookup).to_string(),
            r#""CannotLookup""#
        );
    }
}
