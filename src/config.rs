// Runtime configuration for a render root
//
// Configuration is layered:
// 1. Explicit values set on RuntimeConfig (highest priority)
// 2. A TOML document passed to RuntimeConfig::from_toml_str
// 3. Built-in defaults (lowest priority)

use serde::Deserialize;

use crate::engine::validate_key;
use crate::error::{AddressError, ConfigError};
use crate::types::Address;

/// Settings shared by the compiler, the filler and the render cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    /// Address of the root instance; every other address starts with it.
    /// Follows the key rule: ASCII letters, digits and `_` only
    pub root_address: String,

    /// Prefix for the internal tag names of component references
    /// (`<MyWidget />` compiles to `<hlx-my-widget></hlx-my-widget>`)
    pub tag_prefix: String,

    /// Host function called by handler attribute stubs
    pub dispatch_function: String,

    /// Maximum number of change events one flush may process
    pub flush_limit: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            root_address: "hlx".to_string(),
            tag_prefix: "hlx".to_string(),
            dispatch_function: "hlx.dispatch".to_string(),
            flush_limit: 10_000,
        }
    }
}

/// Config as loaded from a file: everything optional
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    root_address: Option<String>,
    tag_prefix: Option<String>,
    dispatch_function: Option<String>,
    flush_limit: Option<usize>,
}

impl RuntimeConfig {
    /// Parse a TOML document and merge it over the defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(source)?;
        let config = Self::default().merge(file);
        config.validate()?;
        Ok(config)
    }

    /// Check the root address against the key rule, so that no address
    /// separator or marker terminator can appear in it.
    pub fn validate(&self) -> Result<(), AddressError> {
        validate_key(&self.root_address)
    }

    fn merge(self, file: FileConfig) -> Self {
        Self {
            root_address: file.root_address.unwrap_or(self.root_address),
            tag_prefix: file.tag_prefix.unwrap_or(self.tag_prefix),
            dispatch_function: file.dispatch_function.unwrap_or(self.dispatch_function),
            flush_limit: file.flush_limit.unwrap_or(self.flush_limit),
        }
    }

    pub fn root(&self) -> Address {
        Address::new(self.root_address.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.root(), Address::new("hlx"));
        assert_eq!(config.dispatch_function, "hlx.dispatch");
        assert_eq!(config.flush_limit, 10_000);
    }

    #[test]
    fn test_toml_overrides_only_given_fields() {
        let config = RuntimeConfig::from_toml_str(
            r#"
            root_address = "app"
            flush_limit = 32
            "#,
        )
        .unwrap();
        assert_eq!(config.root_address, "app");
        assert_eq!(config.flush_limit, 32);
        assert_eq!(config.tag_prefix, "hlx");
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(matches!(
            RuntimeConfig::from_toml_str("colour = \"red\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_root_address_follows_key_rule() {
        for bad in ["app-1", "app.main", "a--b", ""] {
            let source = format!("root_address = \"{bad}\"");
            assert!(matches!(
                RuntimeConfig::from_toml_str(&source),
                Err(ConfigError::RootAddress(AddressError::InvalidKey { .. }))
            ));
        }
        assert!(RuntimeConfig::from_toml_str("root_address = \"app_1\"").is_ok());
    }
}
