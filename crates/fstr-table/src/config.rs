#![forbid(unsafe_code)]

//! Configuration for a [`TableCollection`](crate::TableCollection).
//!
//! ```toml
//! # fstr.toml
//! locale = "de-DE"
//! extension = "xml"
//! locale_separator = "_"
//! ```
//!
//! ```rust,ignore
//! let config = CollectionConfig::from_toml_file("fstr.toml")?;
//! let collection = TableCollection::with_config(&config);
//! ```
//!
//! Every field has a default, so a partial file only overrides what it names.

#[cfg(feature = "config")]
use std::path::Path;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resource::SuffixLocator;

/// Environment variable consulted first by [`CollectionConfig::from_env`].
pub const LOCALE_ENV: &str = "FSTR_LOCALE";

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct CollectionConfig {
    /// Initial target locale, e.g. `en-US`.
    pub locale: String,
    /// Document file extension without the dot.
    pub extension: String,
    /// Text between the table name and the locale in file names.
    pub locale_separator: String,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            locale: "en-US".into(),
            extension: "xml".into(),
            locale_separator: "_".into(),
        }
    }
}

impl CollectionConfig {
    /// Defaults, with the locale taken from `FSTR_LOCALE` or `LANG` when set.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) with an explicit variable source.
    #[must_use]
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let locale = var(LOCALE_ENV)
            .and_then(|raw| normalize_locale(&raw))
            .or_else(|| var("LANG").and_then(|raw| normalize_locale(&raw)));
        let mut config = Self::default();
        if let Some(locale) = locale {
            config.locale = locale;
        }
        config
    }

    /// Load from a TOML string.
    #[cfg(feature = "config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Check every field. An empty list means the config is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.locale.trim().is_empty() {
            errors.push("locale must not be empty".into());
        }
        if self.locale.contains(['/', '\\']) {
            errors.push(format!("locale must not contain path separators, got {:?}", self.locale));
        }
        if self.extension.is_empty() {
            errors.push("extension must not be empty".into());
        }
        if self.extension.starts_with('.') {
            errors.push(format!(
                "extension is given without the leading dot, got {:?}",
                self.extension
            ));
        }
        if self.locale_separator.contains(['/', '\\']) {
            errors.push(format!(
                "locale_separator must not contain path separators, got {:?}",
                self.locale_separator
            ));
        }

        errors
    }

    /// The locator these settings describe.
    #[must_use]
    pub fn locator(&self) -> SuffixLocator {
        SuffixLocator::new(self.locale_separator.clone(), self.extension.clone())
    }
}

/// Turn a POSIX locale such as `de_DE.UTF-8@euro` into `de-DE`.
///
/// Returns `None` for empty values and the `C`/`POSIX` locales.
#[must_use]
pub fn normalize_locale(raw: &str) -> Option<String> {
    let base = raw.split(['.', '@']).next().unwrap_or_default().trim();
    if base.is_empty() || base == "C" || base == "POSIX" {
        return None;
    }
    Some(base.replace('_', "-"))
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "config")]
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("validation errors: {}", .0.join("; "))]
    Validation(Vec<String>),
}
