//! Localization - String bundles for wizard steps
//!
//! Each step owns a named bundle. Bundles are TOML documents with one table
//! per locale; a lookup falls back to the default locale when the active
//! one lacks a key. Titles starting with `%` are lookup keys, anything else
//! is shown as-is.

use crate::error::WizardError;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Leading marker of a title that must be looked up
pub const LOOKUP_MARKER: char = '%';

/// Locale used when the active one has no entry
pub const DEFAULT_LOCALE: &str = "en";

const EMBEDDED_BUNDLES: &[(&str, &str)] = &[
    ("welcome", include_str!("../resources/i18n/welcome.toml")),
    ("import", include_str!("../resources/i18n/import.toml")),
    ("complete", include_str!("../resources/i18n/complete.toml")),
];

type Strings = HashMap<String, String>;

/// All bundles, for one active locale
#[derive(Debug, Clone)]
pub struct Localization {
    locale: String,
    bundles: HashMap<String, HashMap<String, Strings>>,
}

impl Localization {
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            bundles: HashMap::new(),
        }
    }

    /// Bundles shipped with the binary
    pub fn embedded(locale: impl Into<String>) -> Result<Self> {
        let mut localization = Self::new(locale);
        for (name, source) in EMBEDDED_BUNDLES {
            localization.add_bundle(name, source)?;
        }
        Ok(localization)
    }

    /// Parse a bundle (`[locale] key = "text"` tables) and register it
    pub fn add_bundle(&mut self, name: &str, toml_str: &str) -> Result<()> {
        let tables: HashMap<String, Strings> = toml::from_str(toml_str)
            .with_context(|| format!("Failed to parse string bundle '{}'", name))?;

        tracing::debug!("Loaded bundle '{}' with {} locales", name, tables.len());
        self.bundles.insert(name.to_string(), tables);
        Ok(())
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Strings of one bundle for the active locale
    pub fn bundle(&self, name: &str) -> Catalog {
        let mut strings = Strings::new();

        match self.bundles.get(name) {
            Some(tables) => {
                if let Some(defaults) = tables.get(DEFAULT_LOCALE) {
                    strings.extend(defaults.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
                if let Some(active) = tables.get(&self.locale) {
                    strings.extend(active.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
            }
            None => tracing::warn!("No string bundle named '{}'", name),
        }

        Catalog {
            bundle: name.to_string(),
            locale: self.locale.clone(),
            strings: Arc::new(strings),
        }
    }
}

/// Resolved strings of one bundle
#[derive(Debug, Clone)]
pub struct Catalog {
    bundle: String,
    locale: String,
    strings: Arc<Strings>,
}

impl Catalog {
    /// Catalog with no strings, for steps that need none
    pub fn empty(bundle: &str) -> Self {
        Self {
            bundle: bundle.to_string(),
            locale: DEFAULT_LOCALE.to_string(),
            strings: Arc::new(Strings::new()),
        }
    }

    /// Catalog built from literal pairs
    pub fn from_pairs(bundle: &str, pairs: &[(&str, &str)]) -> Self {
        Self {
            bundle: bundle.to_string(),
            locale: DEFAULT_LOCALE.to_string(),
            strings: Arc::new(
                pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
        }
    }

    pub fn bundle_name(&self) -> &str {
        &self.bundle
    }

    pub fn contains(&self, key: &str) -> bool {
        self.strings.contains_key(key)
    }

    /// Look up `key`; a missing key is a programming error in the bundle
    pub fn get_string(&self, key: &str) -> Result<String, WizardError> {
        self.strings
            .get(key)
            .cloned()
            .ok_or_else(|| WizardError::MissingResource {
                key: key.to_string(),
                bundle: self.bundle.clone(),
                locale: self.locale.clone(),
            })
    }

    /// Pass raw text through, resolve `%key` titles
    pub fn localize(&self, title: &str) -> Result<String, WizardError> {
        match title.strip_prefix(LOOKUP_MARKER) {
            Some(key) => self.get_string(key),
            None => Ok(title.to_string()),
        }
    }

    /// Look up `key` and substitute `{name}` placeholders
    pub fn format(&self, key: &str, args: &[(&str, String)]) -> Result<String, WizardError> {
        let mut text = self.get_string(key)?;
        for (name, value) in args {
            text = text.replace(&format!("{{{}}}", name), value);
        }
        Ok(text)
    }
}
