//! Configuration management for the application template.
//!
//! Configuration lives in an INI file made of `[section]` headers and
//! `key = value` (or `key: value`) options. Option names are case-folded to
//! lowercase, section names are kept verbatim. Options placed in a
//! `[DEFAULT]` section are visible from every other section, and values may
//! reference other options of the same section with `%(name)s`.
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use ini::{Ini, ParseOption};
use regex::Regex;

use crate::error::ConfigError;

/// Name of the section whose options every other section inherits.
pub const DEFAULT_SECTION: &str = "DEFAULT";

/// Section holding the logging options.
pub const LOGGING_SECTION: &str = "logging";

/// Maximum nesting of `%(name)s` references.
const MAX_INTERPOLATION_DEPTH: usize = 10;

static REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^%\(([^)]+)\)s").expect("reference pattern is valid"));

type Options = HashMap<String, String>;

/// Flat section → option → value mapping loaded once at start-up.
#[derive(Debug, Clone, Default)]
pub struct Config {
    defaults: Options,
    sections: HashMap<String, Options>,
    order: Vec<String>,
    source: Option<PathBuf>,
}

impl Config {
    /// Reads and parses the configuration file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::parse(&content)?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parses configuration text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let options = ParseOption {
            enabled_quote: false,
            enabled_escape: false,
            ..ParseOption::default()
        };
        let ini = Ini::load_from_str_opt(content, options)?;

        let mut config = Self::default();
        for (section, properties) in ini.iter() {
            let Some(section) = section else {
                if let Some((key, _)) = properties.iter().next() {
                    return Err(ConfigError::MissingSectionHeader {
                        key: key.to_string(),
                    });
                }
                continue;
            };

            let target = if section == DEFAULT_SECTION {
                &mut config.defaults
            } else {
                if !config.sections.contains_key(section) {
                    config.order.push(section.to_string());
                }
                config.sections.entry(section.to_string()).or_default()
            };

            for (key, value) in properties.iter() {
                target.insert(key.to_lowercase(), value.to_string());
            }
        }

        Ok(config)
    }

    /// The file this configuration was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Section names in file order, excluding `[DEFAULT]`.
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Returns `true` if the section was declared in the file.
    pub fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }

    /// Option names visible from `section`, including inherited defaults.
    pub fn options(&self, section: &str) -> Vec<&str> {
        let mut keys: Vec<&str> = self.defaults.keys().map(String::as_str).collect();
        if let Some(options) = self.sections.get(section) {
            keys.extend(
                options
                    .keys()
                    .map(String::as_str)
                    .filter(|key| !self.defaults.contains_key(*key)),
            );
        }
        keys.sort_unstable();
        keys
    }

    /// Raw value of an option without interpolation.
    pub fn get_raw(&self, section: &str, key: &str) -> Option<&str> {
        let key = key.to_lowercase();
        if section != DEFAULT_SECTION && !self.sections.contains_key(section) {
            return None;
        }
        self.sections
            .get(section)
            .and_then(|options| options.get(&key))
            .or_else(|| self.defaults.get(&key))
            .map(String::as_str)
    }

    /// Interpolated value of an option, `None` if the section or option is absent.
    pub fn get(&self, section: &str, key: &str) -> Result<Option<String>, ConfigError> {
        match self.get_raw(section, key) {
            Some(raw) => self.interpolate(section, key, raw, 1).map(Some),
            None => Ok(None),
        }
    }

    /// Interpolated value of an option that must be present.
    pub fn require(&self, section: &str, key: &str) -> Result<String, ConfigError> {
        if section != DEFAULT_SECTION && !self.has_section(section) {
            return Err(ConfigError::NoSection(section.to_string()));
        }
        self.get(section, key)?.ok_or_else(|| ConfigError::NoOption {
            section: section.to_string(),
            key: key.to_string(),
        })
    }

    /// The configured `[logging] log_file`, if set and non-empty.
    pub fn log_file(&self) -> Result<Option<PathBuf>, ConfigError> {
        Ok(self
            .get(LOGGING_SECTION, "log_file")?
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from))
    }

    fn interpolate(
        &self,
        section: &str,
        key: &str,
        value: &str,
        depth: usize,
    ) -> Result<String, ConfigError> {
        if depth > MAX_INTERPOLATION_DEPTH {
            return Err(ConfigError::InterpolationDepth {
                section: section.to_string(),
                key: key.to_string(),
                depth: MAX_INTERPOLATION_DEPTH,
            });
        }

        let mut resolved = String::with_capacity(value.len());
        let mut rest = value;
        while let Some(index) = rest.find('%') {
            resolved.push_str(&rest[..index]);
            rest = &rest[index..];

            if let Some(tail) = rest.strip_prefix("%%") {
                resolved.push('%');
                rest = tail;
                continue;
            }

            let caps =
                REFERENCE
                    .captures(rest)
                    .ok_or_else(|| ConfigError::InterpolationSyntax {
                        section: section.to_string(),
                        key: key.to_string(),
                        value: value.to_string(),
                    })?;
            let reference = caps[1].to_lowercase();
            let consumed = caps[0].len();

            let raw = self.get_raw(section, &reference).ok_or_else(|| {
                ConfigError::InterpolationMissing {
                    section: section.to_string(),
                    key: key.to_string(),
                    reference: reference.clone(),
                }
            })?;
            resolved.push_str(&self.interpolate(section, key, raw, depth + 1)?);
            rest = &rest[consumed..];
        }
        resolved.push_str(rest);

        Ok(resolved)
    }
}
