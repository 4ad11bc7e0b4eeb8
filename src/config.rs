//! Site configuration module.
//!
//! Handles discovering, loading, and merging configuration files. Configuration
//! is layered: stock defaults are overridden by the site's config file(s), which
//! are in turn overridden by programmatic options (CLI flags).
//!
//! ```text
//! stock defaults  ←  quire.config.yml  ←  extra --config files  ←  overrides
//! ```
//!
//! ## Config File Location
//!
//! Unless explicit files are given with the `config` option, the first of
//! these that exists in the root directory is used:
//!
//! ```text
//! quire.config.yml
//! quire.config.yaml
//! quire.config.toml
//! _config.yml
//! ```
//!
//! A missing default file is fine (stock defaults apply); a missing explicit
//! file is an error.
//!
//! ## Environments
//!
//! A top-level key named after the current environment (`QUIRE_ENV`, default
//! `development`) holds options that apply only in that environment:
//!
//! ```yaml
//! unpublished: false
//! development:
//!   unpublished: true
//! ```
//!
//! ## Collections
//!
//! `collections` may be a list of labels or a mapping of label → options. The
//! `posts` collection always exists and always outputs; its permalink defaults
//! from the top-level `permalink` style.
//!
//! Unlike typed configuration, keys are open-ended: sites and plugins may add
//! any key they like. Typed accessors cover the keys this crate reads.

use crate::front_matter::{kind_name, stringify_mapping};
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("The configuration file '{0}' could not be found.")]
    NotFound(PathBuf),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Config file names probed in the root directory, in priority order.
pub const DEFAULT_CONFIG_FILES: &[&str] = &[
    "quire.config.yml",
    "quire.config.yaml",
    "quire.config.toml",
    "_config.yml",
];

/// Entries always excluded from reading, whatever the site config says.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    ".quire-cache",
    "node_modules",
    "package.json",
    "package-lock.json",
    "yarn.lock",
];

/// Environment variable selecting the environment-specific options.
pub const ENV_VAR: &str = "QUIRE_ENV";

/// Site configuration: a string-keyed mapping with typed accessors.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    data: Mapping,
}

impl Default for Configuration {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Configuration {
    /// Wrap a mapping as-is (keys are stringified), without applying defaults.
    pub fn new(data: Mapping) -> Self {
        Self {
            data: stringify_mapping(data),
        }
    }

    /// The stock defaults, before any collections or excludes are added.
    pub fn defaults() -> Self {
        match serde_yaml::from_str::<Value>(stock_config_yaml()) {
            Ok(Value::Mapping(data)) => Self::new(data),
            _ => panic!("stock config must be a YAML mapping"),
        }
    }

    /// Stock defaults with `overrides` merged on top, then normalized.
    pub fn from_overrides(overrides: Mapping) -> Self {
        Self::defaults()
            .merge(overrides)
            .add_default_collections()
            .add_default_excludes()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.data.insert(Value::String(key.to_string()), value.into());
    }

    pub fn as_mapping(&self) -> &Mapping {
        &self.data
    }

    pub fn into_mapping(self) -> Mapping {
        self.data
    }

    fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    fn get_bool(&self, key: &str) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// The directory config files are discovered in.
    pub fn root_dir(&self) -> PathBuf {
        PathBuf::from(self.get_str("root_dir").unwrap_or("."))
    }

    /// The content source directory, resolved against the root directory.
    pub fn source(&self) -> PathBuf {
        self.root_dir().join(self.get_str("source").unwrap_or("src"))
    }

    /// Directory (relative to source) holding the `_label` collection folders.
    pub fn collections_dir(&self) -> &str {
        self.get_str("collections_dir").unwrap_or("")
    }

    /// Labels of all configured collections, in configuration order.
    pub fn collection_labels(&self) -> Vec<String> {
        match self.get("collections") {
            Some(Value::Mapping(collections)) => collections
                .keys()
                .filter_map(|k| k.as_str().map(String::from))
                .collect(),
            Some(Value::Sequence(labels)) => labels
                .iter()
                .filter_map(|l| l.as_str().map(String::from))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Options of one collection, if configured.
    pub fn collection_options(&self, label: &str) -> Option<&Mapping> {
        self.get("collections")?
            .as_mapping()?
            .get(label)?
            .as_mapping()
    }

    pub fn exclude(&self) -> Vec<String> {
        string_list(self.get("exclude"))
    }

    pub fn include(&self) -> Vec<String> {
        string_list(self.get("include"))
    }

    /// Whether documents dated in the future are read.
    pub fn future(&self) -> bool {
        self.get_bool("future")
    }

    /// Whether documents marked `published: false` are read.
    pub fn unpublished(&self) -> bool {
        self.get_bool("unpublished")
    }

    /// Recursively merge `overlay` on top of this configuration.
    pub fn merge(self, overlay: Mapping) -> Self {
        let merged = merge_values(
            Value::Mapping(self.data),
            Value::Mapping(stringify_mapping(overlay)),
        );
        match merged {
            Value::Mapping(data) => Self { data },
            _ => unreachable!("merging two mappings yields a mapping"),
        }
    }

    /// Config files to read, given the caller's overrides.
    ///
    /// An explicit `config` override (a path or a list of paths) is returned
    /// as given. Otherwise the first existing default file in the root
    /// directory is used, falling back to `quire.config.yml` so that its
    /// absence can be reported.
    pub fn config_files(&self, overrides: &Mapping) -> Vec<PathBuf> {
        let explicit: Vec<PathBuf> = string_list(overrides.get("config"))
            .into_iter()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .collect();
        if !explicit.is_empty() {
            return explicit;
        }

        let root = self.root_dir();
        let found = DEFAULT_CONFIG_FILES
            .iter()
            .map(|name| root.join(name))
            .find(|path| path.exists());
        vec![found.unwrap_or_else(|| root.join(DEFAULT_CONFIG_FILES[0]))]
    }

    fn is_default_candidate(&self, path: &Path) -> bool {
        let root = self.root_dir();
        DEFAULT_CONFIG_FILES
            .iter()
            .any(|name| root.join(name) == path)
    }

    /// Read one config file into a string-keyed mapping.
    ///
    /// TOML is chosen by the `.toml` extension, YAML otherwise. An empty file
    /// yields an empty mapping.
    pub fn read_config_file(&self, path: &Path) -> Result<Mapping, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        info!("Configuration file: {}", path.display());

        let value = if is_toml(path) {
            let parsed: toml::Value = toml::from_str(&content)?;
            serde_yaml::to_value(parsed)?
        } else if content.trim().is_empty() {
            warn!("Configuration file {} is empty", path.display());
            Value::Null
        } else {
            serde_yaml::from_str(&content)?
        };

        match value {
            Value::Mapping(mapping) => Ok(stringify_mapping(mapping)),
            Value::Null => Ok(Mapping::new()),
            other => Err(ConfigError::InvalidConfiguration(format!(
                "{} must contain a mapping, found {}",
                path.display(),
                kind_name(&other)
            ))),
        }
    }

    /// Merge each file on top of this configuration; the last file wins.
    ///
    /// A missing default file and unreadable files are reported and skipped.
    /// A missing explicitly requested file is an error.
    pub fn read_config_files(self, files: &[PathBuf]) -> Result<Self, ConfigError> {
        let mut config = self;
        for file in files {
            match config.read_config_file(file) {
                Ok(mapping) => config = config.merge(mapping),
                Err(ConfigError::NotFound(path)) if config.is_default_candidate(&path) => {
                    warn!("Configuration file: none");
                }
                Err(err @ ConfigError::NotFound(_)) => return Err(err),
                Err(err) => {
                    warn!("Error reading configuration. Using defaults (and options).");
                    warn!("Configuration file: (INVALID) {}: {}", file.display(), err);
                }
            }
        }
        Ok(config)
    }

    /// Lift the options stored under `environment` to the top level.
    ///
    /// Each key under the environment replaces the top-level key of the same
    /// name; the environment key itself is then removed.
    pub fn merge_environment_specific_options(&mut self, environment: &str) {
        let Some(specific) = self.data.get(environment).cloned() else {
            return;
        };
        if let Value::Mapping(options) = specific {
            for (key, value) in options {
                self.data.insert(key, value);
            }
        }
        self.data = std::mem::take(&mut self.data)
            .into_iter()
            .filter(|(key, _)| key.as_str() != Some(environment))
            .collect();
    }

    /// Normalize `collections` and guarantee the `posts` collection.
    ///
    /// - `null` collections are left alone
    /// - a list of labels becomes a mapping of empty option sets
    /// - `posts.output` is forced to `true`
    /// - `posts.permalink` defaults from the top-level `permalink` style
    pub fn add_default_collections(mut self) -> Self {
        let collections = match self.data.get("collections") {
            None | Some(Value::Null) => return self,
            Some(Value::Sequence(labels)) => labels
                .iter()
                .map(|label| (label.clone(), Value::Mapping(Mapping::new())))
                .collect::<Mapping>(),
            Some(Value::Mapping(collections)) => collections.clone(),
            Some(_) => return self,
        };

        let mut base = Mapping::new();
        base.insert("posts".into(), Value::Mapping(Mapping::new()));
        let merged = merge_values(Value::Mapping(base), Value::Mapping(collections));
        let Value::Mapping(mut collections) = merged else {
            return self;
        };

        let permalink = self
            .data
            .get("permalink")
            .and_then(Value::as_str)
            .map(style_to_permalink);

        if let Some(Value::Mapping(posts)) = collections.get_mut("posts") {
            posts.insert("output".into(), Value::Bool(true));
            if let Some(permalink) = permalink {
                if !posts.contains_key("permalink") {
                    posts.insert("permalink".into(), Value::String(permalink));
                }
            }
        } else {
            let mut posts = Mapping::new();
            posts.insert("output".into(), Value::Bool(true));
            if let Some(permalink) = permalink {
                posts.insert("permalink".into(), Value::String(permalink));
            }
            collections.insert("posts".into(), Value::Mapping(posts));
        }

        self.data
            .insert("collections".into(), Value::Mapping(collections));
        self
    }

    /// Append [`DEFAULT_EXCLUDES`] to the `exclude` list.
    pub fn add_default_excludes(mut self) -> Self {
        let mut exclude = match self.data.get("exclude") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Sequence(items)) => items.clone(),
            // A string is reported by `check_include_exclude`.
            Some(_) => return self,
        };
        for default in DEFAULT_EXCLUDES {
            let default = Value::String(default.to_string());
            if !exclude.contains(&default) {
                exclude.push(default);
            }
        }
        self.data
            .insert("exclude".into(), Value::Sequence(exclude));
        self
    }

    /// Reject `exclude`/`include` given as a single string.
    pub fn check_include_exclude(&self) -> Result<(), ConfigError> {
        for key in ["exclude", "include"] {
            if let Some(Value::String(_)) = self.data.get(key) {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "'{key}' should be set as an array, but was a string"
                )));
            }
        }
        Ok(())
    }

    /// Serialize the configuration as YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(&self.data)?)
    }
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Mappings are merged key-by-key (overlay keys override base keys).
/// - Non-mapping values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved, in their position.
pub fn merge_values(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Mapping(mut base_map), Value::Mapping(overlay_map)) => {
            for (key, overlay_val) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(slot) => {
                        let base_val = std::mem::take(slot);
                        *slot = merge_values(base_val, overlay_val);
                    }
                    None => {
                        base_map.insert(key, overlay_val);
                    }
                }
            }
            Value::Mapping(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Expand a named permalink style into its template.
pub fn style_to_permalink(style: &str) -> String {
    match style {
        "date" => "/:categories/:year/:month/:day/:title:output_ext",
        "pretty" => "/:categories/:year/:month/:day/:title/",
        "ordinal" => "/:categories/:year/:y_day/:title:output_ext",
        "weekdate" => "/:categories/:year/W:week/:short_day/:title:output_ext",
        "none" => "/:categories/:title:output_ext",
        custom => custom,
    }
    .to_string()
}

/// The current environment name.
pub fn environment() -> String {
    std::env::var(ENV_VAR).unwrap_or_else(|_| "development".to_string())
}

/// Build the effective site configuration.
///
/// Stock defaults ← config files ← `overrides`, then environment-specific
/// options, default collections and excludes, and validation.
pub fn load_configuration(overrides: Mapping) -> Result<Configuration, ConfigError> {
    let overrides = stringify_mapping(overrides);
    let config = Configuration::from_overrides(overrides.clone());
    let files = config.config_files(&overrides);
    debug!(?files, "reading configuration files");

    let mut config = config.read_config_files(&files)?.merge(overrides);
    config.merge_environment_specific_options(&environment());
    let config = config.add_default_collections().add_default_excludes();
    config.check_include_exclude()?;
    Ok(config)
}

/// Configuration for a site rooted at `root_dir`, with optional explicit files.
pub fn load_config(root_dir: &Path, files: &[PathBuf]) -> Result<Configuration, ConfigError> {
    let mut overrides = Mapping::new();
    overrides.insert(
        "root_dir".into(),
        Value::String(root_dir.to_string_lossy().to_string()),
    );
    if !files.is_empty() {
        let files = files
            .iter()
            .map(|f| Value::String(root_dir.join(f).to_string_lossy().to_string()))
            .collect();
        overrides.insert("config".into(), Value::Sequence(files));
    }
    load_configuration(overrides)
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case("toml"))
        .unwrap_or(false)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Sequence(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect(),
        _ => Vec::new(),
    }
}

/// The stock configuration, documented. Also printed by `quire config --stock`.
pub fn stock_config_yaml() -> &'static str {
    r##"# Quire Configuration
# ===================
# All settings are optional. Values shown below are the defaults.
#
# Options for a single environment go under a key named after it
# (QUIRE_ENV, default "development"):
#
#   development:
#     unpublished: true

# ---------------------------------------------------------------------------
# Where things are
# ---------------------------------------------------------------------------
root_dir: "."
source: src
destination: output
collections_dir: ""
cache_dir: .quire-cache
plugins_dir: plugins
layouts_dir: _layouts
data_dir: _data
components_dir: _components

# ---------------------------------------------------------------------------
# Reading
# ---------------------------------------------------------------------------
# Entries to always read even though they start with "." or "_".
include:
  - .htaccess
  - _redirects
  - .well-known
# Entries to skip. Node and cache directories are always added.
exclude: []
keep_files:
  - .git
  - .svn
encoding: utf-8
markdown_ext: markdown,mkdown,mkdn,mkd,md

# ---------------------------------------------------------------------------
# Content
# ---------------------------------------------------------------------------
# Collection labels, or a mapping of label to options. "posts" always exists.
collections: {}
future: false
unpublished: false
limit_posts: 0

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
# date | pretty | ordinal | weekdate | none | a custom template
permalink: date
timezone: null
"##
}
