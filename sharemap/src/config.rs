//! Engine configuration.
//!
//! Every component config has defaults; a file only needs the keys it
//! changes.
//!
//! ```ini
//! [clustering]
//! radius_px = 60
//! min_points = 2
//! max_zoom = 16
//!
//! [viewport]
//! buffer_ratio = 0.15
//! max_markers = 100
//! cache_epsilon = 0.001
//!
//! [admission]
//! load_threshold = 0.5
//! unload_threshold = 2.0
//! max_loaded = 200
//! batch_size = 20
//! tick_interval_ms = 16
//!
//! [strategy]
//! viewport_only_max = 50
//! clustered_max = 100
//! lazy_max = 200
//! ; forced = hybrid
//!
//! [expansion]
//! radius_deg = 0.0005
//! animation_ms = 300
//!
//! [session]
//! debounce_ms = 300
//!
//! [screen]
//! width = 400
//! height = 800
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::{Ini, Properties};
use thiserror::Error;

use crate::admission::AdmissionConfig;
use crate::cluster::ClusterOptions;
use crate::expansion::ExpansionConfig;
use crate::geo::ScreenSize;
use crate::selector::SelectorConfig;
use crate::session::SessionTiming;
use crate::strategy::{RenderStrategy, StrategyThresholds};

/// Errors loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] ini::ParseError),

    #[error("invalid value '{value}' for [{section}] {key}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
    },

    #[error("invalid configuration: {0}")]
    Invariant(String),
}

/// Configuration for every engine component.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineConfig {
    pub clustering: ClusterOptions,
    pub selector: SelectorConfig,
    pub admission: AdmissionConfig,
    pub strategy: StrategyThresholds,
    /// Strategy used regardless of listing count.
    pub forced_strategy: Option<RenderStrategy>,
    pub expansion: ExpansionConfig,
    pub session: SessionTiming,
    pub screen: ScreenSize,
}

impl EngineConfig {
    /// Loads and validates a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_ini_str(&contents)?;
        tracing::info!(path = %path.display(), "Loaded engine configuration");
        Ok(config)
    }

    /// Parses and validates INI text.
    pub fn from_ini_str(contents: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(contents)?;
        let mut config = Self::default();

        for (section, props) in ini.iter() {
            match section {
                Some("clustering") => config.apply_clustering(props)?,
                Some("viewport") => config.apply_viewport(props)?,
                Some("admission") => config.apply_admission(props)?,
                Some("strategy") => config.apply_strategy(props)?,
                Some("expansion") => config.apply_expansion(props)?,
                Some("session") => config.apply_session(props)?,
                Some("screen") => config.apply_screen(props)?,
                Some(other) => {
                    tracing::warn!(section = other, "Ignoring unknown config section");
                }
                None => {
                    for (key, _) in props.iter() {
                        tracing::warn!(key, "Ignoring config key outside any section");
                    }
                }
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invariant = |msg: &str| Err(ConfigError::Invariant(msg.to_string()));

        if !(self.clustering.radius_px > 0.0 && self.clustering.radius_px.is_finite()) {
            return invariant("clustering.radius_px must be positive");
        }
        if self.clustering.min_points < 2 {
            return invariant("clustering.min_points must be at least 2");
        }
        if !(self.selector.buffer_ratio >= 0.0 && self.selector.buffer_ratio.is_finite()) {
            return invariant("viewport.buffer_ratio must be non-negative");
        }
        if !(self.selector.cache_epsilon >= 0.0) {
            return invariant("viewport.cache_epsilon must be non-negative");
        }
        if !self.admission.has_valid_band() {
            return invariant("admission.load_threshold must be below admission.unload_threshold");
        }
        if self.admission.max_loaded == 0 {
            return invariant("admission.max_loaded must be positive");
        }
        if self.admission.batch_size == 0 {
            return invariant("admission.batch_size must be positive");
        }
        if !self.strategy.is_ordered() {
            return invariant("strategy thresholds must be strictly increasing");
        }
        if !(self.expansion.radius_deg > 0.0 && self.expansion.radius_deg.is_finite()) {
            return invariant("expansion.radius_deg must be positive");
        }
        if !(self.screen.width > 0.0 && self.screen.height > 0.0) {
            return invariant("screen width and height must be positive");
        }
        Ok(())
    }

    fn apply_clustering(&mut self, props: &Properties) -> Result<(), ConfigError> {
        for (key, value) in props.iter() {
            match key {
                "radius_px" => self.clustering.radius_px = parse("clustering", key, value)?,
                "min_points" => self.clustering.min_points = parse("clustering", key, value)?,
                "max_zoom" => self.clustering.max_zoom = parse("clustering", key, value)?,
                _ => unknown_key("clustering", key),
            }
        }
        Ok(())
    }

    fn apply_viewport(&mut self, props: &Properties) -> Result<(), ConfigError> {
        for (key, value) in props.iter() {
            match key {
                "buffer_ratio" => self.selector.buffer_ratio = parse("viewport", key, value)?,
                "max_markers" => self.selector.max_markers = parse("viewport", key, value)?,
                "cache_epsilon" => self.selector.cache_epsilon = parse("viewport", key, value)?,
                _ => unknown_key("viewport", key),
            }
        }
        Ok(())
    }

    fn apply_admission(&mut self, props: &Properties) -> Result<(), ConfigError> {
        for (key, value) in props.iter() {
            match key {
                "load_threshold" => {
                    self.admission.load_threshold = parse("admission", key, value)?
                }
                "unload_threshold" => {
                    self.admission.unload_threshold = parse("admission", key, value)?
                }
                "max_loaded" => self.admission.max_loaded = parse("admission", key, value)?,
                "batch_size" => self.admission.batch_size = parse("admission", key, value)?,
                "tick_interval_ms" => {
                    self.admission.tick_interval = parse_millis("admission", key, value)?
                }
                _ => unknown_key("admission", key),
            }
        }
        Ok(())
    }

    fn apply_strategy(&mut self, props: &Properties) -> Result<(), ConfigError> {
        for (key, value) in props.iter() {
            match key {
                "viewport_only_max" => {
                    self.strategy.viewport_only_max = parse("strategy", key, value)?
                }
                "clustered_max" => self.strategy.clustered_max = parse("strategy", key, value)?,
                "lazy_max" => self.strategy.lazy_max = parse("strategy", key, value)?,
                "forced" => {
                    self.forced_strategy = match value.trim() {
                        "" | "none" | "auto" => None,
                        name => Some(
                            RenderStrategy::parse(name)
                                .ok_or_else(|| invalid("strategy", key, value))?,
                        ),
                    }
                }
                _ => unknown_key("strategy", key),
            }
        }
        Ok(())
    }

    fn apply_expansion(&mut self, props: &Properties) -> Result<(), ConfigError> {
        for (key, value) in props.iter() {
            match key {
                "radius_deg" => self.expansion.radius_deg = parse("expansion", key, value)?,
                "animation_ms" => {
                    self.expansion.animation_duration = parse_millis("expansion", key, value)?
                }
                _ => unknown_key("expansion", key),
            }
        }
        Ok(())
    }

    fn apply_session(&mut self, props: &Properties) -> Result<(), ConfigError> {
        for (key, value) in props.iter() {
            match key {
                "debounce_ms" => self.session.debounce = parse_millis("session", key, value)?,
                _ => unknown_key("session", key),
            }
        }
        Ok(())
    }

    fn apply_screen(&mut self, props: &Properties) -> Result<(), ConfigError> {
        for (key, value) in props.iter() {
            match key {
                "width" => self.screen.width = parse("screen", key, value)?,
                "height" => self.screen.height = parse("screen", key, value)?,
                _ => unknown_key("screen", key),
            }
        }
        Ok(())
    }
}

fn invalid(section: &str, key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse<T: FromStr>(section: &str, key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value))
}

fn parse_millis(section: &str, key: &str, value: &str) -> Result<Duration, ConfigError> {
    parse::<u64>(section, key, value).map(Duration::from_millis)
}

fn unknown_key(section: &str, key: &str) {
    tracing::warn!(section, key, "Ignoring unknown config key");
}
