#![forbid(unsafe_code)]

//! Binding configuration.
//!
//! [`BindingConfig`] controls how recorded dependency names are resolved and
//! what happens when a name cannot be resolved. It can be built in code,
//! read from the environment, or (with the `config-file` feature) loaded
//! from JSON.
//!
//! # Environment
//!
//! | Variable | Values | Effect |
//! |----------|--------|--------|
//! | `FXBIND_UNRESOLVED` | `fail`, `skip` | [`UnresolvedPolicy`] |
//! | `FXBIND_RECOMPUTE_ON_INVALIDATION` | `1`/`true`/`yes`/`on` | eager recompute |
//! | `FXBIND_STRATEGIES` | comma list of `native`, `bean`, `attribute` | resolution order |

use fxbind_core::ResolveStrategy;

/// What to do when no resolution strategy matches a recorded name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config-file", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "config-file", serde(rename_all = "lowercase"))]
pub enum UnresolvedPolicy {
    /// Fail the bind and roll back every listener attached so far.
    #[default]
    Fail,
    /// Log a warning and leave the branch unobserved.
    Skip,
}

impl UnresolvedPolicy {
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "fail" => Some(Self::Fail),
            "skip" => Some(Self::Skip),
            _ => None,
        }
    }
}

/// Configuration for closure-property binding.
#[derive(Debug, Clone)]
pub struct BindingConfig {
    /// Policy for names no strategy can resolve.
    pub unresolved: UnresolvedPolicy,
    /// Resolution chain, tried in order.
    pub strategies: Vec<ResolveStrategy>,
    /// Recompute the cached value as soon as a dependency is invalidated.
    /// Only invalidation listeners are notified either way.
    pub recompute_on_invalidation: bool,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            unresolved: UnresolvedPolicy::Fail,
            strategies: ResolveStrategy::DEFAULT_ORDER.to_vec(),
            recompute_on_invalidation: false,
        }
    }
}

#[inline]
fn env_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl BindingConfig {
    /// Skip unresolved names instead of failing.
    #[must_use]
    pub fn lenient() -> Self {
        Self::default().with_unresolved(UnresolvedPolicy::Skip)
    }

    #[must_use]
    pub fn with_unresolved(mut self, policy: UnresolvedPolicy) -> Self {
        self.unresolved = policy;
        self
    }

    #[must_use]
    pub fn with_strategies(mut self, strategies: impl Into<Vec<ResolveStrategy>>) -> Self {
        self.strategies = strategies.into();
        self
    }

    #[must_use]
    pub fn with_recompute_on_invalidation(mut self, enabled: bool) -> Self {
        self.recompute_on_invalidation = enabled;
        self
    }

    /// Read overrides from the process environment on top of the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Read overrides through a custom environment lookup.
    ///
    /// Unrecognized values are ignored (the default is kept).
    #[must_use]
    pub fn from_env_with<F>(get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(policy) = get_env("FXBIND_UNRESOLVED")
            .as_deref()
            .and_then(UnresolvedPolicy::from_label)
        {
            config.unresolved = policy;
        }
        if let Some(value) = get_env("FXBIND_RECOMPUTE_ON_INVALIDATION") {
            config.recompute_on_invalidation = env_flag(&value);
        }
        if let Some(list) = get_env("FXBIND_STRATEGIES") {
            let parsed: Option<Vec<_>> = list
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(ResolveStrategy::from_label)
                .collect();
            match parsed {
                Some(strategies) if !strategies.is_empty() => config.strategies = strategies,
                _ => tracing::warn!(value = %list, "ignoring invalid FXBIND_STRATEGIES"),
            }
        }
        config
    }
}

// ---------------------------------------------------------------------------
// JSON loading
// ---------------------------------------------------------------------------

/// On-disk shape of [`BindingConfig`]. Custom strategies cannot be expressed.
#[cfg(feature = "config-file")]
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct BindingConfigFile {
    pub unresolved: UnresolvedPolicy,
    pub strategies: Vec<String>,
    pub recompute_on_invalidation: bool,
}

#[cfg(feature = "config-file")]
impl Default for BindingConfigFile {
    fn default() -> Self {
        let config = BindingConfig::default();
        Self {
            unresolved: config.unresolved,
            strategies: config
                .strategies
                .iter()
                .map(|s| s.label().to_string())
                .collect(),
            recompute_on_invalidation: config.recompute_on_invalidation,
        }
    }
}

/// Errors from loading a configuration document.
#[cfg(feature = "config-file")]
#[derive(Debug)]
pub enum ConfigError {
    /// The document is not valid JSON for [`BindingConfigFile`].
    Parse(serde_json::Error),
    /// A strategy label is not one of `native`, `bean`, `attribute`.
    UnknownStrategy(String),
    /// `strategies` is present but lists nothing, so no member could resolve.
    EmptyStrategies,
}

#[cfg(feature = "config-file")]
impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid binding config: {err}"),
            Self::UnknownStrategy(label) => write!(f, "unknown resolution strategy '{label}'"),
            Self::EmptyStrategies => f.write_str("strategy list is empty"),
        }
    }
}

#[cfg(feature = "config-file")]
impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::UnknownStrategy(_) | Self::EmptyStrategies => None,
        }
    }
}

#[cfg(feature = "config-file")]
impl TryFrom<BindingConfigFile> for BindingConfig {
    type Error = ConfigError;

    fn try_from(file: BindingConfigFile) -> Result<Self, Self::Error> {
        if file.strategies.is_empty() {
            return Err(ConfigError::EmptyStrategies);
        }
        let strategies = file
            .strategies
            .iter()
            .map(|label| {
                ResolveStrategy::from_label(label)
                    .ok_or_else(|| ConfigError::UnknownStrategy(label.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            unresolved: file.unresolved,
            strategies,
            recompute_on_invalidation: file.recompute_on_invalidation,
        })
    }
}

#[cfg(feature = "config-file")]
impl BindingConfig {
    /// Parse a JSON configuration document. Missing fields keep defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let file: BindingConfigFile = serde_json::from_str(json).map_err(ConfigError::Parse)?;
        Self::try_from(file)
    }
}
