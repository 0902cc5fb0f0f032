use chrono::Duration;
use std::env;
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::sessions::{PriorityFirstPolicy, RotationPolicy, SelectionPolicy};

pub const DEFAULT_SESSION_SIZE: usize = 10;
pub const DEFAULT_COOLDOWN_MS: i64 = 1_000;

/// Which selection policy drives session building.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectionPolicyKind {
    /// Unmastered terms first, padded with mastered ones.
    #[default]
    PriorityFirst,
    /// Every term once per cycle.
    Rotation,
}

impl SelectionPolicyKind {
    #[must_use]
    pub fn build(self) -> Box<dyn SelectionPolicy> {
        match self {
            SelectionPolicyKind::PriorityFirst => Box::new(PriorityFirstPolicy),
            SelectionPolicyKind::Rotation => Box::new(RotationPolicy),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SelectionPolicyKind::PriorityFirst => "priority",
            SelectionPolicyKind::Rotation => "rotation",
        }
    }
}

impl fmt::Display for SelectionPolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SelectionPolicyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "priority" | "priority-first" => Ok(Self::PriorityFirst),
            "rotation" => Ok(Self::Rotation),
            _ => Err(ConfigError::UnknownPolicy(s.to_string())),
        }
    }
}

/// Tunables for the revision engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionConfig {
    session_size: usize,
    cooldown: Duration,
    policy: SelectionPolicyKind,
}

impl Default for RevisionConfig {
    fn default() -> Self {
        Self {
            session_size: DEFAULT_SESSION_SIZE,
            cooldown: Duration::milliseconds(DEFAULT_COOLDOWN_MS),
            policy: SelectionPolicyKind::default(),
        }
    }
}

impl RevisionConfig {
    /// Defaults overridden by `REVISE_SESSION_SIZE`, `REVISE_COOLDOWN_MS` and
    /// `REVISE_POLICY` when set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Ok(raw) = env::var("REVISE_SESSION_SIZE") {
            config.session_size = parse_session_size(&raw)?;
        }
        if let Ok(raw) = env::var("REVISE_COOLDOWN_MS") {
            config.cooldown = parse_cooldown_ms(&raw)?;
        }
        if let Ok(raw) = env::var("REVISE_POLICY") {
            config.policy = raw.parse()?;
        }
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns `ConfigError::InvalidSessionSize` for zero.
    pub fn with_session_size(mut self, size: usize) -> Result<Self, ConfigError> {
        if size == 0 {
            return Err(ConfigError::InvalidSessionSize(size.to_string()));
        }
        self.session_size = size;
        Ok(self)
    }

    #[must_use]
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown.max(Duration::zero());
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: SelectionPolicyKind) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn session_size(&self) -> usize {
        self.session_size
    }

    #[must_use]
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    #[must_use]
    pub fn policy(&self) -> SelectionPolicyKind {
        self.policy
    }
}

/// # Errors
///
/// Returns `ConfigError::InvalidSessionSize` unless `raw` is a positive integer.
pub fn parse_session_size(raw: &str) -> Result<usize, ConfigError> {
    match raw.trim().parse::<usize>() {
        Ok(size) if size > 0 => Ok(size),
        _ => Err(ConfigError::InvalidSessionSize(raw.to_string())),
    }
}

fn parse_cooldown_ms(raw: &str) -> Result<Duration, ConfigError> {
    raw.trim()
        .parse::<u32>()
        .map(|ms| Duration::milliseconds(i64::from(ms)))
        .map_err(|_| ConfigError::InvalidCooldown(raw.to_string()))
}
