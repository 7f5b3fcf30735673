/// Tunables for the scheduler, the awareness machine and idle prompts.
///
/// Every field has a default so a config file only needs to name what it
/// changes.
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// A duration derived from text length: `len * per_char_ms`, clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthScaled {
    pub per_char_ms: u64,
    pub min_ms: u64,
    pub max_ms: u64,
}

impl LengthScaled {
    pub const fn new(per_char_ms: u64, min_ms: u64, max_ms: u64) -> Self {
        Self {
            per_char_ms,
            min_ms,
            max_ms,
        }
    }

    pub fn for_len(&self, chars: usize) -> u64 {
        (chars as u64)
            .saturating_mul(self.per_char_ms)
            .clamp(self.min_ms, self.max_ms)
    }
}

/// Typing speeds in milliseconds per character, per narrator mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypingSpeeds {
    pub inner: u64,
    pub narrator: u64,
    pub cracking: u64,
    pub conversational: u64,
}

impl Default for TypingSpeeds {
    fn default() -> Self {
        Self {
            inner: 55,
            narrator: 40,
            cracking: 28,
            conversational: 35,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub speeds: TypingSpeeds,
    /// Time after completion before a line is dimmed.
    pub dim: LengthScaled,
    /// Time after completion before a line starts fading out.
    pub remove: LengthScaled,
    /// Pause between a completed line and the next queued one.
    pub gap: LengthScaled,
    /// Duration of the final fade before a line is dropped.
    pub fade_ms: u64,
    pub max_visible: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            speeds: TypingSpeeds::default(),
            dim: LengthScaled::new(60, 3_000, 8_000),
            remove: LengthScaled::new(90, 5_000, 14_000),
            gap: LengthScaled::new(20, 600, 2_000),
            fade_ms: 800,
            max_visible: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwarenessConfig {
    /// Points needed for levels 0 through 5.
    pub thresholds: [u32; 6],
    /// Highest level reachable through points in the baseline era.
    pub baseline_cap: u8,
    /// Highest level reachable through points in later eras.
    pub later_era_cap: u8,
    /// One point is granted per interval of active play.
    pub time_grant_interval_secs: u64,
    /// Delay between reaching full reveal and switching to conversation.
    pub conversational_delay_ms: u64,
}

impl Default for AwarenessConfig {
    fn default() -> Self {
        Self {
            thresholds: [0, 3, 6, 10, 14, 18],
            baseline_cap: 2,
            later_era_cap: 5,
            time_grant_interval_secs: 300,
            conversational_delay_ms: 4_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdleConfig {
    /// Silence window before an idle line; `None` disables idle prompts.
    pub timeout_ms: Option<u64>,
    /// Line ids to choose from when the player goes quiet.
    pub pool: Vec<String>,
}

/// Top-level configuration for a narrator session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NarratorConfig {
    pub scheduler: SchedulerConfig,
    pub awareness: AwarenessConfig,
    pub idle: IdleConfig,
}

impl NarratorConfig {
    /// Load a config from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<NarratorConfig, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a config from a RON string and validate it.
    pub fn parse_ron(input: &str) -> Result<NarratorConfig, ConfigError> {
        let config: NarratorConfig = ron::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.awareness.thresholds;
        if t.windows(2).any(|w| w[0] > w[1]) {
            return Err(ConfigError::Invalid(format!(
                "awareness thresholds must be non-decreasing: {:?}",
                t
            )));
        }
        if self.awareness.baseline_cap > 5 || self.awareness.later_era_cap > 5 {
            return Err(ConfigError::Invalid("awareness caps must be at most 5".to_string()));
        }
        if self.awareness.time_grant_interval_secs == 0 {
            return Err(ConfigError::Invalid("time grant interval must be positive".to_string()));
        }
        if self.scheduler.max_visible == 0 {
            return Err(ConfigError::Invalid("max_visible must be at least 1".to_string()));
        }
        let s = &self.scheduler.speeds;
        if [s.inner, s.narrator, s.cracking, s.conversational].contains(&0) {
            return Err(ConfigError::Invalid("typing speeds must be positive".to_string()));
        }
        for (name, band) in [
            ("dim", &self.scheduler.dim),
            ("remove", &self.scheduler.remove),
            ("gap", &self.scheduler.gap),
        ] {
            if band.min_ms > band.max_ms {
                return Err(ConfigError::Invalid(format!("{} band has min > max", name)));
            }
        }
        Ok(())
    }
}
