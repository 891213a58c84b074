//! Configuration for mnemo.

use serde::{Deserialize, Serialize};

use crate::error::{DeckError, DeckResult};

/// Per-note generation flags.
///
/// Two booleans span the whole combinatorial space of card shapes:
/// single combined card, anchor pairs, rotated pair, and full ordered
/// pairs. Passed explicitly into the generator, never read from
/// ambient state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteConfig {
    /// Answer-role fields may also serve as prompts.
    pub reversible: bool,
    /// Each answer field is scheduled independently.
    pub separable: bool,
}

/// Partial update to a note's generation flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteConfigPatch {
    pub reversible: Option<bool>,
    pub separable: Option<bool>,
}

impl NoteConfigPatch {
    /// Whether the patch changes anything at all.
    pub fn is_empty(&self) -> bool {
        self.reversible.is_none() && self.separable.is_none()
    }

    /// Merge this patch over an existing config.
    pub fn apply(&self, base: NoteConfig) -> NoteConfig {
        NoteConfig {
            reversible: self.reversible.unwrap_or(base.reversible),
            separable: self.separable.unwrap_or(base.separable),
        }
    }
}

/// Scheduler parameter set.
///
/// A copy of the active parameters is frozen into every review row so
/// historical scheduling decisions remain reproducible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerParams {
    /// Algorithm weight vector.
    pub weights: Vec<f32>,
    /// Desired retention target, e.g. 0.9.
    pub retention: f32,
    /// Hard cap on scheduled intervals, in days.
    pub max_interval_days: u32,
    /// Whether intra-day learning steps are used before graduation.
    pub learning_enabled: bool,
    /// Whether review-phase due dates get a small random fuzz.
    pub due_fuzzed: bool,
}

impl Default for SchedulerParams {
    fn default() -> Self {
        Self {
            weights: fsrs::DEFAULT_PARAMETERS.to_vec(),
            retention: 0.9,
            max_interval_days: 36500,
            learning_enabled: true,
            due_fuzzed: true,
        }
    }
}

impl SchedulerParams {
    /// Load parameters from a file (TOML or JSON, by extension).
    pub fn from_file(path: impl AsRef<std::path::Path>) -> DeckResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&content)
                .map_err(|e| DeckError::Configuration(format!("invalid TOML: {}", e))),
            Some("json") => Ok(serde_json::from_str(&content)?),
            other => Err(DeckError::Configuration(format!(
                "unsupported config format: {:?}",
                other
            ))),
        }
    }
}
