use std::fmt;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("question time must be between 1 and 600 seconds, got {0}")]
    InvalidQuestionTime(u32),

    #[error("tier thresholds must be strictly descending and at most 100")]
    InvalidTierThresholds,
}

//
// ─── RESULT TIERS ──────────────────────────────────────────────────────────────
//

/// Qualitative label for a final percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultTier {
    Excellent,
    Good,
    Fair,
    NeedsPractice,
}

impl ResultTier {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ResultTier::Excellent => "Excellent!",
            ResultTier::Good => "Very good!",
            ResultTier::Fair => "Nice try",
            ResultTier::NeedsPractice => "Keep practicing",
        }
    }
}

impl fmt::Display for ResultTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Minimum percentages for each tier. Anything below `fair` needs practice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierThresholds {
    excellent: u32,
    good: u32,
    fair: u32,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            excellent: 80,
            good: 60,
            fair: 40,
        }
    }
}

impl TierThresholds {
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidTierThresholds` unless
    /// `100 >= excellent > good > fair`.
    pub fn new(excellent: u32, good: u32, fair: u32) -> Result<Self, SettingsError> {
        if excellent > 100 || excellent <= good || good <= fair {
            return Err(SettingsError::InvalidTierThresholds);
        }
        Ok(Self {
            excellent,
            good,
            fair,
        })
    }

    #[must_use]
    pub fn excellent(&self) -> u32 {
        self.excellent
    }

    #[must_use]
    pub fn good(&self) -> u32 {
        self.good
    }

    #[must_use]
    pub fn fair(&self) -> u32 {
        self.fair
    }

    #[must_use]
    pub fn tier(&self, percentage: u32) -> ResultTier {
        if percentage >= self.excellent {
            ResultTier::Excellent
        } else if percentage >= self.good {
            ResultTier::Good
        } else if percentage >= self.fair {
            ResultTier::Fair
        } else {
            ResultTier::NeedsPractice
        }
    }
}

//
// ─── QUIZ SETTINGS ─────────────────────────────────────────────────────────────
//

/// Tunables for a playthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizSettings {
    question_time_secs: u32,
    tiers: TierThresholds,
}

impl Default for QuizSettings {
    /// 15 seconds per question, tiers at 80/60/40 %.
    fn default() -> Self {
        Self {
            question_time_secs: 15,
            tiers: TierThresholds::default(),
        }
    }
}

impl QuizSettings {
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidQuestionTime` if the budget is outside `1..=600`.
    pub fn new(question_time_secs: u32, tiers: TierThresholds) -> Result<Self, SettingsError> {
        if !(1..=600).contains(&question_time_secs) {
            return Err(SettingsError::InvalidQuestionTime(question_time_secs));
        }
        Ok(Self {
            question_time_secs,
            tiers,
        })
    }

    /// # Errors
    ///
    /// Returns `SettingsError::InvalidQuestionTime` if the budget is outside `1..=600`.
    pub fn with_question_time(self, question_time_secs: u32) -> Result<Self, SettingsError> {
        Self::new(question_time_secs, self.tiers)
    }

    #[must_use]
    pub fn question_time_secs(&self) -> u32 {
        self.question_time_secs
    }

    #[must_use]
    pub fn tiers(&self) -> TierThresholds {
        self.tiers
    }
}
