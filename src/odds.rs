// src/odds.rs
// Composite "odds enhancer" score: one number and a letter grade per zone.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::context::{CompressionQuality, CompressionResult, InducementResult};
use crate::zones::{MplResult, ValidationResult};

pub const MAX_ODDS_SCORE: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    F,
    D,
    C,
    B,
    A,
    #[serde(rename = "A+")]
    APlus,
}

impl Grade {
    pub fn from_score(score: f64) -> Self {
        if score >= 9.0 {
            Grade::APlus
        } else if score >= 8.0 {
            Grade::A
        } else if score >= 6.5 {
            Grade::B
        } else if score >= 5.0 {
            Grade::C
        } else if score >= 3.0 {
            Grade::D
        } else {
            Grade::F
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OddsScore {
    pub total_score: f64,
    pub grade: Grade,
}

/// Everything the aggregator weighs for one zone.
#[derive(Debug, Clone, Copy)]
pub struct OddsFactors<'a> {
    pub test_count: u32,
    pub hierarchy_level: u8,
    pub validation: &'a ValidationResult,
    pub confirmation_score: i32,
    pub has_combo: bool,
    pub compression: Option<&'a CompressionResult>,
    pub inducement: Option<&'a InducementResult>,
    pub mpl: Option<&'a MplResult>,
}

pub trait OddsCalculator: Send + Sync {
    fn calculate_odds_enhancers(&self, factors: &OddsFactors<'_>) -> OddsScore;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedOddsCalculator;

impl WeightedOddsCalculator {
    fn freshness(test_count: u32) -> f64 {
        match test_count {
            0 => 2.0,
            1 => 1.5,
            2 => 1.0,
            _ => 0.0,
        }
    }

    fn hierarchy(level: u8) -> f64 {
        match level {
            1 => 1.5,
            2 => 1.0,
            3 => 0.5,
            _ => 0.0,
        }
    }
}

impl OddsCalculator for WeightedOddsCalculator {
    fn calculate_odds_enhancers(&self, f: &OddsFactors<'_>) -> OddsScore {
        if !f.validation.is_valid {
            return OddsScore { total_score: 0.0, grade: Grade::F };
        }

        let mut score = Self::freshness(f.test_count)
            + f.validation.confidence * 2.0
            + Self::hierarchy(f.hierarchy_level)
            + (f.confirmation_score.clamp(0, 6) as f64 / 6.0) * 2.0;

        if f.has_combo {
            score += 1.0;
        }
        score += match f.compression.map(|c| c.quality) {
            Some(CompressionQuality::Excellent) => 1.0,
            Some(CompressionQuality::Good) => 0.7,
            Some(CompressionQuality::Moderate) => 0.4,
            None => 0.0,
        };
        score += match f.inducement {
            Some(i) if i.has_inducement && i.reversal_confirmed => 1.0,
            Some(i) if i.has_inducement => 0.5,
            _ => 0.0,
        };
        if let Some(mpl) = f.mpl {
            score += mpl.quality_score / 100.0 * 0.5;
        }

        let total_score = score.min(MAX_ODDS_SCORE);
        OddsScore { total_score, grade: Grade::from_score(total_score) }
    }
}
