//! Component weights for the composite score.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Weights applied to rarity, seriousness, recency and count sufficiency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentWeights {
    pub rarity: f64,
    pub seriousness: f64,
    pub recency: f64,
    pub count: f64,
}

impl Default for ComponentWeights {
    fn default() -> Self {
        Self {
            rarity: 0.40,
            seriousness: 0.35,
            recency: 0.20,
            count: 0.05,
        }
    }
}

impl ComponentWeights {
    const TOLERANCE: f64 = 1e-6;

    pub fn as_array(&self) -> [f64; 4] {
        [self.rarity, self.seriousness, self.recency, self.count]
    }

    pub fn sum(&self) -> f64 {
        self.as_array().iter().sum()
    }

    /// Weights must be finite, non-negative and sum to 1.0.
    pub fn validate(&self) -> Result<()> {
        if self
            .as_array()
            .iter()
            .any(|w| !w.is_finite() || *w < 0.0)
        {
            return Err(EngineError::ConfigurationInvalid(format!(
                "component weights must be finite and non-negative, got {:?}",
                self.as_array()
            )));
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > Self::TOLERANCE {
            return Err(EngineError::ConfigurationInvalid(format!(
                "component weights must sum to 1.0, got {sum:.6}"
            )));
        }
        Ok(())
    }

    /// Parse `"0.4,0.35,0.2,0.05"` in rarity, seriousness, recency, count order.
    pub fn parse_list(raw: &str) -> Result<Self> {
        let values = raw
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|err| {
                EngineError::ConfigurationInvalid(format!("component weights `{raw}`: {err}"))
            })?;
        match values.as_slice() {
            [rarity, seriousness, recency, count] => Ok(Self {
                rarity: *rarity,
                seriousness: *seriousness,
                recency: *recency,
                count: *count,
            }),
            _ => Err(EngineError::ConfigurationInvalid(format!(
                "expected four component weights, got {}",
                values.len()
            ))),
        }
    }
}
