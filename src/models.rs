use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observation of the three gas price tiers, in GWEI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub low: f64,
    pub average: f64,
    pub high: f64,
}

/// Tier prices as reported by the upstream oracle, before they are stamped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GasQuote {
    pub low: f64,
    pub average: f64,
    pub high: f64,
}

impl GasQuote {
    pub fn at(self, timestamp: DateTime<Utc>) -> Sample {
        Sample {
            timestamp,
            low: self.low,
            average: self.average,
            high: self.high,
        }
    }
}

/// Payload of `GET /get-gas-fees`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasFeesResponse {
    pub low: f64,
    pub average: f64,
    pub high: f64,
    pub historical_data: Vec<Sample>,
}

impl GasFeesResponse {
    pub fn quote(&self) -> GasQuote {
        GasQuote {
            low: self.low,
            average: self.average,
            high: self.high,
        }
    }
}
