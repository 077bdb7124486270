use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use url::Url;

use crate::models::GasQuote;

#[derive(thiserror::Error, Debug)]
pub enum UpstreamFetchError {
    #[error("gas oracle request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("gas oracle returned HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("gas oracle returned an unexpected body: {0}")]
    Body(#[from] serde_json::Error),
    #[error("gas oracle rejected the request: {0}")]
    Rejected(String),
    #[error("gas oracle field {field} is not a number: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
}

/// Client for Etherscan's `gastracker/gasoracle` action.
#[derive(Clone)]
pub struct EtherscanClient {
    http: reqwest::Client,
    endpoint: Url,
}

#[derive(Deserialize)]
struct OracleEnvelope {
    #[serde(default)]
    message: Option<String>,
    result: serde_json::Value,
}

#[derive(Deserialize)]
struct OracleResult {
    #[serde(rename = "SafeGasPrice")]
    safe: GasValue,
    #[serde(rename = "ProposeGasPrice")]
    propose: GasValue,
    #[serde(rename = "FastGasPrice")]
    fast: GasValue,
}

/// Etherscan reports prices as decimal strings; accept plain numbers too.
#[derive(Deserialize)]
#[serde(untagged)]
enum GasValue {
    Number(f64),
    Text(String),
}

impl GasValue {
    fn gwei(self, field: &'static str) -> Result<f64, UpstreamFetchError> {
        let (parsed, raw) = match self {
            GasValue::Number(n) => (Some(n), n.to_string()),
            GasValue::Text(s) => (s.trim().parse::<f64>().ok(), s),
        };
        match parsed {
            Some(n) if n.is_finite() => Ok(n),
            _ => Err(UpstreamFetchError::InvalidNumber { field, value: raw }),
        }
    }
}

impl EtherscanClient {
    pub fn new(api_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build reqwest client")?;
        let endpoint = Url::parse_with_params(
            api_url,
            &[
                ("module", "gastracker"),
                ("action", "gasoracle"),
                ("apikey", api_key),
            ],
        )
        .context("invalid ETHERSCAN_API_URL")?;
        Ok(Self { http, endpoint })
    }

    pub async fn fetch_quote(&self) -> Result<GasQuote, UpstreamFetchError> {
        let resp = self.http.get(self.endpoint.clone()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(UpstreamFetchError::Status(status));
        }
        let body = resp.text().await?;
        parse_oracle_body(&body)
    }
}

fn parse_oracle_body(body: &str) -> Result<GasQuote, UpstreamFetchError> {
    let envelope: OracleEnvelope = serde_json::from_str(body)?;
    if !envelope.result.is_object() {
        // e.g. {"status":"0","message":"NOTOK","result":"Invalid API Key"}
        let reason = match envelope.result {
            serde_json::Value::String(s) => s,
            other => envelope.message.unwrap_or_else(|| other.to_string()),
        };
        return Err(UpstreamFetchError::Rejected(reason));
    }

    let result: OracleResult = serde_json::from_value(envelope.result)?;
    Ok(GasQuote {
        low: result.safe.gwei("SafeGasPrice")?,
        average: result.propose.gwei("ProposeGasPrice")?,
        high: result.fast.gwei("FastGasPrice")?,
    })
}
