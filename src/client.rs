use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use url::Url;

use crate::chart::{ChartHandle, ChartSink};
use crate::models::{GasFeesResponse, GasQuote};
use crate::storage::{self, DbPool, GAS_DATA_KEY};
use crate::window::{PersistedWindow, SampleWindow};

/// HTTP client for the proxy's `/get-gas-fees` endpoint.
#[derive(Clone)]
pub struct ProxyClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl ProxyClient {
    pub fn new(server_url: &str) -> Result<Self> {
        let base = Url::parse(server_url).context("invalid GAS_SERVER_URL")?;
        let endpoint = base
            .join("get-gas-fees")
            .context("invalid GAS_SERVER_URL")?;
        let http = reqwest::Client::builder()
            .build()
            .context("failed to build reqwest client")?;
        Ok(Self { http, endpoint })
    }

    pub async fn fetch_gas_fees(&self) -> Result<GasFeesResponse> {
        let resp = self
            .http
            .get(self.endpoint.clone())
            .send()
            .await
            .with_context(|| format!("failed to reach {}", self.endpoint))?
            .error_for_status()
            .context("gas proxy returned an error")?;
        resp.json::<GasFeesResponse>()
            .await
            .context("failed to decode gas proxy response")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The sample was kept; the window now holds `len` samples.
    Appended { len: usize },
    /// The sample was within the debounce threshold of the previous one.
    Unchanged,
}

/// Client-side gas window: in-memory samples backed by the `gasData`
/// record and drawn through a chart handle.
pub struct GasTracker<S: ChartSink> {
    pool: DbPool,
    window: SampleWindow,
    chart: ChartHandle<S>,
}

impl<S: ChartSink> GasTracker<S> {
    /// Restores the window from storage and draws it if anything was restored.
    pub async fn open(pool: DbPool, chart: ChartHandle<S>, now: DateTime<Utc>) -> Result<Self> {
        let mut window = SampleWindow::new();
        let restored = match storage::get(&pool, GAS_DATA_KEY).await? {
            Some(raw) => window.restore_json(&raw, now),
            None => false,
        };

        let mut tracker = Self {
            pool,
            window,
            chart,
        };
        if restored {
            tracing::info!(samples = tracker.window.len(), "restored gas data");
            tracker.redraw()?;
        }
        Ok(tracker)
    }

    pub fn window(&self) -> &SampleWindow {
        &self.window
    }

    pub fn redraw(&mut self) -> Result<()> {
        self.chart.update(&self.window.snapshot())
    }

    /// Fetches from the proxy and applies the quote. A failed fetch leaves the window as it was.
    pub async fn refresh(&mut self, proxy: &ProxyClient, now: DateTime<Utc>) -> Result<RefreshOutcome> {
        let fees = proxy.fetch_gas_fees().await?;
        self.apply_quote(fees.quote(), now).await
    }

    /// Debounces, evicts and persists `quote`. The in-memory window only
    /// changes once the new record has been stored.
    pub async fn apply_quote(&mut self, quote: GasQuote, now: DateTime<Utc>) -> Result<RefreshOutcome> {
        let mut next = self.window.clone();
        if !next.append_if_changed(quote.at(now)) {
            tracing::debug!("gas quote within debounce threshold, skipping");
            return Ok(RefreshOutcome::Unchanged);
        }
        next.evict(now);
        save(&self.pool, &next, now).await?;
        self.window = next;
        self.redraw()?;
        Ok(RefreshOutcome::Appended {
            len: self.window.len(),
        })
    }

    /// Clears the stored record and the window when the record was saved at
    /// least one horizon ago. Returns whether anything was cleared.
    pub async fn expire_stale(&mut self, now: DateTime<Utc>) -> Result<bool> {
        let Some(raw) = storage::get(&self.pool, GAS_DATA_KEY).await? else {
            return Ok(false);
        };
        let Ok(persisted) = PersistedWindow::parse(&raw) else {
            return Ok(false);
        };
        // an unrepresentable age counts as expired, like any other malformed record
        if matches!(persisted.age(now), Some(age) if age < self.window.horizon()) {
            return Ok(false);
        }

        tracing::info!("stored gas data expired, clearing");
        storage::remove(&self.pool, GAS_DATA_KEY).await?;
        self.window.clear();
        save(&self.pool, &self.window, now).await?;
        Ok(true)
    }

    /// Periodic expiry check. Errors are logged and the tracker stays usable.
    pub async fn expiry_tick(&mut self, now: DateTime<Utc>) -> bool {
        let cleared = match self.expire_stale(now).await {
            Ok(cleared) => cleared,
            Err(err) => {
                tracing::error!("failed checking stored gas data expiry: {:#}", err);
                return false;
            }
        };
        if cleared {
            if let Err(err) = self.redraw() {
                tracing::error!("failed redrawing gas chart: {:#}", err);
            }
        }
        cleared
    }
}

async fn save(pool: &DbPool, window: &SampleWindow, now: DateTime<Utc>) -> Result<()> {
    let raw = window
        .persist(now)
        .to_json()
        .context("failed to encode gas data")?;
    storage::put(pool, GAS_DATA_KEY, &raw).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proxy_endpoint_is_joined_onto_base() {
        let client = ProxyClient::new("http://127.0.0.1:3000").unwrap();
        assert_eq!(client.endpoint.as_str(), "http://127.0.0.1:3000/get-gas-fees");

        let client = ProxyClient::new("http://gas.local/app/").unwrap();
        assert_eq!(client.endpoint.as_str(), "http://gas.local/app/get-gas-fees");
    }

    #[test]
    fn invalid_server_url_is_rejected() {
        assert!(ProxyClient::new("not a url").is_err());
    }
}
