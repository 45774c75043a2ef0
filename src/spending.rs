//! Client for the remote spending-aggregation API.
//!
//! Every failure is classified at the call site into [`SpendingError`]:
//! a 401 is the only unauthorized signal; everything else is transient.

use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::types::Period;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Current vs. previous period totals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub total: f64,
    pub previously: f64,
}

/// One point of the spending series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detail {
    pub date: String,
    pub amount: f64,
}

/// Response of `GET /transactions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendingSummary {
    pub summary: Totals,
    #[serde(default)]
    pub details: Vec<Detail>,
}

/// All three windows, fetched together.
#[derive(Debug, Clone, PartialEq)]
pub struct AllSpending {
    pub daily: SpendingSummary,
    pub weekly: SpendingSummary,
    pub monthly: SpendingSummary,
}

impl AllSpending {
    pub fn into_periods(self) -> [(Period, SpendingSummary); 3] {
        [
            (Period::Daily, self.daily),
            (Period::Weekly, self.weekly),
            (Period::Monthly, self.monthly),
        ]
    }
}

/// Response of `POST /refresh`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshOutcome {
    pub success: bool,
}

/// Classified spending API failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpendingError {
    /// HTTP 401. The session is over; never retried.
    #[error("spending API rejected the access token")]
    Unauthorized,
    /// Network error, non-2xx other than 401, or a malformed body.
    #[error("spending API request failed: {0}")]
    Transient(String),
}

impl SpendingError {
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<reqwest::Error> for SpendingError {
    fn from(e: reqwest::Error) -> Self {
        // The request URL carries the access token.
        Self::Transient(e.without_url().to_string())
    }
}

/// The spending API as seen by the dashboard.
pub trait SpendingApi: Send + Sync {
    /// Fetch one aggregation window.
    fn fetch(
        &self,
        period: Period,
        access_token: &str,
    ) -> impl Future<Output = Result<SpendingSummary, SpendingError>> + Send;

    /// Ask the backend to recompute aggregates.
    fn refresh(
        &self,
        access_token: &str,
    ) -> impl Future<Output = Result<RefreshOutcome, SpendingError>> + Send;

    /// Fetch all three windows concurrently.
    ///
    /// All-or-nothing: the first failure wins and nothing partial is returned.
    fn fetch_all(
        &self,
        access_token: &str,
    ) -> impl Future<Output = Result<AllSpending, SpendingError>> + Send {
        async move {
            let (daily, weekly, monthly) = tokio::try_join!(
                self.fetch(Period::Daily, access_token),
                self.fetch(Period::Weekly, access_token),
                self.fetch(Period::Monthly, access_token),
            )?;
            Ok(AllSpending {
                daily,
                weekly,
                monthly,
            })
        }
    }
}

/// HTTP client for the aggregation API.
#[derive(Clone)]
pub struct SpendingClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl SpendingClient {
    /// Create a client for the API rooted at `base_url`.
    #[must_use]
    pub fn new(mut base_url: Url) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("finmon/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            http,
            base_url,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, SpendingError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| SpendingError::Transient(format!("invalid API URL: {e}")))
    }

    async fn classify<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, SpendingError> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(SpendingError::Unauthorized);
        }
        if !status.is_success() {
            return Err(SpendingError::Transient(format!("HTTP {}", status.as_u16())));
        }
        response.json::<T>().await.map_err(Into::into)
    }
}

impl SpendingApi for SpendingClient {
    async fn fetch(
        &self,
        period: Period,
        access_token: &str,
    ) -> Result<SpendingSummary, SpendingError> {
        let url = self.url("transactions")?;
        let response = self
            .http
            .get(url)
            .query(&[("filter", period.as_str()), ("access_token", access_token)])
            .timeout(self.timeout)
            .send()
            .await?;

        let result = Self::classify(response).await;
        if let Err(e) = &result {
            tracing::warn!(%period, error = %e, "Spending fetch failed");
        }
        result
    }

    async fn refresh(&self, access_token: &str) -> Result<RefreshOutcome, SpendingError> {
        let url = self.url("refresh")?;
        let response = self
            .http
            .post(url)
            .query(&[("access_token", access_token)])
            .json(&serde_json::json!({}))
            .timeout(self.timeout)
            .send()
            .await?;

        let result = Self::classify(response).await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "Spending refresh failed");
        }
        result
    }
}
