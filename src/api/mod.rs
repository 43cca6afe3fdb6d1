mod filter;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response, StatusCode};
use url::Url;

use crate::models::{Section, SectionQuery};
use filter::eq_filters;

// ─── Error types ────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("HTTP {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Rate limited – retry after {retry_after:.1}s")]
    RateLimited { retry_after: f64 },
    #[error("Unauthorized – check your API key")]
    Unauthorized,
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Malformed rows: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

// ─── Store seam ─────────────────────────────────────────────────────────────

/// Anything that can answer an equality-match query on `class_sections`.
#[async_trait]
pub trait SectionStore: Send + Sync {
    async fn select_sections(&self, query: &SectionQuery) -> Result<Vec<Section>, StoreError>;
}

/// Result of one fetch. `error` is set when the store failed and the rows were
/// degraded to an empty list.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub sections: Vec<Section>,
    pub error: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

/// Fetch the sections for `query`. A blank department short-circuits without
/// touching the store. Store failures are logged and returned as an empty list.
pub async fn fetch_sections(store: &dyn SectionStore, query: &SectionQuery) -> FetchOutcome {
    if query.dept.is_empty() {
        tracing::debug!(%query, "blank department, skipping fetch");
        return FetchOutcome {
            sections: Vec::new(),
            error: None,
            fetched_at: Utc::now(),
        };
    }

    match store.select_sections(query).await {
        Ok(sections) => {
            tracing::info!(%query, rows = sections.len(), "fetched sections");
            FetchOutcome {
                sections,
                error: None,
                fetched_at: Utc::now(),
            }
        }
        Err(e) => {
            tracing::error!(%query, error = %e, "section fetch failed");
            FetchOutcome {
                sections: Vec::new(),
                error: Some(e.to_string()),
                fetched_at: Utc::now(),
            }
        }
    }
}

// ─── Client ─────────────────────────────────────────────────────────────────

/// PostgREST client for the hosted `class_sections` table.
#[derive(Debug, Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl SupabaseClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid Supabase URL: {base_url}"))?;

        let client = Client::builder()
            .user_agent(concat!("section-picker/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_string(),
        })
    }

    fn table_url(&self, table: &str) -> Result<Url> {
        let full = format!("/rest/v1/{table}");
        self.base_url
            .join(&full)
            .with_context(|| format!("Bad table path: {table}"))
    }

    async fn check_status(resp: Response) -> Result<Response, StoreError> {
        match resp.status() {
            StatusCode::UNAUTHORIZED => Err(StoreError::Unauthorized),
            StatusCode::FORBIDDEN => Err(StoreError::Api {
                status: 403,
                message: "Forbidden – row level security rejected the key".into(),
            }),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<f64>().ok())
                    .unwrap_or(1.0);
                Err(StoreError::RateLimited { retry_after: retry })
            }
            s if s.is_client_error() || s.is_server_error() => {
                let status = s.as_u16();
                let message = resp.text().await.unwrap_or_default();
                Err(StoreError::Api { status, message })
            }
            _ => Ok(resp),
        }
    }
}

#[async_trait]
impl SectionStore for SupabaseClient {
    async fn select_sections(&self, query: &SectionQuery) -> Result<Vec<Section>, StoreError> {
        let mut url = self.table_url("class_sections")?;
        for (k, v) in eq_filters(query) {
            url.query_pairs_mut().append_pair(k, &v);
        }

        let resp = self
            .client
            .get(url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let resp = Self::check_status(resp).await?;

        // Decode from text so a schema mismatch surfaces as `Decode`, not `Network`.
        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

// ─── In-memory store for tests ──────────────────────────────────────────────
