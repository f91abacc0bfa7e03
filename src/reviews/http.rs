//! Paginated review API client.
//!
//! Pages `GET {base}/apps/{app_id}/reviews?sort=newest&count=200[&token=...]`,
//! each answering `{"reviews": [...], "next_token": "..."}`, newest first.
//! Paging stops once a page reaches back past the window start or the API
//! returns no continuation token.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::http_client::{HttpTimeouts, build_http_client};

use super::{Review, ReviewSource, ReviewSourceError};

/// Reviews requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 200;

/// Pause between page requests.
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(500);

/// Hard stop so a misbehaving API cannot page forever.
const MAX_PAGES: u32 = 500;

#[derive(Debug, Deserialize)]
struct ReviewPage {
    #[serde(default)]
    reviews: Vec<Review>,
    #[serde(default)]
    next_token: Option<String>,
}

/// Review source backed by an HTTP review API.
#[derive(Debug, Clone)]
pub struct HttpReviewSource {
    client: Client,
    base_url: Url,
    app_id: String,
    page_size: u32,
    page_delay: Duration,
}

impl HttpReviewSource {
    /// Creates a source for `app_id` against the API at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewSourceError::InvalidUrl`] if `base_url` is not an
    /// absolute http(s) URL, or [`ReviewSourceError::ClientBuild`] if the
    /// HTTP client cannot be constructed.
    pub fn new(
        base_url: &str,
        app_id: impl Into<String>,
        timeouts: HttpTimeouts,
    ) -> Result<Self, ReviewSourceError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ReviewSourceError::invalid_url(base_url, e.to_string()))?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(ReviewSourceError::invalid_url(
                base_url.as_str(),
                "expected an http or https base URL",
            ));
        }
        let client =
            build_http_client(timeouts).map_err(|e| ReviewSourceError::client_build(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            app_id: app_id.into(),
            page_size: DEFAULT_PAGE_SIZE,
            page_delay: DEFAULT_PAGE_DELAY,
        })
    }

    /// Sets the pause between page requests.
    #[must_use]
    pub fn with_page_delay(mut self, page_delay: Duration) -> Self {
        self.page_delay = page_delay;
        self
    }

    /// Sets the number of reviews requested per page.
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Builds the URL for one page.
    #[must_use]
    pub fn page_url(&self, token: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["apps", self.app_id.as_str(), "reviews"]);
        }
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("sort", "newest")
                .append_pair("count", &self.page_size.to_string());
            if let Some(token) = token {
                query.append_pair("token", token);
            }
        }
        url
    }

    async fn fetch_page(&self, token: Option<&str>) -> Result<ReviewPage, ReviewSourceError> {
        let url = self.page_url(token);
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ReviewSourceError::network(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReviewSourceError::http_status(url.as_str(), status.as_u16()));
        }

        response
            .json::<ReviewPage>()
            .await
            .map_err(|e| ReviewSourceError::invalid_response(url.as_str(), e.to_string()))
    }
}

#[async_trait]
impl ReviewSource for HttpReviewSource {
    fn name(&self) -> &'static str {
        "http"
    }

    #[instrument(skip(self), fields(app_id = %self.app_id))]
    async fn fetch(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Review>, ReviewSourceError> {
        let mut collected: Vec<Review> = Vec::new();
        let mut token: Option<String> = None;

        for page in 1..=MAX_PAGES {
            let result = match self.fetch_page(token.as_deref()).await {
                Ok(result) => result,
                Err(error) => {
                    warn!(page, error = %error, "Review page failed; keeping reviews collected so far");
                    break;
                }
            };

            let reached_start = result
                .reviews
                .last()
                .is_some_and(|oldest| oldest.date() < start);
            debug!(page, reviews = result.reviews.len(), reached_start, "Fetched review page");
            collected.extend(result.reviews);

            token = result.next_token.filter(|t| !t.is_empty());
            if reached_start || token.is_none() {
                break;
            }
            if page == MAX_PAGES {
                warn!(pages = MAX_PAGES, "Stopped paging at the page limit");
                break;
            }
            tokio::time::sleep(self.page_delay).await;
        }

        let fetched = collected.len();
        collected.retain(|review| (start..=end).contains(&review.date()));
        info!(fetched, in_window = collected.len(), "Reviews fetched");
        Ok(collected)
    }
}
