use crate::config::ScrapeConfig;
use crate::domain::model::{RecordOutcome, ScrapedRecord, SkipReason};
use crate::utils::error::ScrapeError;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;

const CONTAINER_SELECTOR: &str = "div.record-info";
const NAME_SELECTOR: &str = "h2";
const ADDRESS_SELECTOR: &str = "span.address";
const HTML_LOG_PREVIEW: usize = 500;

struct RecordSelectors {
    container: Selector,
    name: Selector,
    address: Selector,
}

impl RecordSelectors {
    fn new() -> Result<Self, ScrapeError> {
        Ok(Self {
            container: parse_selector(CONTAINER_SELECTOR)?,
            name: parse_selector(NAME_SELECTOR)?,
            address: parse_selector(ADDRESS_SELECTOR)?,
        })
    }
}

fn parse_selector(selector: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(selector).map_err(|e| ScrapeError::Selector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

fn child_text(element: &ElementRef, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
}

fn extract_one(element: &ElementRef, selectors: &RecordSelectors) -> RecordOutcome {
    let name = match child_text(element, &selectors.name) {
        None => return RecordOutcome::Skipped(SkipReason::MissingName),
        Some(name) if name.is_empty() => return RecordOutcome::Skipped(SkipReason::EmptyName),
        Some(name) => name,
    };
    let address = match child_text(element, &selectors.address) {
        None => return RecordOutcome::Skipped(SkipReason::MissingAddress),
        Some(address) if address.is_empty() => {
            return RecordOutcome::Skipped(SkipReason::EmptyAddress)
        }
        Some(address) => address,
    };
    RecordOutcome::Extracted(ScrapedRecord { name, address })
}

/// One outcome per `div.record-info` container, in document order.
pub fn extract_records(html: &str) -> Result<Vec<RecordOutcome>, ScrapeError> {
    let selectors = RecordSelectors::new()?;
    let document = Html::parse_document(html);

    Ok(document
        .select(&selectors.container)
        .map(|element| extract_one(&element, &selectors))
        .collect())
}

/// Fetches pages with a fixed user agent and pulls name/address records out
/// of them. A malformed record container is skipped, not fatal.
#[derive(Debug, Clone)]
pub struct RecordScraper {
    client: Client,
    user_agent: String,
}

impl RecordScraper {
    pub fn new(config: &ScrapeConfig) -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|source| ScrapeError::Transport {
                url: String::new(),
                source,
            })?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: &ScrapeConfig) -> Self {
        Self {
            client,
            user_agent: config.user_agent.clone(),
        }
    }

    pub async fn scrape(&self, url: &str) -> Result<Vec<ScrapedRecord>, ScrapeError> {
        tracing::debug!(url = %url, "Scraping records");

        let target = url::Url::parse(url).map_err(|e| ScrapeError::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let response = self
            .client
            .get(target)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(|source| {
                tracing::error!(url = %url, error = %source, "Error while scraping");
                ScrapeError::Transport {
                    url: url.to_string(),
                    source,
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(url = %url, status = status.as_u16(), "Scrape target returned an error status");
            return Err(ScrapeError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let html = response.text().await.map_err(|source| ScrapeError::Transport {
            url: url.to_string(),
            source,
        })?;
        let preview: String = html.chars().take(HTML_LOG_PREVIEW).collect();
        tracing::debug!(bytes = html.len(), "Scraped HTML content: {}", preview);

        let mut records = Vec::new();
        for (index, outcome) in extract_records(&html)?.into_iter().enumerate() {
            match outcome {
                RecordOutcome::Extracted(record) => {
                    tracing::info!(name = %record.name, address = %record.address, "Found record");
                    records.push(record);
                }
                RecordOutcome::Skipped(reason) => {
                    tracing::warn!(index, reason = %reason, "Skipping malformed record");
                }
            }
        }

        tracing::debug!(url = %url, count = records.len(), "Scrape complete");
        Ok(records)
    }
}
