use anyhow::Result;
use httpmock::prelude::*;
use people_search::adapters::csv_export;
use people_search::config::ScrapeConfig;
use people_search::{RecordScraper, ScrapeError};
use tempfile::TempDir;

const LISTING_PAGE: &str = r#"
<html>
  <body>
    <div class="record-info">
      <h2> Jane Doe </h2>
      <span class="address">1 Elm St, Springfield</span>
    </div>
    <div class="record-info">
      <h2>John Roe</h2>
      <span class="address"> 22 Oak Ave, Shelbyville </span>
    </div>
  </body>
</html>
"#;

const PARTIAL_PAGE: &str = r#"
<html>
  <body>
    <div class="record-info">
      <h2>No Address Person</h2>
    </div>
    <div class="record-info">
      <span class="address">Nameless Rd</span>
    </div>
    <div class="record-info">
      <h2>Kept Person</h2>
      <span class="address">3 Pine Ct</span>
    </div>
  </body>
</html>
"#;

fn scraper() -> Result<RecordScraper> {
    Ok(RecordScraper::new(&ScrapeConfig::default())?)
}

#[tokio::test]
async fn test_scrape_extracts_every_record() -> Result<()> {
    let server = MockServer::start_async().await;
    let page_mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/people")
                .header("user-agent", ScrapeConfig::default().user_agent);
            then.status(200)
                .header("content-type", "text/html")
                .body(LISTING_PAGE);
        })
        .await;

    let records = scraper()?.scrape(&server.url("/people")).await?;

    page_mock.assert_async().await;
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].name, "Jane Doe");
    assert_eq!(records[0].address, "1 Elm St, Springfield");
    assert_eq!(records[1].name, "John Roe");
    assert_eq!(records[1].address, "22 Oak Ave, Shelbyville");
    Ok(())
}

#[tokio::test]
async fn test_scrape_skips_incomplete_records() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/partial");
            then.status(200).body(PARTIAL_PAGE);
        })
        .await;

    let records = scraper()?.scrape(&server.url("/partial")).await?;

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "Kept Person");
    assert_eq!(records[0].address, "3 Pine Ct");
    Ok(())
}

#[tokio::test]
async fn test_scrape_page_without_records_is_empty() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/empty");
            then.status(200).body("<html><body><p>Nothing here</p></body></html>");
        })
        .await;

    let records = scraper()?.scrape(&server.url("/empty")).await?;
    assert!(records.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_scrape_error_status() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/missing");
            then.status(404).body("not found");
        })
        .await;

    let result = scraper()?.scrape(&server.url("/missing")).await;
    assert!(matches!(result, Err(ScrapeError::Status { status: 404, .. })));
    Ok(())
}

#[tokio::test]
async fn test_scrape_invalid_url() -> Result<()> {
    let result = scraper()?.scrape("not a url").await;
    assert!(matches!(result, Err(ScrapeError::InvalidUrl { .. })));
    Ok(())
}

#[tokio::test]
async fn test_scraped_records_export_to_csv() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/people");
            then.status(200).body(LISTING_PAGE);
        })
        .await;

    let records = scraper()?.scrape(&server.url("/people")).await?;

    let temp_dir = TempDir::new()?;
    let output = temp_dir.path().join("records.csv");
    csv_export::write_records_to_file(&output, &records)?;

    let content = std::fs::read_to_string(&output)?;
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[0], "name,address");
    assert_eq!(lines[1], "Jane Doe,\"1 Elm St, Springfield\"");
    assert_eq!(lines.len(), 3);
    Ok(())
}
