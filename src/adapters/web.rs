//! HTML form front end: `GET /` renders the form, `POST /search` runs the
//! search and renders the results. Failures become a generic 500 page.

use crate::core::SearchService;
use crate::domain::model::SearchResultItem;
use crate::domain::ports::{ConsentFlow, CredentialStore};
use crate::utils::error::Result;
use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use html_escape::{encode_double_quoted_attribute, encode_text};
use serde::Deserialize;
use std::fmt::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub const GENERIC_ERROR_BODY: &str = "An error occurred. Please try again later.";

const INDEX_PAGE: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <title>People Search</title>
</head>
<body>
  <h1>People Search</h1>
  <form action="/search" method="post">
    <input type="text" name="query" placeholder="Name, city, ..." required />
    <button type="submit">Search</button>
  </form>
</body>
</html>"#;

#[derive(Debug, Deserialize)]
pub struct SearchForm {
    pub query: String,
}

pub fn router<S, F>(service: Arc<SearchService<S, F>>) -> Router
where
    S: CredentialStore + 'static,
    F: ConsentFlow + 'static,
{
    Router::new()
        .route("/", get(index))
        .route("/search", post(search::<S, F>))
        .with_state(service)
}

pub async fn serve<S, F>(service: Arc<SearchService<S, F>>, addr: SocketAddr) -> Result<()>
where
    S: CredentialStore + 'static,
    F: ConsentFlow + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Starting web server on {}", addr);
    axum::serve(listener, router(service)).await?;
    Ok(())
}

async fn index() -> Html<&'static str> {
    tracing::debug!("Rendering index");
    Html(INDEX_PAGE)
}

async fn search<S, F>(
    State(service): State<Arc<SearchService<S, F>>>,
    Form(form): Form<SearchForm>,
) -> Response
where
    S: CredentialStore + 'static,
    F: ConsentFlow + 'static,
{
    match service.run(&form.query).await {
        Ok(results) => Html(render_results(&form.query, &results)).into_response(),
        Err(e) => {
            tracing::error!(
                error = %e,
                category = ?e.category(),
                detail = ?e,
                "Error during search"
            );
            (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_ERROR_BODY).into_response()
        }
    }
}

pub fn render_results(query: &str, results: &[SearchResultItem]) -> String {
    let mut page = String::from(
        "<!doctype html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\" />\
         <title>Search results</title></head>\n<body>\n",
    );
    let _ = writeln!(page, "<h1>Results for &quot;{}&quot;</h1>", encode_text(query));

    if results.is_empty() {
        page.push_str("<p>No results found.</p>\n");
    } else {
        page.push_str("<ul>\n");
        for item in results {
            let title = encode_text(item.title().unwrap_or("(untitled)")).into_owned();
            page.push_str("<li>");
            match item.link() {
                Some(link) => {
                    let _ = write!(
                        page,
                        "<a href=\"{}\">{}</a>",
                        encode_double_quoted_attribute(link),
                        title
                    );
                }
                None => page.push_str(&title),
            }
            if let Some(snippet) = item.snippet() {
                let _ = write!(page, "<p>{}</p>", encode_text(snippet));
            }
            page.push_str("</li>\n");
        }
        page.push_str("</ul>\n");
    }

    page.push_str("<p><a href=\"/\">New search</a></p>\n</body>\n</html>\n");
    page
}
