use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::pipeline::Pipeline;
use crate::services::reporting::RunReporter;

pub const EMPTY_TICKER_MESSAGE: &str = "Please fill the ticker field";

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<dyn Pipeline>,
    pub reporter: Option<RunReporter>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResearchRequest {
    #[serde(default)]
    pub ticker: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/research", post(research_form))
        .route("/api/research", post(research_json))
        .route("/health", get(health))
        .route("/report", get(report))
        .with_state(state)
}

pub async fn run_server(state: AppState, bind_addr: &str) -> Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("🌐 API Server listening on {}", bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index() -> Html<String> {
    Html(render_page("", None))
}

async fn research_form(State(state): State<AppState>, Form(req): Form<ResearchRequest>) -> Response {
    if req.ticker.trim().is_empty() {
        warn!("🚫 [API] Research requested without a ticker");
        return (
            StatusCode::BAD_REQUEST,
            Html(render_page("", Some(&error_block(EMPTY_TICKER_MESSAGE)))),
        )
            .into_response();
    }

    info!("📨 [API] Research requested for {}", req.ticker);
    match state.pipeline.run(&req.ticker).await {
        Ok(output) => {
            let result = format!("<h2>Result</h2>\n<pre id=\"result\">{}</pre>", escape_html(&output.final_output));
            Html(render_page(&req.ticker, Some(&result))).into_response()
        }
        Err(e) => {
            error!("❌ [API] Research for {} failed: {}", req.ticker, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(render_page(&req.ticker, Some(&error_block(&e.to_string())))),
            )
                .into_response()
        }
    }
}

async fn research_json(State(state): State<AppState>, Json(req): Json<ResearchRequest>) -> Response {
    if req.ticker.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": EMPTY_TICKER_MESSAGE }))).into_response();
    }

    match state.pipeline.run(&req.ticker).await {
        Ok(output) => Json(output).into_response(),
        Err(e) => {
            error!("❌ [API] Research for {} failed: {}", req.ticker, e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": e.to_string() }))).into_response()
        }
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn report(State(state): State<AppState>) -> Response {
    match &state.reporter {
        Some(reporter) => Json(reporter.summary()).into_response(),
        None => (StatusCode::NOT_FOUND, "Run reporting is disabled.").into_response(),
    }
}

fn error_block(message: &str) -> String {
    format!("<p class=\"error\">{}</p>", escape_html(message))
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn render_page(ticker: &str, body: Option<&str>) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Stock Newsletter Crew</title>
<style>
body {{ font-family: sans-serif; max-width: 860px; margin: 2rem auto; }}
pre {{ white-space: pre-wrap; background: #f6f6f6; padding: 1rem; }}
.error {{ color: #b00020; font-weight: bold; }}
</style>
</head>
<body>
<h1>Stock Newsletter Crew</h1>
<form method="post" action="/research">
<label for="ticker">Ticker</label>
<input id="ticker" name="ticker" type="text" value="{}" placeholder="AAPL">
<button type="submit">Run Research</button>
</form>
{}
</body>
</html>
"#,
        escape_html(ticker),
        body.unwrap_or("")
    )
}
