//! Server-rendered web form for the trend pipeline.
//!
//! ## Endpoints
//!
//! - `GET /`: the empty form
//! - `POST /`: run the pipeline for the submitted topic and render the result

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Form, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::Credentials;
use crate::llm::Narrator;
use crate::search::Retriever;
use crate::{PipelineError, Pipeline, Report, Result};

/// Shown when a key is missing, instead of running the pipeline.
pub const MISSING_KEYS_WARNING: &str = "👈 Enter both keys in the sidebar to switch on the trend radar.";
/// Shown once both keys are available.
pub const READY_MESSAGE: &str = "✅ You're in. System ready.";
/// Prefix of the single message shown when the pipeline fails.
pub const ERROR_PREFIX: &str = "Connection dropped: ";

/// Form fields posted by the page.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct AskForm {
    #[serde(default)]
    pub google_api_key: String,
    #[serde(default)]
    pub tavily_api_key: String,
    #[serde(default)]
    pub question: String,
}

/// What the page shows below the form.
#[derive(Debug)]
pub enum Outcome {
    /// A key is missing; nothing was run.
    MissingKeys,
    /// Both keys are present but there is no topic yet.
    Ready,
    /// The pipeline finished.
    Breakdown(Box<Report>),
    /// The pipeline failed; carries the error text.
    Failed(String),
}

/// Shared state for axum handlers.
struct AppState<R, N> {
    pipeline: Arc<Pipeline<R, N>>,
    /// Keys configured on the server, used when the form leaves a key blank.
    credentials: Arc<Credentials>,
}

impl<R, N> Clone for AppState<R, N> {
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
            credentials: Arc::clone(&self.credentials),
        }
    }
}

/// The web UI server running in a background task.
pub struct WebServer {
    /// The address the server is listening on.
    addr: SocketAddr,
    /// Handle to the background server task.
    handle: JoinHandle<()>,
}

impl WebServer {
    /// Binds to `bind_addr` (port `0` picks a free port) and starts serving.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP listener cannot bind.
    pub async fn start<R, N>(
        pipeline: Pipeline<R, N>,
        credentials: Credentials,
        bind_addr: &str,
    ) -> Result<Self>
    where
        R: Retriever + 'static,
        N: Narrator + 'static,
    {
        let app = router(AppState {
            pipeline: Arc::new(pipeline),
            credentials: Arc::new(credentials),
        });

        let listener = TcpListener::bind(bind_addr)
            .await
            .map_err(|e| PipelineError::ServerError(format!("bind to {bind_addr} failed: {e}")))?;
        let addr = listener
            .local_addr()
            .map_err(|e| PipelineError::ServerError(format!("failed to get local addr: {e}")))?;

        info!("Trend radar listening on http://{addr}");

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("Web server error: {e}");
            }
        });

        Ok(Self { addr, handle })
    }

    /// Returns the address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Waits until the server task ends.
    pub async fn wait(mut self) -> Result<()> {
        (&mut self.handle)
            .await
            .map_err(|e| PipelineError::ServerError(e.to_string()))
    }
}

impl Drop for WebServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn router<R, N>(state: AppState<R, N>) -> Router
where
    R: Retriever + 'static,
    N: Narrator + 'static,
{
    Router::new()
        .route("/", get(handle_index::<R, N>).post(handle_ask::<R, N>))
        .with_state(state)
}

/// `GET /`
async fn handle_index<R, N>(State(state): State<AppState<R, N>>) -> Html<String> {
    let outcome = if state.credentials.is_complete() {
        Outcome::Ready
    } else {
        Outcome::MissingKeys
    };
    Html(render_page(&AskForm::default(), &outcome))
}

/// `POST /`
async fn handle_ask<R, N>(
    State(state): State<AppState<R, N>>,
    Form(form): Form<AskForm>,
) -> Html<String>
where
    R: Retriever,
    N: Narrator,
{
    let outcome = answer(&*state.pipeline, &*state.credentials, &form).await;
    Html(render_page(&form, &outcome))
}

/// Resolves the keys for a submitted form and runs the pipeline when possible.
///
/// Keys typed in the form win over the server's keys. Any pipeline error is
/// collapsed into a single [`Outcome::Failed`].
pub async fn answer<R: Retriever, N: Narrator>(
    pipeline: &Pipeline<R, N>,
    server_credentials: &Credentials,
    form: &AskForm,
) -> Outcome {
    let credentials =
        Credentials::new(&form.google_api_key, &form.tavily_api_key).or(server_credentials);

    if !credentials.is_complete() {
        info!("Keys missing, pipeline not started");
        return Outcome::MissingKeys;
    }
    if form.question.trim().is_empty() {
        return Outcome::Ready;
    }

    match pipeline.run(&credentials, &form.question).await {
        Ok(report) => Outcome::Breakdown(Box::new(report)),
        Err(e) => {
            error!("Pipeline failed: {e}");
            Outcome::Failed(e.to_string())
        }
    }
}

/// Renders the whole page: header, key sidebar, topic form and the outcome.
pub fn render_page(form: &AskForm, outcome: &Outcome) -> String {
    let mut html = String::with_capacity(4096);

    html.push_str(PAGE_HEAD);
    html.push_str("<body>\n<aside class=\"sidebar\">\n<h2>🔑 ACCESS</h2>\n");
    html.push_str("<form method=\"post\" action=\"/\" id=\"ask\">\n");
    html.push_str(&format!(
        "<label>Google API Key:<input type=\"password\" name=\"google_api_key\" value=\"{}\"></label>\n",
        html_escape(&form.google_api_key)
    ));
    html.push_str(&format!(
        "<label>Tavily API Key:<input type=\"password\" name=\"tavily_api_key\" value=\"{}\"></label>\n",
        html_escape(&form.tavily_api_key)
    ));
    html.push_str("</form>\n");
    if !matches!(outcome, Outcome::MissingKeys) {
        html.push_str(&format!("<div class=\"success\">{READY_MESSAGE}</div>\n"));
    }
    html.push_str("</aside>\n<main>\n");

    html.push_str("<h1>🔥 TREND ALERT</h1>\n");
    html.push_str("<h3>What's trending right now, no filters, no fluff.</h3>\n");
    html.push_str(&format!(
        "<label class=\"question\">🎤 What should we talk about today?\
<input type=\"text\" name=\"question\" form=\"ask\" value=\"{}\" \
placeholder=\"e.g. What's going on with OpenAI's new model?\"></label>\n",
        html_escape(&form.question)
    ));
    html.push_str("<button type=\"submit\" form=\"ask\">🚀 Scan the web</button>\n");

    match outcome {
        Outcome::MissingKeys => {
            html.push_str(&format!("<div class=\"warning\">{MISSING_KEYS_WARNING}</div>\n"));
        }
        Outcome::Ready => {}
        Outcome::Breakdown(report) => render_report(&mut html, report),
        Outcome::Failed(message) => {
            html.push_str(&format!(
                "<div class=\"error\">{ERROR_PREFIX}{}</div>\n",
                html_escape(message)
            ));
        }
    }

    html.push_str("</main>\n</body>\n</html>\n");
    html
}

fn render_report(html: &mut String, report: &Report) {
    html.push_str("<hr>\n<h2>⚡ The Breakdown:</h2>\n");
    html.push_str(&format!(
        "<div class=\"story\">{}</div>\n",
        html_escape(&report.state.final_story)
    ));

    html.push_str("<details class=\"receipts\">\n");
    html.push_str(&format!(
        "<summary>🛠️ See the receipts ({} Tavily sources)</summary>\n<ol class=\"sources\">\n",
        report.sources.len()
    ));
    for source in &report.sources {
        let label = if source.title.is_empty() {
            &source.url
        } else {
            &source.title
        };
        html.push_str(&format!(
            "<li class=\"source\"><a href=\"{url}\">{label}</a><div class=\"url\">{url}</div><pre>{content}</pre></li>\n",
            url = html_escape(&source.url),
            label = html_escape(label),
            content = html_escape(&source.content),
        ));
    }
    html.push_str("</ol>\n");
    html.push_str(&format!(
        "<p class=\"meta\">Scanned {} in {:.2?}</p>\n</details>\n",
        report.completed_at.format("%Y-%m-%d %H:%M:%S UTC"),
        report.elapsed
    ));
}

/// Escape HTML special characters.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>TREND ALERT | No Bullshit News</title>
<style>
body { display: flex; margin: 0; font-family: sans-serif; }
.sidebar { width: 18rem; padding: 1rem; background: #f0f2f6; min-height: 100vh; }
.sidebar label { display: block; margin-bottom: 0.75rem; }
main { flex: 1; padding: 1rem 2rem; }
input { display: block; width: 100%; box-sizing: border-box; padding: 0.4rem; }
.question { display: block; margin-bottom: 0.5rem; }
.story { white-space: pre-wrap; }
.success { background: #dff5e3; padding: 0.5rem; }
.warning { background: #fff4d6; padding: 0.5rem; margin-top: 1rem; }
.error { background: #fde2e2; padding: 0.5rem; margin-top: 1rem; }
.sources pre { white-space: pre-wrap; }
</style>
</head>
"#;
