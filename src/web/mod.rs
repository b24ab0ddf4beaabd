//! Single-page web UI and the PNG endpoint.

use std::num::NonZeroU16;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Form, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use tracing::{error, info, warn};

use crate::error::MemeError;
use crate::generator::MemeGenerator;

mod views;

use views::{CaptionForm, HomeTemplate};

#[derive(Clone, Debug)]
pub(crate) struct AppState {
    generator: Arc<MemeGenerator>,
}

impl AppState {
    fn new(generator: MemeGenerator) -> Self {
        Self {
            generator: Arc::new(generator),
        }
    }
}

async fn root_handler(State(state): State<AppState>) -> HomeTemplate {
    HomeTemplate::with_default_caption(state.generator.model())
}

/// Renders the page with either the meme or what went wrong.
async fn generate_handler(
    State(state): State<AppState>,
    Form(form): Form<CaptionForm>,
) -> Result<HomeTemplate, MemeError> {
    let caption = form.caption();
    let mut page = HomeTemplate::new(&caption, state.generator.model());
    if caption.is_empty() {
        page.warn("Please enter some caption text first.");
        return Ok(page);
    }

    match state.generator.generate(&caption).await {
        Ok(composed) => {
            let png = composed.to_png()?;
            info!("Serving {} byte meme", png.len());
            page.show_png(&png);
        }
        Err(err) => {
            warn!("Meme generation failed: {}", err);
            page.fail(err.user_message());
        }
    }
    Ok(page)
}

/// Raw PNG for scripts; failures use the error's status code.
async fn api_meme_handler(
    State(state): State<AppState>,
    Form(form): Form<CaptionForm>,
) -> Result<Response, MemeError> {
    let composed = state.generator.generate(&form.caption()).await?;
    let png = composed.to_png()?;
    Ok(([(CONTENT_TYPE, "image/png")], png).into_response())
}

async fn styles_handler() -> impl IntoResponse {
    const STYLES: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/static/styles.css"));
    ([(CONTENT_TYPE, "text/css")], STYLES)
}

fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", axum::routing::get(root_handler))
        .route("/generate", axum::routing::post(generate_handler))
        .route("/api/meme", axum::routing::post(api_meme_handler))
        .route("/static/styles.css", axum::routing::get(styles_handler))
}

/// Serves the UI until the listener fails.
pub async fn setup_server(
    listen_addr: &str,
    port: NonZeroU16,
    generator: MemeGenerator,
) -> Result<(), anyhow::Error> {
    let app = create_router().with_state(AppState::new(generator));

    let addr = format!("{}:{}", listen_addr, port);
    info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    if let Err(err) = axum::serve(listener, app).await {
        error!("Server error: {}", err);
    }
    Ok(())
}
