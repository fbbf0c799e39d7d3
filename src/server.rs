//! HTTP surface: the page routes plus a JSON endpoint for scripted use.

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use tokio::sync::Mutex;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};

use crate::diagnosis::{diagnose, GenerativeModel};
use crate::encoder::{encode_image, ImagePayload};
use crate::error::DetectorError;
use crate::page::{Page, DETECT_FAILED_NOTICE};
use crate::render::render_page;

/// Multipart field the upload forms use for the file.
pub const IMAGE_FIELD: &str = "image";

pub struct AppState {
    model: Arc<dyn GenerativeModel>,
    page: Mutex<Page>,
}

impl AppState {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self {
            model,
            page: Mutex::new(Page::new()),
        }
    }
}

pub fn router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/upload", post(upload_image))
        .route("/detect", post(detect))
        .route("/api/diagnose", post(api_diagnose))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    let mut page = state.page.lock().await;
    let notice = page.take_notice();
    Html(render_page(&page, notice.as_deref()))
}

/// Reads the image field. Any read problem is reported as `None`.
async fn read_image(multipart: &mut Multipart) -> Option<ImagePayload> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return None,
            Err(e) => {
                debug!(error = %e, "multipart stream ended early");
                return None;
            }
        };
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let declared = field.content_type().map(str::to_string);
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(error = %e, "could not read uploaded file");
                return None;
            }
        };
        if bytes.is_empty() {
            return None;
        }
        return Some(encode_image(&bytes, declared.as_deref()));
    }
}

async fn upload_image(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Redirect {
    match read_image(&mut multipart).await {
        Some(image) => {
            info!(mime_type = %image.mime_type, encoded_len = image.data.len(), "image uploaded");
            state.page.lock().await.select_image(image);
        }
        None => debug!("upload carried no readable image, page unchanged"),
    }
    Redirect::to("/")
}

async fn detect(State(state): State<Arc<AppState>>) -> Redirect {
    // the lock is released before the model call
    let image = state.page.lock().await.begin_detect();
    let Some(image) = image else {
        debug!("detect requested without an image");
        return Redirect::to("/");
    };

    // runs detached so a dropped request still settles the page
    let task = tokio::spawn({
        let state = Arc::clone(&state);
        async move {
            let outcome = diagnose(state.model.as_ref(), &[image]).await;
            if let Err(e) = &outcome {
                warn!(error = %e, "crop diagnosis failed");
            }
            state.page.lock().await.finish_detect(outcome);
        }
    });

    if let Err(e) = task.await {
        warn!(error = %e, "detection task did not complete");
        state
            .page
            .lock()
            .await
            .finish_detect(Err(DetectorError::Task(e.to_string())));
    }
    Redirect::to("/")
}

async fn api_diagnose(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    let Some(image) = read_image(&mut multipart).await else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": DetectorError::NoImage.to_string() })),
        )
            .into_response();
    };

    match diagnose(state.model.as_ref(), &[image]).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => {
            warn!(error = %e, "crop diagnosis failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": DETECT_FAILED_NOTICE })),
            )
                .into_response()
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
