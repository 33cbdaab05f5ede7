use axum::extract::{Form, Path, State};
use axum::response::Redirect;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::db::{job_repo, Database, DatabaseError, Job};

use super::error::ApiError;
use super::state::AppState;
use super::validation::validate_text;

#[derive(Debug, Deserialize)]
pub struct GenerateForm {
    /// A missing field is treated like empty text.
    #[serde(default)]
    pub text: String,
}

/// `POST /api/generate`: validates the text and enqueues a job.
pub async fn generate(
    State(state): State<AppState>,
    Form(form): Form<GenerateForm>,
) -> Result<Redirect, ApiError> {
    let text = match validate_text(&form.text, state.config.max_text_chars) {
        Ok(text) => text.to_string(),
        Err(rejection) => {
            tracing::debug!("Rejected submission: {}", rejection.as_flag());
            return Ok(Redirect::to(&rejection.redirect_target()));
        }
    };

    let job = with_store(&state, move |db| job_repo::create(db, &text)).await?;
    tracing::info!("Queued job {} ({} chars)", job.id, job.text.chars().count());

    Ok(Redirect::to("/"))
}

/// `GET /api/entries`: all jobs, newest first.
pub async fn list_entries(State(state): State<AppState>) -> Result<Json<Vec<Job>>, ApiError> {
    let jobs = with_store(&state, job_repo::list).await?;
    Ok(Json(jobs))
}

/// `GET /api/entries/:id`
pub async fn get_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Job>, ApiError> {
    with_store(&state, move |db| job_repo::get(db, id))
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound(id))
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Runs a blocking store call off the async executor. The call may wait up
/// to the store's busy timeout if the worker holds the write lock.
async fn with_store<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> Result<T, DatabaseError> + Send + 'static,
    T: Send + 'static,
{
    let db = state.db.clone();
    let result = tokio::task::spawn_blocking(move || f(&db)).await?;
    Ok(result?)
}
