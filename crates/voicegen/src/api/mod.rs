//! HTTP surface: the producer side of the queue plus read-only job lookups.
//!
//! | Method | Path                | Response                               |
//! |--------|---------------------|----------------------------------------|
//! | POST   | `/api/generate`     | 303 to `/` or `/?error=<flag>`         |
//! | GET    | `/api/entries`      | JSON array of jobs, newest first       |
//! | GET    | `/api/entries/:id`  | JSON job or 404                        |
//! | GET    | `/health`           | `{"status":"ok"}`                      |
//! | GET    | anything else       | static files from the public dir       |

pub mod error;
pub mod routes;
pub mod state;
pub mod validation;

use axum::routing::{get, post};
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use state::AppState;
pub use validation::{validate_text, TextRejection};

/// Builds the application router.
pub fn build_router(state: AppState) -> Router {
    // `index.html` and generated audio (`audio/<id>.wav`) both live here.
    let public = ServeDir::new(&state.config.public_dir);

    Router::new()
        .route("/api/generate", post(routes::generate))
        .route("/api/entries", get(routes::list_entries))
        .route("/api/entries/:id", get(routes::get_entry))
        .route("/health", get(routes::health))
        .fallback_service(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
