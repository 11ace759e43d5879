use axum::routing::get;
use axum::Router;

use crate::handlers::convert;
use crate::state::AppState;

/// Mount the upload form and conversion endpoint at the root.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(convert::upload_form).post(convert::convert))
}
