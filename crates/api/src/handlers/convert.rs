//! Handlers for the upload form and the conversion endpoint.
//!
//! Routes (mounted at the root):
//! - `GET  /` -- HTML upload form for manual testing
//! - `POST /` -- multipart upload (`file`, optional `params`), responds with
//!   the converted PDF as an attachment

use axum::extract::{Multipart, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::HeaderValue;
use axum::response::{Html, IntoResponse, Response};

use crate::error::{AppError, AppResult};
use crate::orchestrator::{ConversionRequest, RequestOrchestrator, UploadedFile};
use crate::state::AppState;

/// Multipart field carrying the document.
pub const FILE_FIELD: &str = "file";

/// Multipart field carrying the engine options.
pub const PARAMS_FIELD: &str = "params";

const UPLOAD_FORM: &str = r#"<!doctype html>
<html>
<head><title>pdfrelay</title></head>
<body>
<h1>Upload a PDF for OCR</h1>
<form method="post" enctype="multipart/form-data">
  <p><label>Options <input type="text" name="params" size="60" placeholder="--deskew -l eng"></label></p>
  <p><input type="file" name="file" accept="application/pdf"></p>
  <p><input type="submit" value="Convert"></p>
</form>
</body>
</html>
"#;

/// GET /
pub async fn upload_form() -> Html<&'static str> {
    Html(UPLOAD_FORM)
}

/// POST /
///
/// Parts other than `file` and `params` are ignored. If a part is repeated
/// the last one wins.
pub async fn convert(State(state): State<AppState>, mut multipart: Multipart) -> AppResult<Response> {
    let mut request = ConversionRequest::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(FILE_FIELD) => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                request.file = Some(UploadedFile { filename, bytes });
            }
            Some(PARAMS_FIELD) => {
                request.params = Some(field.text().await?);
            }
            _ => {}
        }
    }

    let converted = RequestOrchestrator::new(&state).handle(request).await?;

    let disposition = HeaderValue::from_str(&content_disposition(&converted.filename))
        .map_err(|e| AppError::InternalError(format!("Invalid Content-Disposition: {e}")))?;

    Ok((
        [
            (CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (CONTENT_DISPOSITION, disposition),
        ],
        converted.bytes,
    )
        .into_response())
}

/// `attachment` disposition naming `filename`.
///
/// Non-ASCII names get an ASCII fallback plus an RFC 5987 `filename*`.
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();

    if filename.is_ascii() && fallback == filename {
        format!("attachment; filename=\"{fallback}\"")
    } else {
        format!(
            "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
            urlencoding::encode(filename)
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
