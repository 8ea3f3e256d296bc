//! One module per `WebDAV` method served by the local engine.

pub mod copy_move;
pub mod delete;
pub mod get_head;
pub mod lock;
pub mod mkcol;
pub mod options;
pub mod propfind;
pub mod put;

use std::path::Path;

use salvo::Response;
use salvo::http::header::ALLOW;
use salvo::http::{HeaderValue, StatusCode};
use salvo::writing::Text;

use super::ALLOWED_METHODS;

pub(crate) fn set_allow(res: &mut Response) {
    res.headers_mut()
        .insert(ALLOW, HeaderValue::from_static(ALLOWED_METHODS));
}

pub(crate) fn render_xml(
    res: &mut Response,
    status: StatusCode,
    body: Result<String, quick_xml::Error>,
) {
    match body {
        Ok(body) => {
            res.status_code(status);
            res.render(Text::Xml(body));
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize XML body");
            res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
        }
    }
}

/// Whether the parent directory of `target` exists.
pub(crate) async fn parent_exists(target: &Path) -> bool {
    match target.parent() {
        Some(parent) => tokio::fs::metadata(parent)
            .await
            .is_ok_and(|meta| meta.is_dir()),
        None => false,
    }
}
