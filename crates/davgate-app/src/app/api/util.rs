use std::borrow::Cow;

use percent_encoding::percent_decode_str;
use salvo::Request;
use salvo::http::uri::Uri;

const DESTINATION: &str = "Destination";

/// ## Summary
/// Returns the decoded, canonical request path. Rules and the engine both see
/// this form, so `//a` and `/./a` are checked exactly like `/a`.
///
/// Returns `None` when the path has a `..` segment.
#[must_use]
pub fn request_path(req: &Request) -> Option<String> {
    canonical_path(&decode_path(req.uri().path()))
}

/// ## Summary
/// Returns the canonical path named by the `Destination` header, with any
/// scheme and authority stripped.
///
/// Returns `None` when the header is missing, unparsable, or climbs with `..`.
#[must_use]
pub fn destination_path(req: &Request) -> Option<String> {
    let raw = req.headers().get(DESTINATION)?.to_str().ok()?;
    let uri = raw.parse::<Uri>().ok()?;
    canonical_path(&decode_path(uri.path()))
}

fn decode_path(raw: &str) -> Cow<'_, str> {
    percent_decode_str(raw)
        .decode_utf8()
        .unwrap_or(Cow::Borrowed(raw))
}

/// Collapses repeated `/` and drops `.` segments. A trailing `/` survives.
fn canonical_path(decoded: &str) -> Option<String> {
    let mut segments = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => return None,
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        return Some("/".to_string());
    }

    let mut path = String::with_capacity(decoded.len());
    for segment in segments {
        path.push('/');
        path.push_str(segment);
    }
    if decoded.ends_with('/') {
        path.push('/');
    }
    Some(path)
}
