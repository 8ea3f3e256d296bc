use salvo::Response;
use salvo::http::{HeaderValue, StatusCode};

/// Advertises the supported methods and `DAV` compliance classes 1 and 2.
pub fn options(res: &mut Response) {
    super::set_allow(res);
    let headers = res.headers_mut();
    headers.insert("dav", HeaderValue::from_static("1, 2"));
    headers.insert("ms-author-via", HeaderValue::from_static("DAV"));
    res.status_code(StatusCode::OK);
}
