//! Tests for cross-origin headers and preflight handling.

use salvo::http::StatusCode;

use super::helpers::*;

fn cors_gate(hosts: &str) -> TestGate {
    TestGate::new(&format!(
        r#"
        [auth]
        enabled = true

        [cors]
        enabled = true
        credentials = true
        allowed_hosts = {hosts}
        allowed_headers = ["Authorization", "Depth"]
        allowed_methods = ["GET", "PROPFIND"]
        exposed_headers = ["ETag"]

        [[users]]
        username = "bob"
        password = "pw"
        root = "{{root}}/bob"
        "#
    ))
}

#[test_log::test(tokio::test)]
async fn no_origin_means_no_cors_headers() {
    let gate = cors_gate(r#"["*"]"#);
    gate.write("bob/a.txt", "a");

    TestRequest::get("/a.txt")
        .auth("bob", "pw")
        .send(gate.service())
        .await
        .assert_status(StatusCode::OK)
        .assert_header_absent("Access-Control-Allow-Origin")
        .assert_header_absent("Access-Control-Allow-Methods");
}

#[test_log::test(tokio::test)]
async fn wildcard_host_answers_star() {
    let gate = cors_gate(r#"["*"]"#);
    gate.write("bob/a.txt", "a");

    TestRequest::get("/a.txt")
        .auth("bob", "pw")
        .origin("https://app.example")
        .send(gate.service())
        .await
        .assert_status(StatusCode::OK)
        .assert_header("Access-Control-Allow-Origin", "*")
        .assert_header("Access-Control-Allow-Headers", "Authorization, Depth")
        .assert_header("Access-Control-Allow-Methods", "GET, PROPFIND")
        .assert_header("Access-Control-Allow-Credentials", "true")
        .assert_header("Access-Control-Expose-Headers", "ETag");
}

#[test_log::test(tokio::test)]
async fn listed_origin_is_echoed_and_unlisted_gets_nothing() {
    let gate = cors_gate(r#"["https://app.example"]"#);
    gate.write("bob/a.txt", "a");

    TestRequest::get("/a.txt")
        .auth("bob", "pw")
        .origin("https://app.example")
        .send(gate.service())
        .await
        .assert_status(StatusCode::OK)
        .assert_header("Access-Control-Allow-Origin", "https://app.example");

    TestRequest::get("/a.txt")
        .auth("bob", "pw")
        .origin("https://evil.example")
        .send(gate.service())
        .await
        .assert_status(StatusCode::OK)
        .assert_header_absent("Access-Control-Allow-Origin");
}

/// ## Summary
/// A preflight is answered before authentication, with or without a listed origin.
#[test_log::test(tokio::test)]
async fn preflight_returns_before_authentication() {
    let gate = cors_gate(r#"["https://app.example"]"#);

    TestRequest::options("/anything")
        .origin("https://app.example")
        .header("Access-Control-Request-Method", "PROPFIND")
        .send(gate.service())
        .await
        .assert_status(StatusCode::OK)
        .assert_header("Access-Control-Allow-Origin", "https://app.example")
        .assert_header_absent("WWW-Authenticate");

    TestRequest::options("/anything")
        .origin("https://evil.example")
        .send(gate.service())
        .await
        .assert_status(StatusCode::OK)
        .assert_header_absent("Access-Control-Allow-Origin");
}

#[test_log::test(tokio::test)]
async fn options_without_origin_needs_credentials() {
    let gate = cors_gate(r#"["*"]"#);

    TestRequest::options("/")
        .send(gate.service())
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    TestRequest::options("/")
        .auth("bob", "pw")
        .send(gate.service())
        .await
        .assert_status(StatusCode::OK)
        .assert_header_contains("DAV", "1")
        .assert_header_contains("Allow", "PROPFIND");
}

#[test_log::test(tokio::test)]
async fn disabled_cors_ignores_origin() {
    let gate = TestGate::new(
        r#"
        [[users]]
        username = "bob"
        password = "pw"
        root = "{root}/bob"
        "#,
    );

    TestRequest::options("/")
        .origin("https://app.example")
        .send(gate.service())
        .await
        .assert_status(StatusCode::UNAUTHORIZED)
        .assert_header_absent("Access-Control-Allow-Origin");
}

/// ## Summary
/// A rejected request from an allowed origin still carries the CORS headers,
/// so the browser can read the 401.
#[test_log::test(tokio::test)]
async fn failed_authentication_keeps_cors_headers() {
    let gate = cors_gate(r#"["https://app.example"]"#);
    gate.write("bob/a.txt", "a");

    TestRequest::get("/a.txt")
        .auth("bob", "wrong")
        .origin("https://app.example")
        .send(gate.service())
        .await
        .assert_status(StatusCode::UNAUTHORIZED)
        .assert_header("Access-Control-Allow-Origin", "https://app.example")
        .assert_header("Access-Control-Allow-Credentials", "true")
        .assert_body_empty();

    TestRequest::get("/a.txt")
        .origin("https://app.example")
        .send(gate.service())
        .await
        .assert_status(StatusCode::UNAUTHORIZED)
        .assert_header("Access-Control-Allow-Origin", "https://app.example");
}
