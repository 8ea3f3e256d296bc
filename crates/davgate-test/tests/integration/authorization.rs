//! Tests for path rules and the modify flag.

use salvo::http::StatusCode;

use super::helpers::*;

const RULES_CONFIG: &str = r#"
    [defaults]
    root = "{root}/data"
    modify = true

    [[users]]
    username = "bob"
    password = "pw"
    rules = [
        { path = "/docs/public", allow = true },
        { path = "/docs", allow = false },
        { path = "\\.secret$", regex = true, allow = false },
    ]

    [[users]]
    username = "reader"
    password = "pw"
    modify = false
"#;

#[test_log::test(tokio::test)]
async fn first_matching_rule_wins() {
    let gate = TestGate::new(RULES_CONFIG);
    gate.write("data/docs/public/a.txt", "public");
    gate.write("data/docs/internal/b.txt", "internal");

    TestRequest::get("/docs/public/a.txt")
        .auth("bob", "pw")
        .send(gate.service())
        .await
        .assert_status(StatusCode::OK)
        .assert_body_contains("public");

    TestRequest::get("/docs/internal/b.txt")
        .auth("bob", "pw")
        .send(gate.service())
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[test_log::test(tokio::test)]
async fn regex_rules_match_anywhere() {
    let gate = TestGate::new(RULES_CONFIG);
    gate.write("data/keys/api.secret", "k");
    gate.write("data/keys/api.secret.txt", "not a match");

    TestRequest::get("/keys/api.secret")
        .auth("bob", "pw")
        .send(gate.service())
        .await
        .assert_status(StatusCode::FORBIDDEN);

    TestRequest::get("/keys/api.secret.txt")
        .auth("bob", "pw")
        .send(gate.service())
        .await
        .assert_status(StatusCode::OK);
}

#[test_log::test(tokio::test)]
async fn read_only_user_cannot_modify() {
    let gate = TestGate::new(RULES_CONFIG);
    gate.write("data/a.txt", "original");

    TestRequest::get("/a.txt")
        .auth("reader", "pw")
        .send(gate.service())
        .await
        .assert_status(StatusCode::OK);

    TestRequest::propfind("/")
        .auth("reader", "pw")
        .depth("1")
        .send(gate.service())
        .await
        .assert_status(StatusCode::MULTI_STATUS);

    TestRequest::put("/a.txt")
        .auth("reader", "pw")
        .body("changed")
        .send(gate.service())
        .await
        .assert_status(StatusCode::FORBIDDEN);

    TestRequest::mkcol("/new")
        .auth("reader", "pw")
        .send(gate.service())
        .await
        .assert_status(StatusCode::FORBIDDEN);

    TestRequest::delete("/a.txt")
        .auth("reader", "pw")
        .send(gate.service())
        .await
        .assert_status(StatusCode::FORBIDDEN);

    assert_eq!(gate.read("data/a.txt").as_deref(), Some("original"));
    assert!(!gate.exists("data/new"));
}

/// ## Summary
/// A copy or move is refused when its destination falls under a deny rule.
#[test_log::test(tokio::test)]
async fn destination_is_authorized_too() {
    let gate = TestGate::new(RULES_CONFIG);
    gate.write("data/a.txt", "a");

    TestRequest::copy("/a.txt")
        .auth("bob", "pw")
        .destination("/docs/internal/a.txt")
        .send(gate.service())
        .await
        .assert_status(StatusCode::FORBIDDEN);

    TestRequest::move_resource("/a.txt")
        .auth("bob", "pw")
        .destination("/docs/internal/a.txt")
        .send(gate.service())
        .await
        .assert_status(StatusCode::FORBIDDEN);

    assert!(gate.exists("data/a.txt"));
    assert!(!gate.exists("data/docs/internal/a.txt"));
}

/// ## Summary
/// Repeated slashes and `.` segments name the same resource, so they meet the
/// same rule.
#[test_log::test(tokio::test)]
async fn rules_see_the_canonical_path() {
    let gate = TestGate::new(RULES_CONFIG);
    gate.write("data/docs/internal/b.txt", "internal");

    for path in [
        "//docs/internal/b.txt",
        "/docs//internal/b.txt",
        "///docs/internal//b.txt",
    ] {
        TestRequest::get(path)
            .auth("bob", "pw")
            .send(gate.service())
            .await
            .assert_status(StatusCode::FORBIDDEN)
            .assert_body_not_contains("internal");
    }
}

#[test_log::test(tokio::test)]
async fn destination_is_canonicalized_before_rules() {
    let gate = TestGate::new(RULES_CONFIG);
    gate.write("data/a.txt", "a");
    gate.mkdir("data/docs/internal");

    for destination in [
        "//docs/internal/a.txt",
        "/./docs/internal/a.txt",
        "/docs/./internal//a.txt",
    ] {
        TestRequest::copy("/a.txt")
            .auth("bob", "pw")
            .destination(destination)
            .send(gate.service())
            .await
            .assert_status(StatusCode::FORBIDDEN);

        TestRequest::move_resource("/a.txt")
            .auth("bob", "pw")
            .destination(destination)
            .send(gate.service())
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    assert!(gate.exists("data/a.txt"));
    assert!(!gate.exists("data/docs/internal/a.txt"));
}

#[test_log::test(tokio::test)]
async fn destination_above_the_root_is_rejected() {
    let gate = TestGate::new(RULES_CONFIG);
    gate.write("data/a.txt", "a");

    TestRequest::copy("/a.txt")
        .auth("bob", "pw")
        .destination("/../escaped.txt")
        .send(gate.service())
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    assert!(!gate.exists("escaped.txt"));
}
