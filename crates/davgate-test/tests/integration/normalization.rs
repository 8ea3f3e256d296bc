//! Tests for request rewriting around the engine.

use salvo::http::StatusCode;

use super::helpers::*;

const CONFIG: &str = r#"
    [[users]]
    username = "bob"
    password = "pw"
    root = "{root}/bob"
    modify = true
"#;

/// ## Summary
/// A browser `GET` on a collection is answered with a one-level listing.
#[test_log::test(tokio::test)]
async fn get_on_collection_lists_members() {
    let gate = TestGate::new(CONFIG);
    gate.write("bob/docs/a.txt", "a");
    gate.write("bob/docs/b.txt", "bb");
    gate.mkdir("bob/docs/sub");
    gate.write("bob/docs/sub/deep.txt", "deep");

    let response = TestRequest::get("/docs")
        .auth("bob", "pw")
        .send(gate.service())
        .await
        .assert_status(StatusCode::MULTI_STATUS)
        .assert_body_contains("<D:href>/docs/</D:href>")
        .assert_body_contains("<D:href>/docs/a.txt</D:href>")
        .assert_body_contains("<D:href>/docs/sub/</D:href>")
        .assert_body_not_contains("deep.txt");

    assert_eq!(response.count_multistatus_responses(), 4);
}

#[test_log::test(tokio::test)]
async fn get_on_collection_keeps_client_depth() {
    let gate = TestGate::new(CONFIG);
    gate.write("bob/docs/a.txt", "a");

    let response = TestRequest::get("/docs/")
        .auth("bob", "pw")
        .depth("0")
        .send(gate.service())
        .await
        .assert_status(StatusCode::MULTI_STATUS);

    assert_eq!(response.count_multistatus_responses(), 1);
}

#[test_log::test(tokio::test)]
async fn head_has_no_body() {
    let gate = TestGate::new(CONFIG);
    gate.write("bob/a.txt", "some content");

    TestRequest::head("/a.txt")
        .auth("bob", "pw")
        .send(gate.service())
        .await
        .assert_status(StatusCode::OK)
        .assert_body_empty();
}

#[test_log::test(tokio::test)]
async fn percent_encoded_paths_are_decoded() {
    let gate = TestGate::new(CONFIG);
    gate.mkdir("bob");

    TestRequest::put("/with%20space.txt")
        .auth("bob", "pw")
        .body("spaced")
        .send(gate.service())
        .await
        .assert_status(StatusCode::CREATED);

    assert_eq!(gate.read("bob/with space.txt").as_deref(), Some("spaced"));

    TestRequest::propfind("/")
        .auth("bob", "pw")
        .depth("1")
        .send(gate.service())
        .await
        .assert_status(StatusCode::MULTI_STATUS)
        .assert_body_contains("<D:href>/with%20space.txt</D:href>")
        .assert_body_contains("<D:displayname>with space.txt</D:displayname>");
}

#[test_log::test(tokio::test)]
async fn traversal_never_leaves_the_root() {
    let gate = TestGate::new(CONFIG);
    gate.mkdir("bob");
    gate.write("outside.txt", "outside");

    TestRequest::get("/%2e%2e/outside.txt")
        .auth("bob", "pw")
        .send(gate.service())
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
