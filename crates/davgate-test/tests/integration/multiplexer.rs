//! Tests for per-principal engine reuse through the full pipeline.

use salvo::http::StatusCode;

use super::helpers::*;

const CONFIG: &str = r#"
    [defaults]
    root = "{root}/shared"
    modify = true

    [[users]]
    username = "bob"
    password = "pw"

    [[users]]
    username = "alice"
    password = "pw"
"#;

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 4))]
async fn concurrent_first_requests_share_one_engine() {
    let gate = TestGate::new(CONFIG);
    gate.write("shared/a.txt", "a");

    let requests = (0..16).map(|_| {
        TestRequest::get("/a.txt")
            .auth("bob", "pw")
            .send(gate.service())
    });
    let responses = futures::future::join_all(requests).await;

    assert!(
        responses.iter().all(|r| r.status == StatusCode::OK),
        "every concurrent request should succeed"
    );
    assert_eq!(gate.gate().multiplexer().engine_count(), 1);
}

/// ## Summary
/// Users sharing a root still hold locks in separate namespaces.
#[test_log::test(tokio::test)]
async fn lock_namespaces_are_per_principal() {
    let gate = TestGate::new(CONFIG);
    gate.write("shared/a.txt", "a");

    TestRequest::lock("/a.txt")
        .auth("bob", "pw")
        .xml_body(&lockinfo("bob"))
        .send(gate.service())
        .await
        .assert_status(StatusCode::OK);

    TestRequest::put("/a.txt")
        .auth("bob", "pw")
        .body("bob without token")
        .send(gate.service())
        .await
        .assert_status(StatusCode::LOCKED);

    TestRequest::put("/a.txt")
        .auth("alice", "pw")
        .body("alice")
        .send(gate.service())
        .await
        .assert_status(StatusCode::NO_CONTENT);

    assert_eq!(gate.gate().multiplexer().engine_count(), 2);
    assert_eq!(gate.read("shared/a.txt").as_deref(), Some("alice"));
}
