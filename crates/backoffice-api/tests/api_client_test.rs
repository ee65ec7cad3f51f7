#![allow(clippy::unwrap_used)]
// Integration tests for `ApiClient` using wiremock.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{
    body_json, body_string_contains, header, method, path, query_param, query_param_is_missing,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

use backoffice_api::{
    ApiClient, AttachmentUpload, EffectiveRateQuery, Error, Language, ListQuery, StaticToken,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ApiClient) {
    let server = MockServer::start().await;
    let client = ApiClient::with_client(
        reqwest::Client::new(),
        &format!("{}/api", server.uri()),
        Arc::new(StaticToken::new("tok-123")),
        Language::En,
    )
    .unwrap();
    (server, client)
}

// ── Headers ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_requests_carry_token_and_language() {
    let (server, client) = setup().await;
    client.set_language(Language::Ar);

    Mock::given(method("GET"))
        .and(path("/api/vendors/4"))
        .and(header("authorization", "Bearer tok-123"))
        .and(header("accept-language", "ar"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": {"id": 4, "name": "Acme"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let vendor = client.fetch("vendors", "4").await.unwrap();
    assert_eq!(vendor["name"], "Acme");
}

#[tokio::test]
async fn test_missing_token_fails_before_sending() {
    let server = MockServer::start().await;
    let client = ApiClient::with_client(
        reqwest::Client::new(),
        &server.uri(),
        Arc::new(StaticToken::none()),
        Language::En,
    )
    .unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client.list("vendors", &ListQuery::page(1)).await.unwrap_err();
    assert!(matches!(err, Error::MissingToken));
    assert!(err.is_auth_expired());
}

// ── Lists ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_sends_paging_and_normalizes_meta() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/employees"))
        .and(query_param("page", "2"))
        .and(query_param("per_page", "10"))
        .and(query_param("search", "sara"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "data": [{"id": 11, "name": "Sara"}],
                "current_page": 2,
                "last_page": 3,
                "per_page": 10,
                "total": 21
            }
        })))
        .mount(&server)
        .await;

    let page = client
        .list("employees", &ListQuery::page(2).per_page(10).search("sara"))
        .await
        .unwrap();

    assert_eq!(page.items.len(), 1);
    let meta = page.meta.unwrap();
    assert_eq!(meta.current_page, 2);
    assert_eq!(meta.last_page, 3);
    assert_eq!(meta.total, 21);
}

#[tokio::test]
async fn test_blank_search_is_not_sent() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/banks"))
        .and(query_param_is_missing("search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(1)
        .mount(&server)
        .await;

    let page = client
        .list("banks", &ListQuery::page(1).search("  "))
        .await
        .unwrap();
    assert!(page.meta.is_none());
}

#[tokio::test]
async fn test_tree_returns_roots() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/accounts/tree"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": 1, "name": "Assets", "children": [{"id": 2, "name": "Cash", "children": []}]}
            ]
        })))
        .mount(&server)
        .await;

    let roots = client.tree("accounts").await.unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0]["children"][0]["name"], "Cash");
}

// ── Writes ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_create_returns_entity_and_message() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/currencies"))
        .and(body_json(json!({"code": "USD"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "message": "Currency created",
            "data": {"id": 9, "code": "USD"}
        })))
        .mount(&server)
        .await;

    let m = client
        .create("currencies", &json!({"code": "USD"}))
        .await
        .unwrap();
    assert_eq!(m.message.as_deref(), Some("Currency created"));
    assert_eq!(m.entity.unwrap()["id"], 9);
}

#[tokio::test]
async fn test_toggle_status_uses_patch() {
    let (server, client) = setup().await;

    Mock::given(method("PATCH"))
        .and(path("/api/branches/3/toggle-status"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": {"id": 3, "is_active": false}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let m = client.toggle_status("branches", "3").await.unwrap();
    assert_eq!(m.entity.unwrap()["is_active"], false);
}

#[tokio::test]
async fn test_action_posts_to_action_path() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/journal-entries/12/post"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Posted"})))
        .expect(1)
        .mount(&server)
        .await;

    let m = client
        .action("journal-entries", "12", "post", None)
        .await
        .unwrap();
    assert_eq!(m.message.as_deref(), Some("Posted"));
    assert!(m.entity.is_none());
}

#[tokio::test]
async fn test_delete_with_empty_body() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/vendors/4"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let m = client.remove("vendors", "4").await.unwrap();
    assert!(m.entity.is_none());
    assert!(m.message.is_none());
}

#[tokio::test]
async fn test_multipart_update_spoofs_put() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/journal-entries/7"))
        .and(body_string_contains("name=\"_method\""))
        .and(body_string_contains("name=\"lines[0][debit]\""))
        .and(body_string_contains("name=\"attachments[]\"; filename=\"receipt.pdf\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"id": 7}})))
        .expect(1)
        .mount(&server)
        .await;

    let files = vec![AttachmentUpload::new("receipt.pdf", b"%PDF-1.4".to_vec())];
    let m = client
        .update_with_attachments(
            "journal-entries",
            "7",
            &json!({"lines": [{"debit": "10.00"}]}),
            &files,
        )
        .await
        .unwrap();
    assert_eq!(m.entity.unwrap()["id"], 7);
}

#[tokio::test]
async fn test_delete_attachment_path() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/journal-entries/7/attachments/55"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Deleted"})))
        .expect(1)
        .mount(&server)
        .await;

    client
        .delete_attachment("journal-entries", "7", "55")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_effective_rate_query() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/exchange-rates/effective"))
        .and(query_param("currency_id", "2"))
        .and(query_param("date", "2024-03-01"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": {"rate": "3.6725"}})),
        )
        .mount(&server)
        .await;

    let rate = client
        .effective_exchange_rate(&EffectiveRateQuery {
            currency_id: "2".into(),
            date: chrono::NaiveDate::from_ymd_opt(2024, 3, 1),
        })
        .await
        .unwrap();
    assert_eq!(rate["rate"], "3.6725");
}

#[tokio::test]
async fn test_save_account_links_wraps_links() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/account-links"))
        .and(body_json(json!({"links": [{"key": "cash", "account_id": 14}]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Saved"})))
        .expect(1)
        .mount(&server)
        .await;

    client
        .save_account_links(&json!([{"key": "cash", "account_id": 14}]))
        .await
        .unwrap();
}

// ── Errors ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_validation_errors_are_flattened() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/vendors"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "message": "The given data was invalid.",
            "errors": {
                "name": ["The name field is required."],
                "email": ["The email must be valid."]
            }
        })))
        .mount(&server)
        .await;

    let err = client.create("vendors", &json!({})).await.unwrap_err();
    match &err {
        Error::Validation { fields, .. } => assert_eq!(fields.len(), 2),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(
        err.user_message(),
        "The name field is required., The email must be valid."
    );
}

#[tokio::test]
async fn test_unauthorized_is_auth_expired() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Unauthenticated."})))
        .mount(&server)
        .await;

    let err = client.me().await.unwrap_err();
    assert!(err.is_auth_expired());
}

#[tokio::test]
async fn test_not_found_keeps_status() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/vendors/999"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not found"})))
        .mount(&server)
        .await;

    let err = client.fetch("vendors", "999").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.user_message(), "Not found");
}

// ── Auth ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_is_anonymous() {
    let server = MockServer::start().await;
    let client = ApiClient::with_client(
        reqwest::Client::new(),
        &server.uri(),
        Arc::new(StaticToken::none()),
        Language::En,
    )
    .unwrap();

    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_json(json!({"email": "hr@example.com", "password": "s3cret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"token": "abc", "user": {"id": 1, "name": "HR"}}
        })))
        .mount(&server)
        .await;

    let body = client
        .login("hr@example.com", &SecretString::from("s3cret".to_owned()))
        .await
        .unwrap();
    assert_eq!(body["data"]["token"], "abc");
}

// ── Attachments ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_upload_from_path_reads_name_and_mime() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("scan.png");
    std::fs::write(&file, [0x89, b'P', b'N', b'G']).unwrap();

    let upload = AttachmentUpload::from_path(&file).await.unwrap();
    assert_eq!(upload.file_name, "scan.png");
    assert_eq!(upload.mime, "image/png");
    assert_eq!(upload.size(), 4);
}
