use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use sea_orm::Database;
use serde_json::{Value, json};
use tower::ServiceExt;

use engine::Engine;
use migration::MigratorTrait;
use server::{ServerState, router};

struct TestApp {
    app: Router,
    engine: Arc<Engine>,
}

async fn test_app() -> TestApp {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Arc::new(Engine::builder().database(db).build().await.unwrap());
    let app = router(ServerState {
        engine: engine.clone(),
    });
    TestApp { app, engine }
}

fn request(method: Method, uri: &str, principal: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(id) = principal {
        builder = builder
            .header("x-principal-id", id)
            .header("x-principal-email", format!("{id}@example.org"))
            .header("x-principal-name", id.to_uppercase());
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn scan() -> Value {
    json!({ "name": "scan.pdf", "content_type": "application/pdf", "size": 4 })
}

impl TestApp {
    async fn send(&self, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let res = self.app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    async fn json(
        &self,
        method: Method,
        uri: &str,
        principal: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, bytes) = self.send(request(method, uri, Some(principal), body)).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    /// Owner `owner`, approved members `alice` and `bob`, category "Travel".
    async fn seeded(&self) -> String {
        for id in ["owner", "alice", "bob"] {
            let (status, _) = self.json(Method::POST, "/session", id, None).await;
            assert_eq!(status, StatusCode::OK);
        }
        self.engine.bootstrap_owner("owner@example.org").await.unwrap();
        for id in ["alice", "bob"] {
            let (status, _) = self
                .json(
                    Method::POST,
                    &format!("/users/{id}/status"),
                    "owner",
                    Some(json!({ "status": "approved" })),
                )
                .await;
            assert_eq!(status, StatusCode::OK);
        }
        let (status, category) = self
            .json(
                Method::POST,
                "/categories",
                "owner",
                Some(json!({ "name": "Travel" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        category["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn requests_without_principal_are_unauthorized() {
    let app = test_app().await;
    let (status, body) = app.send(request(Method::GET, "/me", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"], "missing principal headers");
}

#[tokio::test]
async fn first_session_is_pending_and_cannot_read_receipts() {
    let app = test_app().await;
    let (status, user) = app.json(Method::POST, "/session", "dave", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["role"], "member");
    assert_eq!(user["status"], "pending");
    assert_eq!(user["display_name"], "DAVE");

    let (status, body) = app.json(Method::GET, "/receipts", "dave", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("pending"));
}

#[tokio::test]
async fn receipt_lifecycle_over_http() {
    let app = test_app().await;
    let category_id = app.seeded().await;

    let (status, receipt) = app
        .json(
            Method::POST,
            "/receipts",
            "alice",
            Some(json!({
                "category_id": category_id,
                "amount": "12,34",
                "receipt_date": "2026-03-14",
                "file": scan(),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(receipt["amount_cents"], 1234);
    assert_eq!(receipt["currency"], "EUR");
    assert_eq!(receipt["file"]["download_url"], "");
    let id = receipt["id"].as_str().unwrap().to_string();

    let (status, updated) = app
        .json(
            Method::PATCH,
            &format!("/receipts/{id}"),
            "alice",
            Some(json!({ "amount": "20" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["amount_cents"], 2000);
    assert_eq!(updated["edit_count"], 1);

    let (status, list) = app.json(Method::GET, "/receipts", "alice", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["total_cents"], 2000);
    assert_eq!(list["by_month"][0]["year_month"], "2026-03");
    assert_eq!(list["by_category"][0]["label"], "Travel");

    let (status, history) = app
        .json(Method::GET, &format!("/receipts/{id}/history"), "alice", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history[0]["action"], "update");
    assert_eq!(history[0]["patch"]["amount_cents"], 2000);
    assert_eq!(history[1]["action"], "create");

    // bob neither sees nor deletes it
    let (status, _) = app
        .json(Method::GET, &format!("/receipts/{id}"), "bob", None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .json(Method::POST, &format!("/receipts/{id}/delete"), "bob", None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    for _ in 0..2 {
        let (status, _) = app
            .json(Method::POST, &format!("/receipts/{id}/delete"), "alice", None)
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
    let (_, list) = app.json(Method::GET, "/receipts", "alice", None).await;
    assert_eq!(list["receipts"].as_array().unwrap().len(), 0);
    let (_, list) = app
        .json(Method::GET, "/receipts?include_deleted=true", "alice", None)
        .await;
    assert_eq!(list["receipts"][0]["deleted_by_user_id"], "alice");
}

#[tokio::test]
async fn validation_errors_are_unprocessable() {
    let app = test_app().await;
    let category_id = app.seeded().await;

    let (status, body) = app
        .json(
            Method::POST,
            "/receipts",
            "alice",
            Some(json!({
                "category_id": category_id,
                "amount": "12.345",
                "receipt_date": "2026-03-14",
                "file": scan(),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Invalid amount: too many decimals");

    let (status, _) = app
        .json(
            Method::POST,
            "/receipts",
            "alice",
            Some(json!({
                "category_id": category_id,
                "amount": "5",
                "receipt_date": "2026-02-30",
                "file": scan(),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = app
        .json(
            Method::POST,
            "/receipts",
            "alice",
            Some(json!({
                "category_id": category_id,
                "amount": "5",
                "receipt_date": "2026-03-14",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Invalid file: a receipt file is required");
}

#[tokio::test]
async fn file_upload_sets_download_url() {
    let app = test_app().await;
    let category_id = app.seeded().await;
    let (_, receipt) = app
        .json(
            Method::POST,
            "/receipts",
            "alice",
            Some(json!({
                "category_id": category_id,
                "amount": "3.50",
                "receipt_date": "2026-03-01",
                "file": scan(),
            })),
        )
        .await;
    let id = receipt["id"].as_str().unwrap();

    let req = Request::builder()
        .method(Method::PUT)
        .uri(format!("/receipts/{id}/file?name=scan.pdf"))
        .header("x-principal-id", "alice")
        .header(header::CONTENT_TYPE, "application/pdf")
        .body(Body::from(vec![1u8, 2, 3, 4]))
        .unwrap();
    let (status, bytes) = app.send(req).await;
    assert_eq!(status, StatusCode::OK);
    let file: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(file["size"], 4);
    assert_eq!(file["content_type"], "application/pdf");
    assert_eq!(
        file["download_url"],
        format!("memory://receipts/alice/{id}/scan.pdf")
    );
}

#[tokio::test]
async fn export_is_csv_and_audit_log_is_staff_only() {
    let app = test_app().await;
    let category_id = app.seeded().await;
    app.json(
        Method::POST,
        "/receipts",
        "alice",
        Some(json!({
            "category_id": category_id,
            "amount": "10",
            "receipt_date": "2026-03-02",
            "file": scan(),
        })),
    )
    .await;

    let res = app
        .app
        .clone()
        .oneshot(request(Method::GET, "/export", Some("owner"), None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert!(lines[0].starts_with("receiptId,receiptDate,receiptDatePretty"));
    assert_eq!(lines[1], "SUMMARY,,,,,,1000,10.00,");
    assert!(lines[2].contains(",02.03.2026,Travel,alice,ALICE,1000,10.00,no"));

    let (status, _) = app.json(Method::GET, "/revisions", "alice", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, page) = app
        .json(Method::GET, "/revisions?limit=10", "owner", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["revisions"].as_array().unwrap().len(), 1);
    assert!(page["next_cursor"].is_null());
}

#[tokio::test]
async fn whitelist_and_categories_over_http() {
    let app = test_app().await;
    app.seeded().await;

    let (status, entry) = app
        .json(
            Method::POST,
            "/whitelist",
            "owner",
            Some(json!({ "email": "Eve@Example.org", "note": "contractor" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(entry["email"], "eve@example.org");

    let (_, eve) = app.json(Method::POST, "/session", "eve", None).await;
    assert_eq!(eve["status"], "approved");

    let (status, _) = app
        .json(Method::DELETE, "/whitelist/eve@example.org", "owner", None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.json(Method::GET, "/whitelist", "alice", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .json(
            Method::POST,
            "/categories",
            "owner",
            Some(json!({ "name": "travel" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "\"travel\" already present!");

    let (status, _) = app
        .json(Method::PATCH, "/categories/00000000-0000-0000-0000-000000000000", "owner", Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
