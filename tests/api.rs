//! End-to-end tests against the full router.

use axum::http::{header, HeaderValue, StatusCode};
use axum_test::{
    multipart::{MultipartForm, Part},
    TestResponse, TestServer,
};
use health_wallet::{config::Config, create_router, db, state::AppState};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const MAX_UPLOAD_BYTES: usize = 4 * 1024;

struct TestApp {
    server: TestServer,
    pool: SqlitePool,
    upload_dir: PathBuf,
    _dir: TempDir,
}

async fn spawn_app() -> TestApp {
    spawn_app_with(&[]).await
}

/// Like `spawn_app`, with extra configuration values.
async fn spawn_app_with(extra: &[(&str, String)]) -> TestApp {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_url = format!("sqlite://{}", dir.path().join("api.db").display());
    let upload_dir = dir.path().join("uploads");
    let upload_dir_str = upload_dir.display().to_string();

    let config = Config::from_lookup(|key| match key {
        "JWT_SECRET" => Some("integration-test-secret".to_string()),
        "DATABASE_URL" => Some(db_url.clone()),
        "DATABASE_MAX_CONNECTIONS" => Some("2".to_string()),
        "UPLOAD_DIR" => Some(upload_dir_str.clone()),
        "MAX_UPLOAD_BYTES" => Some(MAX_UPLOAD_BYTES.to_string()),
        other => extra.iter().find(|(k, _)| *k == other).map(|(_, v)| v.clone()),
    })
    .expect("Failed to build test config");

    let pool = db::create_db_pool(&config.database).await.expect("Failed to create database");
    let server = TestServer::new(create_router(AppState::new(pool.clone(), config))).expect("Failed to create test server");

    TestApp {
        server,
        pool,
        upload_dir,
        _dir: dir,
    }
}

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
}

fn pdf_part(name: &str, contents: &[u8]) -> Part {
    Part::bytes(contents.to_vec()).file_name(name).mime_type("application/pdf")
}

fn count_files(dir: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    entries
        .flatten()
        .map(|entry| {
            let path = entry.path();
            if path.is_dir() {
                count_files(&path)
            } else {
                1
            }
        })
        .sum()
}

impl TestApp {
    async fn register(&self, name: &str, email: &str) -> String {
        let response = self
            .server
            .post("/api/auth/register")
            .json(&json!({ "name": name, "email": email, "password": "password123" }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json::<Value>()["token"].as_str().unwrap().to_string()
    }

    async fn get(&self, path: &str, token: &str) -> TestResponse {
        self.server.get(path).add_header(header::AUTHORIZATION, bearer(token)).await
    }

    async fn delete(&self, path: &str, token: &str) -> TestResponse {
        self.server.delete(path).add_header(header::AUTHORIZATION, bearer(token)).await
    }

    async fn post_json(&self, path: &str, token: &str, body: Value) -> TestResponse {
        self.server
            .post(path)
            .add_header(header::AUTHORIZATION, bearer(token))
            .json(&body)
            .await
    }

    async fn upload(&self, token: &str, form: MultipartForm) -> TestResponse {
        self.server
            .post("/api/reports/upload")
            .add_header(header::AUTHORIZATION, bearer(token))
            .multipart(form)
            .await
    }

    /// Uploads a small PDF and returns the created report JSON.
    async fn upload_report(&self, token: &str, report_type: &str, date: &str, tags: &str) -> Value {
        let form = MultipartForm::new()
            .add_text("report_type", report_type)
            .add_text("report_date", date)
            .add_text("vital_types", tags)
            .add_part("file", pdf_part("results.pdf", b"%PDF-1.4 test report"));
        let response = self.upload(token, form).await;
        response.assert_status(StatusCode::CREATED);
        response.json::<Value>()["report"].clone()
    }

    async fn count(&self, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn health_and_unknown_api_routes() {
    let app = spawn_app().await;

    let response = app.server.get("/api/health").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "OK");

    let response = app.server.get("/api/does-not-exist").await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert!(response.json::<Value>()["error"].is_string());
}

#[tokio::test]
async fn register_twice_fails_and_login_issues_usable_token() {
    let app = spawn_app().await;
    app.register("Alice", "alice@example.com").await;

    let response = app
        .server
        .post("/api/auth/register")
        .json(&json!({ "name": "Alice Again", "email": "ALICE@example.com", "password": "other" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "User with this email already exists");

    let response = app
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": "alice@example.com", "password": "password123" }))
        .await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["user"]["role"], "Owner");
    let token = body["token"].as_str().unwrap();

    let me = app.get("/api/auth/me", token).await;
    me.assert_status_ok();
    let me = me.json::<Value>();
    assert_eq!(me["user"]["email"], "alice@example.com");
    assert_eq!(me["user"]["name"], "Alice");
    assert!(me["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn bad_credentials_and_missing_fields() {
    let app = spawn_app().await;
    app.register("Bob", "bob@example.com").await;

    let wrong_password = app
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": "bob@example.com", "password": "nope" }))
        .await;
    wrong_password.assert_status(StatusCode::UNAUTHORIZED);

    let unknown = app
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": "nobody@example.com", "password": "password123" }))
        .await;
    unknown.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.json::<Value>(), unknown.json::<Value>());

    let missing = app
        .server
        .post("/api/auth/register")
        .json(&json!({ "name": "NoPass", "email": "np@example.com" }))
        .await;
    missing.assert_status(StatusCode::BAD_REQUEST);

    let bad_email = app
        .server
        .post("/api/auth/register")
        .json(&json!({ "name": "X", "email": "not-an-email", "password": "pw" }))
        .await;
    bad_email.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn token_checks() {
    let app = spawn_app().await;
    let token = app.register("Carol", "carol@example.com").await;

    app.server.get("/api/reports").await.assert_status(StatusCode::UNAUTHORIZED);
    app.get("/api/reports", "garbage.token.value").await.assert_status(StatusCode::FORBIDDEN);
    app.get("/api/reports", &token).await.assert_status_ok();

    app.upload_report(&token, "Lab", "2024-05-01", "BP").await;
    assert_eq!(app.count("reports").await, 1);

    // The signature stays valid, but the account is gone
    sqlx::query("DELETE FROM users WHERE email = 'carol@example.com'")
        .execute(&app.pool)
        .await
        .unwrap();
    assert_eq!(app.count("reports").await, 0);
    assert_eq!(app.count("report_vitals").await, 0);
    let response = app.get("/api/auth/me", &token).await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(response.json::<Value>()["error"], "User not found");
}

#[tokio::test]
async fn upload_without_report_type_leaves_nothing_behind() {
    let app = spawn_app().await;
    let token = app.register("Dan", "dan@example.com").await;

    let form = MultipartForm::new()
        .add_part("file", pdf_part("scan.pdf", b"%PDF-1.4 orphan"))
        .add_text("report_date", "2024-05-01");
    let response = app.upload(&token, form).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "Report type and date are required");

    assert_eq!(count_files(&app.upload_dir), 0);
    assert_eq!(app.count("reports").await, 0);
}

#[tokio::test]
async fn rejected_uploads_are_cleaned_up() {
    let app = spawn_app().await;
    let token = app.register("Erin", "erin@example.com").await;

    let wrong_type = MultipartForm::new()
        .add_text("report_type", "Lab")
        .add_text("report_date", "2024-05-01")
        .add_part("file", Part::bytes(b"hello".to_vec()).file_name("notes.txt").mime_type("text/plain"));
    app.upload(&token, wrong_type).await.assert_status(StatusCode::BAD_REQUEST);

    let bad_date = MultipartForm::new()
        .add_part("file", pdf_part("scan.pdf", b"%PDF"))
        .add_text("report_type", "Lab")
        .add_text("report_date", "05/01/2024");
    app.upload(&token, bad_date).await.assert_status(StatusCode::BAD_REQUEST);

    let bad_tag = MultipartForm::new()
        .add_part("file", pdf_part("scan.pdf", b"%PDF"))
        .add_text("report_type", "Lab")
        .add_text("report_date", "2024-05-01")
        .add_text("vital_types", "Mood");
    app.upload(&token, bad_tag).await.assert_status(StatusCode::BAD_REQUEST);

    let too_big = MultipartForm::new()
        .add_text("report_type", "Lab")
        .add_text("report_date", "2024-05-01")
        .add_part("file", pdf_part("huge.pdf", &vec![b'x'; MAX_UPLOAD_BYTES + 1]));
    let response = app.upload(&token, too_big).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "File exceeds the maximum size of 4 KB");

    let no_file = MultipartForm::new()
        .add_text("report_type", "Lab")
        .add_text("report_date", "2024-05-01");
    app.upload(&token, no_file).await.assert_status(StatusCode::BAD_REQUEST);

    assert_eq!(count_files(&app.upload_dir), 0);
    assert_eq!(app.count("reports").await, 0);
}

#[tokio::test]
async fn uploaded_report_is_listed_and_served() {
    let app = spawn_app().await;
    let token = app.register("Fay", "fay@example.com").await;

    let report = app.upload_report(&token, "Lab", "2024-05-01", "BP, Sugar").await;
    assert_eq!(report["file_name"], "results.pdf");
    assert_eq!(report["associated_vitals"], json!(["BP", "Sugar"]));
    let file_url = report["file_url"].as_str().unwrap().to_string();
    assert!(file_url.starts_with(&format!("/uploads/{}/", report["user_id"])));
    assert_eq!(count_files(&app.upload_dir), 1);

    app.upload_report(&token, "X-Ray", "2024-06-15", "").await;

    let listed = app.get("/api/reports", &token).await.json::<Value>();
    let reports = listed["reports"].as_array().unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0]["report_type"], "X-Ray");

    let filtered = app
        .server
        .get("/api/reports")
        .add_query_param("vital_type", "Sugar")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await
        .json::<Value>();
    assert_eq!(filtered["reports"].as_array().unwrap().len(), 1);
    assert_eq!(filtered["reports"][0]["report_type"], "Lab");

    let bad_filter = app
        .server
        .get("/api/reports")
        .add_query_param("start_date", "last week")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    bad_filter.assert_status(StatusCode::BAD_REQUEST);

    let served = app.server.get(&file_url).await;
    served.assert_status_ok();
    assert_eq!(served.text(), "%PDF-1.4 test report");
}

#[tokio::test]
async fn report_visible_to_owner_and_grantee_only() {
    let app = spawn_app().await;
    let owner = app.register("Owner", "owner@example.com").await;
    let doctor = app.register("Doctor", "doctor@example.com").await;
    let stranger = app.register("Stranger", "stranger@example.com").await;

    let report = app.upload_report(&owner, "Lab", "2024-05-01", "").await;
    let path = format!("/api/reports/{}", report["id"]);

    app.get(&path, &doctor).await.assert_status(StatusCode::NOT_FOUND);

    let shared = app
        .post_json("/api/share", &owner, json!({ "report_id": report["id"], "shared_with_email": "Doctor@Example.com" }))
        .await;
    shared.assert_status(StatusCode::CREATED);
    assert_eq!(shared.json::<Value>()["share"]["shared_with_email"], "doctor@example.com");

    app.get(&path, &owner).await.assert_status_ok();
    app.get(&path, &doctor).await.assert_status_ok();
    app.get(&path, &stranger).await.assert_status(StatusCode::NOT_FOUND);
    app.get("/api/reports/999999", &owner).await.assert_status(StatusCode::NOT_FOUND);
    app.get("/api/reports/not-a-number", &owner).await.assert_status(StatusCode::NOT_FOUND);

    let inbox = app.get("/api/reports/shared", &doctor).await.json::<Value>();
    assert_eq!(inbox["reports"].as_array().unwrap().len(), 1);
    assert_eq!(inbox["reports"][0]["owner_name"], "Owner");
    let empty = app.get("/api/reports/shared", &stranger).await.json::<Value>();
    assert!(empty["reports"].as_array().unwrap().is_empty());

    // Grantees can read but not delete
    app.delete(&path, &doctor).await.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_a_report_removes_file_rows_and_grants() {
    let app = spawn_app().await;
    let owner = app.register("Owner", "owner@example.com").await;
    let doctor = app.register("Doctor", "doctor@example.com").await;

    let report = app.upload_report(&owner, "Lab", "2024-05-01", "Oxygen").await;
    app.post_json("/api/share", &owner, json!({ "report_id": report["id"], "shared_with_email": "doctor@example.com" }))
        .await
        .assert_status(StatusCode::CREATED);
    assert_eq!(count_files(&app.upload_dir), 1);

    let path = format!("/api/reports/{}", report["id"]);
    app.delete(&path, &owner).await.assert_status_ok();

    assert_eq!(count_files(&app.upload_dir), 0);
    assert_eq!(app.count("reports").await, 0);
    assert_eq!(app.count("shared_access").await, 0);
    assert_eq!(app.count("report_vitals").await, 0);

    app.get(&path, &owner).await.assert_status(StatusCode::NOT_FOUND);
    app.get(&path, &doctor).await.assert_status(StatusCode::NOT_FOUND);
    app.delete(&path, &owner).await.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn vitals_record_list_trends_and_delete() {
    let app = spawn_app().await;
    let token = app.register("Gus", "gus@example.com").await;
    let other = app.register("Hal", "hal@example.com").await;

    for (vital_type, value, at) in [
        ("BP", json!(135), "2024-06-03T08:00:00Z"),
        ("BP", json!(120), "2024-06-01T08:00:00Z"),
        ("Heart Rate", json!("72"), "2024-06-02T08:00:00Z"),
        ("BP", json!(128), "2024-05-20T08:00:00Z"),
    ] {
        app.post_json("/api/vitals", &token, json!({ "vital_type": vital_type, "value": value, "recorded_at": at }))
            .await
            .assert_status(StatusCode::CREATED);
    }
    app.post_json("/api/vitals", &other, json!({ "vital_type": "BP", "value": 160, "recorded_at": "2024-06-02T08:00:00Z" }))
        .await
        .assert_status(StatusCode::CREATED);

    let defaulted = app.post_json("/api/vitals", &token, json!({ "vital_type": "Weight", "value": 80.5 })).await;
    defaulted.assert_status(StatusCode::CREATED);
    assert!(defaulted.json::<Value>()["vital"]["recorded_at"].is_string());

    let trends = app
        .server
        .get("/api/vitals/trends")
        .add_query_param("vital_type", "BP")
        .add_query_param("start_date", "2024-06-01")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    trends.assert_status_ok();
    let trends = trends.json::<Value>()["trends"].clone();
    assert_eq!(trends.as_object().unwrap().len(), 1);
    let values: Vec<f64> = trends["BP"].as_array().unwrap().iter().map(|p| p["value"].as_f64().unwrap()).collect();
    assert_eq!(values, vec![120.0, 135.0]);

    let all_trends = app.get("/api/vitals/trends", &token).await.json::<Value>();
    assert_eq!(all_trends["trends"]["BP"].as_array().unwrap().len(), 3);
    assert_eq!(all_trends["trends"]["Heart Rate"][0]["value"], 72.0);

    let listed = app
        .server
        .get("/api/vitals")
        .add_query_param("vital_type", "BP")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await
        .json::<Value>();
    let listed = listed["vitals"].as_array().unwrap();
    assert_eq!(listed.len(), 3);
    assert_eq!(listed[0]["value"], 135.0);

    let id = listed[0]["id"].as_i64().unwrap();
    app.delete(&format!("/api/vitals/{}", id), &other).await.assert_status(StatusCode::NOT_FOUND);
    app.delete(&format!("/api/vitals/{}", id), &token).await.assert_status_ok();
    app.delete(&format!("/api/vitals/{}", id), &token).await.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_vital_types_are_rejected() {
    let app = spawn_app().await;
    let token = app.register("Ivy", "ivy@example.com").await;

    let response = app.post_json("/api/vitals", &token, json!({ "vital_type": "Cholesterol", "value": 190 })).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "Invalid vital type");

    app.post_json("/api/vitals", &token, json!({ "vital_type": "BP" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    app.server
        .get("/api/vitals")
        .add_query_param("vital_type", "Mood")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    assert_eq!(app.count("vitals").await, 0);
}

#[tokio::test]
async fn sharing_twice_and_revoking() {
    let app = spawn_app().await;
    let owner = app.register("Owner", "owner@example.com").await;
    let intruder = app.register("Intruder", "intruder@example.com").await;
    app.register("Nurse", "nurse@example.com").await;

    let report = app.upload_report(&owner, "Lab", "2024-05-01", "").await;
    let body = json!({ "report_id": report["id"], "shared_with_email": "nurse@example.com" });

    app.post_json("/api/share", &owner, body.clone()).await.assert_status(StatusCode::CREATED);
    let again = app.post_json("/api/share", &owner, body.clone()).await;
    again.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(again.json::<Value>()["error"], "Report already shared with this user");
    assert_eq!(app.count("shared_access").await, 1);

    app.post_json("/api/share", &intruder, body).await.assert_status(StatusCode::NOT_FOUND);
    app.post_json("/api/share", &owner, json!({ "report_id": report["id"] }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let sent = app.get("/api/share/sent", &owner).await.json::<Value>();
    let shares = sent["shares"].as_array().unwrap();
    assert_eq!(shares.len(), 1);
    assert_eq!(shares[0]["shared_with_name"], "Nurse");
    assert_eq!(shares[0]["report_type"], "Lab");
    let share_path = format!("/api/share/{}", shares[0]["id"]);

    app.delete(&share_path, &intruder).await.assert_status(StatusCode::NOT_FOUND);
    app.delete(&share_path, &owner).await.assert_status_ok();
    app.delete(&share_path, &owner).await.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(app.count("shared_access").await, 0);
}

#[tokio::test]
async fn malformed_bodies_get_json_validation_errors() {
    let app = spawn_app().await;
    let token = app.register("Jay", "jay@example.com").await;

    let wrong_type = app
        .post_json("/api/share", &token, json!({ "report_id": "1", "shared_with_email": "x@example.com" }))
        .await;
    wrong_type.assert_status(StatusCode::BAD_REQUEST);
    assert!(wrong_type.json::<Value>()["error"].is_string());

    let numeric_type = app.post_json("/api/vitals", &token, json!({ "vital_type": 5, "value": 1 })).await;
    numeric_type.assert_status(StatusCode::BAD_REQUEST);
    assert!(numeric_type.json::<Value>()["error"].is_string());

    let plain_text = app
        .server
        .post("/api/auth/login")
        .text("email=jay@example.com&password=password123")
        .await;
    plain_text.assert_status(StatusCode::BAD_REQUEST);
    assert!(plain_text.json::<Value>()["error"].is_string());

    let not_multipart = app.post_json("/api/reports/upload", &token, json!({ "report_type": "Lab" })).await;
    not_multipart.assert_status(StatusCode::BAD_REQUEST);
    assert!(not_multipart.json::<Value>()["error"].is_string());
}

#[tokio::test]
async fn frontend_is_served_outside_the_api() {
    let frontend = tempfile::tempdir().unwrap();
    std::fs::write(frontend.path().join("index.html"), "<html>wallet</html>").unwrap();
    std::fs::create_dir(frontend.path().join("assets")).unwrap();
    std::fs::write(frontend.path().join("assets").join("app.js"), "console.log('wallet');").unwrap();

    let app = spawn_app_with(&[("FRONTEND_DIR", frontend.path().display().to_string())]).await;

    let asset = app.server.get("/assets/app.js").await;
    asset.assert_status_ok();
    assert_eq!(asset.text(), "console.log('wallet');");

    let client_route = app.server.get("/dashboard").await;
    client_route.assert_status_ok();
    assert_eq!(client_route.text(), "<html>wallet</html>");

    let unknown_api = app.server.get("/api/unknown").await;
    unknown_api.assert_status(StatusCode::NOT_FOUND);
    assert!(unknown_api.json::<Value>()["error"].is_string());

    app.server.get("/api/health").await.assert_status_ok();
}
