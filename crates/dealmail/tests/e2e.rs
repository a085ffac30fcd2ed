// SPDX-FileCopyrightText: 2026 Dealmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the `dealmail` binary.
//!
//! Each test writes a config and user export into its own temp directory,
//! points the mail API at a wiremock server, and runs the real binary with
//! a pinned `--now`.

use std::path::Path;
use std::process::Output;

use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::process::Command;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SCHEDULE_AT: &str = "2026-03-09T14:30:00Z";
const DISPATCH_AT: &str = "2026-03-10T12:00:00Z";

const USERS: &str = r#"{"id":"aino@example.com","last_updated_at":"2026-03-01T00:00:00Z","registration":{"registered_at":"2025-01-01T00:00:00Z","first_name":"Aino"},"has_app_store_payment":true,"locale":"fi-FI"}
{"id":"eero@example.com","last_updated_at":"2026-02-20T00:00:00Z","registration":{"registered_at":"2024-06-01T00:00:00Z","first_name":"Eero"},"has_play_store_payment":true,"locale":"fi-FI"}
{"id":"liisa@example.com","last_updated_at":"2026-03-05T00:00:00Z","registration":{"registered_at":"2025-09-01T00:00:00Z"},"has_app_store_payment":true}
{"id":"old@example.com","last_updated_at":"2025-01-01T00:00:00Z","registration":{"registered_at":"2024-01-01T00:00:00Z"},"has_app_store_payment":true,"locale":"fi-FI"}
not json
"#;

fn write_config(dir: &Path, api: Option<&str>) -> String {
    let mail = match api {
        Some(uri) => format!("api_key = \"SG.test-key\"\napi_base_url = \"{uri}\"\n"),
        None => String::new(),
    };
    let config = format!(
        r#"[job]
timezone = "UTC"
send_hour = 10

[storage]
database_path = "{db}"

[retry]
backoff_ms = 0

[mail]
{mail}sender_address = "deals@example.com"
unsubscribe_group_id = 42
unsubscribe_group_ids = [42]

[mail.templates.yearlyDeal]
fi = "d-yearly-fi"
en = "d-yearly-en"
sv = "d-yearly-sv"

[checkout]
base_url = "https://shop.example.com"

[input]
users_path = "{users}"

[[campaigns]]
name = "yearly"
template_key = "yearlyDeal"
price_id = "price_yearly"
"#,
        db = dir.join("dealmail.db").display(),
        users = dir.join("users.jsonl").display(),
    );
    let config_path = dir.join("dealmail.toml");
    std::fs::write(&config_path, config).unwrap();
    std::fs::write(dir.join("users.jsonl"), USERS).unwrap();
    config_path.to_string_lossy().to_string()
}

async fn dealmail(config: &str, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_dealmail"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env("RUST_LOG", "dealmail=info")
        .output()
        .await
        .unwrap()
}

async fn status(config: &str) -> Value {
    let out = dealmail(config, &["status", "--json", "--now", DISPATCH_AT]).await;
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    serde_json::from_slice(&out.stdout).unwrap()
}

async fn accepting_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .and(header("authorization", "Bearer SG.test-key"))
        .respond_with(ResponseTemplate::new(202).insert_header("x-message-id", "msg-1"))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn schedule_then_dispatch_delivers_every_eligible_user() {
    let dir = TempDir::new().unwrap();
    let server = accepting_server().await;
    let config = write_config(dir.path(), Some(&server.uri()));

    let out = dealmail(&config, &["schedule", "--now", SCHEDULE_AT]).await;
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("yearly: queued 3 of 4 screened"), "{stdout}");

    let out = dealmail(&config, &["dispatch", "--now", DISPATCH_AT]).await;
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    assert_eq!(server.received_requests().await.unwrap().len(), 3);
    let rows = status(&config).await;
    assert_eq!(rows[0]["campaign"], "yearly");
    assert_eq!(rows[0]["queued"], 0);
    assert_eq!(rows[0]["sent"], 3);
}

#[tokio::test]
async fn request_body_carries_personalization() {
    let dir = TempDir::new().unwrap();
    let server = accepting_server().await;
    let config = write_config(dir.path(), Some(&server.uri()));

    dealmail(&config, &["schedule", "--now", SCHEDULE_AT]).await;
    dealmail(&config, &["dispatch", "--now", DISPATCH_AT]).await;

    let bodies: Vec<Value> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect();
    let liisa = bodies
        .iter()
        .find(|b| b["personalizations"][0]["to"][0]["email"] == "liisa@example.com")
        .unwrap();
    // No locale and no first name: campaign defaults apply.
    assert_eq!(liisa["template_id"], "d-yearly-fi");
    assert_eq!(
        liisa["personalizations"][0]["dynamic_template_data"]["firstName"],
        "te"
    );
    assert_eq!(
        liisa["personalizations"][0]["dynamic_template_data"]["checkoutLink"],
        "https://shop.example.com/checkout/price_yearly/liisa%40example.com"
    );
    assert_eq!(liisa["asm"]["group_id"], 42);
}

#[tokio::test]
async fn partial_delivery_exits_with_status_three() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .and(body_partial_json(json!({
            "personalizations": [{ "to": [{ "email": "eero@example.com" }] }]
        })))
        .respond_with(ResponseTemplate::new(500))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;
    let config = write_config(dir.path(), Some(&server.uri()));

    dealmail(&config, &["schedule", "--now", SCHEDULE_AT]).await;
    let out = dealmail(&config, &["dispatch", "--drain", "--now", DISPATCH_AT]).await;

    assert_eq!(out.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&out.stdout).contains("not sent: eero@example.com"));
    let rows = status(&config).await;
    assert_eq!(rows[0]["sent"], 2);
    assert_eq!(rows[0]["queued"], 1);
}

#[tokio::test]
async fn dry_run_lists_due_entries_without_an_api_key() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), None);

    dealmail(&config, &["schedule", "--now", SCHEDULE_AT]).await;
    let out = dealmail(&config, &["dispatch", "--dry-run", "--now", DISPATCH_AT]).await;

    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(String::from_utf8_lossy(&out.stdout).contains("3 due"));
}

#[tokio::test]
async fn dispatch_without_api_key_fails() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), None);

    let out = dealmail(&config, &["dispatch", "--now", DISPATCH_AT]).await;

    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("mail.api_key"));
}

#[tokio::test]
async fn rescheduling_the_same_export_queues_nothing_new() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), None);

    dealmail(&config, &["schedule", "--now", SCHEDULE_AT]).await;
    let out = dealmail(&config, &["schedule", "--now", SCHEDULE_AT]).await;

    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("yearly: queued 0 of 4 screened"));
}

#[tokio::test]
async fn config_typo_is_reported_and_exits_with_status_one() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("dealmail.toml");
    std::fs::write(&config_path, "[job]\nsend_houre = 9\n").unwrap();

    let out = dealmail(&config_path.to_string_lossy(), &["config", "check"]).await;

    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("unknown configuration key"));
}

#[tokio::test]
async fn config_check_summarizes_a_valid_file() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), None);

    let out = dealmail(&config, &["config", "check"]).await;

    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("configuration is valid"));
    assert!(stdout.contains("yearly"));
}
