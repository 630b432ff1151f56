use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{json, Value};

use muster_api::app::{build_app, services::build_in_memory_services};
use muster_api::middleware::{DISPLAY_NAME_HEADER, IDENTITY_HEADER};
use muster_infra::AccessConfig;

const SENIOR: &str = "100000000000000000";
const MANAGER: &str = "100000000000000001";
const NEWCOMER: &str = "100000000000000002";

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, in-memory stores, ephemeral port.
        let services = Arc::new(build_in_memory_services(&AccessConfig::default()));
        let app = build_app(services);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_as(&self, identity: Option<&str>, path: &str) -> reqwest::Response {
        let mut req = self.client.get(self.url(path));
        if let Some(identity) = identity {
            req = req.header(IDENTITY_HEADER, identity);
        }
        req.send().await.unwrap()
    }

    async fn put_role(&self, actor: &str, target: &str, body: Value) -> reqwest::Response {
        self.client
            .put(self.url(&format!("/access/roles/{target}")))
            .header(IDENTITY_HEADER, actor)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn delete_role(&self, actor: Option<&str>, target: &str) -> reqwest::Response {
        let mut req = self.client.delete(self.url(&format!("/access/roles/{target}")));
        if let Some(actor) = actor {
            req = req.header(IDENTITY_HEADER, actor);
        }
        req.send().await.unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn error_code(res: reqwest::Response) -> String {
    let body: Value = res.json().await.unwrap();
    body["error"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn health_is_open() {
    let server = TestServer::spawn().await;
    let res = server.get_as(None, "/health").await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn anonymous_caller_has_no_capabilities() {
    let server = TestServer::spawn().await;

    for identity in [None, Some("not-a-snowflake")] {
        let res = server.get_as(identity, "/access/me").await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().contains_key("x-request-id"));

        let body: Value = res.json().await.unwrap();
        assert_eq!(body["identity"], Value::Null);
        assert_eq!(body["role"], Value::Null);
        assert_eq!(body["source"], "none");
        assert_eq!(body["capabilities"]["canOpenPanel"], false);
        assert_eq!(body["capabilities"]["canManageAccessPolicy"], false);
    }
}

#[tokio::test]
async fn bootstrap_manager_resolves_from_registry() {
    let server = TestServer::spawn().await;
    let body: Value = server
        .get_as(Some(MANAGER), "/access/me")
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(body["identity"], MANAGER);
    assert_eq!(body["role"], "manager");
    assert_eq!(body["source"], "bootstrap");
    assert_eq!(body["capabilities"]["canManageAccessPolicy"], true);
}

#[tokio::test]
async fn upserted_role_takes_effect_and_is_audited() {
    let server = TestServer::spawn().await;

    let res = server
        .client
        .put(server.url(&format!("/access/roles/{NEWCOMER}")))
        .header(IDENTITY_HEADER, MANAGER)
        .header(DISPLAY_NAME_HEADER, "Grace")
        .json(&json!({"role": "staff", "displayName": "Ada"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let entry: Value = res.json().await.unwrap();
    assert_eq!(entry["role"], "staff");
    assert_eq!(entry["displayName"], "Ada");
    assert_eq!(entry["addedBy"], MANAGER);

    let me: Value = server
        .get_as(Some(NEWCOMER), "/access/me")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(me["role"], "staff");
    assert_eq!(me["source"], "override");
    assert_eq!(me["capabilities"]["canAccessSharedArea"], true);
    assert_eq!(me["capabilities"]["canManageAccessPolicy"], false);

    let audit: Value = server
        .get_as(Some(MANAGER), "/audit?area=access-control&limit=10")
        .await
        .json()
        .await
        .unwrap();
    let entries = audit["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["action"], "upsert-role");
    assert_eq!(entries[0]["target"], NEWCOMER);
    assert_eq!(entries[0]["actorIdentity"], MANAGER);
    assert_eq!(entries[0]["actorDisplayName"], "Grace");
    assert_eq!(entries[0]["actorRole"], "manager");
}

#[tokio::test]
async fn malformed_input_is_rejected() {
    let server = TestServer::spawn().await;

    let res = server.put_role(MANAGER, "abc", json!({"role": "staff"})).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(res).await, "invalid_identity");

    let res = server
        .put_role(MANAGER, &format!("%20{NEWCOMER}%20"), json!({"role": "staff"}))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(res).await, "invalid_identity");

    let res = server.put_role(MANAGER, NEWCOMER, json!({"role": "owner"})).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(res).await, "invalid_role");

    let directory: Value = server
        .get_as(Some(MANAGER), "/access/directory")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(directory["entries"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn policy_routes_require_the_capability() {
    let server = TestServer::spawn().await;
    server.put_role(MANAGER, NEWCOMER, json!({"role": "staff"})).await;

    let res = server.get_as(None, "/access/directory").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = server.get_as(Some(NEWCOMER), "/access/directory").await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_code(res).await, "forbidden");

    let res = server.put_role(NEWCOMER, "100000000000000003", json!({"role": "manager"})).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = server.get_as(Some(NEWCOMER), "/audit").await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = server.delete_role(None, NEWCOMER).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bootstrap_identities_cannot_be_removed() {
    let server = TestServer::spawn().await;

    let res = server.delete_role(Some(SENIOR), MANAGER).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(error_code(res).await, "protected_identity");

    let me: Value = server
        .get_as(Some(MANAGER), "/access/me")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(me["role"], "manager");
}

#[tokio::test]
async fn removing_overrides() {
    let server = TestServer::spawn().await;

    let res = server.delete_role(Some(MANAGER), NEWCOMER).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    server.put_role(MANAGER, NEWCOMER, json!({"role": "staff"})).await;
    let res = server.delete_role(Some(MANAGER), NEWCOMER).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let me: Value = server
        .get_as(Some(NEWCOMER), "/access/me")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(me["source"], "none");

    let audit: Value = server
        .get_as(Some(MANAGER), "/audit?action=remove-role")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(audit["entries"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn directory_is_ordered_by_rank_then_identity() {
    let server = TestServer::spawn().await;
    for (target, role) in [
        ("100000000000000009", "staff"),
        ("100000000000000004", "manager"),
        ("100000000000000003", "staff"),
    ] {
        let res = server.put_role(SENIOR, target, json!({"role": role})).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    let body: Value = server
        .get_as(Some(SENIOR), "/access/directory")
        .await
        .json()
        .await
        .unwrap();
    let order: Vec<(String, String)> = body["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| {
            (
                e["identity"].as_str().unwrap().to_string(),
                e["source"].as_str().unwrap().to_string(),
            )
        })
        .collect();

    assert_eq!(
        order,
        vec![
            (SENIOR.to_string(), "bootstrap".to_string()),
            (MANAGER.to_string(), "bootstrap".to_string()),
            ("100000000000000004".to_string(), "override".to_string()),
            ("100000000000000003".to_string(), "override".to_string()),
            ("100000000000000009".to_string(), "override".to_string()),
        ]
    );
}

#[tokio::test]
async fn audit_free_text_and_limit() {
    let server = TestServer::spawn().await;
    for n in 2..=7 {
        server
            .put_role(MANAGER, &format!("10000000000000000{n}"), json!({"role": "staff"}))
            .await;
    }

    let body: Value = server
        .get_as(Some(MANAGER), "/audit?freeText=UPSERT&limit=2")
        .await
        .json()
        .await
        .unwrap();
    let entries = body["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["target"], "100000000000000007");
    assert_eq!(entries[1]["target"], "100000000000000006");

    let body: Value = server
        .get_as(Some(MANAGER), "/audit?limit=0")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["entries"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn explain_reports_decisions() {
    let server = TestServer::spawn().await;

    let body: Value = server
        .get_as(Some(MANAGER), "/access/explain?capability=canViewAuditLog")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["granted"], true);
    assert_eq!(body["source"], "bootstrap");

    let body: Value = server
        .get_as(None, "/access/explain?capability=canOpenPanel")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["granted"], false);

    let res = server
        .get_as(Some(MANAGER), "/access/explain?capability=canFly")
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(res).await, "unknown_capability");
}
