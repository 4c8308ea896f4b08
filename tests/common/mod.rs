#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

use grouplist_api::config::AppConfig;
use grouplist_api::database::MemoryStore;
use grouplist_api::state::AppState;

pub const ADMIN_USERNAME: &str = "wbchse";
pub const ADMIN_PASSWORD: &str = "changeme";
pub const USER_PASSWORD: &str = "secret123";

pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
    pub admin_token: String,
}

/// Development config over a fresh in-memory store
pub async fn spawn() -> Result<TestServer> {
    spawn_with(AppConfig::development()).await
}

pub async fn spawn_with(config: AppConfig) -> Result<TestServer> {
    let state = AppState::new(config, Arc::new(MemoryStore::new()));
    state
        .user_service()
        .bootstrap_admin(ADMIN_USERNAME, ADMIN_PASSWORD)
        .await
        .context("failed to bootstrap admin")?;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .context("failed to bind test listener")?;
    let addr = listener.local_addr()?;

    let app = grouplist_api::app(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await;
    });

    let mut server = TestServer {
        base_url: format!("http://{}", addr),
        client: reqwest::Client::new(),
        admin_token: String::new(),
    };
    server.admin_token = server.login(ADMIN_USERNAME, ADMIN_PASSWORD).await?;
    Ok(server)
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<String> {
        let (status, body) = self
            .send(Method::POST, "/api/auth/login", None, Some(json!({ "username": username, "password": password })))
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "login failed: {} {}", status, body);
        body["token"]
            .as_str()
            .map(str::to_string)
            .context("login response without token")
    }

    /// Registers a regional user through the API and returns their token
    pub async fn regional_token(&self, username: &str, region: &str) -> Result<String> {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/auth/register",
                Some(&self.admin_token),
                Some(json!({
                    "username": username,
                    "password": USER_PASSWORD,
                    "role": "user",
                    "region": region,
                })),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "register failed: {} {}", status, body);
        self.login(username, USER_PASSWORD).await
    }

    pub async fn send(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut request = self.client.request(method, self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        let value = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Ok((status, value))
    }

    pub async fn get(&self, token: &str, path: &str) -> Result<(StatusCode, Value)> {
        self.send(Method::GET, path, Some(token), None).await
    }

    pub async fn post(&self, token: &str, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::POST, path, Some(token), Some(body)).await
    }

    pub async fn put(&self, token: &str, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::PUT, path, Some(token), Some(body)).await
    }

    pub async fn delete(&self, token: &str, path: &str) -> Result<(StatusCode, Value)> {
        self.send(Method::DELETE, path, Some(token), None).await
    }

    /// Admin creates an HE in an explicit region
    pub async fn create_he(&self, he_code: &str, subject_code: &str, region: &str) -> Result<Value> {
        let (status, body) = self
            .post(
                &self.admin_token,
                "/api/hes/add",
                json!({
                    "he_code": he_code,
                    "name": format!("Head {}", he_code),
                    "subject_code": subject_code,
                    "region": region,
                }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "HE create failed: {} {}", status, body);
        Ok(body["data"].clone())
    }

    pub async fn create_exmr(&self, token: &str, he_code: &str, subject_code: &str) -> Result<(StatusCode, Value)> {
        self.post(
            token,
            "/api/exmrs/add",
            json!({ "name": "Examiner", "he_code": he_code, "subject_code": subject_code }),
        )
        .await
    }
}
