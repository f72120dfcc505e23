#![allow(dead_code)]

use api::{create_router, AppState};
use authz::RoleSet;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use database::Database;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;
use user::{password::Argon2Hasher, SessionConfig, User};

pub const PASSWORD: &str = "password123";

pub fn session_config() -> SessionConfig {
    SessionConfig::with_secret(vec![7; 64])
}

pub async fn state() -> AppState {
    state_with(session_config()).await
}

pub async fn state_with(config: SessionConfig) -> AppState {
    let db = Arc::new(Database::in_memory().await.unwrap());
    AppState::new(db, config, Arc::new(Argon2Hasher::fast()))
        .await
        .unwrap()
}

pub async fn create_user(state: &AppState, email: &str, roles: &[&str]) -> User {
    state
        .users
        .create_user(
            email,
            email.split('@').next().unwrap(),
            PASSWORD,
            RoleSet::parse(roles.iter().copied()).unwrap(),
        )
        .await
        .unwrap()
}

/// A browser: a router plus a cookie jar
pub struct Client {
    app: Router,
    pub cookies: HashMap<String, String>,
}

impl Client {
    pub fn new(state: &AppState) -> Self {
        Self {
            app: create_router(state.clone()),
            cookies: HashMap::new(),
        }
    }

    pub async fn send(&mut self, mut request: Request<Body>) -> Response {
        if !self.cookies.is_empty() {
            let header_value = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; ");
            request
                .headers_mut()
                .insert(header::COOKIE, header_value.parse().unwrap());
        }

        let response = self.app.clone().oneshot(request).await.unwrap();

        for set_cookie in response.headers().get_all(header::SET_COOKIE) {
            let raw = set_cookie.to_str().unwrap();
            let pair = raw.split(';').next().unwrap();
            let (name, value) = pair.split_once('=').unwrap();
            if value.is_empty() || raw.contains("Max-Age=0") {
                self.cookies.remove(name);
            } else {
                self.cookies.insert(name.to_string(), value.to_string());
            }
        }
        response
    }

    pub async fn get(&mut self, uri: &str) -> Response {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(&mut self, uri: &str, body: &str) -> Response {
        self.send(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn send_json(&mut self, method: Method, uri: &str, body: Value) -> Response {
        self.send(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn csrf(&mut self, intention: &str) -> String {
        let response = self.get(&format!("/csrf/{}", intention)).await;
        assert_eq!(response.status(), StatusCode::OK);
        json(response).await["token"].as_str().unwrap().to_string()
    }

    pub async fn login_with(&mut self, email: &str, password: &str, remember: bool) -> Response {
        let page = json(self.get("/login").await).await;
        let token = page["csrf_token"].as_str().unwrap().to_string();
        let mut body = format!(
            "email={}&password={}&_csrf_token={}",
            email, password, token
        );
        if remember {
            body.push_str("&_remember_me=on");
        }
        self.post_form("/login", &body).await
    }

    pub async fn login(&mut self, email: &str) -> Response {
        self.login_with(email, PASSWORD, false).await
    }

    pub async fn flashes(&mut self, uri: &str) -> Vec<(String, String)> {
        let page = json(self.get(uri).await).await;
        page["flashes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| {
                (
                    f["kind"].as_str().unwrap().to_string(),
                    f["message"].as_str().unwrap().to_string(),
                )
            })
            .collect()
    }
}

pub async fn json(response: Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

pub fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
}

pub fn is_redirect(response: &Response) -> bool {
    response.status() == StatusCode::SEE_OTHER
}
