#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tower::ServiceExt;

use todo_backend::auth::TokenManager;
use todo_backend::build_app;
use todo_backend::db;
use todo_backend::notifications::{MemoryMailer, OutgoingEmail, RetryPolicy};

pub struct TestApp {
    pub router: Router,
    pub db: SqlitePool,
    pub mailer: Arc<MemoryMailer>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(MemoryMailer::new()).await
}

pub async fn spawn_app_with(mailer: MemoryMailer) -> TestApp {
    let pool = db::connect("sqlite::memory:", 1)
        .await
        .expect("Failed to create test db");

    let tokens = TokenManager::new(
        "test-secret",
        chrono::Duration::minutes(5),
        chrono::Duration::days(1),
    );
    let mailer = Arc::new(mailer);
    let policy = RetryPolicy {
        max_attempts: 3,
        initial_backoff: Duration::from_millis(1),
    };

    let (router, worker) =
        build_app(pool.clone(), tokens, mailer.clone(), policy).expect("Failed to build app");
    tokio::spawn(worker.start());

    TestApp {
        router,
        db: pool,
        mailer,
    }
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: &str) -> TestResponse {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    /// Registers a user and returns their access token.
    pub async fn register(&self, username: &str, email: &str, password: &str) -> String {
        let response = self
            .post(
                "/register/",
                None,
                json!({"username": username, "email": email, "password": password}),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body["tokens"]["access"]
            .as_str()
            .expect("access token missing")
            .to_string()
    }

    pub async fn create_todo(&self, token: &str, body: Value) -> Value {
        let response = self.post("/todos/", Some(token), body).await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body
    }

    /// Notifications are delivered in the background, so poll for them.
    pub async fn wait_for_emails(&self, count: usize) -> Vec<OutgoingEmail> {
        for _ in 0..200 {
            let sent = self.mailer.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "expected {} emails, got {}",
            count,
            self.mailer.sent().len()
        );
    }

    pub async fn wait_for_attempts(&self, count: usize) {
        for _ in 0..200 {
            if self.mailer.attempts() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {} delivery attempts", count);
    }
}
