mod common;

use axum::http::{Method, StatusCode};
use chrono::{DateTime, Utc};
use serde_json::json;

use common::spawn_app;
use todo_backend::notifications::MemoryMailer;

#[tokio::test]
async fn test_create_todo_as_alice() {
    let app = spawn_app().await;
    let alice = app.register("alice", "a@x.com", "pw123456").await;

    let response = app
        .post(
            "/todos/",
            Some(&alice),
            json!({"title": "Buy milk", "priority": "HIGH"}),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    let todo = response.body;
    assert_eq!(todo["title"], "Buy milk");
    assert_eq!(todo["completed"], false);
    assert_eq!(todo["priority"], "HIGH");
    assert!(todo["description"].is_null());
    assert!(todo.get("user").is_none());

    let created_at: DateTime<Utc> = todo["created_at"].as_str().unwrap().parse().unwrap();
    assert!((Utc::now() - created_at).num_seconds().abs() < 60);

    let emails = app.wait_for_emails(2).await;
    let created = emails
        .iter()
        .find(|e| e.subject == "New Todo Created")
        .expect("todo created email missing");
    assert_eq!(created.to, "a@x.com");
    assert!(created.html_body.contains("Buy milk"));
}

#[tokio::test]
async fn test_todos_are_private_to_their_owner() {
    let app = spawn_app().await;
    let alice = app.register("alice", "a@x.com", "pw123456").await;
    let bob = app.register("bob", "b@x.com", "pw123456").await;

    let todo = app.create_todo(&alice, json!({"title": "secret plan"})).await;

    let alice_list = app.get("/todos/", &alice).await;
    assert_eq!(alice_list.body.as_array().unwrap().len(), 1);
    assert_eq!(alice_list.body[0]["id"], todo["id"]);

    let bob_list = app.get("/todos/", &bob).await;
    assert_eq!(bob_list.status, StatusCode::OK);
    assert!(bob_list.body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_foreign_todo_looks_missing() {
    let app = spawn_app().await;
    let alice = app.register("alice", "a@x.com", "pw123456").await;
    let bob = app.register("bob", "b@x.com", "pw123456").await;

    let todo = app.create_todo(&bob, json!({"title": "bob's"})).await;
    let uri = format!("/todos/{}/", todo["id"]);

    let patch = app
        .request(Method::PATCH, &uri, Some(&alice), Some(json!({"title": "mine now"})))
        .await;
    assert_eq!(patch.status, StatusCode::NOT_FOUND);

    assert_eq!(app.get(&uri, &alice).await.status, StatusCode::NOT_FOUND);
    assert_eq!(
        app.request(Method::DELETE, &uri, Some(&alice), None).await.status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        app.post(&format!("{}toggle_complete/", uri), Some(&alice), json!({}))
            .await
            .status,
        StatusCode::NOT_FOUND
    );

    let untouched = app.get(&uri, &bob).await;
    assert_eq!(untouched.body["title"], "bob's");
}

#[tokio::test]
async fn test_list_is_newest_first() {
    let app = spawn_app().await;
    let alice = app.register("alice", "a@x.com", "pw123456").await;

    let t1 = app.create_todo(&alice, json!({"title": "T1"})).await;
    let t2 = app.create_todo(&alice, json!({"title": "T2"})).await;

    let list = app.get("/todos/", &alice).await.body;
    assert_eq!(list[0]["id"], t2["id"]);
    assert_eq!(list[1]["id"], t1["id"]);
}

#[tokio::test]
async fn test_toggle_complete_twice_restores_value() {
    let app = spawn_app().await;
    let alice = app.register("alice", "a@x.com", "pw123456").await;
    let todo = app.create_todo(&alice, json!({"title": "flip"})).await;
    let uri = format!("/todos/{}/", todo["id"]);
    let toggle = format!("{}toggle_complete/", uri);

    let first = app.post(&toggle, Some(&alice), json!({})).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body, json!({"status": "todo updated"}));
    assert_eq!(app.get(&uri, &alice).await.body["completed"], true);

    app.post(&toggle, Some(&alice), json!({})).await;
    assert_eq!(app.get(&uri, &alice).await.body["completed"], false);
}

#[tokio::test]
async fn test_put_and_patch() {
    let app = spawn_app().await;
    let alice = app.register("alice", "a@x.com", "pw123456").await;
    let todo = app
        .create_todo(
            &alice,
            json!({"title": "draft", "description": "notes", "category": "work"}),
        )
        .await;
    let uri = format!("/todos/{}/", todo["id"]);

    let put_without_title = app
        .request(Method::PUT, &uri, Some(&alice), Some(json!({"completed": true})))
        .await;
    assert_eq!(put_without_title.status, StatusCode::BAD_REQUEST);
    assert!(put_without_title.body.get("title").is_some());

    let put = app
        .request(
            Method::PUT,
            &uri,
            Some(&alice),
            Some(json!({"title": "final", "priority": "LOW"})),
        )
        .await;
    assert_eq!(put.status, StatusCode::OK);
    assert_eq!(put.body["title"], "final");
    assert_eq!(put.body["priority"], "LOW");
    assert_eq!(put.body["description"], "notes");

    let patch = app
        .request(
            Method::PATCH,
            &uri,
            Some(&alice),
            Some(json!({"description": null, "created_at": "2000-01-01T00:00:00Z"})),
        )
        .await;
    assert_eq!(patch.status, StatusCode::OK);
    assert!(patch.body["description"].is_null());
    assert_eq!(patch.body["category"], "work");
    assert_eq!(patch.body["created_at"], todo["created_at"]);

    let updated_at: DateTime<Utc> = patch.body["updated_at"].as_str().unwrap().parse().unwrap();
    let created_at: DateTime<Utc> = todo["created_at"].as_str().unwrap().parse().unwrap();
    assert!(updated_at >= created_at);
}

#[tokio::test]
async fn test_field_validation_errors() {
    let app = spawn_app().await;
    let alice = app.register("alice", "a@x.com", "pw123456").await;

    let missing_title = app.post("/todos/", Some(&alice), json!({"category": "x"})).await;
    assert_eq!(missing_title.status, StatusCode::BAD_REQUEST);
    assert!(missing_title.body["title"].is_array());

    let bad = app
        .post(
            "/todos/",
            Some(&alice),
            json!({"title": "x".repeat(201), "priority": "URGENT"}),
        )
        .await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
    assert!(bad.body["title"].is_array());
    assert!(bad.body["priority"].is_array());

    let todo = app.create_todo(&alice, json!({"title": "ok"})).await;
    let patch = app
        .request(
            Method::PATCH,
            &format!("/todos/{}/", todo["id"]),
            Some(&alice),
            Some(json!({"priority": "urgent"})),
        )
        .await;
    assert_eq!(patch.status, StatusCode::BAD_REQUEST);
    assert!(patch.body["priority"].is_array());
}

#[tokio::test]
async fn test_delete_todo() {
    let app = spawn_app().await;
    let alice = app.register("alice", "a@x.com", "pw123456").await;
    let todo = app.create_todo(&alice, json!({"title": "temp"})).await;
    let uri = format!("/todos/{}/", todo["id"]);

    let deleted = app.request(Method::DELETE, &uri, Some(&alice), None).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    assert_eq!(app.get(&uri, &alice).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_by_category_requires_parameter() {
    let app = spawn_app().await;
    let alice = app.register("alice", "a@x.com", "pw123456").await;

    for uri in ["/todos/by_category/", "/todos/by_category/?category="] {
        let response = app.get(uri, &alice).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.body["error"], "Category parameter is required");
    }
}

#[tokio::test]
async fn test_by_category_and_categories() {
    let app = spawn_app().await;
    let alice = app.register("alice", "a@x.com", "pw123456").await;
    let bob = app.register("bob", "b@x.com", "pw123456").await;

    app.create_todo(&alice, json!({"title": "a", "category": "home"})).await;
    app.create_todo(&alice, json!({"title": "b", "category": "home"})).await;
    app.create_todo(&alice, json!({"title": "c", "category": "work"})).await;
    app.create_todo(&alice, json!({"title": "d", "category": ""})).await;
    app.create_todo(&alice, json!({"title": "e"})).await;
    app.create_todo(&bob, json!({"title": "f", "category": "gym"})).await;

    let home = app.get("/todos/by_category/?category=home", &alice).await;
    assert_eq!(home.status, StatusCode::OK);
    let titles: Vec<&str> = home
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["b", "a"]);

    let categories = app.get("/todos/categories/", &alice).await;
    let mut names: Vec<String> = serde_json::from_value(categories.body).unwrap();
    names.sort();
    assert_eq!(names, vec!["home".to_string(), "work".to_string()]);
}

#[tokio::test]
async fn test_requires_access_token() {
    let app = spawn_app().await;

    let anonymous = app.request(Method::GET, "/todos/", None, None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let garbage = app.get("/todos/", "not-a-token").await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);

    let register = app
        .post(
            "/register/",
            None,
            json!({"username": "alice", "email": "a@x.com", "password": "pw123456"}),
        )
        .await;
    let refresh = register.body["tokens"]["refresh"].as_str().unwrap();
    assert_eq!(app.get("/todos/", refresh).await.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_mail_outage_does_not_fail_create() {
    let app = common::spawn_app_with(MemoryMailer::failing(usize::MAX)).await;
    let alice = app.register("alice", "a@x.com", "pw123456").await;

    let response = app.post("/todos/", Some(&alice), json!({"title": "still saved"})).await;
    assert_eq!(response.status, StatusCode::CREATED);

    app.wait_for_attempts(6).await;
    assert!(app.mailer.sent().is_empty());
    assert_eq!(app.get("/todos/", &alice).await.body[0]["title"], "still saved");
}

#[tokio::test]
async fn test_deleting_user_removes_their_todos() {
    let app = spawn_app().await;
    let alice = app.register("alice", "a@x.com", "pw123456").await;
    app.create_todo(&alice, json!({"title": "orphan"})).await;

    sqlx::query("DELETE FROM users WHERE username = 'alice'")
        .execute(&app.db)
        .await
        .unwrap();

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM todos")
        .fetch_one(&app.db)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
    assert_eq!(app.get("/todos/", &alice).await.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unparseable_todo_id_is_not_found() {
    let app = spawn_app().await;
    let alice = app.register("alice", "a@x.com", "pw123456").await;

    for uri in ["/todos/abc/", "/todos/99999999999999999999/"] {
        let response = app.get(uri, &alice).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.body, json!({"detail": "Not found."}));
    }

    let toggle = app.post("/todos/abc/toggle_complete/", Some(&alice), json!({})).await;
    assert_eq!(toggle.status, StatusCode::NOT_FOUND);
    assert_eq!(toggle.body["detail"], "Not found.");

    let delete = app.request(Method::DELETE, "/todos/abc/", Some(&alice), None).await;
    assert_eq!(delete.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_query_is_json_bad_request() {
    let app = spawn_app().await;
    let alice = app.register("alice", "a@x.com", "pw123456").await;

    let response = app
        .get("/todos/by_category/?category=a&category=b", &alice)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["error"].is_string());
}

#[tokio::test]
async fn test_title_is_stored_trimmed() {
    let app = spawn_app().await;
    let alice = app.register("alice", "a@x.com", "pw123456").await;

    let todo = app.create_todo(&alice, json!({"title": "  padded  "})).await;
    assert_eq!(todo["title"], "padded");

    let blank = app.post("/todos/", Some(&alice), json!({"title": "   "})).await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);
    assert!(blank.body["title"].is_array());

    let patch = app
        .request(
            Method::PATCH,
            &format!("/todos/{}/", todo["id"]),
            Some(&alice),
            Some(json!({"title": " renamed\n"})),
        )
        .await;
    assert_eq!(patch.body["title"], "renamed");
}

#[tokio::test]
async fn test_null_priority_is_rejected() {
    let app = spawn_app().await;
    let alice = app.register("alice", "a@x.com", "pw123456").await;

    let response = app
        .post("/todos/", Some(&alice), json!({"title": "t", "priority": null}))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["priority"][0], "This field may not be null.");
    assert!(app.get("/todos/", &alice).await.body.as_array().unwrap().is_empty());

    let todo = app.create_todo(&alice, json!({"title": "t", "priority": "HIGH"})).await;
    let patch = app
        .request(
            Method::PATCH,
            &format!("/todos/{}/", todo["id"]),
            Some(&alice),
            Some(json!({"priority": null})),
        )
        .await;
    assert_eq!(patch.status, StatusCode::BAD_REQUEST);
    assert!(patch.body["priority"].is_array());
}
