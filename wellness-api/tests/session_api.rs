#[macro_use]
extern crate time_test;

use rocket::http::{Header, Status};
use rocket::local::asynchronous::Client;
use rocket::tokio;
use serde_json::{Value, json};

use wellness_api::orm::testing::test_rocket;

async fn client() -> Client {
    Client::tracked(test_rocket())
        .await
        .expect("valid rocket instance")
}

/// Registers a user and returns `(token, user id)`.
async fn register(client: &Client, email: &str) -> (String, i64) {
    let response = client
        .post("/api/auth/register")
        .json(&json!({ "email": email, "password": "password123" }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Created);
    let body: Value = response.into_json().await.expect("valid JSON");
    (
        body["token"].as_str().unwrap().to_string(),
        body["user"]["id"].as_i64().unwrap(),
    )
}

fn bearer(token: &str) -> Header<'static> {
    Header::new("Authorization", format!("Bearer {}", token))
}

fn session_body(title: &str, status: &str) -> Value {
    json!({
        "title": title,
        "tags": ["meditation", "morning"],
        "jsonUrl": "https://example.com/json1",
        "status": status
    })
}

/// Creates a session and returns its JSON.
async fn create(client: &Client, token: &str, body: &Value) -> Value {
    let response = client
        .post("/api/session")
        .header(bearer(token))
        .json(body)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Created);
    response.into_json().await.expect("valid JSON")
}

async fn get_session(client: &Client, id: i64, token: Option<&str>) -> (Status, Value) {
    let mut request = client.get(format!("/api/session/{}", id));
    if let Some(token) = token {
        request = request.header(bearer(token));
    }
    let response = request.dispatch().await;
    let status = response.status();
    (status, response.into_json().await.unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_create_session() {
    let client = client().await;
    time_test!("test_create_session");
    let (token, user_id) = register(&client, "creator@example.com").await;

    let response = client
        .post("/api/session")
        .header(bearer(&token))
        .json(&session_body("Morning Meditation", "draft"))
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Created);
    let location = response.headers().get_one("Location").map(str::to_string);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(location, Some(format!("/api/session/{}", body["id"])));
    assert_eq!(body["title"], "Morning Meditation");
    assert_eq!(body["tags"], json!(["meditation", "morning"]));
    assert_eq!(body["jsonUrl"], "https://example.com/json1");
    assert_eq!(body["status"], "draft");
    assert_eq!(body["user"], user_id);
    assert!(body["createdAt"].is_string());
    assert!(body["updatedAt"].is_string());
}

#[tokio::test]
async fn test_create_requires_authentication() {
    let client = client().await;
    time_test!("test_create_requires_authentication");

    let response = client
        .post("/api/session")
        .json(&session_body("Anonymous", "published"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);

    let response = client.get("/api/session").dispatch().await;
    let listed: Value = response.into_json().await.unwrap();
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn test_create_normalises_comma_separated_tags() {
    let client = client().await;
    time_test!("test_create_normalises_comma_separated_tags");
    let (token, _) = register(&client, "tags@example.com").await;

    let body = create(
        &client,
        &token,
        &json!({
            "title": "  Evening Yoga Flow ",
            "tags": " yoga, evening ,, ",
            "jsonUrl": "https://example.com/json2",
            "status": "published"
        }),
    )
    .await;
    assert_eq!(body["title"], "Evening Yoga Flow");
    assert_eq!(body["tags"], json!(["yoga", "evening"]));
}

#[tokio::test]
async fn test_create_missing_json_url_inserts_nothing() {
    let client = client().await;
    time_test!("test_create_missing_json_url_inserts_nothing");
    let (token, _) = register(&client, "missing@example.com").await;

    let response = client
        .post("/api/session")
        .header(bearer(&token))
        .json(&json!({ "title": "No URL", "tags": ["a"], "status": "draft" }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);
    let body: Value = response.into_json().await.unwrap();
    assert!(body["message"].as_str().unwrap().contains("jsonUrl"));

    let response = client
        .get("/api/session/my-sessions")
        .header(bearer(&token))
        .dispatch()
        .await;
    let mine: Value = response.into_json().await.unwrap();
    assert_eq!(mine, json!([]));
}

#[tokio::test]
async fn test_create_rejects_invalid_status_and_empty_tags() {
    let client = client().await;
    time_test!("test_create_rejects_invalid_status_and_empty_tags");
    let (token, _) = register(&client, "invalid@example.com").await;

    let bodies = [
        session_body("Bad status", "archived"),
        json!({ "title": "No status", "tags": ["a"], "jsonUrl": "https://example.com/x" }),
        json!({ "title": "Blank tags", "tags": ", ,", "jsonUrl": "https://example.com/x", "status": "draft" }),
        json!({ "title": "   ", "tags": ["a"], "jsonUrl": "https://example.com/x", "status": "draft" }),
    ];
    for body in bodies {
        let response = client
            .post("/api/session")
            .header(bearer(&token))
            .json(&body)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest, "body: {}", body);
    }

    let response = client
        .post("/api/session")
        .header(bearer(&token))
        .json(&session_body("Bad status", "archived"))
        .dispatch()
        .await;
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["message"], "Status should be either 'draft' or 'published'.");
}

#[tokio::test]
async fn test_list_published_never_includes_drafts() {
    let client = client().await;
    time_test!("test_list_published_never_includes_drafts");
    let (alice, alice_id) = register(&client, "alice@example.com").await;
    let (bob, _) = register(&client, "bob@example.com").await;

    create(&client, &alice, &session_body("Alice public", "published")).await;
    create(&client, &alice, &session_body("Alice draft", "draft")).await;
    create(&client, &bob, &session_body("Bob public", "published")).await;
    create(&client, &bob, &session_body("Bob draft", "draft")).await;

    let response = client.get("/api/session").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let listed: Value = response.into_json().await.unwrap();
    let listed = listed.as_array().unwrap();

    let titles: Vec<&str> = listed.iter().map(|s| s["title"].as_str().unwrap()).collect();
    assert_eq!(titles, vec!["Alice public", "Bob public"]);
    assert!(listed.iter().all(|s| s["status"] == "published"));
    assert_eq!(listed[0]["user"]["id"], alice_id);
    assert_eq!(listed[0]["user"]["email"], "alice@example.com");
}

#[tokio::test]
async fn test_my_sessions() {
    let client = client().await;
    time_test!("test_my_sessions");
    let (alice, alice_id) = register(&client, "mine@example.com").await;
    let (bob, _) = register(&client, "theirs@example.com").await;

    create(&client, &alice, &session_body("First", "draft")).await;
    create(&client, &alice, &session_body("Second", "published")).await;
    create(&client, &bob, &session_body("Not mine", "published")).await;

    let response = client
        .get("/api/session/my-sessions")
        .header(bearer(&alice))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let mine: Value = response.into_json().await.unwrap();
    let mine = mine.as_array().unwrap();

    let titles: Vec<&str> = mine.iter().map(|s| s["title"].as_str().unwrap()).collect();
    assert_eq!(titles, vec!["Second", "First"]);
    assert!(mine.iter().all(|s| s["user"] == alice_id));

    let response = client.get("/api/session/my-sessions").dispatch().await;
    assert_eq!(response.status(), Status::Unauthorized);
}

#[tokio::test]
async fn test_get_one_visibility() {
    let client = client().await;
    time_test!("test_get_one_visibility");
    let (owner, owner_id) = register(&client, "owner@example.com").await;
    let (other, _) = register(&client, "other@example.com").await;

    let draft = create(&client, &owner, &session_body("Secret", "draft")).await;
    let public = create(&client, &owner, &session_body("Open", "published")).await;
    let draft_id = draft["id"].as_i64().unwrap();
    let public_id = public["id"].as_i64().unwrap();

    let (status, body) = get_session(&client, draft_id, Some(&other)).await;
    assert_eq!(status, Status::Forbidden);
    assert_eq!(body["message"], "Unauthorized access to draft");

    let (status, _) = get_session(&client, draft_id, None).await;
    assert_eq!(status, Status::Forbidden);

    let (status, body) = get_session(&client, draft_id, Some(&owner)).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["user"]["id"], owner_id);
    assert_eq!(body["user"]["email"], "owner@example.com");

    for token in [None, Some(other.as_str())] {
        let (status, body) = get_session(&client, public_id, token).await;
        assert_eq!(status, Status::Ok);
        assert_eq!(body["title"], "Open");
    }
}

#[tokio::test]
async fn test_get_one_not_found_and_bad_header() {
    let client = client().await;
    time_test!("test_get_one_not_found_and_bad_header");
    let (token, _) = register(&client, "lost@example.com").await;
    let public = create(&client, &token, &session_body("Open", "published")).await;

    let (status, body) = get_session(&client, 9999, None).await;
    assert_eq!(status, Status::NotFound);
    assert_eq!(body["message"], "Session not found");

    let response = client.get("/api/session/not-a-number").dispatch().await;
    assert_eq!(response.status(), Status::NotFound);

    let (status, _) =
        get_session(&client, public["id"].as_i64().unwrap(), Some("not-a-token")).await;
    assert_eq!(status, Status::Unauthorized);
}

#[tokio::test]
async fn test_update_by_non_owner_is_forbidden_and_changes_nothing() {
    let client = client().await;
    time_test!("test_update_by_non_owner_is_forbidden_and_changes_nothing");
    let (owner, _) = register(&client, "keeper@example.com").await;
    let (intruder, _) = register(&client, "intruder@example.com").await;

    let created = create(&client, &owner, &session_body("Mine", "draft")).await;
    let id = created["id"].as_i64().unwrap();

    let response = client
        .put(format!("/api/session/{}", id))
        .header(bearer(&intruder))
        .json(&json!({ "title": "Hijacked", "status": "published" }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Forbidden);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["message"], "Not authorized to update this session");

    let (status, body) = get_session(&client, id, Some(&owner)).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["title"], "Mine");
    assert_eq!(body["status"], "draft");
    assert_eq!(body["updatedAt"], created["updatedAt"]);
}

#[tokio::test]
async fn test_partial_update_keeps_omitted_fields() {
    let client = client().await;
    time_test!("test_partial_update_keeps_omitted_fields");
    let (token, user_id) = register(&client, "partial@example.com").await;

    let created = create(&client, &token, &session_body("Original", "draft")).await;
    let id = created["id"].as_i64().unwrap();

    let response = client
        .put(format!("/api/session/{}", id))
        .header(bearer(&token))
        .json(&json!({ "tags": "calm, sleep" }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let updated: Value = response.into_json().await.unwrap();

    assert_eq!(updated["tags"], json!(["calm", "sleep"]));
    assert_eq!(updated["title"], "Original");
    assert_eq!(updated["jsonUrl"], created["jsonUrl"]);
    assert_eq!(updated["status"], "draft");
    assert_eq!(updated["user"], user_id);
    assert_eq!(updated["createdAt"], created["createdAt"]);
    assert_ne!(updated["updatedAt"], created["updatedAt"]);
}

#[tokio::test]
async fn test_update_validation() {
    let client = client().await;
    time_test!("test_update_validation");
    let (token, _) = register(&client, "validate@example.com").await;
    let created = create(&client, &token, &session_body("Valid", "draft")).await;
    let id = created["id"].as_i64().unwrap();

    let bad_bodies = [
        json!({}),
        json!({ "status": "live" }),
        json!({ "title": "  " }),
        json!({ "jsonUrl": "" }),
        json!({ "tags": [] }),
    ];
    for body in bad_bodies {
        let response = client
            .put(format!("/api/session/{}", id))
            .header(bearer(&token))
            .json(&body)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest, "body: {}", body);
    }

    let response = client
        .put(format!("/api/session/{}", id))
        .header(bearer(&token))
        .header(rocket::http::ContentType::JSON)
        .body("[1, 2")
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);

    let response = client
        .put("/api/session/9999")
        .header(bearer(&token))
        .json(&json!({ "title": "Ghost" }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);

    let response = client
        .put(format!("/api/session/{}", id))
        .json(&json!({ "title": "No token" }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);
}

#[tokio::test]
async fn test_end_to_end_publish_flow() {
    let client = client().await;
    time_test!("test_end_to_end_publish_flow");
    let (a, _) = register(&client, "a@example.com").await;
    let (b, _) = register(&client, "b@example.com").await;

    let draft = create(&client, &a, &session_body("Sleep Prep", "draft")).await;
    let id = draft["id"].as_i64().unwrap();

    let (status, _) = get_session(&client, id, Some(&b)).await;
    assert_eq!(status, Status::Forbidden);

    let (status, _) = get_session(&client, id, Some(&a)).await;
    assert_eq!(status, Status::Ok);

    let response = client
        .put(format!("/api/session/{}", id))
        .header(bearer(&a))
        .json(&json!({ "status": "published" }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let updated: Value = response.into_json().await.unwrap();
    assert_eq!(updated["status"], "published");

    let (status, body) = get_session(&client, id, None).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["status"], "published");

    let response = client.get("/api/session").dispatch().await;
    let listed: Value = response.into_json().await.unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);

    // Back to draft is allowed too
    let response = client
        .put(format!("/api/session/{}", id))
        .header(bearer(&a))
        .json(&json!({ "status": "draft" }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let (status, _) = get_session(&client, id, None).await;
    assert_eq!(status, Status::Forbidden);
}
