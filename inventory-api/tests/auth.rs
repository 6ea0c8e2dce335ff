#[macro_use]
extern crate time_test;

use rocket::http::{ContentType, Status};
use rocket::local::asynchronous::Client;
use serde_json::{Value, json};

use inventory_api::orm::testing::test_rocket;

async fn login(client: &Client, username: &str, password: &str) -> Status {
    client
        .post("/api/login")
        .json(&json!({"username": username, "password": password}))
        .dispatch()
        .await
        .status()
}

#[rocket::async_test]
async fn status_needs_no_session() {
    let client = Client::tracked(test_rocket()).await.expect("valid rocket instance");
    time_test!("status_needs_no_session");

    let response = client.get("/api/status").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["status"], "running");
    assert!(body["version"].is_string());
    assert_eq!(body["database"], "ok");
}

#[rocket::async_test]
async fn protected_routes_answer_401_without_a_session() {
    let client = Client::tracked(test_rocket()).await.expect("valid rocket instance");

    for path in ["/api/devices", "/api/software/1", "/api/dashboard/stats", "/api/export/devices"] {
        let response = client.get(path).dispatch().await;
        assert_eq!(response.status(), Status::Unauthorized, "{}", path);
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["status"], 401);
        assert_eq!(body["path"], path);
    }

    let response = client
        .post("/api/computers")
        .header(ContentType::JSON)
        .body(r#"{"asset_tag": "X"}"#)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);
}

#[rocket::async_test]
async fn login_sets_cookie_and_hello_returns_the_user() {
    let client = Client::tracked(test_rocket()).await.expect("valid rocket instance");

    let response = client
        .post("/api/login")
        .json(&json!({"username": "admin", "password": "admin"}))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    assert!(response.cookies().get("session").is_some());
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["username"], "admin");

    let hello = client.get("/api/hello").dispatch().await;
    assert_eq!(hello.status(), Status::Ok);
    let body: Value = hello.into_json().await.unwrap();
    assert_eq!(body["username"], "admin");
}

#[rocket::async_test]
async fn wrong_password_is_rejected() {
    let client = Client::tracked(test_rocket()).await.expect("valid rocket instance");

    let response = client
        .post("/api/login")
        .json(&json!({"username": "admin", "password": "nope"}))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);
    assert!(response.cookies().get("session").is_none());
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["error"], "Invalid credentials");

    assert_eq!(login(&client, "nobody", "admin").await, Status::Unauthorized);
}

#[rocket::async_test]
async fn blank_credentials_are_field_errors() {
    let client = Client::tracked(test_rocket()).await.expect("valid rocket instance");

    let response = client
        .post("/api/login")
        .json(&json!({"username": "", "password": ""}))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);
    let body: Value = response.into_json().await.unwrap();
    assert!(body["username"].is_array());
    assert!(body["password"].is_array());
}

#[rocket::async_test]
async fn logout_revokes_the_session() {
    let client = Client::tracked(test_rocket()).await.expect("valid rocket instance");

    let response = client
        .post("/api/login")
        .json(&json!({"username": "admin", "password": "admin"}))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let session_cookie = response
        .cookies()
        .get("session")
        .cloned()
        .expect("Session cookie should be set after login");

    let logout = client.post("/api/logout").dispatch().await;
    assert_eq!(logout.status(), Status::Ok);

    // Replaying the old token must fail.
    let replay = client.get("/api/hello").cookie(session_cookie).dispatch().await;
    assert_eq!(replay.status(), Status::Unauthorized);
}

#[rocket::async_test]
async fn malformed_json_is_a_bad_request() {
    let client = Client::tracked(test_rocket()).await.expect("valid rocket instance");
    assert_eq!(login(&client, "admin", "admin").await, Status::Ok);

    let response = client
        .post("/api/software")
        .header(ContentType::JSON)
        .body("{not json")
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["status"], 400);

    let wrong_shape = client.post("/api/login").json(&json!({"username": 5})).dispatch().await;
    assert_eq!(wrong_shape.status(), Status::UnprocessableEntity);
}
