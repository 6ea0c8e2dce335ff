use rocket::http::Status;
use rocket::local::asynchronous::Client;
use serde_json::{Value, json};

use inventory_api::DbConn;
use inventory_api::orm::testing::{seed_category, seed_device, seed_software, test_rocket};

async fn logged_in_client() -> Client {
    let client = Client::tracked(test_rocket()).await.expect("valid rocket instance");
    let response = client
        .post("/api/login")
        .json(&json!({"username": "admin", "password": "admin"}))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    drop(response);
    client
}

async fn db(client: &Client) -> DbConn {
    DbConn::get_one(client.rocket()).await.expect("database connection")
}

async fn get_json(client: &Client, path: String) -> Value {
    let response = client.get(path).dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    response.into_json().await.unwrap()
}

/// Two devices in one category, ids returned in insertion order.
async fn two_devices(client: &Client) -> (i32, i32) {
    db(client)
        .await
        .run(|c| {
            let cat = seed_category(c, "Laptops");
            (seed_device(c, "LAP-1", cat.id).id, seed_device(c, "LAP-2", cat.id).id)
        })
        .await
}

#[rocket::async_test]
async fn seats_are_validated() {
    let client = logged_in_client().await;

    let zero = client
        .post("/api/software")
        .json(&json!({"name": "Office", "version": "2024", "seats": 0}))
        .dispatch()
        .await;
    assert_eq!(zero.status(), Status::BadRequest);
    let errors: Value = zero.into_json().await.unwrap();
    assert!(errors["seats"].is_array());

    let created = client
        .post("/api/software")
        .json(&json!({
            "name": "Office",
            "version": "2024",
            "seats": 5,
            "license_type": "subscription"
        }))
        .dispatch()
        .await;
    assert_eq!(created.status(), Status::Created);
    let created: Value = created.into_json().await.unwrap();
    assert_eq!(created["available_seats"], 5);
    assert_eq!(created["used_seats"], 0);
    assert_eq!(created["license_status"], "no_expiry");

    let blank_name = client
        .patch(format!("/api/software/{}", created["id"]))
        .json(&json!({"name": ""}))
        .dispatch()
        .await;
    assert_eq!(blank_name.status(), Status::BadRequest);
}

#[rocket::async_test]
async fn seats_cannot_drop_below_usage() {
    let client = logged_in_client().await;
    let sw = db(&client).await.run(|c| seed_software(c, "CAD", 10, 4)).await;

    let response = client
        .patch(format!("/api/software/{}", sw.id))
        .json(&json!({"seats": 3}))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);
    let errors: Value = response.into_json().await.unwrap();
    assert_eq!(errors["seats"][0], "Number of seats cannot be less than seats in use (4).");

    let response = client
        .patch(format!("/api/software/{}", sw.id))
        .json(&json!({"seats": 4}))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["available_seats"], 0);
}

#[rocket::async_test]
async fn license_reports() {
    let client = logged_in_client().await;
    db(&client)
        .await
        .run(|c| {
            seed_software(c, "Roomy", 50, 1);
            seed_software(c, "Tight", 10, 8);
            seed_software(c, "Full", 3, 3);
        })
        .await;
    let licenses = [("Soon", "2025-02-01"), ("Lapsed", "2024-12-31"), ("Later", "2026-01-01")];
    for (name, expiry) in licenses {
        let response = client
            .post("/api/software")
            .json(&json!({"name": name, "seats": 20, "license_expiry": expiry}))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Created);
    }

    let names = |rows: &Value| -> Vec<String> {
        let mut names: Vec<String> = rows
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["name"].as_str().unwrap().to_string())
            .collect();
        names.sort();
        names
    };

    let low = get_json(&client, "/api/software/low_seats".into()).await;
    assert_eq!(names(&low), vec!["Full", "Tight"]);

    let soon = get_json(&client, "/api/software/expiring_soon".into()).await;
    assert_eq!(names(&soon), vec!["Soon"]);

    let expired = get_json(&client, "/api/software/expired".into()).await;
    assert_eq!(names(&expired), vec!["Lapsed"]);
    assert_eq!(expired[0]["license_status"], "expired");

    let filtered = get_json(&client, "/api/software?low_seats=true&ordering=-name".into()).await;
    assert_eq!(filtered["count"], 2);
    assert_eq!(filtered["results"][0]["name"], "Tight");
}

#[rocket::async_test]
async fn installations_consume_and_free_seats() {
    let client = logged_in_client().await;
    let (first, second) = two_devices(&client).await;
    let sw = db(&client).await.run(|c| seed_software(c, "Editor", 1, 0)).await;
    let path = format!("/api/software/{}/installations", sw.id);

    let installed = client.post(path.clone()).json(&json!({"device_id": first})).dispatch().await;
    assert_eq!(installed.status(), Status::Created);
    let installed: Value = installed.into_json().await.unwrap();
    assert_eq!(installed["device"]["asset_tag"], "LAP-1");
    assert_eq!(installed["installed_by"]["username"], "admin");

    let software = get_json(&client, format!("/api/software/{}", sw.id)).await;
    assert_eq!(software["used_seats"], 1);
    assert_eq!(software["available_seats"], 0);

    let full = client.post(path.clone()).json(&json!({"device_id": second})).dispatch().await;
    assert_eq!(full.status(), Status::BadRequest);
    let errors: Value = full.into_json().await.unwrap();
    assert_eq!(errors["software"][0], "No seats available");

    let listed = get_json(&client, path.clone()).await;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    let removed = client.delete(format!("/api/installations/{}", installed["id"])).dispatch().await;
    assert_eq!(removed.status(), Status::NoContent);

    let software = get_json(&client, format!("/api/software/{}", sw.id)).await;
    assert_eq!(software["used_seats"], 0);

    let again = client.post(path).json(&json!({"device_id": second})).dispatch().await;
    assert_eq!(again.status(), Status::Created);
}

#[rocket::async_test]
async fn installing_twice_on_one_device_is_rejected() {
    let client = logged_in_client().await;
    let (device, _) = two_devices(&client).await;
    let sw = db(&client).await.run(|c| seed_software(c, "Browser", 10, 0)).await;
    let path = format!("/api/software/{}/installations", sw.id);

    let first = client.post(path.clone()).json(&json!({"device_id": device})).dispatch().await;
    assert_eq!(first.status(), Status::Created);

    let second = client.post(path).json(&json!({"device_id": device})).dispatch().await;
    assert_eq!(second.status(), Status::BadRequest);
    let errors: Value = second.into_json().await.unwrap();
    assert!(errors["non_field_errors"].is_array());

    let software = get_json(&client, format!("/api/software/{}", sw.id)).await;
    assert_eq!(software["used_seats"], 1);
}
