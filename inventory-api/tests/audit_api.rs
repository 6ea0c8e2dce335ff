use rocket::http::Status;
use rocket::local::asynchronous::Client;
use serde_json::{Value, json};

use inventory_api::DbConn;
use inventory_api::orm::testing::{seed_category, seed_device, seed_location, test_rocket};

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

#[rocket::async_test]
async fn audit_with_items() {
    let client = logged_in_client().await;
    let db = DbConn::get_one(client.rocket()).await.expect("database connection");
    let (device, office) = db
        .run(|c| {
            let cat = seed_category(c, "Laptops");
            (seed_device(c, "LAP-1", cat.id).id, seed_location(c, "Office").id)
        })
        .await;

    let missing_title =
        client.post("/api/audits").json(&json!({"audit_type": "physical"})).dispatch().await;
    assert_eq!(missing_title.status(), Status::BadRequest);

    let created = client
        .post("/api/audits")
        .json(&json!({"title": "Q1 floor check", "audit_type": "physical"}))
        .dispatch()
        .await;
    assert_eq!(created.status(), Status::Created);
    let audit: Value = created.into_json().await.unwrap();
    assert_eq!(audit["conducted_by"]["username"], "admin");
    assert_eq!(audit["item_count"], 0);
    assert_eq!(audit["completion_status"], "scheduled");
    let items_path = format!("/api/audits/{}/items", audit["id"]);

    let item = client
        .post(items_path.clone())
        .json(&json!({
            "device_id": device,
            "expected_location_id": office,
            "actual_location_id": office,
            "found": true,
            "condition": "good"
        }))
        .dispatch()
        .await;
    assert_eq!(item.status(), Status::Created);
    let item: Value = item.into_json().await.unwrap();
    assert_eq!(item["device"]["asset_tag"], "LAP-1");
    assert_eq!(item["actual_location"]["name"], "Office");

    let duplicate =
        client.post(items_path.clone()).json(&json!({"device_id": device})).dispatch().await;
    assert_eq!(duplicate.status(), Status::BadRequest);
    let errors: Value = duplicate.into_json().await.unwrap();
    assert_eq!(errors["non_field_errors"][0], "This device is already part of the audit.");

    let audit: Value = client
        .get(format!("/api/audits/{}", audit["id"]))
        .dispatch()
        .await
        .into_json()
        .await
        .unwrap();
    assert_eq!(audit["item_count"], 1);

    let closed = client
        .patch(format!("/api/audits/{}", audit["id"]))
        .json(&json!({"end_date": "2025-01-16T17:00:00", "findings": "All present"}))
        .dispatch()
        .await;
    assert_eq!(closed.status(), Status::Ok);
    let closed: Value = closed.into_json().await.unwrap();
    assert_eq!(closed["completion_status"], "completed");
    assert_eq!(closed["title"], "Q1 floor check");

    let removed = client.delete(format!("/api/audit-items/{}", item["id"])).dispatch().await;
    assert_eq!(removed.status(), Status::NoContent);
    let items: Value = client.get(items_path).dispatch().await.into_json().await.unwrap();
    assert_eq!(items.as_array().map(Vec::len), Some(0));

    let listed: Value = client.get("/api/audits").dispatch().await.into_json().await.unwrap();
    assert_eq!(listed["count"], 1);

    let deleted = client.delete(format!("/api/audits/{}", audit["id"])).dispatch().await;
    assert_eq!(deleted.status(), Status::NoContent);
    let gone = client.get(format!("/api/audits/{}", audit["id"])).dispatch().await;
    assert_eq!(gone.status(), Status::NotFound);
}
