use rocket::http::Status;
use rocket::local::asynchronous::Client;
use serde_json::{Value, json};

use inventory_api::DbConn;
use inventory_api::orm::testing::{seed_category, seed_device, test_rocket};

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

async fn category(client: &Client, name: &'static str) -> i32 {
    db(client).await.run(move |c| seed_category(c, name).id).await
}

async fn post_json(client: &Client, path: &str, body: Value) -> (Status, Value) {
    let response = client.post(path.to_string()).json(&body).dispatch().await;
    let status = response.status();
    (status, response.into_json().await.unwrap_or(Value::Null))
}

#[rocket::async_test]
async fn computer_lifecycle() {
    let client = logged_in_client().await;
    let laptops = category(&client, "Laptops").await;

    let (status, created) = post_json(
        &client,
        "/api/computers",
        json!({
            "asset_tag": "LAP-001",
            "model": "Latitude 7440",
            "category_id": laptops,
            "computer_type": "laptop",
            "mac_address": "AA:BB:CC:DD:EE:FF",
            "memory_gb": 16
        }),
    )
    .await;
    assert_eq!(status, Status::Created);
    assert_eq!(created["kind"], "computer");
    assert_eq!(created["computer_type"], "laptop");
    assert_eq!(created["memory_gb"], 16);
    let id = created["id"].as_i64().unwrap();

    // visible through the generic collection too
    let generic = client.get(format!("/api/devices/{}", id)).dispatch().await;
    assert_eq!(generic.status(), Status::Ok);

    // but not as a peripheral
    let wrong_kind = client.get(format!("/api/peripherals/{}", id)).dispatch().await;
    assert_eq!(wrong_kind.status(), Status::NotFound);

    let patched = client
        .patch(format!("/api/computers/{}", id))
        .json(&json!({"memory_gb": 32, "notes": "upgraded"}))
        .dispatch()
        .await;
    assert_eq!(patched.status(), Status::Ok);
    let patched: Value = patched.into_json().await.unwrap();
    assert_eq!(patched["memory_gb"], 32);
    assert_eq!(patched["notes"], "upgraded");
    assert_eq!(patched["model"], "Latitude 7440");
    assert_eq!(patched["mac_address"], "AA:BB:CC:DD:EE:FF");

    let deleted = client.delete(format!("/api/computers/{}", id)).dispatch().await;
    assert_eq!(deleted.status(), Status::NoContent);
    let gone = client.get(format!("/api/devices/{}", id)).dispatch().await;
    assert_eq!(gone.status(), Status::NotFound);
}

#[rocket::async_test]
async fn duplicate_asset_tag_is_a_field_error() {
    let client = logged_in_client().await;
    let cat = category(&client, "Servers").await;
    let body = json!({"asset_tag": "SRV-1", "model": "R740", "category_id": cat});

    let (status, _) = post_json(&client, "/api/devices", body.clone()).await;
    assert_eq!(status, Status::Created);

    let (status, errors) = post_json(&client, "/api/devices", body).await;
    assert_eq!(status, Status::BadRequest);
    assert_eq!(errors["asset_tag"][0], "This asset tag is already in use.");
}

#[rocket::async_test]
async fn validation_errors_are_keyed_by_field() {
    let client = logged_in_client().await;
    let cat = category(&client, "Switches").await;

    let (status, errors) = post_json(
        &client,
        "/api/network-devices",
        json!({"asset_tag": "SW-1", "model": "C9300", "category_id": cat, "status": "misplaced"}),
    )
    .await;
    assert_eq!(status, Status::BadRequest);
    assert!(errors["status"].is_array());
    assert!(errors.get("asset_tag").is_none());

    let (status, errors) = post_json(
        &client,
        "/api/network-devices",
        json!({"asset_tag": "", "model": "C9300", "category_id": cat}),
    )
    .await;
    assert_eq!(status, Status::BadRequest);
    assert!(errors["asset_tag"].is_array());
}

#[rocket::async_test]
async fn quick_actions_change_status() {
    let client = logged_in_client().await;
    let cat = category(&client, "Printers").await;
    let device = db(&client).await.run(move |c| seed_device(c, "PRN-1", cat)).await;

    let mark = format!("/api/devices/{}/mark_maintenance", device.id);
    let (status, body) = post_json(&client, &mark, json!({})).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["status"], "Device marked for maintenance");

    let current: Value = client
        .get(format!("/api/devices/{}", device.id))
        .dispatch()
        .await
        .into_json()
        .await
        .unwrap();
    assert_eq!(current["status"], "maintenance");

    let (_, body) =
        post_json(&client, &format!("/api/devices/{}/mark_active", device.id), json!({})).await;
    assert_eq!(body["status"], "Device marked as active");

    let (_, body) =
        post_json(&client, &format!("/api/devices/{}/mark_retired", device.id), json!({})).await;
    assert_eq!(body["status"], "Device marked as retired");

    let missing = client.post("/api/devices/9999/mark_active").dispatch().await;
    assert_eq!(missing.status(), Status::NotFound);
}

#[rocket::async_test]
async fn listing_paginates_with_links() {
    let client = logged_in_client().await;
    let cat = category(&client, "Desks").await;
    db(&client)
        .await
        .run(move |c| {
            for n in 0..25 {
                seed_device(c, &format!("D-{:03}", n), cat);
            }
        })
        .await;

    let first: Value = client
        .get("/api/devices?page_size=10")
        .dispatch()
        .await
        .into_json()
        .await
        .unwrap();
    assert_eq!(first["count"], 25);
    assert_eq!(first["results"].as_array().unwrap().len(), 10);
    assert_eq!(first["results"][0]["asset_tag"], "D-000");
    assert_eq!(first["next"], "/api/devices?page_size=10&page=2");
    assert!(first["previous"].is_null());

    let last: Value = client
        .get("/api/devices?page_size=10&page=3")
        .dispatch()
        .await
        .into_json()
        .await
        .unwrap();
    assert_eq!(last["results"].as_array().unwrap().len(), 5);
    assert!(last["next"].is_null());
    assert_eq!(last["previous"], "/api/devices?page_size=10&page=2");

    let past_end = client.get("/api/devices?page_size=10&page=4").dispatch().await;
    assert_eq!(past_end.status(), Status::NotFound);

    let descending: Value = client
        .get("/api/devices?ordering=-asset_tag&search=D-01")
        .dispatch()
        .await
        .into_json()
        .await
        .unwrap();
    assert_eq!(descending["count"], 10);
    assert_eq!(descending["results"][0]["asset_tag"], "D-019");
}

#[rocket::async_test]
async fn filters_select_by_status_and_category() {
    let client = logged_in_client().await;
    let laptops = category(&client, "Laptops").await;
    let phones = category(&client, "Phones").await;
    db(&client)
        .await
        .run(move |c| {
            seed_device(c, "L-1", laptops);
            seed_device(c, "L-2", laptops);
            seed_device(c, "P-1", phones);
        })
        .await;
    let (status, _) =
        post_json(&client, "/api/devices/2/mark_retired", json!({})).await;
    assert_eq!(status, Status::Ok);

    let retired: Value = client
        .get("/api/devices?status=retired")
        .dispatch()
        .await
        .into_json()
        .await
        .unwrap();
    assert_eq!(retired["count"], 1);
    assert_eq!(retired["results"][0]["asset_tag"], "L-2");

    let both: Value = client
        .get(format!("/api/devices?category={}&category={}", laptops, phones))
        .dispatch()
        .await
        .into_json()
        .await
        .unwrap();
    assert_eq!(both["count"], 3);

    let active_laptops: Value = client
        .get(format!("/api/devices?category={}&status=active", laptops))
        .dispatch()
        .await
        .into_json()
        .await
        .unwrap();
    assert_eq!(active_laptops["count"], 1);
}

#[rocket::async_test]
async fn under_warranty_is_an_unpaginated_list() {
    let client = logged_in_client().await;
    let cat = category(&client, "Monitors").await;
    let (status, _) = post_json(
        &client,
        "/api/peripherals",
        json!({
            "asset_tag": "MON-1",
            "model": "U2720Q",
            "category_id": cat,
            "peripheral_type": "monitor",
            "warranty_expiry": "2027-01-01"
        }),
    )
    .await;
    assert_eq!(status, Status::Created);
    db(&client).await.run(move |c| seed_device(c, "MON-2", cat)).await;

    let rows: Value = client
        .get("/api/peripherals/under_warranty")
        .dispatch()
        .await
        .into_json()
        .await
        .unwrap();
    let rows = rows.as_array().expect("a plain array");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["asset_tag"], "MON-1");
    assert_eq!(rows[0]["warranty_status"], "under_warranty");

    let needs: Value = client
        .get("/api/devices/needs_maintenance")
        .dispatch()
        .await
        .into_json()
        .await
        .unwrap();
    assert_eq!(needs.as_array().map(Vec::len), Some(0));
}

#[rocket::async_test]
async fn unknown_collections_are_not_found() {
    let client = logged_in_client().await;
    let response = client.get("/api/gadgets").dispatch().await;
    assert_eq!(response.status(), Status::NotFound);
}

const BASE_FIELDS: &[&str] = &[
    "asset_tag",
    "serial_number",
    "model",
    "category_id",
    "vendor_id",
    "status",
    "condition",
    "location_id",
    "assigned_to_id",
    "specifications",
    "purchase_date",
    "warranty_expiry",
    "purchase_price",
    "notes",
    "image",
];

fn with_base(mut body: Value, asset_tag: &str, category_id: i32) -> Value {
    let object = body.as_object_mut().unwrap();
    object.insert("asset_tag".into(), json!(asset_tag));
    object.insert("serial_number".into(), json!(format!("SN-{}", asset_tag)));
    object.insert("model".into(), json!("Model X"));
    object.insert("category_id".into(), json!(category_id));
    object.insert("condition".into(), json!("good"));
    object.insert("specifications".into(), json!({"cpu": "i7", "ports": [1, 2]}));
    object.insert("purchase_date".into(), json!("2024-03-01"));
    object.insert("warranty_expiry".into(), json!("2027-03-01"));
    object.insert("purchase_price".into(), json!(1249.5));
    object.insert("notes".into(), json!("rack 4"));
    body
}

/// GETs a device, PUTs the body straight back and checks nothing writable moved.
async fn assert_read_body_writes_back(client: &Client, path: &str, extra_fields: &[&str]) {
    let before: Value = client.get(path.to_string()).dispatch().await.into_json().await.unwrap();

    let response = client.put(path.to_string()).json(&before).dispatch().await;
    assert_eq!(response.status(), Status::Ok, "PUT {}", path);
    let replaced: Value = response.into_json().await.unwrap();
    let after: Value = client.get(path.to_string()).dispatch().await.into_json().await.unwrap();

    for field in BASE_FIELDS.iter().chain(extra_fields) {
        assert!(before.get(*field).is_some(), "{} missing from {}", field, path);
        assert_eq!(replaced[*field], before[*field], "{} changed on {}", field, path);
        assert_eq!(after[*field], before[*field], "{} changed on {}", field, path);
    }
}

#[rocket::async_test]
async fn read_bodies_write_back_unchanged() {
    let client = logged_in_client().await;
    let cat = category(&client, "Mixed").await;

    let (status, plain) =
        post_json(&client, "/api/devices", with_base(json!({}), "DEV-1", cat)).await;
    assert_eq!(status, Status::Created);
    let path = format!("/api/devices/{}", plain["id"]);
    assert_read_body_writes_back(&client, &path, &[]).await;

    let network = json!({
        "ip_address": "10.0.0.2",
        "mac_address": "AA:BB:CC:00:11:22",
        "hostname": "core-sw-01",
        "network_segment": "backbone",
        "is_managed": true,
        "management_ip": "10.0.255.2"
    });
    let (status, switch) =
        post_json(&client, "/api/network-devices", with_base(network, "NET-1", cat)).await;
    assert_eq!(status, Status::Created);
    let path = format!("/api/network-devices/{}", switch["id"]);
    let fields = [
        "ip_address",
        "mac_address",
        "hostname",
        "network_segment",
        "is_managed",
        "management_ip",
    ];
    assert_read_body_writes_back(&client, &path, &fields).await;

    let computer = json!({
        "computer_type": "laptop",
        "operating_system": "Windows 11",
        "os_version": "23H2",
        "processor": "i7-1365U",
        "memory_gb": 16,
        "storage_gb": 512,
        "hostname": "ws-finance-01",
        "ip_address": "10.0.1.20",
        "mac_address": "AA:BB:CC:00:11:33",
        "domain_joined": true,
        "domain_name": "corp.example.com"
    });
    let (status, laptop) =
        post_json(&client, "/api/computers", with_base(computer, "PC-1", cat)).await;
    assert_eq!(status, Status::Created);
    let path = format!("/api/computers/{}", laptop["id"]);
    let fields = [
        "computer_type",
        "operating_system",
        "os_version",
        "processor",
        "memory_gb",
        "storage_gb",
        "hostname",
        "ip_address",
        "mac_address",
        "domain_joined",
        "domain_name",
    ];
    assert_read_body_writes_back(&client, &path, &fields).await;

    let peripheral = json!({"peripheral_type": "webcam", "connected_to_id": laptop["id"]});
    let (status, webcam) =
        post_json(&client, "/api/peripherals", with_base(peripheral, "PER-1", cat)).await;
    assert_eq!(status, Status::Created);
    let path = format!("/api/peripherals/{}", webcam["id"]);
    assert_read_body_writes_back(&client, &path, &["peripheral_type", "connected_to_id"]).await;
}
