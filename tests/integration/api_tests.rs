//! API integration tests against a running server
//!
//! Start the server with `KAPI_API_KEY=test-key`, then run:
//! `cargo test --test api_tests -- --ignored`

use reqwest::Client;
use serde_json::Value;

const BASE_URL: &str = "http://localhost:8080/api/v1";
const API_KEY: &str = "test-key";
const PNG: &str = "data:image/png;base64,iVBORw0KGgo=";

fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4())
}

async fn create_building(client: &Client, name: &str) -> Value {
    let response = client
        .post(format!("{}/buildings", BASE_URL))
        .header("X-API-KEY", API_KEY)
        .form(&[("name", name)])
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);
    response.json().await.expect("Failed to parse response")
}

async fn borrow(client: &Client, building_id: &str, room: &str) -> reqwest::Response {
    client
        .post(format!("{}/borrowed-keys", BASE_URL))
        .header("X-API-KEY", API_KEY)
        .form(&[
            ("building_id", building_id),
            ("borrower_name", "Jane"),
            ("borrower_type", "employee"),
            ("borrower_email", "jane@example.com"),
            ("key_room_number", room),
            ("key_type", "room"),
            ("image_base64", PNG),
            ("signature_base64", PNG),
        ])
        .send()
        .await
        .expect("Failed to send request")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_missing_api_key() {
    let client = Client::new();

    let response = client
        .get(format!("{}/borrowed-keys", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_borrow_return_scenario() {
    let client = Client::new();
    let building = create_building(&client, &unique("Hall A")).await;
    let building_id = building["id"].as_str().expect("No building id");

    let response = borrow(&client, building_id, "101").await;
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    let borrow_id = body["data"]["id"].as_str().expect("No borrow id").to_string();
    let key_id = body["data"]["key_id"].as_str().expect("No key id").to_string();

    let status: Value = client
        .get(format!("{}/borrowed-keys/status/{}", BASE_URL, key_id))
        .header("X-API-KEY", API_KEY)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(status["borrowed"], true);

    let response = borrow(&client, building_id, "101").await;
    assert_eq!(response.status(), 409);

    let response = client
        .post(format!("{}/borrowed-keys/return/{}", BASE_URL, borrow_id))
        .header("X-API-KEY", API_KEY)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["borrowed"], false);
    assert!(body["data"]["returned_at"].is_string());

    let response = client
        .post(format!("{}/borrowed-keys/return/{}", BASE_URL, borrow_id))
        .header("X-API-KEY", API_KEY)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);
}

#[tokio::test]
#[ignore]
async fn test_reservation_lifecycle() {
    let client = Client::new();
    let building = create_building(&client, &unique("Annex")).await;
    let building_id = building["id"].as_str().expect("No building id");

    let response = client
        .post(format!("{}/reservations", BASE_URL))
        .header("X-API-KEY", API_KEY)
        .form(&[
            ("building_id", building_id),
            ("key_room_number", "7"),
            ("key_type", "room"),
            ("description", "Inspection"),
            ("collection_at", "2030-01-01T09:00:00Z"),
            ("reservation_by", "Facilities"),
        ])
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    let reservation_id = body["data"]["id"].as_str().expect("No reservation id").to_string();
    assert_eq!(body["data"]["collected"], false);

    let response = client
        .get(format!("{}/reservations?building_id={}", BASE_URL, building_id))
        .header("X-API-KEY", API_KEY)
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["total"], 1);

    let delete_url = format!("{}/reservations/{}", BASE_URL, reservation_id);
    let response = client
        .delete(&delete_url)
        .header("X-API-KEY", API_KEY)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let response = client
        .delete(&delete_url)
        .header("X-API-KEY", API_KEY)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 404);
}
