//! API integration tests.
//!
//! These run against a live server (`cargo run`) with a seeded admin account
//! (admin/admin123) and an empty-enough database. Run with:
//! `cargo test -- --ignored`

use reqwest::Client;
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Unique suffix so test fixtures never collide across runs
fn unique(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .subsec_nanos();
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .as_secs();
    format!("{}{}{}", prefix, secs, nanos)
}

async fn get_admin_token(client: &Client) -> String {
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "username": "admin",
            "password": "admin123"
        }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

/// Sign up a fresh member and return (token, user_id)
async fn signup_member(client: &Client) -> (String, i64) {
    let username = unique("reader");

    let response = client
        .post(format!("{}/auth/signup", BASE_URL))
        .json(&json!({
            "username": username,
            "password": "secret99",
            "confirm_password": "secret99",
            "full_name": "Test Reader"
        }))
        .send()
        .await
        .expect("Failed to send signup request");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse signup response");
    let user_id = body["id"].as_i64().expect("No user ID");

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "username": username,
            "password": "secret99"
        }))
        .send()
        .await
        .expect("Failed to send login request");
    let body: Value = response.json().await.expect("Failed to parse login response");
    let token = body["token"].as_str().expect("No token in response").to_string();

    (token, user_id)
}

/// Create a book as admin, return its id
async fn create_book(client: &Client, token: &str, copies: i32) -> i64 {
    let response = client
        .post(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({
            "title": "Integration Test Book",
            "author": "Nobody",
            "isbn": unique("978-test-"),
            "category": "Testing",
            "total_copies": copies
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    body["id"].as_i64().expect("No book ID")
}

async fn get_book(client: &Client, token: &str, book_id: i64) -> Value {
    let response = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    response.json().await.expect("Failed to parse response")
}

async fn cleanup(client: &Client, token: &str, book_id: Option<i64>, user_ids: &[i64]) {
    for user_id in user_ids {
        let _ = client
            .delete(format!("{}/users/{}", BASE_URL, user_id))
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await;
    }
    if let Some(id) = book_id {
        let _ = client
            .delete(format!("{}/books/{}", BASE_URL, id))
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await;
    }
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
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "username": "admin",
            "password": "wrong"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_unauthenticated_access_rejected() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_signup_validation() {
    let client = Client::new();

    // Password too short
    let response = client
        .post(format!("{}/auth/signup", BASE_URL))
        .json(&json!({
            "username": unique("reader"),
            "password": "short",
            "confirm_password": "short",
            "full_name": "Test Reader"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);

    // Mismatched confirmation
    let response = client
        .post(format!("{}/auth/signup", BASE_URL))
        .json(&json!({
            "username": unique("reader"),
            "password": "secret99",
            "confirm_password": "secret98",
            "full_name": "Test Reader"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_single_copy_borrow_contention() {
    let client = Client::new();
    let admin = get_admin_token(&client).await;

    let book_id = create_book(&client, &admin, 1).await;
    let (reader_a, user_a) = signup_member(&client).await;
    let (reader_b, user_b) = signup_member(&client).await;

    // A borrows the only copy
    let response = client
        .post(format!("{}/books/{}/borrow", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", reader_a))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    let record_id = body["id"].as_i64().expect("No record ID");

    let book = get_book(&client, &admin, book_id).await;
    assert_eq!(book["available_copies"], 0);
    assert_eq!(book["is_available"], false);

    // B gets turned away, availability untouched
    let response = client
        .post(format!("{}/books/{}/borrow", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", reader_b))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);
    let book = get_book(&client, &admin, book_id).await;
    assert_eq!(book["available_copies"], 0);

    // A cannot borrow the same book twice either
    let response = client
        .post(format!("{}/books/{}/borrow", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", reader_a))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);

    // Return restores the copy
    let response = client
        .post(format!("{}/records/{}/return", BASE_URL, record_id))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let book = get_book(&client, &admin, book_id).await;
    assert_eq!(book["available_copies"], 1);

    // A second return of the same record is a soft conflict
    let response = client
        .post(format!("{}/records/{}/return", BASE_URL, record_id))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);
    let book = get_book(&client, &admin, book_id).await;
    assert_eq!(book["available_copies"], 1);

    cleanup(&client, &admin, Some(book_id), &[user_a, user_b]).await;
}

#[tokio::test]
#[ignore]
async fn test_delete_book_with_active_loan_conflicts() {
    let client = Client::new();
    let admin = get_admin_token(&client).await;

    let book_id = create_book(&client, &admin, 1).await;
    let (reader, user_id) = signup_member(&client).await;

    let response = client
        .post(format!("{}/books/{}/borrow", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", reader))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    let record_id = body["id"].as_i64().expect("No record ID");

    // Deletion is blocked while the loan is out
    let response = client
        .delete(format!("{}/books/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);

    // After the return it goes through
    let response = client
        .post(format!("{}/records/{}/return", BASE_URL, record_id))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let response = client
        .delete(format!("{}/books/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 204);

    cleanup(&client, &admin, None, &[user_id]).await;
}

#[tokio::test]
#[ignore]
async fn test_editing_copies_reconciles_availability() {
    let client = Client::new();
    let admin = get_admin_token(&client).await;

    let book_id = create_book(&client, &admin, 2).await;
    let (reader, user_id) = signup_member(&client).await;

    // One copy out on loan
    let response = client
        .post(format!("{}/books/{}/borrow", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", reader))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    let record_id = body["id"].as_i64().expect("No record ID");

    let book = get_book(&client, &admin, book_id).await;
    assert_eq!(book["available_copies"], 1);

    // Shrink the stock to the copy that is out: nothing left on the shelf
    let response = client
        .put(format!("{}/books/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({
            "title": book["title"],
            "author": book["author"],
            "isbn": book["isbn"],
            "category": book["category"],
            "total_copies": 1
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let book = get_book(&client, &admin, book_id).await;
    assert_eq!(book["total_copies"], 1);
    assert_eq!(book["available_copies"], 0);

    // Unwind
    let response = client
        .post(format!("{}/records/{}/return", BASE_URL, record_id))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    cleanup(&client, &admin, Some(book_id), &[user_id]).await;
}

#[tokio::test]
#[ignore]
async fn test_member_dashboard_and_records() {
    let client = Client::new();
    let admin = get_admin_token(&client).await;

    let book_id = create_book(&client, &admin, 1).await;
    let (reader, user_id) = signup_member(&client).await;

    let response = client
        .post(format!("{}/books/{}/borrow", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", reader))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    let record_id = body["id"].as_i64().expect("No record ID");

    // Fresh loan: borrowed, no fine
    let response = client
        .get(format!("{}/records/mine", BASE_URL))
        .header("Authorization", format!("Bearer {}", reader))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let records: Value = response.json().await.expect("Failed to parse response");
    let mine = records
        .as_array()
        .expect("records should be an array")
        .iter()
        .find(|r| r["id"].as_i64() == Some(record_id))
        .expect("borrowed record missing from listing");
    assert_eq!(mine["status"], "borrowed");
    assert_eq!(mine["fine_amount"].as_str().map(|s| s.parse::<f64>().unwrap()), Some(0.0));

    let response = client
        .get(format!("{}/stats/dashboard", BASE_URL))
        .header("Authorization", format!("Bearer {}", reader))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let dashboard: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(dashboard["active_borrows"], 1);
    assert_eq!(dashboard["overdue_borrows"], 0);
    assert_eq!(dashboard["books_lost"], 0);

    let response = client
        .post(format!("{}/records/{}/return", BASE_URL, record_id))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    cleanup(&client, &admin, Some(book_id), &[user_id]).await;
}

#[tokio::test]
#[ignore]
async fn test_get_stats() {
    let client = Client::new();
    let admin = get_admin_token(&client).await;

    let response = client
        .get(format!("{}/stats", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["total_books"].is_number());
    assert!(body["total_users"].is_number());
    assert!(body["active_borrows"].is_number());
    assert!(body["overdue_books"].is_number());
}
