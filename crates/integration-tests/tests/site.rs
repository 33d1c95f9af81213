//! End-to-end tests against a running site.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database
//! - The site running (cargo run -p delicious-site), reachable at
//!   `SITE_BASE_URL`
//!
//! Run with: cargo test -p delicious-integration-tests -- --ignored

use reqwest::{Client, StatusCode, multipart};
use serde_json::Value;

use delicious_integration_tests::{TEST_PASSWORD, site_base_url, unique};

/// A client that keeps the session cookie and does not follow redirects.
fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// Register a fresh account; the client is logged in afterwards.
async fn register(client: &Client) -> String {
    let base_url = site_base_url();
    let email = format!("e2e-{}@example.com", unique());
    let resp = client
        .post(format!("{base_url}/register"))
        .form(&[
            ("name", "E2E User"),
            ("email", email.as_str()),
            ("password", TEST_PASSWORD),
            ("password-confirm", TEST_PASSWORD),
        ])
        .send()
        .await
        .expect("Failed to register");

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    email
}

fn location(resp: &reqwest::Response) -> String {
    resp.headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("redirect has a location")
        .to_owned()
}

#[tokio::test]
#[ignore = "Requires running site and database"]
async fn test_health_endpoints() {
    let base_url = site_base_url();
    let client = client();

    let resp = client.get(format!("{base_url}/health")).send().await.expect("health");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(format!("{base_url}/health/ready"))
        .send()
        .await
        .expect("ready");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running site and database"]
async fn test_register_then_add_store_and_heart_it() {
    let base_url = site_base_url();
    let client = client();
    register(&client).await;

    let name = format!("E2E Eats {}", unique());
    let form = multipart::Form::new()
        .text("name", name.clone())
        .text("description", "Made by the end-to-end suite.")
        .text("tags", "Wifi")
        .text("tags", "Vegetarian")
        .text("address", "1 Main St, Hamilton")
        .text("lng", "-79.8711")
        .text("lat", "43.2557");
    let resp = client
        .post(format!("{base_url}/add"))
        .multipart(form)
        .send()
        .await
        .expect("Failed to add store");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let store_path = location(&resp);
    assert!(store_path.starts_with("/store/e2e-eats-"));

    let page = client
        .get(format!("{base_url}{store_path}"))
        .send()
        .await
        .expect("store page")
        .text()
        .await
        .expect("store body");
    assert!(page.contains(&name));
    assert!(page.contains("Care to leave a review?"));

    let results: Vec<Value> = client
        .get(format!("{base_url}/api/search"))
        .query(&[("q", name.as_str())])
        .send()
        .await
        .expect("search")
        .json()
        .await
        .expect("search json");
    let store = results
        .iter()
        .find(|r| r["name"] == name.as_str())
        .expect("new store is searchable");
    let id = store["id"].as_i64().expect("numeric id");

    let hearts: Value = client
        .post(format!("{base_url}/api/stores/{id}/heart"))
        .send()
        .await
        .expect("heart")
        .json()
        .await
        .expect("heart json");
    assert_eq!(hearts["hearts"], serde_json::json!([id]));

    let hearts: Value = client
        .post(format!("{base_url}/api/stores/{id}/heart"))
        .send()
        .await
        .expect("unheart")
        .json()
        .await
        .expect("unheart json");
    assert_eq!(hearts["hearts"], serde_json::json!([]));
}

#[tokio::test]
#[ignore = "Requires running site and database"]
async fn test_invalid_store_is_rerendered_with_errors() {
    let base_url = site_base_url();
    let client = client();
    register(&client).await;

    let form = multipart::Form::new()
        .text("name", "")
        .text("description", "No name")
        .text("address", "")
        .text("lng", "")
        .text("lat", "");
    let resp = client
        .post(format!("{base_url}/add"))
        .multipart(form)
        .send()
        .await
        .expect("Failed to post store");
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
#[ignore = "Requires running site and database"]
async fn test_failed_login_redirects_back() {
    let base_url = site_base_url();
    let client = client();

    let resp = client
        .post(format!("{base_url}/login"))
        .form(&[
            ("email", "nobody@example.com"),
            ("password", "definitely-wrong"),
        ])
        .send()
        .await
        .expect("login");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login");

    let page = client
        .get(format!("{base_url}/login"))
        .send()
        .await
        .expect("login page")
        .text()
        .await
        .expect("login body");
    assert!(page.contains("Failed Login!"));
}

#[tokio::test]
#[ignore = "Requires running site and database"]
async fn test_forgot_password_does_not_reveal_accounts() {
    let base_url = site_base_url();
    let client = client();

    let resp = client
        .post(format!("{base_url}/account/forgot"))
        .form(&[("email", format!("nobody-{}@example.com", unique()))])
        .send()
        .await
        .expect("forgot");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login");

    let resp = client
        .get(format!("{base_url}/account/reset/not-a-real-token"))
        .send()
        .await
        .expect("reset page");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login");
}

#[tokio::test]
#[ignore = "Requires running site and database"]
async fn test_near_api_validates_coordinates() {
    let base_url = site_base_url();
    let resp = client()
        .get(format!("{base_url}/api/stores/near"))
        .query(&[("lat", "43.2557"), ("lng", "-200")])
        .send()
        .await
        .expect("near");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("error json");
    assert!(body["error"].as_str().expect("message").contains("longitude"));
}

#[tokio::test]
#[ignore = "Requires running site and database"]
async fn test_past_end_page_redirects_to_last_page() {
    let base_url = site_base_url();
    let resp = client()
        .get(format!("{base_url}/stores/page/100000"))
        .send()
        .await
        .expect("page");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(location(&resp).starts_with("/stores/page/"));
}
