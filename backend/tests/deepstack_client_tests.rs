mod helpers;

use fruits_backend::deepstack::DeepstackClient;
use fruits_backend::upload::UploadedImage;
use helpers::{png_bytes, spawn_deepstack, unreachable_base_url};
use serde_json::json;
use std::time::Duration;

const MODEL: &str = "FruitsRecognition";

fn client_for(base_url: &str) -> DeepstackClient {
    DeepstackClient::new(base_url, MODEL, Duration::from_secs(5)).unwrap()
}

fn apple() -> UploadedImage {
    UploadedImage::new(png_bytes([200, 30, 30]), "apple.png", Some("image/png".to_string()))
}

#[actix_web::test]
async fn test_success_returns_parsed_payload() {
    let fake = spawn_deepstack(200, r#"{"success": true, "label": "Apple", "confidence": 0.93}"#);
    let client = client_for(&fake.base_url);

    let response = client.call_custom_model(&apple()).await.unwrap();

    assert_eq!(response.status_code, 200);
    assert_eq!(response.endpoint, format!("{}/v1/vision/custom/{}", fake.base_url, MODEL));
    assert_eq!(response.payload["label"], "Apple");
    assert!(response.response_preview.contains("Apple"));
}

#[actix_web::test]
async fn test_image_is_posted_as_image_field() {
    let fake = spawn_deepstack(200, r#"{"label": "Apple", "confidence": 0.5}"#);
    let client = client_for(&fake.base_url);
    let image = apple();

    client.call_custom_model(&image).await.unwrap();

    let received = fake.received.lock().unwrap().clone();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].name.as_deref(), Some("image"));
    assert_eq!(received[0].filename.as_deref(), Some("apple.png"));
    assert_eq!(received[0].content_type.as_deref(), Some("image/png"));
    assert_eq!(received[0].size, image.data.len());
}

#[actix_web::test]
async fn test_not_found_carries_hint() {
    let fake = spawn_deepstack(404, r#"{"error": "Not Found"}"#);
    let client = client_for(&fake.base_url);

    let err = client.call_custom_model(&apple()).await.unwrap_err();

    assert_eq!(err.status_code, 404);
    assert!(err.is_endpoint_missing());
    assert_eq!(err.message, "DeepStack custom endpoint was not found.");
    assert_eq!(err.details["endpoint"], json!(client.endpoint()));
    assert!(err.details["hint"].as_str().unwrap().contains("/v1/vision/custom/<model>"));
    assert!(err.details["response_preview"].as_str().unwrap().contains("Not Found"));
}

#[actix_web::test]
async fn test_server_error_keeps_status() {
    let fake = spawn_deepstack(500, "internal failure");
    let client = client_for(&fake.base_url);

    let err = client.call_custom_model(&apple()).await.unwrap_err();

    assert_eq!(err.status_code, 500);
    assert_eq!(err.message, "DeepStack returned HTTP 500.");
    assert_eq!(err.details["response_preview"], "internal failure");
    assert!(!err.is_endpoint_missing());
}

#[actix_web::test]
async fn test_non_json_body_is_bad_gateway() {
    let fake = spawn_deepstack(200, "<html>definitely not json</html>");
    let client = client_for(&fake.base_url);

    let err = client.call_custom_model(&apple()).await.unwrap_err();

    assert_eq!(err.status_code, 502);
    assert_eq!(err.message, "DeepStack returned a non-JSON response.");
    assert_eq!(err.details["response_preview"], "<html>definitely not json</html>");
}

#[actix_web::test]
async fn test_unreachable_service_is_unavailable() {
    let base_url = unreachable_base_url();
    let client = client_for(&base_url);

    let err = client.call_custom_model(&apple()).await.unwrap_err();

    assert_eq!(err.status_code, 503);
    assert_eq!(err.message, "Could not reach DeepStack service.");
    assert_eq!(err.details["endpoint"], json!(client.endpoint()));
    assert!(err.details.contains_key("exception"));
}
