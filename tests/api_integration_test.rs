//! 実APIに対する結合テスト
//!
//! PANTRY_TOKEN が未設定ならスキップする。

use pantry_scan::api::{ApiClient, ReceiptBackend};
use pantry_scan::config::{normalize_api_url, DEFAULT_API_URL};

#[tokio::test]
async fn api_list_templates_integration() {
    let token = match std::env::var("PANTRY_TOKEN") {
        Ok(token) if !token.trim().is_empty() => token,
        _ => {
            eprintln!("PANTRY_TOKEN not set; skipping integration test");
            return;
        }
    };
    let base_url = std::env::var("PANTRY_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

    let client = ApiClient::new(&base_url, Some(token), 30).expect("client build failed");
    assert_eq!(client.base_url(), normalize_api_url(&base_url));

    let templates = client.list_templates().await.expect("get-food-item-templates failed");
    for template in &templates {
        assert!(!template.template_id.is_empty());
    }

    // 未登録のキーは None
    let missing = client
        .scan_key_template("pantry-scan-integration-test-unknown-key")
        .await
        .expect("get-scan-key failed");
    assert!(missing.is_none());
}
