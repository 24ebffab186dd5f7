//! HTTP notification source end to end

use taprelay::source::http::HttpSource;
use taprelay::source::NotificationSource;

/// POST a JSON body and return the status code
async fn post_json(url: String, body: &'static str) -> u16 {
    tokio::task::spawn_blocking(move || {
        match ureq::post(&url)
            .set("Content-Type", "application/json")
            .send_string(body)
        {
            Ok(response) => response.status(),
            Err(ureq::Error::Status(code, _)) => code,
            Err(e) => panic!("request failed: {}", e),
        }
    })
    .await
    .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_http_source_filters_and_queues() {
    let mut source = HttpSource::new("127.0.0.1:0".into(), "family.fomo.app".into());
    let mut rx = source.start().await.unwrap();
    let url = format!("http://{}/notifications", source.local_addr().unwrap());

    let status = post_json(
        url.clone(),
        r#"{"app":"family.fomo.app","title":"FOMO","body":"New token detected","postedAt":42,"action":"fomo://token/1"}"#,
    )
    .await;
    assert_eq!(status, 202);

    let notification = rx.recv().await.unwrap();
    assert_eq!(notification.title, "FOMO");
    assert_eq!(notification.body, "New token detected");
    assert_eq!(notification.posted_at, 42);
    assert_eq!(notification.action.as_deref(), Some("fomo://token/1"));

    // Other apps are acknowledged but not queued
    let status = post_json(url.clone(), r#"{"app":"com.example.chat","title":"hi"}"#).await;
    assert_eq!(status, 204);

    // Missing app identity is rejected by the extractor
    let status = post_json(url, r#"{"title":"FOMO"}"#).await;
    assert!((400..500).contains(&status));

    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_http_source_bind_failure() {
    let mut source = HttpSource::new("not-an-address".into(), "family.fomo.app".into());
    assert!(source.start().await.is_err());
}
