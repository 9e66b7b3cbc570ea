//! End-to-end tests for the built-in extractors against mocked sites.

use mediaget::config::Config;
use mediaget::extractors::{DispatchError, ExtractorEvent, ExtractorRegistry, MediaType, Outcome};
use tokio::sync::mpsc;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn registry_with_api(api_base: &str) -> ExtractorRegistry {
    let config = Config {
        streamable_api_base: api_base.to_string(),
        ..Config::for_testing()
    };
    ExtractorRegistry::from_config(config).expect("Failed to build registry")
}

fn drain(rx: &mut mpsc::UnboundedReceiver<ExtractorEvent>) -> Vec<ExtractorEvent> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

const STREAMABLE_READY: &str = r#"{
    "status": 2,
    "percent": 100,
    "url": "streamable.com/abc123",
    "title": "Great goal",
    "thumbnail_url": "//cdn.streamable.com/image/abc123.jpg",
    "message": null,
    "files": {
        "mp4": {
            "status": 2,
            "url": "//cdn.streamable.com/video/mp4/abc123.mp4",
            "width": 1280,
            "height": 720,
            "duration": 31.5,
            "size": 4200000
        },
        "mp4-mobile": {
            "status": 2,
            "url": "https://cdn.streamable.com/video/mp4-mobile/abc123.mp4",
            "width": 640,
            "height": 360,
            "duration": 31.5
        }
    }
}"#;

#[tokio::test]
async fn test_streamable_extraction() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/videos/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(STREAMABLE_READY, "application/json"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let registry = registry_with_api(&mock_server.uri());
    let (tx, mut rx) = mpsc::unbounded_channel();

    let media = registry
        .dispatch_with_events(&Url::parse("https://streamable.com/abc123").unwrap(), &tx)
        .await
        .expect("dispatch failed");

    assert_eq!(media.len(), 2);
    let main = &media[0];
    assert_eq!(main.media_type, MediaType::Video);
    assert_eq!(main.real_url, "https://cdn.streamable.com/video/mp4/abc123.mp4");
    assert_eq!(main.title.as_deref(), Some("Great goal"));
    assert_eq!(
        main.thumbnail.as_deref(),
        Some("https://cdn.streamable.com/image/abc123.jpg")
    );
    assert_eq!(main.duration_secs, Some(31.5));
    assert_eq!(main.attributes.get("variant").map(String::as_str), Some("mp4"));
    assert_eq!(main.attributes.get("height").map(String::as_str), Some("720"));
    assert_eq!(main.attributes.get("size").map(String::as_str), Some("4200000"));
    assert_eq!(
        media[1].attributes.get("variant").map(String::as_str),
        Some("mp4-mobile")
    );

    let events = drain(&mut rx);
    assert!(events.iter().all(|e| e.extractor() == "streamable"));
    assert!(matches!(
        events.last(),
        Some(ExtractorEvent::Completed(c)) if matches!(c.outcome, Outcome::Succeeded { media_count: 2 })
    ));
}

#[tokio::test]
async fn test_streamable_video_still_processing() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/videos/pending1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": 1,
            "message": "video is processing",
            "files": {}
        })))
        .mount(&mock_server)
        .await;

    let registry = registry_with_api(&mock_server.uri());
    let err = registry
        .dispatch(&Url::parse("https://streamable.com/pending1").unwrap())
        .await
        .unwrap_err();

    assert!(!err.is_unsupported());
    let message = err.to_string();
    assert!(message.contains("not ready"), "unexpected message: {message}");
    assert!(message.contains("video is processing"));
}

#[tokio::test]
async fn test_streamable_api_error_is_extraction_failure() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/videos/gone99"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let registry = registry_with_api(&mock_server.uri());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let err = registry
        .dispatch_with_events(&Url::parse("https://streamable.com/gone99").unwrap(), &tx)
        .await
        .unwrap_err();

    match &err {
        DispatchError::ExtractionFailed(inner) => {
            let fetch_error = inner
                .chain()
                .find_map(|e| e.downcast_ref::<mediaget::fetch::FetchError>())
                .expect("fetch error missing from chain");
            assert_eq!(fetch_error.status(), Some(reqwest::StatusCode::NOT_FOUND));
        }
        DispatchError::NoSupportedExtractor { .. } => panic!("expected extraction failure"),
    }

    let events = drain(&mut rx);
    assert!(matches!(
        events.first(),
        Some(ExtractorEvent::Progress(p)) if p.message.as_deref() == Some("fetching video metadata")
    ));
    assert!(matches!(
        events.last(),
        Some(ExtractorEvent::Completed(c)) if matches!(c.outcome, Outcome::Failed { .. })
    ));
}

#[tokio::test]
async fn test_direct_link_needs_no_network() {
    // Points the API at a server that would fail every request
    let registry = registry_with_api("http://127.0.0.1:9");

    let media = registry
        .dispatch(&Url::parse("https://media.example.com/podcast/episode-12.mp3").unwrap())
        .await
        .expect("dispatch failed");

    assert_eq!(media.len(), 1);
    assert_eq!(media[0].media_type, MediaType::Audio);
    assert_eq!(media[0].title.as_deref(), Some("episode-12.mp3"));
}

#[tokio::test]
async fn test_opengraph_fallback() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/watch/7"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"<html><head>
                <meta property="og:title" content="Seven">
                <meta property="og:video:url" content="/media/7.webm">
                <meta property="og:image" content="/media/7.jpg">
            </head><body></body></html>"#,
            "text/html; charset=utf-8",
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let registry = registry_with_api(&mock_server.uri());
    let page = Url::parse(&format!("{}/watch/7", mock_server.uri())).unwrap();
    assert_eq!(
        registry.find_kind(page.as_str()).map(|k| k.id()),
        Some("opengraph")
    );

    let media = registry.dispatch(&page).await.expect("dispatch failed");

    assert_eq!(media.len(), 2);
    assert_eq!(media[1].media_type, MediaType::Image);
    assert_eq!(media[1].real_url, format!("{}/media/7.jpg", mock_server.uri()));
    assert_eq!(media[0].media_type, MediaType::Video);
    assert_eq!(media[0].real_url, format!("{}/media/7.webm", mock_server.uri()));
    assert_eq!(
        media[0].thumbnail.as_deref(),
        Some(format!("{}/media/7.jpg", mock_server.uri()).as_str())
    );
    assert_eq!(media[0].title.as_deref(), Some("Seven"));
}

#[tokio::test]
async fn test_unsupported_scheme() {
    let registry = registry_with_api("http://127.0.0.1:9");
    let err = registry
        .dispatch(&Url::parse("ftp://files.example.com/clip.mp4").unwrap())
        .await
        .unwrap_err();
    assert!(err.is_unsupported());
}
