//! Stage-level tests for timeline extraction, gap filling, and script
//! generation against a mock generation service.

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vnar_genai::{FileHandle, GenerationClient, RetryConfig};
use vnar_models::{HighlightEvent, PLACEHOLDER_DESCRIPTION};
use vnar_pipeline::timeline::{extract_timeline, fill_gaps, UploadedFrame};
use vnar_pipeline::script::generate_script;

const GENERATE_PATH: &str = "/v1beta/models/gemini-1.5-pro-latest:generateContent";

fn client(server: &MockServer) -> GenerationClient {
    GenerationClient::new("test-key")
        .with_base_url(server.uri())
        .with_retry(
            RetryConfig::new("test")
                .with_max_retries(1)
                .with_base_delay_secs(0.001)
                .with_max_delay_secs(0.002),
        )
}

fn uploaded_frame(time: u32) -> UploadedFrame {
    UploadedFrame {
        time,
        handle: FileHandle {
            name: format!("files/frame-{time}"),
            uri: format!("https://files/frame-{time}"),
            mime_type: "image/jpeg".to_string(),
            state: "ACTIVE".to_string(),
        },
    }
}

fn generation_body(text: &str) -> serde_json::Value {
    json!({"candidates": [{"content": {"parts": [{"text": text}]}}]})
}

#[tokio::test]
async fn extraction_coerces_start_and_replaces_empty_description() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(generation_body(
            r#"[{"start": "3.7", "event_description": ""}]"#,
        )))
        .mount(&server)
        .await;

    let frames = vec![uploaded_frame(0), uploaded_frame(10)];
    let events = extract_timeline(&client(&server), &frames).await.unwrap();

    assert_eq!(events, vec![HighlightEvent::new(4, PLACEHOLDER_DESCRIPTION)]);
}

#[tokio::test]
async fn extraction_empty_result_falls_back_to_midpoint_event() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(generation_body("[]")))
        .mount(&server)
        .await;

    let frames = vec![uploaded_frame(0), uploaded_frame(10), uploaded_frame(20)];
    let events = extract_timeline(&client(&server), &frames).await.unwrap();

    assert_eq!(events, vec![HighlightEvent::new(10, PLACEHOLDER_DESCRIPTION)]);
}

#[tokio::test]
async fn gap_fill_request_results_are_clamped_into_the_gap() {
    let server = MockServer::start().await;
    // The model wanders outside the 5..30 window; starts must be clamped in.
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(generation_body(
            r#"[{"start": 2, "description": "too early"},
                {"start": 14, "description": "mid"},
                {"start": 22, "description": "later"},
                {"start": 45, "description": "too late"}]"#,
        )))
        .mount(&server)
        .await;

    let timeline = vec![HighlightEvent::new(5, "B"), HighlightEvent::new(30, "C")];
    let frames = vec![uploaded_frame(10), uploaded_frame(20)];
    let filled = fill_gaps(&client(&server), timeline, &frames, 10).await;

    assert!(filled.iter().all(|e| e.start >= 5 && e.start <= 30));
    for pair in filled.windows(2) {
        assert!(pair[0].start < pair[1].start);
    }
    assert!(filled.iter().any(|e| e.description == "mid"));
    // Out-of-window starts land on the gap's edges.
    assert!(filled.iter().any(|e| e.start == 6 && e.description == "too early"));
    assert!(filled.iter().any(|e| e.start == 29 && e.description == "too late"));
}

#[tokio::test]
async fn gap_fill_sparse_request_result_is_subdivided_further() {
    let server = MockServer::start().await;
    // One event for a 25-second gap is not dense enough on its own.
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(generation_body(
            r#"[{"start": 14, "description": "mid"}]"#,
        )))
        .mount(&server)
        .await;

    let timeline = vec![HighlightEvent::new(5, "B"), HighlightEvent::new(30, "C")];
    let frames = vec![uploaded_frame(10), uploaded_frame(20)];
    let filled = fill_gaps(&client(&server), timeline, &frames, 10).await;

    assert!(filled.iter().any(|e| e.start == 14 && e.description == "mid"));
    for pair in filled.windows(2) {
        assert!(
            pair[1].start - pair[0].start <= 10,
            "gap {} -> {} exceeds 10s: {filled:?}",
            pair[0].start,
            pair[1].start
        );
    }
}

#[tokio::test]
async fn gap_fill_subdivides_when_the_request_keeps_failing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let timeline = vec![HighlightEvent::new(5, "B"), HighlightEvent::new(30, "C")];
    let frames = vec![uploaded_frame(12)];
    let filled = fill_gaps(&client(&server), timeline, &frames, 10).await;

    // 2 originals + max(1, 25 / 7) = 3 synthetic events
    assert_eq!(filled.len(), 5);
    for pair in filled.windows(2) {
        assert!(pair[1].start - pair[0].start <= 10);
    }
}

#[tokio::test]
async fn script_rate_is_clamped_and_text_taken_from_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(generation_body(
            r#"{"text": "What a save!", "rate": 5.0}"#,
        )))
        .mount(&server)
        .await;

    let timeline = vec![HighlightEvent::new(0, "goalkeeper save")];
    let lines = generate_script(&client(&server), &timeline, 8).await;

    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].id, "line-0");
    assert_eq!(lines[0].text, "What a save!");
    assert_eq!(lines[0].rate, 2.0);
}

#[tokio::test]
async fn script_falls_back_to_verbatim_description_on_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let timeline = vec![
        HighlightEvent::new(0, "kickoff"),
        HighlightEvent::new(6, "first attack"),
    ];
    let lines = generate_script(&client(&server), &timeline, 8).await;

    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].text, "kickoff");
    assert_eq!(lines[0].rate, 1.0);
    assert_eq!(lines[1].text, "first attack");
}
