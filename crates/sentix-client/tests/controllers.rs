use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;
use sentix_client::session::{BATCH_DEEP_ALL_FILE_NAME, FAST_FALLBACK_NOTE};
use sentix_client::{
    AnalysisSession, NewsFlow, SentixApi, SessionError, SingleOutcome, UploadFile, YoutubeError,
    YoutubeFlow,
};
use sentix_core::{History, KvStore, MemoryStore, Prefs, Timeouts};
use sentix_protocol::{BatchResult, DeepRowOutcome, HistoryMode, RowResult, Sentiment};
use serde_json::json;
use tokio_util::sync::CancellationToken;

fn store() -> Arc<dyn KvStore> {
    Arc::new(MemoryStore::new())
}

fn session(server: &MockServer, timeouts: Timeouts) -> (AnalysisSession, History) {
    let store = store();
    let api = Arc::new(SentixApi::new(&server.base_url(), timeouts).unwrap());
    let history = History::new(store.clone());
    (
        AnalysisSession::new(api, history.clone(), Prefs::new(store)),
        history,
    )
}

async fn analyze_mock(server: &MockServer, text: &str, status: u16, label: &str) {
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/analyze")
                .json_body_partial(json!({ "text": text }).to_string());
            then.status(status)
                .header("content-type", "application/json")
                .json_body(json!({"overall_sentiment": label, "confidence": 0.9}));
        })
        .await;
}

#[tokio::test]
async fn deep_rows_keep_positions_and_isolate_failures() {
    let server = MockServer::start_async().await;
    analyze_mock(&server, "alpha", 200, "positive").await;
    analyze_mock(&server, "beta", 500, "error").await;
    analyze_mock(&server, "gamma", 200, "negative").await;

    let (session, _) = session(&server, Timeouts::default());
    let texts: Vec<String> = ["alpha", "beta", "gamma"].iter().map(|s| s.to_string()).collect();
    let out = session.deep_analyze_rows(&texts, &CancellationToken::new()).await;

    assert_eq!(out.len(), 3);
    assert_eq!(
        out[0].analysis().and_then(|r| r.overall_sentiment.as_deref()),
        Some("positive")
    );
    match &out[1] {
        DeepRowOutcome::Failed { error, text } => {
            assert!(error.contains("500"), "{error}");
            assert_eq!(text, "beta");
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(
        out[2].analysis().and_then(|r| r.overall_sentiment.as_deref()),
        Some("negative")
    );
}

#[tokio::test]
async fn batch_deep_all_attaches_results_and_records_history() {
    let server = MockServer::start_async().await;
    analyze_mock(&server, "good", 200, "positive").await;

    let (session, history) = session(&server, Timeouts::default());
    let mut batch = BatchResult {
        rows: vec![RowResult::new("  good  "), RowResult::new("   ")],
        ..BatchResult::default()
    };
    batch.summary = serde_json::from_value(json!({"consensus_rate": 1.0})).ok();

    let out = session.analyze_batch_rows(batch).await.unwrap();
    let deep = out.deep_results.as_ref().unwrap();
    assert_eq!(deep.len(), 1);
    assert!(!deep[0].is_failure());

    let entries = history.analyses();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].mode, HistoryMode::BatchAll);
    assert_eq!(entries[0].file_name.as_deref(), Some(BATCH_DEEP_ALL_FILE_NAME));

    let empty = BatchResult::default();
    let err = session.analyze_batch_rows(empty).await.unwrap_err();
    assert_eq!(err.to_string(), "Run Deep Analysis on a file first.");
}

#[tokio::test]
async fn slow_deep_analysis_falls_back_to_fast_prediction() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/analyze");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"overall_sentiment": "positive"}))
                .delay(Duration::from_millis(1_500));
        })
        .await;
    let predict = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/predict")
                .json_body_partial(r#"{"narrative": false}"#);
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"label": "negative", "confidence": 0.5}));
        })
        .await;

    let timeouts = Timeouts {
        deep: Duration::from_millis(100),
        fast: Duration::from_millis(1_000),
        ..Timeouts::default()
    };
    let (session, history) = session(&server, timeouts);
    let outcome = session.analyze_text("meh product").await.unwrap();
    match outcome {
        SingleOutcome::Fast { note, result } => {
            assert_eq!(note, FAST_FALLBACK_NOTE);
            assert_eq!(result.label(), Sentiment::Negative);
        }
        other => panic!("expected fast fallback, got {other:?}"),
    }
    predict.assert_async().await;
    assert_eq!(history.analyses()[0].mode, HistoryMode::SingleFast);
    assert_eq!(history.texts(), vec!["meh product"]);
}

#[tokio::test]
async fn empty_input_and_bad_uploads_are_rejected() {
    let server = MockServer::start_async().await;
    let (session, _) = session(&server, Timeouts::default());
    let err = session.analyze_text("   ").await.unwrap_err();
    assert_eq!(err.to_string(), "Please enter text or choose a CSV/XLSX.");

    let err = session
        .analyze_file(UploadFile::new("notes.txt", b"x".to_vec()))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::UnsupportedFile(_)));
}

#[tokio::test]
async fn batch_upload_sends_multipart_and_records_summary() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/batch")
                .body_contains("filename=\"reviews.csv\"")
                .body_contains("great phone");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "rows": [{"text": "great phone", "per_model": {"m": {"label": "positive", "confidence": 0.8}}}],
                    "summary": {"consensus_rate": 1.0}
                }));
        })
        .await;

    let (session, history) = session(&server, Timeouts::default());
    let out = session
        .analyze_file(UploadFile::new("reviews.csv", b"text\ngreat phone\n".to_vec()))
        .await
        .unwrap();
    mock.assert_async().await;
    assert_eq!(out.rows.len(), 1);
    let entries = history.analyses();
    assert_eq!(entries[0].mode, HistoryMode::Batch);
    assert_eq!(entries[0].file_name.as_deref(), Some("reviews.csv"));
}

#[tokio::test]
async fn per_row_http_error_is_shown_verbatim() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/analyze");
            then.status(500).body("boom");
        })
        .await;
    let (session, _) = session(&server, Timeouts::default());
    let err = session.analyze_row("row text").await.unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("500") && msg.contains("boom"), "{msg}");
}

#[tokio::test]
async fn youtube_failures_are_retried_then_paraphrased() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/stream/youtube/full")
                .json_body_partial(r#"{"yt_id": "abc123", "window_seconds": 20}"#);
            then.status(404)
                .header("content-type", "application/json")
                .json_body(json!({"detail": "No transcript found for abc123"}));
        })
        .await;

    let store = store();
    let prefs = Prefs::new(store);
    let api = Arc::new(SentixApi::new(&server.base_url(), Timeouts::default()).unwrap());
    let flow = YoutubeFlow::new(api, prefs.clone()).with_retry_policy(2, Duration::from_millis(10));

    let err = flow.fetch(" https://youtu.be/abc123 ").await.unwrap_err();
    assert!(matches!(err, YoutubeError::Failed(_)));
    assert_eq!(err.to_string(), "No CC/Whisper transcript available for this range.");
    assert_eq!(mock.hits_async().await, 2);
    assert_eq!(prefs.yt_last_url().as_deref(), Some("https://youtu.be/abc123"));
}

#[tokio::test]
async fn news_ingest_validates_custom_feeds() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/stream/news/rss")
                .json_body_partial(r#"{"feeds": ["https://a.example/rss"], "limit_per_feed": 5}"#);
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"items": [{"title": "x", "label": "positive"}], "summary": {"counts": {"positive": 1}}}));
        })
        .await;
    let api = Arc::new(SentixApi::new(&server.base_url(), Timeouts::default()).unwrap());
    let flow = NewsFlow::new(api);

    let err = flow
        .ingest(sentix_client::IngestOptions {
            feeds: vec!["ftp://bad".into()],
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Custom RSS must start with http:// or https://");

    let out = flow
        .ingest(sentix_client::IngestOptions {
            feeds: vec!["https://a.example/rss".into()],
            ..Default::default()
        })
        .await
        .unwrap();
    mock.assert_async().await;
    assert_eq!(out.summary.counts.positive, 1);
}

#[tokio::test]
async fn newer_analysis_cancels_the_one_in_flight() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/analyze")
                .json_body_partial(r#"{"text": "first"}"#);
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"overall_sentiment": "negative"}))
                .delay(Duration::from_secs(3));
        })
        .await;
    analyze_mock(&server, "second", 200, "positive").await;

    let (session, history) = session(&server, Timeouts::default());
    let (first, second) = tokio::join!(session.analyze_text("first"), async {
        tokio::time::sleep(Duration::from_millis(150)).await;
        session.analyze_text("second").await
    });

    assert!(matches!(first, Err(SessionError::DeepCanceled)), "{first:?}");
    let second = second.unwrap();
    assert!(matches!(second, SingleOutcome::Deep(_)));
    assert_eq!(second.result().overall_sentiment.as_deref(), Some("positive"));
    assert_eq!(history.texts()[0], "second");
}

#[tokio::test]
async fn session_teardown_aborts_the_request() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/analyze");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"overall_sentiment": "positive"}))
                .delay(Duration::from_secs(3));
        })
        .await;
    let store = store();
    let api = Arc::new(SentixApi::new(&server.base_url(), Timeouts::default()).unwrap());
    let session = AnalysisSession::new(api.clone(), History::new(store.clone()), Prefs::new(store));

    let started = std::time::Instant::now();
    let (res, _) = tokio::join!(session.analyze_row("slow row"), async {
        tokio::time::sleep(Duration::from_millis(150)).await;
        session.cancel();
    });
    assert!(matches!(res, Err(SessionError::RowCanceled)), "{res:?}");
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(api.http().inflight(), 0);
}

#[tokio::test]
async fn youtube_teardown_stops_retries_and_reports_network_issue() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/stream/youtube/full");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"segments": []}))
                .delay(Duration::from_secs(3));
        })
        .await;
    let api = Arc::new(SentixApi::new(&server.base_url(), Timeouts::default()).unwrap());
    let flow = YoutubeFlow::new(api.clone(), Prefs::new(store()));

    let started = std::time::Instant::now();
    let (res, _) = tokio::join!(flow.fetch("https://youtu.be/abc123"), async {
        tokio::time::sleep(Duration::from_millis(150)).await;
        flow.cancel();
    });
    let err = res.unwrap_err();
    assert_eq!(err.to_string(), "Network issue while contacting the API.");
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(mock.hits_async().await, 1);
    assert_eq!(api.http().inflight(), 0);
}

#[tokio::test]
async fn transcript_pass_uses_the_analyze_timeout() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/analyze")
                .json_body_partial(r#"{"mode": "yt_deep"}"#);
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"overall_sentiment": "positive"}))
                .delay(Duration::from_secs(3));
        })
        .await;
    let timeouts = Timeouts {
        analyze: Duration::from_millis(100),
        youtube: Duration::from_secs(10),
        ..Timeouts::default()
    };
    let api = Arc::new(SentixApi::new(&server.base_url(), timeouts).unwrap());
    let flow = YoutubeFlow::new(api, Prefs::new(store()));
    let analysis: sentix_protocol::YoutubeAnalysis = serde_json::from_value(json!({
        "segments": [{"text": "a long enough transcript line", "label": "positive", "start": 0, "end": 20}]
    }))
    .unwrap();

    let started = std::time::Instant::now();
    let err = flow.analyze_transcript(&analysis).await.unwrap_err();
    assert_eq!(err.to_string(), "Network issue while contacting the API.");
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(mock.hits_async().await, 2);
}

#[tokio::test]
async fn model_comparison_sends_models_under_the_batch_timeout() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/batch")
                .body_contains("name=\"models\"")
                .body_contains("xlmr,onnx-optimized");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "rows": [{"text": "ok", "per_model": {
                        "xlmr": {"label": "neutral", "confidence": 0.6},
                        "onnx-optimized": {"label": "neutral", "confidence": 0.7}
                    }}],
                    "summary": {"consensus_rate": 1.0}
                }))
                .delay(Duration::from_millis(400));
        })
        .await;

    let timeouts = Timeouts {
        batch: Duration::from_secs(5),
        batch_upload: Duration::from_millis(50),
        ..Timeouts::default()
    };
    let (session, history) = session(&server, timeouts);
    let out = session
        .compare_models(UploadFile::new("reviews.csv", b"text\nok\n".to_vec()), " xlmr,onnx-optimized ")
        .await
        .unwrap();
    mock.assert_async().await;
    assert_eq!(out.rows.len(), 1);
    assert_eq!(history.analyses()[0].model, "xlmr,onnx-optimized");

    let err = session
        .compare_models(UploadFile::new("notes.txt", Vec::new()), "xlmr")
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::UnsupportedFile(_)));
}
