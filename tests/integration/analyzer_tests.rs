//! Integration tests for the chat completions analyzer
//!
//! These tests stand up a wiremock server in place of the language model
//! API and check that every kind of bad reply degrades to an empty analysis.

use serde_json::json;
use std::sync::Arc;
use sumi_inquiry::analysis::ChatAnalyzer;
use sumi_inquiry::config::{AnalyzerConfig, Config};
use sumi_inquiry::{CrawlEngine, PageAnalysis, PageAnalyzer};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn analyzer_for(server: &MockServer) -> ChatAnalyzer {
    let config = AnalyzerConfig {
        endpoint: format!("{}/v1", server.uri()),
        model: "test-model".to_string(),
        ..AnalyzerConfig::default()
    };
    ChatAnalyzer::new(&config, "test-key").expect("Failed to build analyzer")
}

fn completion(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    }))
}

#[tokio::test]
async fn test_fenced_json_reply_is_parsed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({ "model": "test-model" })))
        .respond_with(completion(
            "```json\n{\"summary\": \"A page about cats\", \"keywords\": [\"cats\", \"pets\"], \"answer\": \"Whiskers\"}\n```",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let analysis = analyzer_for(&server)
        .analyze("Cats are great. The cat's name is Whiskers.", Some("What is the cat called?"))
        .await;

    assert_eq!(analysis.summary, "A page about cats");
    assert_eq!(analysis.keywords, vec!["cats".to_string(), "pets".to_string()]);
    assert_eq!(analysis.answer.as_deref(), Some("Whiskers"));
}

#[tokio::test]
async fn test_null_answer_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(completion(
            r#"{"summary": "Unrelated", "keywords": ["misc"], "answer": null}"#,
        ))
        .mount(&server)
        .await;

    let analysis = analyzer_for(&server)
        .analyze("Nothing relevant here.", Some("Who won?"))
        .await;

    assert_eq!(analysis.summary, "Unrelated");
    assert!(analysis.answer.is_none());
}

#[tokio::test]
async fn test_garbage_reply_degrades() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(completion("Sorry, I cannot help with that."))
        .mount(&server)
        .await;

    let analysis = analyzer_for(&server).analyze("Some text", None).await;
    assert_eq!(analysis, PageAnalysis::default());
}

#[tokio::test]
async fn test_server_error_degrades() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let analysis = analyzer_for(&server).analyze("Some text", Some("Why?")).await;
    assert_eq!(analysis, PageAnalysis::default());
}

#[tokio::test]
async fn test_malformed_envelope_degrades() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let analysis = analyzer_for(&server).analyze("Some text", None).await;
    assert_eq!(analysis, PageAnalysis::default());
}

#[tokio::test]
async fn test_crawl_with_chat_analyzer() {
    let site = MockServer::start().await;
    let model = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(
                    r#"<html><head><title>Opening Hours</title></head>
                    <body><p>We open at nine.</p><a href="/other">Other</a></body></html>"#,
                )
                .insert_header("content-type", "text/html"),
        )
        .mount(&site)
        .await;
    Mock::given(method("GET"))
        .and(path("/other"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>Other</p>"))
        .expect(0)
        .mount(&site)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(completion(
            r#"{"summary": "Opening hours", "keywords": ["hours"], "answer": "Nine o'clock"}"#,
        ))
        .expect(1)
        .mount(&model)
        .await;

    let mut config = Config::default();
    config.crawler.request_delay_ms = 0;

    let engine = CrawlEngine::new(&config, Arc::new(analyzer_for(&model)), None).unwrap();
    let outcome = engine
        .crawl(&format!("{}/", site.uri()), Some("When do you open?"), None)
        .await
        .unwrap();

    let found = outcome.found_answer.expect("Expected an answer");
    assert_eq!(found.answer, "Nine o'clock");
    assert_eq!(found.title, "Opening Hours");
    assert_eq!(outcome.pages_processed, 1);
}
