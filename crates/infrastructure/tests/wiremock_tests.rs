//! Integration tests for outbound HTTP
//!
//! Tests cover:
//! - Instrumented HTTP client against a mock server
//! - Trace context propagation headers
//! - Task notifier adapter

use std::time::Duration;

use application::ports::TaskNotifierPort;
use chrono::Utc;
use domain::{Task, TaskId, TaskTitle};
use infrastructure::{
    HttpClientError, HttpTaskNotifier, InstrumentedClientConfig, InstrumentedHttpClient,
    NotifierConfig,
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_string, header, method, path, query_param},
};

// ============================================================================
// Instrumented HTTP Client Tests
// ============================================================================

mod instrumented_client_tests {
    use super::*;

    #[tokio::test]
    async fn client_creation_succeeds() {
        assert!(InstrumentedHttpClient::new().is_ok());
    }

    #[tokio::test]
    async fn post_body_reaches_server_unchanged() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/echo"))
            .and(body_string("{\"title\":\"Buy milk\"}"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": 1
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = InstrumentedHttpClient::new().unwrap();
        let response = client
            .send(
                client
                    .post(format!("{}/echo", mock_server.uri()))
                    .body("{\"title\":\"Buy milk\"}"),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), 201);
        let json: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(json["id"], 1);
    }

    #[tokio::test]
    async fn no_traceparent_without_exported_span() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let client = InstrumentedHttpClient::new().unwrap();
        client.send(client.get(mock_server.uri())).await.unwrap();

        let requests = mock_server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(!requests[0].headers.contains_key("traceparent"));
    }

    #[tokio::test]
    async fn slow_server_times_out() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&mock_server)
            .await;

        let client = InstrumentedHttpClient::with_config(
            InstrumentedClientConfig::default().with_timeout(Duration::from_millis(200)),
        )
        .unwrap();
        let result = client.send(client.get(mock_server.uri())).await;
        assert!(matches!(result, Err(HttpClientError::Transport(_))));
    }
}

// ============================================================================
// Notifier Adapter Tests
// ============================================================================

mod notifier_tests {
    use super::*;

    fn task(id: i64, title: &str) -> Task {
        Task {
            id: TaskId::new(id),
            title: TaskTitle::new(title).unwrap(),
            completed: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn title_with_spaces_and_symbols_is_encoded() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get"))
            .and(query_param("task_id", "7"))
            .and(query_param("task_title", "Milk & eggs?"))
            .and(header("X-Task-Title", "Milk & eggs?"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let notifier = HttpTaskNotifier::new(&NotifierConfig {
            endpoint: format!("{}/get", mock_server.uri()),
            ..NotifierConfig::default()
        })
        .unwrap();

        notifier.task_created(&task(7, "Milk & eggs?")).await.unwrap();
    }

    #[tokio::test]
    async fn custom_user_agent_is_used() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("User-Agent", "tester/2.0"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let notifier = HttpTaskNotifier::new(&NotifierConfig {
            endpoint: mock_server.uri(),
            user_agent: "tester/2.0".into(),
            ..NotifierConfig::default()
        })
        .unwrap();

        notifier.task_created(&task(1, "x")).await.unwrap();
    }
}
