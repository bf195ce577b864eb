//! End-to-end: tracing events -> layer -> engine-provided sink -> HTTP.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use logdna_sink::{
    DeliveryEngine, DurableParams, EventSink, Formatters, HttpClient, LogEvent, LogLevel,
    LogdnaSinkExt, SinkLayer, VolatileParams,
};
use tracing_subscriber::layer::SubscriberExt;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Holds events until `flush` posts them as one batch.
struct BufferedSink {
    request_uri: String,
    formatters: Formatters,
    client: Arc<dyn HttpClient>,
    pending: Mutex<Vec<LogEvent>>,
}

impl BufferedSink {
    async fn flush(&self) -> logdna_sink::Result<reqwest::Response> {
        let events = std::mem::take(&mut *self.pending.lock().unwrap());
        let lines: Vec<String> = events.iter().map(|e| self.formatters.text.format(e)).collect();
        let body: Bytes = self.formatters.batch.format(&lines);
        self.client.post(&self.request_uri, body).await
    }
}

impl EventSink for BufferedSink {
    fn emit(&self, event: LogEvent) {
        self.pending.lock().unwrap().push(event);
    }
}

struct ManualEngine;

impl DeliveryEngine for ManualEngine {
    type Output = (Arc<BufferedSink>, LogLevel);

    fn http(&mut self, params: VolatileParams) -> Self::Output {
        let sink = BufferedSink {
            request_uri: params.request_uri,
            formatters: params.formatters,
            client: params.http_client,
            pending: Mutex::new(Vec::new()),
        };
        (Arc::new(sink), params.minimum_level)
    }

    fn durable_http(&mut self, _params: DurableParams) -> Self::Output {
        unreachable!("durable delivery is not exercised here")
    }
}

#[tokio::test]
async fn test_events_reach_ingestion_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/logs/ingest"))
        .and(query_param("tags", "e2e,test"))
        .and(header("authorization", "Basic YWJjMTIzOg=="))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let ingest_url = format!("{}/logs/ingest", server.uri());
    let (sink, minimum_level) = ManualEngine
        .write_to_logdna(|config| {
            config.api_key = "abc123".to_string();
            config.app_name = Some("e2e".to_string());
            config.tags = Some("e2e,test".to_string());
            config.ingest_url = ingest_url;
            config.restricted_to_minimum_level = LogLevel::Information;
        })
        .unwrap();

    let subscriber =
        tracing_subscriber::registry().with(SinkLayer::new(Arc::clone(&sink), minimum_level));
    tracing::subscriber::with_default(subscriber, || {
        tracing::debug!("dropped");
        tracing::info!(order_id = 42, "order placed");
        tracing::error!("payment declined");
    });

    let response = sink.flush().await.unwrap();
    assert_eq!(response.status(), 200);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);

    let hostname = requests[0]
        .url
        .query_pairs()
        .find(|(k, _)| k == "hostname")
        .map(|(_, v)| v.into_owned())
        .unwrap();
    assert_eq!(hostname, hostname::get().unwrap().to_string_lossy().to_lowercase());

    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let lines = body["lines"].as_array().unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["line"], "order placed");
    assert_eq!(lines[0]["app"], "e2e");
    assert_eq!(lines[0]["level"], "INFO");
    assert_eq!(lines[0]["meta"]["order_id"], 42);
    assert_eq!(lines[1]["level"], "ERROR");
}

#[tokio::test]
async fn test_server_errors_are_left_to_the_engine() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let ingest_url = server.uri();
    let (sink, _) = ManualEngine
        .write_to_logdna(|config| {
            config.api_key = "abc123".to_string();
            config.ingest_url = ingest_url;
        })
        .unwrap();

    sink.emit(LogEvent::new(LogLevel::Warning, "retry me"));
    let response = sink.flush().await.unwrap();
    assert_eq!(response.status(), 500);
}
