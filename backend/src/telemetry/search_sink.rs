//! Ships log events to a search cluster as JSON documents.
//!
//! [`SearchSinkLayer`] turns every enabled event into a document carrying the
//! event fields plus the fields of every enclosing span (so the request
//! `correlation_id` travels with it) and queues it on a bounded channel.
//! [`SearchSinkWorker`] drains the channel and POSTs each document to
//! `{base}/ws-{yyyy.MM}/_doc`. Delivery is best effort: a full queue drops the
//! event and failed requests are only counted, never logged, so the sink can
//! not feed back into itself.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, Url};
use serde_json::{Map, Value, json};
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

const QUEUE_CAPACITY: usize = 1024;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const INDEX_PREFIX: &str = "ws";

/// Targets whose events are never shipped, to keep the sink from reporting
/// on its own HTTP traffic.
const INTERNAL_TARGETS: [&str; 4] = ["reqwest", "hyper", "h2", "rustls"];

/// Delivery counters shared by the layer and the worker.
#[derive(Debug, Default)]
pub struct SinkStats {
    delivered: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

impl SinkStats {
    /// Documents accepted by the search cluster.
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Documents the cluster rejected or that could not be sent.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Events discarded because the queue was full or closed.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// One queued log event.
#[derive(Debug, Clone)]
pub struct LogDocument {
    timestamp: DateTime<Utc>,
    body: Value,
}

impl LogDocument {
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn body(&self) -> &Value {
        &self.body
    }
}

/// Monthly index an event lands in, e.g. `ws-2024.05`.
pub fn index_name(timestamp: DateTime<Utc>) -> String {
    format!("{INDEX_PREFIX}-{}", timestamp.format("%Y.%m"))
}

/// `{base}/{index}/_doc`, keeping any path prefix on `base`.
pub fn document_url(base: &Url, index: &str) -> Option<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .push(index)
        .push("_doc");
    Some(url)
}

/// Build the sink layer and the worker that delivers its documents.
///
/// The worker must be spawned on a Tokio runtime; until then documents
/// accumulate in the queue.
///
/// # Errors
/// Returns an error when the HTTP client cannot be constructed.
pub fn search_sink(base: Url) -> Result<(SearchSinkLayer, SearchSinkWorker), reqwest::Error> {
    let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
    let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);
    let stats = Arc::new(SinkStats::default());
    Ok((
        SearchSinkLayer {
            sender,
            stats: Arc::clone(&stats),
        },
        SearchSinkWorker {
            receiver,
            client,
            base,
            stats,
        },
    ))
}

/// Collects tracing fields into a JSON object.
struct JsonVisitor<'a>(&'a mut Map<String, Value>);

impl JsonVisitor<'_> {
    fn insert(&mut self, field: &Field, value: Value) {
        self.0.insert(field.name().to_owned(), value);
    }
}

impl Visit for JsonVisitor<'_> {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, json!(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, json!(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, json!(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::Bool(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, Value::String(value.to_owned()));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, Value::String(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, Value::String(format!("{value:?}")));
    }
}

/// Span fields captured at creation and updated on `record`.
struct SpanFields(Map<String, Value>);

/// Layer queueing every event for the search cluster.
pub struct SearchSinkLayer {
    sender: mpsc::Sender<LogDocument>,
    stats: Arc<SinkStats>,
}

impl SearchSinkLayer {
    pub fn stats(&self) -> Arc<SinkStats> {
        Arc::clone(&self.stats)
    }
}

fn is_internal(target: &str) -> bool {
    INTERNAL_TARGETS
        .iter()
        .any(|prefix| target.starts_with(prefix))
}

impl<S> Layer<S> for SearchSinkLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut fields = Map::new();
        attrs.record(&mut JsonVisitor(&mut fields));
        span.extensions_mut().insert(SpanFields(fields));
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut extensions = span.extensions_mut();
        if let Some(SpanFields(fields)) = extensions.get_mut::<SpanFields>() {
            values.record(&mut JsonVisitor(fields));
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if is_internal(metadata.target()) {
            return;
        }

        let mut fields = Map::new();
        event.record(&mut JsonVisitor(&mut fields));
        let message = fields.remove("message");

        let mut span_fields = Map::new();
        let mut span_names = Vec::new();
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                span_names.push(Value::String(span.name().to_owned()));
                if let Some(SpanFields(captured)) = span.extensions().get::<SpanFields>() {
                    span_fields.extend(captured.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
            }
        }

        let timestamp = Utc::now();
        let mut body = json!({
            "@timestamp": timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            "level": metadata.level().as_str(),
            "target": metadata.target(),
            "message": message.unwrap_or(Value::Null),
            "fields": fields,
            "span": span_fields,
            "spans": span_names,
        });
        if let Some(id) = body.pointer("/span/correlation_id").cloned() {
            body["correlationId"] = id;
        }

        if self.sender.try_send(LogDocument { timestamp, body }).is_err() {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Background task delivering queued documents.
pub struct SearchSinkWorker {
    receiver: mpsc::Receiver<LogDocument>,
    client: Client,
    base: Url,
    stats: Arc<SinkStats>,
}

impl SearchSinkWorker {
    pub fn stats(&self) -> Arc<SinkStats> {
        Arc::clone(&self.stats)
    }

    /// Deliver documents until every layer handle is dropped.
    pub async fn run(mut self) {
        while let Some(document) = self.receiver.recv().await {
            self.ship(&document).await;
        }
    }

    async fn ship(&self, document: &LogDocument) {
        let delivered = match document_url(&self.base, &index_name(document.timestamp)) {
            Some(url) => self
                .client
                .post(url)
                .json(&document.body)
                .send()
                .await
                .is_ok_and(|response| response.status().is_success()),
            None => false,
        };
        let counter = if delivered {
            &self.stats.delivered
        } else {
            &self.stats.failed
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}
