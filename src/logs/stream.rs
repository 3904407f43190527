//! Server-push log stream client.
//!
//! The backend exposes `/logs` as a server-sent-events endpoint. The
//! transport cannot carry custom headers, so the session token travels as a
//! URL query parameter; a known weaker-security tradeoff, not a pattern to
//! copy elsewhere.
//!
//! Stream errors are terminal for the handle. There is no automatic
//! reconnect; callers open a fresh stream if they want one.

use crate::config::Settings;
use thiserror::Error;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use url::Url;

/// Error type for the log stream.
#[derive(Debug, Error)]
pub enum StreamError {
    /// No session token was available; no connection was attempted.
    #[error("No authentication token available for logs")]
    NoToken,

    #[error("Invalid logs URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Stream connection failed: {0}")]
    Connect(String),

    #[error("Stream rejected with HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("Stream read failed: {0}")]
    Read(String),
}

/// One delivery from the stream.
#[derive(Debug)]
pub enum LogEvent {
    /// A log line.
    Line(String),
    /// Terminal failure; no further events follow.
    Error(StreamError),
}

/// Incremental decoder for `text/event-stream` payloads.
///
/// Events are separated by blank lines; each `data:` field contributes one
/// line of payload, multiple `data:` fields in one event are joined with a
/// newline.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: String,
}

impl SseDecoder {
    /// Feed a chunk and collect any completed events.
    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        self.buffer.push_str(chunk);

        let mut events = Vec::new();
        while let Some(boundary) = self.find_boundary() {
            let (event, rest) = self.buffer.split_at(boundary.0);
            let event = event.to_string();
            self.buffer = rest[boundary.1..].to_string();

            if let Some(data) = Self::decode_event(&event) {
                events.push(data);
            }
        }
        events
    }

    fn find_boundary(&self) -> Option<(usize, usize)> {
        let crlf = self.buffer.find("\r\n\r\n").map(|i| (i, 4));
        let lf = self.buffer.find("\n\n").map(|i| (i, 2));
        match (crlf, lf) {
            (Some(a), Some(b)) => Some(if a.0 < b.0 { a } else { b }),
            (a, b) => a.or(b),
        }
    }

    fn decode_event(event: &str) -> Option<String> {
        let mut data_lines = Vec::new();
        for line in event.lines() {
            if let Some(value) = line.strip_prefix("data:") {
                data_lines.push(value.strip_prefix(' ').unwrap_or(value));
            }
            // Comment lines (":keepalive") and other fields are ignored
        }
        if data_lines.is_empty() {
            None
        } else {
            Some(data_lines.join("\n"))
        }
    }
}

/// Handle on an open log stream. Dropping it closes the connection.
pub struct LogStreamHandle {
    rx: mpsc::UnboundedReceiver<LogEvent>,
    task: JoinHandle<()>,
}

impl LogStreamHandle {
    /// Next event, `None` when the stream has ended.
    pub async fn next(&mut self) -> Option<LogEvent> {
        self.rx.recv().await
    }
}

impl Drop for LogStreamHandle {
    fn drop(&mut self) {
        // Tear down the reader so the server-side stream is released
        self.task.abort();
    }
}

/// Open the authenticated log stream.
///
/// Fails with [`StreamError::NoToken`] before any connection attempt when no
/// session token is available.
pub fn open_stream(
    http: reqwest::Client,
    settings: &Settings,
    session_token: Option<String>,
) -> Result<LogStreamHandle, StreamError> {
    let token = session_token.ok_or(StreamError::NoToken)?;

    let mut url = Url::parse(&format!(
        "{}/logs",
        settings.backend_url.trim_end_matches('/')
    ))?;
    url.query_pairs_mut().append_pair("token", &token);

    let (tx, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run_stream(http, url, tx));

    Ok(LogStreamHandle { rx, task })
}

async fn run_stream(http: reqwest::Client, url: Url, tx: mpsc::UnboundedSender<LogEvent>) {
    let response = match http.get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            let _ = tx.send(LogEvent::Error(StreamError::Connect(e.to_string())));
            return;
        }
    };

    let status = response.status();
    if !status.is_success() {
        let _ = tx.send(LogEvent::Error(StreamError::Status(status)));
        return;
    }

    info!("log stream connection opened");
    let mut decoder = SseDecoder::default();
    let mut body = response.bytes_stream();

    while let Some(chunk) = body.next().await {
        match chunk {
            Ok(bytes) => {
                for line in decoder.push(&String::from_utf8_lossy(&bytes)) {
                    debug!(line = %line, "received log message");
                    if tx.send(LogEvent::Line(line)).is_err() {
                        // Viewer went away; stop reading
                        return;
                    }
                }
            }
            Err(e) => {
                error!(error = %e, "log stream read failed");
                let _ = tx.send(LogEvent::Error(StreamError::Read(e.to_string())));
                return;
            }
        }
    }
    debug!("log stream ended");
}
