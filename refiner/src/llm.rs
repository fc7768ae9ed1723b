//! Streaming client for OpenAI-compatible chat-completion APIs.
//!
//! Completions are requested with `stream: true` and read as server-sent
//! events. Each `data:` line carries one JSON chunk whose
//! `choices[0].delta.content` is forwarded to the progress channel as it
//! arrives; the full text is returned once the stream ends.

use futures_util::StreamExt;
use mcts::{OracleError, Progress};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace};

/// Errors from the chat backend.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Backend returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

impl From<LlmError> for OracleError {
    fn from(e: LlmError) -> Self {
        OracleError::Transport(e.to_string())
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    content: Option<String>,
}

/// One decoded line of an event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseLine {
    /// A piece of completion text.
    Content(String),
    /// The `[DONE]` terminator.
    Done,
    /// Blank lines, comments, role-only deltas and undecodable payloads.
    Skip,
}

/// Decode a single event-stream line.
pub fn parse_sse_line(line: &str) -> SseLine {
    let line = line.trim_end_matches('\r');
    let payload = line
        .strip_prefix("data: ")
        .or_else(|| line.strip_prefix("data:"))
        .unwrap_or(line)
        .trim();

    if payload.is_empty() {
        return SseLine::Skip;
    }
    if payload == "[DONE]" {
        return SseLine::Done;
    }

    match serde_json::from_str::<StreamChunk>(payload) {
        Ok(chunk) => match chunk.choices.into_iter().next() {
            Some(StreamChoice {
                delta: Delta {
                    content: Some(content),
                },
            }) => SseLine::Content(content),
            _ => SseLine::Skip,
        },
        Err(e) => {
            trace!(error = %e, "Skipping undecodable stream line");
            SseLine::Skip
        }
    }
}

/// Reassembles newline-terminated lines from arbitrary byte chunks.
///
/// Bytes are held until a full line is available, so multi-byte UTF-8
/// characters split across network reads decode correctly.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
    // Bytes of `buf` already known to hold no newline
    scanned: usize,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes and return every line they complete.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(offset) = self.buf[self.scanned..].iter().position(|&b| b == b'\n') {
            let pos = self.scanned + offset;
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line[..pos]).into_owned());
            self.scanned = 0;
        }
        self.scanned = self.buf.len();
        lines
    }

    /// Whatever is left after the stream ends without a trailing newline.
    pub fn finish(self) -> Option<String> {
        if self.buf.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&self.buf).into_owned())
        }
    }
}

/// Client for one model on one backend.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl ChatClient {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("refiner/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(LlmError::Client)?;

        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.into(),
            api_key,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send `prompt` as a single user message and stream the reply.
    ///
    /// Every content piece is forwarded to `progress` as a chunk.
    pub async fn stream_completion(
        &self,
        prompt: &str,
        progress: &Progress,
    ) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream: true,
        };

        let mut request = self.http.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let request_err = |source: reqwest::Error| LlmError::Request {
            url: self.endpoint.clone(),
            source,
        };
        let response = request.send().await.map_err(request_err)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status { status, body });
        }

        let mut stream = response.bytes_stream();
        let mut lines = LineBuffer::new();
        let mut text = String::new();
        let mut done = false;

        'read: while let Some(bytes) = stream.next().await {
            let bytes = bytes.map_err(request_err)?;
            for line in lines.push(&bytes) {
                match parse_sse_line(&line) {
                    SseLine::Content(piece) => {
                        progress.chunk(piece.as_str());
                        text.push_str(&piece);
                    }
                    SseLine::Done => {
                        done = true;
                        break 'read;
                    }
                    SseLine::Skip => {}
                }
            }
        }
        // Backends that omit the final newline
        if !done {
            if let Some(SseLine::Content(piece)) = lines.finish().as_deref().map(parse_sse_line) {
                progress.chunk(piece.as_str());
                text.push_str(&piece);
            }
        }

        debug!(model = %self.model, chars = text.len(), "Completion finished");
        Ok(text)
    }
}

/// Minimal HTTP/1.1 server that answers one request with a canned response.
#[cfg(test)]
pub(crate) mod test_server {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve `bodies` to consecutive requests, each as a 200 event stream.
    /// The handle resolves to the raw requests received.
    pub async fn serve_events(bodies: Vec<String>) -> (String, JoinHandle<Vec<String>>) {
        let responses = bodies
            .into_iter()
            .map(|body| {
                format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    body.len(),
                    body
                )
            })
            .collect();
        serve_raw(responses).await
    }

    pub async fn serve_raw(responses: Vec<String>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/v1", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let mut requests = Vec::new();
            for response in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                requests.push(read_request(&mut socket).await);
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.unwrap();
            }
            requests
        });

        (base_url, handle)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut data = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            data.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&data);
            if let Some(head_end) = text.find("\r\n\r\n") {
                let content_length = text[..head_end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if data.len() >= head_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&data).into_owned()
    }

    /// Encode completion pieces the way a streaming backend would.
    pub fn sse_body(pieces: &[&str]) -> String {
        let mut body = String::new();
        for piece in pieces {
            let chunk = serde_json::json!({ "choices": [{ "delta": { "content": piece } }] });
            body.push_str(&format!("data: {chunk}\n\n"));
        }
        body.push_str("data: [DONE]\n\n");
        body
    }
}
