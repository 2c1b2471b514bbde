use futures_util::{Stream, StreamExt};
use memchr::memchr;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::{ChatRequest, ChatStreamError, ChatStreamLine};
use crate::core::handoff::{handoff, FragmentSender, FragmentSource, ResponseFragment};
use crate::utils::url::construct_api_url;

const MAX_ERROR_BODY_CHARS: usize = 500;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("empty line")]
    Empty,
    #[error("backend reported an error: {0}")]
    Backend(String),
    #[error("malformed stream line: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("Request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("Backend returned {status}: {body}")]
    Transport {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("request cancelled")]
    Cancelled,
}

/// Decode one line of an `/api/chat` stream into a fragment.
pub fn decode_line(line: &str) -> Result<ResponseFragment, DecodeError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(DecodeError::Empty);
    }

    match serde_json::from_str::<ChatStreamLine>(line) {
        Ok(parsed) => Ok(ResponseFragment {
            is_final: parsed.done,
            text: parsed.message.map(|m| m.content).unwrap_or_default(),
        }),
        Err(err) => match serde_json::from_str::<ChatStreamError>(line) {
            Ok(backend) => Err(DecodeError::Backend(backend.error)),
            Err(_) => Err(DecodeError::Malformed(err)),
        },
    }
}

fn summarize_error_body(body: &str) -> String {
    let collapsed = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return "<empty body>".to_string();
    }
    if collapsed.chars().count() > MAX_ERROR_BODY_CHARS {
        let truncated: String = collapsed.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{truncated}…")
    } else {
        collapsed
    }
}

/// Decode a line and hand it over. Returns `true` once the stream is over,
/// either because a final fragment went out or because the consumer is gone.
async fn forward_line(bytes: &[u8], sender: &FragmentSender) -> bool {
    let line = match std::str::from_utf8(bytes) {
        Ok(line) => line,
        Err(err) => {
            debug!(error = %err, "Dropping stream line with invalid UTF-8");
            return false;
        }
    };

    match decode_line(line) {
        Ok(fragment) => {
            let is_final = fragment.is_final;
            sender.deliver(fragment).await.is_err() || is_final
        }
        Err(DecodeError::Empty) => false,
        Err(DecodeError::Backend(message)) => {
            warn!(%message, "Dropping backend error line from chat stream");
            false
        }
        Err(err) => {
            debug!(error = %err, "Dropping undecodable stream line");
            false
        }
    }
}

/// Read a chunked body, split it into lines and feed decoded fragments to
/// `sender`. The sender is dropped on return, which closes the source.
pub async fn pump_lines<S, B, E>(body: S, sender: FragmentSender, cancel: CancellationToken)
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let mut body = std::pin::pin!(body);
    let mut buffer: Vec<u8> = Vec::new();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Chat stream cancelled");
                return;
            }
            next = body.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                buffer.extend_from_slice(chunk.as_ref());
                while let Some(newline_pos) = memchr(b'\n', &buffer) {
                    let line: Vec<u8> = buffer.drain(..=newline_pos).collect();
                    if forward_line(&line[..newline_pos], &sender).await {
                        return;
                    }
                }
            }
            Some(Err(err)) => {
                debug!(error = %err, "Chat stream read failed; closing without final fragment");
                break;
            }
            None => break,
        }
    }

    if !buffer.is_empty() && !sender.is_cancelled() {
        forward_line(&buffer, &sender).await;
    }
}

/// Issues chat requests against an Ollama-compatible backend.
#[derive(Clone)]
pub struct ChatStreamService {
    client: reqwest::Client,
    base_url: String,
}

impl ChatStreamService {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send `request` and, on a success status, start the background reader.
    ///
    /// The returned source yields fragments in wire order and closes after a
    /// final fragment, at end of body, or when `cancel_token` fires.
    pub async fn open(
        &self,
        request: ChatRequest,
        cancel_token: CancellationToken,
    ) -> Result<FragmentSource, StreamError> {
        let chat_url = construct_api_url(&self.base_url, "api/chat");
        debug!(url = %chat_url, model = %request.model, messages = request.messages.len(), "Opening chat stream");

        let send = self
            .client
            .post(chat_url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send();

        let response = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => return Err(StreamError::Cancelled),
            response = send => response.map_err(StreamError::Request)?,
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = tokio::select! {
                biased;
                _ = cancel_token.cancelled() => String::new(),
                text = response.text() => text.unwrap_or_else(|_| "<no body>".to_string()),
            };
            warn!(%status, "Chat request rejected");
            return Err(StreamError::Transport {
                status,
                body: summarize_error_body(&body),
            });
        }

        let (sender, source) = handoff(cancel_token.clone());
        let body = response.bytes_stream();
        tokio::spawn(pump_lines(body, sender, cancel_token));
        Ok(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use std::convert::Infallible;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::time::timeout;

    fn chunks(parts: &[&str]) -> Vec<Result<Vec<u8>, Infallible>> {
        parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect()
    }

    async fn collect(mut source: FragmentSource) -> Vec<ResponseFragment> {
        let mut out = Vec::new();
        while let Some(fragment) = source.recv().await {
            out.push(fragment);
        }
        out
    }

    #[test]
    fn decode_line_reads_content_and_done_flag() {
        let fragment =
            decode_line(r#"{"done":false,"message":{"role":"assistant","content":"Hel"}}"#)
                .expect("decode");
        assert_eq!(fragment, ResponseFragment::partial("Hel"));

        let fragment = decode_line(r#"{"done":true,"message":{"content":""}}"#).expect("decode");
        assert_eq!(fragment, ResponseFragment::last(""));
    }

    #[test]
    fn decode_line_keeps_trailing_text_on_final_fragment() {
        let fragment = decode_line(r#"{"done":true,"message":{"content":"!"}}"#).expect("decode");
        assert!(fragment.is_final);
        assert_eq!(fragment.text, "!");
    }

    #[test]
    fn decode_line_defaults_missing_message_to_empty() {
        let fragment = decode_line(r#"{"done":true,"total_duration":12}"#).expect("decode");
        assert_eq!(fragment, ResponseFragment::last(""));
    }

    #[test]
    fn decode_line_rejects_garbage() {
        assert!(matches!(decode_line(""), Err(DecodeError::Empty)));
        assert!(matches!(decode_line("   "), Err(DecodeError::Empty)));
        assert!(matches!(
            decode_line("not json"),
            Err(DecodeError::Malformed(_))
        ));
        assert!(matches!(
            decode_line(r#"{"message":{"content":"no done flag"}}"#),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn decode_line_recognizes_backend_errors() {
        match decode_line(r#"{"error":"model not found"}"#) {
            Err(DecodeError::Backend(message)) => assert_eq!(message, "model not found"),
            other => panic!("expected backend error, got {other:?}"),
        }
    }

    #[test]
    fn error_body_summary_collapses_and_truncates() {
        assert_eq!(summarize_error_body("  a\n  b "), "a b");
        assert_eq!(summarize_error_body(""), "<empty body>");
        let long = "x".repeat(MAX_ERROR_BODY_CHARS + 10);
        let summary = summarize_error_body(&long);
        assert_eq!(summary.chars().count(), MAX_ERROR_BODY_CHARS + 1);
    }

    #[tokio::test]
    async fn pump_reassembles_lines_split_across_chunks() {
        let cancel = CancellationToken::new();
        let (sender, source) = handoff(cancel.clone());
        let body = stream::iter(chunks(&[
            "{\"done\":false,\"message\":{\"content\":\"Hel\"}}\n{\"done\":fa",
            "lse,\"message\":{\"content\":\"lo\"}}\n",
            "{\"done\":true,\"message\":{\"content\":\"\"}}\n",
        ]));
        tokio::spawn(pump_lines(body, sender, cancel));

        let fragments = collect(source).await;
        assert_eq!(
            fragments,
            vec![
                ResponseFragment::partial("Hel"),
                ResponseFragment::partial("lo"),
                ResponseFragment::last(""),
            ]
        );
    }

    #[tokio::test]
    async fn pump_skips_malformed_lines() {
        let cancel = CancellationToken::new();
        let (sender, source) = handoff(cancel.clone());
        let body = stream::iter(chunks(&[
            "{\"done\":false,\"message\":{\"content\":\"a\"}}\n",
            "garbage\n\n{\"error\":\"oops\"}\n",
            "{\"done\":false,\"message\":{\"content\":\"b\"}}\n",
        ]));
        tokio::spawn(pump_lines(body, sender, cancel));

        let texts: Vec<String> = collect(source).await.into_iter().map(|f| f.text).collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn pump_stops_after_final_fragment() {
        let cancel = CancellationToken::new();
        let (sender, source) = handoff(cancel.clone());
        let body = stream::iter(chunks(&[
            "{\"done\":true,\"message\":{\"content\":\"end\"}}\n",
            "{\"done\":false,\"message\":{\"content\":\"after\"}}\n",
        ]));
        tokio::spawn(pump_lines(body, sender, cancel));

        assert_eq!(collect(source).await, vec![ResponseFragment::last("end")]);
    }

    #[tokio::test]
    async fn pump_decodes_unterminated_last_line() {
        let cancel = CancellationToken::new();
        let (sender, source) = handoff(cancel.clone());
        let body = stream::iter(chunks(&["{\"done\":false,\"message\":{\"content\":\"tail\"}}"]));
        tokio::spawn(pump_lines(body, sender, cancel));

        assert_eq!(collect(source).await, vec![ResponseFragment::partial("tail")]);
    }

    #[tokio::test]
    async fn pump_closes_on_read_error_without_final() {
        let cancel = CancellationToken::new();
        let (sender, source) = handoff(cancel.clone());
        let body = stream::iter(vec![
            Ok(b"{\"done\":false,\"message\":{\"content\":\"part\"}}\n".to_vec()),
            Err("connection reset"),
        ]);
        tokio::spawn(pump_lines(body, sender, cancel));

        assert_eq!(collect(source).await, vec![ResponseFragment::partial("part")]);
    }

    #[tokio::test]
    async fn pump_observes_cancellation_while_waiting_for_data() {
        let cancel = CancellationToken::new();
        let (sender, mut source) = handoff(cancel.clone());
        let body = stream::pending::<Result<Vec<u8>, Infallible>>();
        let reader = tokio::spawn(pump_lines(body, sender, cancel.clone()));

        cancel.cancel();
        timeout(Duration::from_secs(1), reader)
            .await
            .expect("reader stopped")
            .expect("join");
        assert_eq!(source.recv().await, None);
    }

    async fn serve_once(response: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener should bind");
        let addr = listener.local_addr().expect("local addr should resolve");
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.expect("read");
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if let Some(header_end) = find_header_end(&request) {
                    let headers = String::from_utf8_lossy(&request[..header_end]).to_lowercase();
                    let content_length = headers
                        .lines()
                        .find_map(|line| line.strip_prefix("content-length:"))
                        .and_then(|value| value.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if request.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
            }
            socket
                .write_all(response.as_bytes())
                .await
                .expect("write response");
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}")
    }

    fn find_header_end(bytes: &[u8]) -> Option<usize> {
        bytes.windows(4).position(|window| window == b"\r\n\r\n")
    }

    fn sample_request() -> ChatRequest {
        ChatRequest {
            model: "test-model".into(),
            messages: vec![crate::api::ChatMessage {
                role: "user".into(),
                content: "hi".into(),
            }],
            stream: true,
            tools: None,
        }
    }

    #[tokio::test]
    async fn open_streams_fragments_from_http_body() {
        let body = "{\"done\":false,\"message\":{\"content\":\"Hi\"}}\n{\"done\":false,\"message\":{\"content\":\" there\"}}\n{\"done\":true,\"message\":{\"content\":\"\"}}\n";
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/x-ndjson\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        let base_url = serve_once(response).await;
        let service = ChatStreamService::new(reqwest::Client::new(), base_url);

        let source = service
            .open(sample_request(), CancellationToken::new())
            .await
            .expect("open");
        let texts: Vec<String> = collect(source).await.into_iter().map(|f| f.text).collect();
        assert_eq!(texts, vec!["Hi", " there", ""]);
    }

    #[tokio::test]
    async fn open_reports_non_success_status() {
        let body = "{\"error\":\"boom\"}";
        let response = format!(
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        let base_url = serve_once(response).await;
        let service = ChatStreamService::new(reqwest::Client::new(), base_url);

        match service
            .open(sample_request(), CancellationToken::new())
            .await
        {
            Err(StreamError::Transport { status, body }) => {
                assert_eq!(status.as_u16(), 500);
                assert_eq!(body, "{\"error\":\"boom\"}");
            }
            Err(other) => panic!("expected transport error, got {other}"),
            Ok(_) => panic!("expected transport error, got a stream"),
        }
    }

    #[tokio::test]
    async fn open_honours_prior_cancellation() {
        let service = ChatStreamService::new(reqwest::Client::new(), "http://127.0.0.1:9");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = service.open(sample_request(), cancel).await;
        assert!(matches!(result, Err(StreamError::Cancelled)));
    }
}
