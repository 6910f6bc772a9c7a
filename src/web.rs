//! Local JSON API over the chat widget, headless traffic frames and the
//! profile tables.
//!
//! One widget is shared by every connection, so the busy flag applies across
//! clients: a second `POST /api/chat` while a question is in flight gets 409.
//! The provider credential stays in this process and never reaches a browser.

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::chat::{ChatWidget, SubmitOutcome};
use crate::error::FolioError;
use crate::headless::{run_simulation, SimulationOptions};
use crate::profile::profile;
use crate::providers::Generator;
use crate::traffic::{Theme, Viewport, MAX_DIMENSION};

const MAX_HEAD_BYTES: usize = 16 * 1024;
const MAX_BODY_BYTES: usize = 64 * 1024;
const MAX_TICKS: u32 = 10_000;

/// Percent-decoding for URL query parameters.
pub fn url_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
                match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    Some(b) => {
                        out.push(b);
                        i += 2;
                    }
                    None => out.push(b'%'),
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Parse query string into key-value pairs. Later duplicates win.
pub fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next()?;
            let val = parts.next().unwrap_or("");
            Some((url_decode(key), url_decode(val)))
        })
        .collect()
}

// -- Requests and responses -----------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub query: String,
    pub body: Vec<u8>,
}

impl Request {
    pub fn new(method: &str, target: &str, body: impl Into<Vec<u8>>) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p, q),
            None => (target, ""),
        };
        Self {
            method: method.to_string(),
            path: path.to_string(),
            query: query.to_string(),
            body: body.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Response {
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8",
            body: body.into(),
        }
    }

    pub fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self {
                status,
                content_type: "application/json",
                body,
            },
            Err(e) => Self::error(500, &format!("serialization failed: {e}")),
        }
    }

    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, &serde_json::json!({ "error": message }))
    }

    pub fn to_http(&self) -> String {
        format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            self.status,
            reason(self.status),
            self.content_type,
            self.body.len(),
            self.body,
        )
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        413 => "Payload Too Large",
        _ => "Internal Server Error",
    }
}

#[derive(Debug, PartialEq, Eq)]
struct RequestHead {
    method: String,
    target: String,
    content_length: usize,
    header_len: usize,
}

/// `Ok(None)` while the head is still incomplete.
fn parse_head(buf: &[u8]) -> Result<Option<RequestHead>, FolioError> {
    let mut headers = [httparse::EMPTY_HEADER; 32];
    let mut req = httparse::Request::new(&mut headers);
    let header_len = match req.parse(buf) {
        Ok(httparse::Status::Complete(n)) => n,
        Ok(httparse::Status::Partial) => return Ok(None),
        Err(e) => return Err(FolioError::Request(e.to_string())),
    };

    let content_length = match req
        .headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case("content-length"))
    {
        Some(h) => std::str::from_utf8(h.value)
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .ok_or_else(|| FolioError::Request("invalid Content-Length".into()))?,
        None => 0,
    };

    Ok(Some(RequestHead {
        method: req.method.unwrap_or("GET").to_string(),
        target: req.path.unwrap_or("/").to_string(),
        content_length,
        header_len,
    }))
}

async fn read_request(stream: &mut TcpStream) -> Result<Request, FolioError> {
    let mut buf = Vec::with_capacity(4096);
    let mut chunk = [0u8; 4096];

    let head = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(FolioError::Request("connection closed before headers".into()));
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(head) = parse_head(&buf)? {
            break head;
        }
        if buf.len() > MAX_HEAD_BYTES {
            return Err(FolioError::Request("headers too large".into()));
        }
    };

    if head.content_length > MAX_BODY_BYTES {
        return Err(FolioError::Request("body too large".into()));
    }
    let wanted = head.header_len + head.content_length;
    while buf.len() < wanted {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(FolioError::Request("connection closed mid-body".into()));
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    Ok(Request::new(
        &head.method,
        &head.target,
        buf[head.header_len..wanted].to_vec(),
    ))
}

// -- Routing --------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: String,
}

#[derive(Serialize)]
struct ChatResponse<'a> {
    outcome: &'a SubmitOutcome,
    transcript: crate::chat::ChatSnapshot,
}

/// Dispatch one request. Socket-free so it can be driven directly in tests.
pub async fn route<G: Generator>(chat: &ChatWidget<G>, theme: Theme, req: &Request) -> Response {
    match (req.method.as_str(), req.path.as_str()) {
        ("GET", "/health") => Response::text(200, "ok"),
        ("GET", "/api/transcript") => Response::json(200, &chat.snapshot()),
        ("POST", "/api/chat") => post_chat(chat, &req.body).await,
        ("GET", "/api/frame") => get_frame(&req.query, theme).await,
        ("GET", "/api/profile") => Response::json(200, profile()),
        (_, "/health" | "/api/transcript" | "/api/chat" | "/api/frame" | "/api/profile") => {
            Response::error(405, "method not allowed")
        }
        _ => Response::error(404, "not found"),
    }
}

async fn post_chat<G: Generator>(chat: &ChatWidget<G>, body: &[u8]) -> Response {
    let parsed: ChatRequest = match serde_json::from_slice(body) {
        Ok(p) => p,
        Err(e) => return Response::error(400, &format!("expected {{\"message\": string}}: {e}")),
    };
    let outcome = chat.submit(&parsed.message).await;
    let status = match outcome {
        SubmitOutcome::Empty => 400,
        SubmitOutcome::Busy => 409,
        SubmitOutcome::Replied { .. } => 200,
    };
    Response::json(
        status,
        &ChatResponse {
            outcome: &outcome,
            transcript: chat.snapshot(),
        },
    )
}

fn param<T: FromStr>(params: &HashMap<String, String>, key: &str, default: T) -> Result<T, String> {
    match params.get(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| format!("invalid value for '{key}': {raw}")),
        None => Ok(default),
    }
}

fn frame_options(query: &str, default_theme: Theme) -> Result<SimulationOptions, String> {
    let params = parse_query(query);
    let width: f64 = param(&params, "width", 1280.0)?;
    let height: f64 = param(&params, "height", 720.0)?;
    if !(0.0..=MAX_DIMENSION).contains(&width) || !(0.0..=MAX_DIMENSION).contains(&height) {
        return Err(format!("width and height must be in 0..={MAX_DIMENSION}"));
    }
    let ticks: u32 = param(&params, "ticks", 1)?;
    if ticks > MAX_TICKS {
        return Err(format!("ticks must be at most {MAX_TICKS}"));
    }
    let pointer = match (params.get("px"), params.get("py")) {
        (Some(_), Some(_)) => Some((param(&params, "px", 0.0)?, param(&params, "py", 0.0)?)),
        (None, None) => None,
        _ => return Err("px and py must be given together".into()),
    };
    let seed = match params.get("seed") {
        Some(_) => Some(param(&params, "seed", 0u64)?),
        None => None,
    };
    let theme = match params.get("theme").map(String::as_str) {
        Some("dark") => Theme::Dark,
        Some("light") => Theme::Light,
        Some(other) => return Err(format!("unknown theme: {other}")),
        None => default_theme,
    };
    Ok(SimulationOptions {
        viewport: Viewport::new(width, height),
        ticks,
        pointer,
        seed,
        theme,
    })
}

/// Runs the simulation on the blocking pool so long runs don't hold up other
/// connections.
async fn get_frame(query: &str, theme: Theme) -> Response {
    let opts = match frame_options(query, theme) {
        Ok(opts) => opts,
        Err(msg) => return Response::error(400, &msg),
    };
    match tokio::task::spawn_blocking(move || run_simulation(&opts)).await {
        Ok(run) => Response::json(
            200,
            &serde_json::json!({ "report": run.report, "frame": run.frame }),
        ),
        Err(e) => {
            warn!(error = %e, "frame simulation task failed");
            Response::error(500, "simulation failed")
        }
    }
}

// -- Server loop ----------------------------------------------------------------

/// Bind 127.0.0.1:`port` and serve until the process exits.
pub async fn serve<G: Generator + 'static>(
    port: u16,
    chat: ChatWidget<G>,
    theme: Theme,
) -> Result<(), FolioError> {
    let listener = TcpListener::bind(format!("127.0.0.1:{port}")).await?;
    serve_listener(listener, chat, theme).await
}

pub async fn serve_listener<G: Generator + 'static>(
    listener: TcpListener,
    chat: ChatWidget<G>,
    theme: Theme,
) -> Result<(), FolioError> {
    let addr = listener.local_addr()?;
    info!(%addr, session = %chat.session_id(), "portfolio API listening");

    loop {
        let (stream, peer) = listener.accept().await?;
        let chat = chat.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, &chat, theme).await {
                warn!(%peer, error = %e, "connection error");
            }
        });
    }
}

async fn handle_connection<G: Generator>(
    mut stream: TcpStream,
    chat: &ChatWidget<G>,
    theme: Theme,
) -> Result<(), FolioError> {
    let response = match read_request(&mut stream).await {
        Ok(req) => {
            let resp = route(chat, theme, &req).await;
            debug!(method = %req.method, path = %req.path, status = resp.status, "request");
            resp
        }
        Err(FolioError::Request(msg)) if msg.contains("too large") => Response::error(413, &msg),
        Err(FolioError::Request(msg)) => Response::error(400, &msg),
        Err(e) => return Err(e),
    };
    stream.write_all(response.to_http().as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{CONNECTION_APOLOGY, GREETING};
    use crate::error::GenerateError;

    struct Echo;

    impl Generator for Echo {
        async fn generate(&self, prompt: &str) -> Result<Option<String>, GenerateError> {
            Ok(prompt.rsplit('\n').next().map(|q| format!("echo: {q}")))
        }
    }

    struct Down;

    impl Generator for Down {
        async fn generate(&self, _prompt: &str) -> Result<Option<String>, GenerateError> {
            Err(GenerateError::Http { status: 503, message: "unavailable".into() })
        }
    }

    fn body(resp: &Response) -> serde_json::Value {
        serde_json::from_str(&resp.body).expect("json body")
    }

    #[test]
    fn test_url_decode_basic() {
        assert_eq!(url_decode("hello+world"), "hello world");
        assert_eq!(url_decode("hello%20world"), "hello world");
        assert_eq!(url_decode("a%26b"), "a&b");
        assert_eq!(url_decode("plain"), "plain");
    }

    #[test]
    fn test_url_decode_utf8_sequence() {
        assert_eq!(url_decode("caf%C3%A9"), "café");
    }

    #[test]
    fn test_url_decode_dangling_percent_kept() {
        assert_eq!(url_decode("100%"), "100%");
        assert_eq!(url_decode("%zz"), "%zz");
    }

    #[test]
    fn test_parse_query_basic() {
        let params = parse_query("width=800&height=600&theme=dark");
        assert_eq!(params.get("width").map(String::as_str), Some("800"));
        assert_eq!(params.get("theme").map(String::as_str), Some("dark"));
    }

    #[test]
    fn test_parse_query_empty() {
        assert!(parse_query("").is_empty());
    }

    #[test]
    fn test_parse_query_duplicate_keys_last_wins() {
        let params = parse_query("seed=1&seed=2");
        assert_eq!(params.get("seed").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_parse_head_complete_with_body_length() {
        let raw = b"POST /api/chat HTTP/1.1\r\nHost: x\r\nContent-Length: 12\r\n\r\n{\"message\":1}";
        let head = parse_head(raw).expect("parse").expect("complete");
        assert_eq!(head.method, "POST");
        assert_eq!(head.target, "/api/chat");
        assert_eq!(head.content_length, 12);
        assert_eq!(&raw[head.header_len..], b"{\"message\":1}");
    }

    #[test]
    fn test_parse_head_partial() {
        assert!(parse_head(b"GET /health HTTP/1.1\r\nHost:").expect("parse").is_none());
    }

    #[test]
    fn test_parse_head_bad_content_length() {
        let raw = b"POST / HTTP/1.1\r\nContent-Length: lots\r\n\r\n";
        assert!(matches!(parse_head(raw), Err(FolioError::Request(_))));
    }

    #[test]
    fn test_request_splits_query() {
        let r = Request::new("GET", "/api/frame?width=10", Vec::new());
        assert_eq!(r.path, "/api/frame");
        assert_eq!(r.query, "width=10");
    }

    #[test]
    fn test_response_http_framing() {
        let http = Response::text(200, "ok").to_http();
        assert!(http.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(http.contains("Content-Length: 2\r\n"));
        assert!(http.ends_with("\r\n\r\nok"));
    }

    #[tokio::test]
    async fn test_route_transcript_starts_with_greeting() {
        let chat = ChatWidget::new(Echo);
        let resp = route(&chat, Theme::Light, &Request::new("GET", "/api/transcript", Vec::new())).await;
        assert_eq!(resp.status, 200);
        let json = body(&resp);
        assert_eq!(json["busy"], false);
        assert_eq!(json["turns"][0]["text"], GREETING);
        assert_eq!(json["turns"][0]["speaker"], "assistant");
    }

    #[tokio::test]
    async fn test_route_chat_round_trip() {
        let chat = ChatWidget::new(Echo);
        let req = Request::new("POST", "/api/chat", br#"{"message":"hello"}"#.to_vec());
        let resp = route(&chat, Theme::Light, &req).await;
        assert_eq!(resp.status, 200);
        let json = body(&resp);
        assert_eq!(json["outcome"]["status"], "replied");
        assert_eq!(json["outcome"]["reply"], "echo: hello");
        assert_eq!(json["transcript"]["turns"].as_array().map(Vec::len), Some(3));
    }

    #[tokio::test]
    async fn test_route_chat_empty_is_400() {
        let chat = ChatWidget::new(Echo);
        let req = Request::new("POST", "/api/chat", br#"{"message":"   "}"#.to_vec());
        let resp = route(&chat, Theme::Light, &req).await;
        assert_eq!(resp.status, 400);
        assert_eq!(chat.len(), 1);
    }

    #[tokio::test]
    async fn test_route_chat_bad_json_is_400() {
        let chat = ChatWidget::new(Echo);
        let resp = route(&chat, Theme::Light, &Request::new("POST", "/api/chat", b"nope".to_vec())).await;
        assert_eq!(resp.status, 400);
    }

    #[tokio::test]
    async fn test_route_chat_provider_down_still_200() {
        let chat = ChatWidget::new(Down);
        let req = Request::new("POST", "/api/chat", br#"{"message":"hi"}"#.to_vec());
        let resp = route(&chat, Theme::Light, &req).await;
        assert_eq!(resp.status, 200);
        assert_eq!(body(&resp)["outcome"]["reply"], CONNECTION_APOLOGY);
    }

    #[tokio::test]
    async fn test_route_frame_with_params() {
        let chat = ChatWidget::new(Echo);
        let req = Request::new("GET", "/api/frame?width=300&height=130&ticks=5&seed=4&theme=dark", Vec::new());
        let resp = route(&chat, Theme::Light, &req).await;
        assert_eq!(resp.status, 200);
        let json = body(&resp);
        assert_eq!(json["report"]["lanes"], 2);
        assert_eq!(json["report"]["theme"], "dark");
        assert_eq!(json["frame"]["commands"][0]["op"], "clear");
    }

    #[tokio::test]
    async fn test_route_frame_does_not_block_runtime() {
        let chat = ChatWidget::new(Echo);
        let frame = {
            let chat = chat.clone();
            tokio::spawn(async move {
                let req = Request::new("GET", "/api/frame?width=8192&height=8192&ticks=10000&seed=1", Vec::new());
                route(&chat, Theme::Light, &req).await
            })
        };
        // lets the frame task start its run
        tokio::task::yield_now().await;
        assert!(!frame.is_finished());

        let health = route(&chat, Theme::Light, &Request::new("GET", "/health", Vec::new())).await;
        assert_eq!(health.status, 200);

        let resp = frame.await.expect("frame task");
        assert_eq!(resp.status, 200);
        assert_eq!(body(&resp)["report"]["ticks"], 10_000);
    }

    #[tokio::test]
    async fn test_route_frame_rejects_half_pointer() {
        let chat = ChatWidget::new(Echo);
        let resp = route(&chat, Theme::Light, &Request::new("GET", "/api/frame?px=3", Vec::new())).await;
        assert_eq!(resp.status, 400);
    }

    #[tokio::test]
    async fn test_route_frame_rejects_huge_viewport() {
        let chat = ChatWidget::new(Echo);
        let resp = route(&chat, Theme::Light, &Request::new("GET", "/api/frame?width=100000", Vec::new())).await;
        assert_eq!(resp.status, 400);
    }

    #[tokio::test]
    async fn test_route_profile_and_unknown() {
        let chat = ChatWidget::new(Echo);
        let resp = route(&chat, Theme::Light, &Request::new("GET", "/api/profile", Vec::new())).await;
        assert_eq!(resp.status, 200);
        assert_eq!(body(&resp)["name"], "V Sai Sesidhar");
        let resp = route(&chat, Theme::Light, &Request::new("GET", "/nope", Vec::new())).await;
        assert_eq!(resp.status, 404);
        let resp = route(&chat, Theme::Light, &Request::new("DELETE", "/api/chat", Vec::new())).await;
        assert_eq!(resp.status, 405);
    }

    #[tokio::test]
    async fn test_serve_listener_answers_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let server = tokio::spawn(serve_listener(listener, ChatWidget::new(Echo), Theme::Light));

        let client = reqwest::Client::new();
        let health = client
            .get(format!("http://{addr}/health"))
            .send()
            .await
            .expect("health request");
        assert_eq!(health.status().as_u16(), 200);
        assert_eq!(health.text().await.expect("body"), "ok");

        let chat: serde_json::Value = client
            .post(format!("http://{addr}/api/chat"))
            .json(&serde_json::json!({ "message": "over the wire" }))
            .send()
            .await
            .expect("chat request")
            .json()
            .await
            .expect("chat json");
        assert_eq!(chat["outcome"]["reply"], "echo: over the wire");

        server.abort();
    }
}
