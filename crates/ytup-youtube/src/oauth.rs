//! OAuth 2.0 authorization-code flow with a loopback redirect.
//!
//! # Flow Overview
//!
//! 1. Bind a local HTTP listener on an ephemeral port
//! 2. Generate a random state nonce
//! 3. Build the authorization URL and open the user's browser
//! 4. User grants permission; the provider redirects to the listener
//! 5. The listener validates the state nonce and extracts the code
//! 6. The code is exchanged at the token endpoint for tokens
//!
//! # Security
//!
//! - The loopback listener only accepts connections from localhost
//! - The state nonce prevents an attacker-controlled page from injecting
//!   its own authorization code into the waiting flow
//! - A callback with a wrong state is rejected without aborting the flow

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use rand::Rng as _;
use rand::distr::Alphanumeric;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::config::YouTubeConfig;
use crate::error::{YouTubeError, YouTubeResult};
use crate::token::Token;

/// The redirect path served by the loopback listener.
const CALLBACK_PATH: &str = "/callback";

/// How long to wait for the browser to deliver the callback.
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300); // 5 minutes

/// Length of the state nonce.
const STATE_LEN: usize = 32;

/// OAuth client for the authorization-code grant.
///
/// Handles the interactive loopback flow, the code exchange, and
/// refresh-token renewal.
#[derive(Debug)]
pub struct OAuthClient {
    client_id: String,
    client_secret: String,
    auth_url: String,
    token_url: String,
    http_client: reqwest::Client,
}

impl OAuthClient {
    /// Creates a new OAuth client from the configuration.
    pub fn new(config: &YouTubeConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .expect("failed to create HTTP client");

        Self {
            client_id: config.credentials.client_id.clone(),
            client_secret: config.credentials.client_secret.clone(),
            auth_url: config.auth_url.clone(),
            token_url: config.token_url.clone(),
            http_client,
        }
    }

    /// Runs the interactive authorization flow and returns the obtained
    /// token.
    ///
    /// Opens the user's default browser on the authorization URL; if the
    /// browser cannot be launched the URL is printed for manual use.
    ///
    /// # Errors
    ///
    /// Returns an error if the loopback listener cannot be bound, the
    /// user denies authorization, no callback arrives within the wait
    /// bound, or the token exchange fails.
    pub async fn authorize(&self, scopes: &[String]) -> YouTubeResult<Token> {
        self.authorize_with(scopes, |url| {
            if let Err(e) = open::that(url) {
                warn!("failed to open browser: {}", e);
            }
            eprintln!("\nAuthorize this app at:\n\n{}\n", url);
        })
        .await
    }

    /// Runs the authorization flow, handing the authorization URL to
    /// `present_url` instead of assuming a browser is available.
    pub async fn authorize_with(
        &self,
        scopes: &[String],
        present_url: impl FnOnce(&str),
    ) -> YouTubeResult<Token> {
        let state = generate_state();
        let server = CallbackServer::bind(state.clone())?;
        let redirect_uri = format!("http://127.0.0.1:{}{}", server.port(), CALLBACK_PATH);

        let auth_url = self.build_auth_url(&redirect_uri, scopes, &state);

        info!("starting OAuth flow, waiting for browser authorization");
        debug!("authorization URL: {}", auth_url);
        present_url(&auth_url);

        // The listener is torn down inside wait() on every outcome,
        // before the exchange.
        let code = server.wait(CALLBACK_TIMEOUT)?;

        info!("received authorization code, exchanging for tokens");
        self.exchange_code(&code, &redirect_uri).await
    }

    /// Builds the authorization URL sent to the browser.
    fn build_auth_url(&self, redirect_uri: &str, scopes: &[String], state: &str) -> String {
        let scope = scopes.join(" ");

        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
            self.auth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scope),
            urlencoding::encode(state),
        )
    }

    /// Exchanges an authorization code for tokens.
    ///
    /// Exchange failure is fatal to the authorization attempt; there is
    /// no retry.
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> YouTubeResult<Token> {
        let params = [
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ];

        let response = self
            .http_client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| YouTubeError::network(format!("token exchange request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| YouTubeError::network(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(YouTubeError::authentication(format!(
                "token exchange failed ({}): {}",
                status, body
            )));
        }

        let token_response: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            YouTubeError::invalid_response(format!("invalid token response: {}", e))
        })?;

        info!("successfully obtained tokens");
        Ok(Token::new(
            token_response.access_token,
            token_response.refresh_token,
            token_response.token_type,
            token_response.expires_in,
        ))
    }

    /// Renews an expired access token using the refresh token.
    ///
    /// Returns the new access token and its expiry in seconds.
    pub async fn refresh(&self, refresh_token: &str) -> YouTubeResult<(String, Option<i64>)> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http_client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| YouTubeError::network(format!("token refresh request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| YouTubeError::network(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(YouTubeError::authentication(format!(
                "token refresh failed ({}): {}",
                status, body
            )));
        }

        let token_response: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            YouTubeError::invalid_response(format!("invalid token response: {}", e))
        })?;

        info!("successfully refreshed access token");
        Ok((token_response.access_token, token_response.expires_in))
    }
}

/// Generates the per-flow state nonce.
fn generate_state() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(STATE_LEN)
        .map(char::from)
        .collect()
}

/// What a single callback request means for the pending flow.
#[derive(Debug, PartialEq)]
enum CallbackAction {
    /// Unrelated path (browser probe such as /favicon.ico): 404, flow
    /// unaffected.
    NotFound,
    /// Discard this request with a 500 but keep waiting.
    Reject(&'static str),
    /// The provider reported a denial; abort the flow.
    Denied(String),
    /// A valid authorization code arrived.
    Deliver(String),
}

/// A parsed callback request line.
#[derive(Debug)]
struct CallbackRequest {
    path: String,
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

impl CallbackRequest {
    /// Parses a request line of the form `GET /callback?code=...&state=... HTTP/1.1`.
    fn parse(request_line: &str) -> Option<Self> {
        let mut parts = request_line.split_whitespace();
        if parts.next() != Some("GET") {
            return None;
        }
        let target = parts.next()?;

        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p, q),
            None => (target, ""),
        };

        let mut code = None;
        let mut state = None;
        let mut error = None;

        for param in query.split('&') {
            if let Some((key, value)) = param.split_once('=') {
                let value = urlencoding::decode(value).unwrap_or_default().into_owned();
                match key {
                    "code" => code = Some(value),
                    "state" => state = Some(value),
                    "error" => error = Some(value),
                    _ => {}
                }
            }
        }

        Some(Self {
            path: path.to_string(),
            code,
            state,
            error,
        })
    }

    /// Decides what this request does to the flow.
    ///
    /// A wrong state nonce discards the request without aborting the
    /// flow: a later, correct callback may still succeed.
    fn evaluate(&self, expected_state: &str) -> CallbackAction {
        if self.path != CALLBACK_PATH {
            return CallbackAction::NotFound;
        }

        if self.state.as_deref() != Some(expected_state) {
            return CallbackAction::Reject("state mismatch");
        }

        if let Some(ref err) = self.error {
            return CallbackAction::Denied(err.clone());
        }

        match self.code {
            Some(ref code) => CallbackAction::Deliver(code.clone()),
            None => CallbackAction::Reject("missing code"),
        }
    }
}

/// Terminal outcome delivered by the listener thread.
enum FlowOutcome {
    Code(String),
    Denied(String),
}

/// The loopback callback listener.
///
/// Serves requests one at a time on a dedicated thread and hands at
/// most one outcome back to the waiting flow over a single-use channel.
struct CallbackServer {
    port: u16,
    stop: Arc<AtomicBool>,
    rx: mpsc::Receiver<FlowOutcome>,
    handle: thread::JoinHandle<()>,
}

impl CallbackServer {
    /// Binds an ephemeral loopback port and starts serving.
    ///
    /// Bind failure is fatal: no authorization attempt proceeds without
    /// a redirect target.
    fn bind(expected_state: String) -> YouTubeResult<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").map_err(|e| {
            YouTubeError::configuration(format!("failed to bind loopback listener: {}", e))
                .with_source(e)
        })?;
        let port = listener
            .local_addr()
            .map_err(|e| YouTubeError::internal(format!("no local address: {}", e)))?
            .port();

        debug!("bound loopback listener on port {}", port);

        let stop = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel();

        let thread_stop = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            for stream in listener.incoming() {
                if thread_stop.load(Ordering::SeqCst) {
                    return;
                }
                match stream {
                    Ok(stream) => {
                        if let Some(outcome) = handle_connection(stream, &expected_state) {
                            // One delivery per flow: send once, then stop
                            // accepting.
                            let _ = tx.send(outcome);
                            return;
                        }
                    }
                    Err(e) => error!("failed to accept connection: {}", e),
                }
            }
        });

        Ok(Self {
            port,
            stop,
            rx,
            handle,
        })
    }

    fn port(&self) -> u16 {
        self.port
    }

    /// Blocks until the flow resolves or `timeout` elapses, then tears
    /// the listener down regardless of the outcome.
    fn wait(self, timeout: Duration) -> YouTubeResult<String> {
        let result = self.rx.recv_timeout(timeout);
        self.shutdown();

        match result {
            Ok(FlowOutcome::Code(code)) => Ok(code),
            Ok(FlowOutcome::Denied(err)) => Err(YouTubeError::authentication(format!(
                "authorization denied: {}",
                err
            ))),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(YouTubeError::timeout(format!(
                "no authorization callback within {} seconds",
                timeout.as_secs()
            ))),
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(YouTubeError::internal("callback channel disconnected"))
            }
        }
    }

    /// Stops the listener thread and joins it.
    ///
    /// The wake connection unblocks a thread still parked in `accept`.
    fn shutdown(self) {
        self.stop.store(true, Ordering::SeqCst);
        let _ = TcpStream::connect(("127.0.0.1", self.port));
        let _ = self.handle.join();
    }
}

/// Handles one incoming connection.
///
/// Returns `Some` only when the request resolves the flow; probe
/// requests and rejected callbacks return `None` and the listener keeps
/// waiting.
fn handle_connection(mut stream: TcpStream, expected_state: &str) -> Option<FlowOutcome> {
    let mut reader = BufReader::new(&stream);
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return None;
    }

    let request = match CallbackRequest::parse(&request_line) {
        Some(request) => request,
        None => {
            warn!("rejecting callback request: malformed request line");
            let _ = stream.write_all(
                b"HTTP/1.1 500 Internal Server Error\r\nContent-Type: text/plain\r\n\r\n",
            );
            let _ = stream.flush();
            return None;
        }
    };
    let action = request.evaluate(expected_state);

    let (response, outcome) = match action {
        CallbackAction::NotFound => (
            "HTTP/1.1 404 Not Found\r\nContent-Type: text/plain\r\n\r\nNot Found".to_string(),
            None,
        ),
        CallbackAction::Reject(reason) => {
            warn!("rejecting callback request: {}", reason);
            (
                "HTTP/1.1 500 Internal Server Error\r\nContent-Type: text/plain\r\n\r\n"
                    .to_string(),
                None,
            )
        }
        CallbackAction::Denied(err) => {
            warn!("authorization denied by provider: {}", err);
            (
                "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html\r\n\r\n\
                 <html><body><h1>Authorization Failed</h1>\
                 <p>You can close this window.</p></body></html>"
                    .to_string(),
                Some(FlowOutcome::Denied(err)),
            )
        }
        CallbackAction::Deliver(code) => (
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n\
             <html><body><h1>Authorization Successful</h1>\
             <p>You can close this window and return to the terminal.</p></body></html>"
                .to_string(),
            Some(FlowOutcome::Code(code)),
        ),
    };

    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();

    outcome
}

/// Response from the token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    token_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    use crate::config::OAuthCredentials;

    fn test_client(token_url: &str) -> OAuthClient {
        let config = YouTubeConfig::new(OAuthCredentials::new("cid", "csec"))
            .with_token_url(token_url)
            .with_timeout(Duration::from_secs(5));
        OAuthClient::new(&config)
    }

    #[test]
    fn state_nonce_is_fresh_per_flow() {
        let a = generate_state();
        let b = generate_state();
        assert_eq!(a.len(), STATE_LEN);
        assert_ne!(a, b);
    }

    #[test]
    fn auth_url_format() {
        let client = test_client("http://127.0.0.1:1/token");
        let url = client.build_auth_url(
            "http://127.0.0.1:8080/callback",
            &["scopeA".to_string(), "scopeB".to_string()],
            "st123",
        );

        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("client_id=cid"));
        assert!(url.contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A8080%2Fcallback"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("scope=scopeA%20scopeB"));
        assert!(url.contains("state=st123"));
    }

    #[test]
    fn probe_path_is_not_found() {
        let req = CallbackRequest::parse("GET /favicon.ico HTTP/1.1\r\n").unwrap();
        assert_eq!(req.evaluate("st"), CallbackAction::NotFound);
    }

    #[test]
    fn state_mismatch_is_rejected_not_fatal() {
        let req =
            CallbackRequest::parse("GET /callback?state=WRONG&code=evil HTTP/1.1\r\n").unwrap();
        assert_eq!(req.evaluate("st"), CallbackAction::Reject("state mismatch"));
    }

    #[test]
    fn missing_code_is_rejected() {
        let req = CallbackRequest::parse("GET /callback?state=st HTTP/1.1\r\n").unwrap();
        assert_eq!(req.evaluate("st"), CallbackAction::Reject("missing code"));
    }

    #[test]
    fn denial_aborts_the_flow() {
        let req = CallbackRequest::parse("GET /callback?state=st&error=access_denied HTTP/1.1\r\n")
            .unwrap();
        assert_eq!(
            req.evaluate("st"),
            CallbackAction::Denied("access_denied".to_string())
        );
    }

    #[test]
    fn valid_callback_delivers_the_code() {
        let req =
            CallbackRequest::parse("GET /callback?state=st&code=authcode1 HTTP/1.1\r\n").unwrap();
        assert_eq!(
            req.evaluate("st"),
            CallbackAction::Deliver("authcode1".to_string())
        );
    }

    #[test]
    fn query_values_are_url_decoded() {
        let req =
            CallbackRequest::parse("GET /callback?state=st&code=a%2Fb%3Dc HTTP/1.1\r\n").unwrap();
        assert_eq!(req.code.as_deref(), Some("a/b=c"));
    }

    #[test]
    fn non_get_requests_are_ignored() {
        assert!(CallbackRequest::parse("POST /callback HTTP/1.1\r\n").is_none());
        assert!(CallbackRequest::parse("\r\n").is_none());
    }

    /// A malformed request still gets an HTTP response instead of a
    /// silently dropped connection, and the flow keeps waiting.
    #[test]
    fn malformed_request_gets_a_response_and_flow_survives() {
        let server = CallbackServer::bind("st".to_string()).unwrap();
        let port = server.port();

        let status = send_request(port, "POST /callback HTTP/1.1");
        assert!(status.contains("500"));

        let browser = thread::spawn(move || {
            let status = send_request(port, "GET /callback?state=st&code=c1 HTTP/1.1");
            assert!(status.contains("200"));
        });

        let code = server.wait(Duration::from_secs(10)).unwrap();
        assert_eq!(code, "c1");
        browser.join().unwrap();
    }

    /// Extracts a query parameter from a URL, decoded.
    fn query_param(url: &str, name: &str) -> String {
        let query = url.split_once('?').map(|(_, q)| q).unwrap_or_default();
        for param in query.split('&') {
            if let Some((key, value)) = param.split_once('=') {
                if key == name {
                    return urlencoding::decode(value).unwrap().into_owned();
                }
            }
        }
        panic!("parameter {} not found in {}", name, url);
    }

    /// Sends one raw HTTP request to the given port and returns the
    /// response status line.
    fn send_request(port: u16, request_line: &str) -> String {
        let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
        stream
            .write_all(format!("{}\r\nHost: 127.0.0.1\r\n\r\n", request_line).as_bytes())
            .unwrap();
        let mut response = String::new();
        let _ = stream.read_to_string(&mut response);
        response.lines().next().unwrap_or_default().to_string()
    }

    /// A one-shot fake token endpoint that answers any POST with the
    /// given JSON body.
    fn spawn_token_endpoint(response_json: &'static str) -> (String, thread::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());

            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line.trim().is_empty() {
                    break;
                }
                if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                    content_length = value.trim().parse().unwrap();
                }
            }
            let mut body = vec![0u8; content_length];
            reader.read_exact(&mut body).unwrap();
            let body = String::from_utf8(body).unwrap();
            assert!(body.contains("grant_type=authorization_code"));
            assert!(body.contains("code=authcode1"));
            assert!(body.contains("client_id=cid"));
            assert!(body.contains("client_secret=csec"));

            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                response_json.len(),
                response_json
            );
            stream.write_all(response.as_bytes()).unwrap();
        });

        (format!("http://{}/token", addr), handle)
    }

    /// Full flow against a fake provider: probe and mismatched callbacks
    /// are tolerated, the genuine callback completes the flow, and the
    /// exchanged token survives a cache round-trip.
    #[tokio::test(flavor = "multi_thread")]
    async fn interactive_flow_happy_path() {
        let (token_url, endpoint) = spawn_token_endpoint(
            r#"{"access_token":"tok1","refresh_token":"ref1","expires_in":3600,"token_type":"Bearer"}"#,
        );
        let client = test_client(&token_url);

        let mut browser: Option<thread::JoinHandle<()>> = None;
        let token = client
            .authorize_with(&["scopeA".to_string()], |auth_url| {
                let state = query_param(auth_url, "state");
                let redirect_uri = query_param(auth_url, "redirect_uri");
                let port: u16 = redirect_uri
                    .rsplit_once(':')
                    .and_then(|(_, rest)| rest.split('/').next())
                    .and_then(|p| p.parse().ok())
                    .unwrap();

                browser = Some(thread::spawn(move || {
                    // Browser probe: must not disturb the flow.
                    let status = send_request(port, "GET /favicon.ico HTTP/1.1");
                    assert!(status.contains("404"));

                    // Forged callback: rejected, flow keeps waiting.
                    let status =
                        send_request(port, "GET /callback?state=WRONG&code=evil HTTP/1.1");
                    assert!(status.contains("500"));

                    // Genuine callback.
                    let status = send_request(
                        port,
                        &format!("GET /callback?state={}&code=authcode1 HTTP/1.1", state),
                    );
                    assert!(status.contains("200"));
                }));
            })
            .await
            .unwrap();

        browser.unwrap().join().unwrap();
        endpoint.join().unwrap();

        assert_eq!(token.access_token, "tok1");
        assert_eq!(token.refresh_token, Some("ref1".to_string()));
        assert_eq!(token.token_type, "Bearer");
        assert!(token.expires_at.is_some());
        assert!(!token.is_expired());

        // A fresh cache over the same root returns the identical token,
        // as a new process would.
        let tmp = tempfile::tempdir().unwrap();
        let creds = OAuthCredentials::new("cid", "csec");
        let scopes = vec!["scopeA".to_string()];
        crate::cache::TokenCache::with_root(tmp.path(), true)
            .save(&creds, &scopes, &token)
            .unwrap();
        let reloaded = crate::cache::TokenCache::with_root(tmp.path(), true)
            .load(&creds, &scopes)
            .unwrap();
        assert_eq!(reloaded, token);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn denial_callback_fails_the_flow() {
        let client = test_client("http://127.0.0.1:1/token");

        let mut browser: Option<thread::JoinHandle<()>> = None;
        let result = client
            .authorize_with(&["scopeA".to_string()], |auth_url| {
                let state = query_param(auth_url, "state");
                let redirect_uri = query_param(auth_url, "redirect_uri");
                let port: u16 = redirect_uri
                    .rsplit_once(':')
                    .and_then(|(_, rest)| rest.split('/').next())
                    .and_then(|p| p.parse().ok())
                    .unwrap();

                browser = Some(thread::spawn(move || {
                    let status = send_request(
                        port,
                        &format!("GET /callback?state={}&error=access_denied HTTP/1.1", state),
                    );
                    assert!(status.contains("400"));
                }));
            })
            .await;

        browser.unwrap().join().unwrap();

        let err = result.unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::AuthenticationFailed);
        assert!(err.message().contains("access_denied"));
    }
}
