//! Remote Web API client.
//!
//! Requests go through an [`HttpClient`] so tests can script responses. The
//! production client is [`UreqClient`]. [`WebApi`] adds the bearer token,
//! refreshes it when stale, retries transport failures, and turns error
//! statuses into user notifications where the player explains itself.

use std::{collections::BTreeMap, fmt, sync::Arc, time::Duration};

use config::Settings;
use parking_lot::Mutex;
use serde_json::{Value, json};
use spotkeys_engine::NotificationDispatcher;
use tracing::{debug, info, trace, warn};

use crate::{
    Error, Result,
    token::{TokenStore, unix_now},
};

/// HTTP verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET
    Get,
    /// PUT
    Put,
    /// POST
    Post,
    /// DELETE
    Delete,
}

impl Method {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request body.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// `application/json`
    Json(Value),
    /// `application/x-www-form-urlencoded`
    Form(Vec<(String, String)>),
}

/// A fully resolved request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Verb.
    pub method: Method,
    /// Absolute URL without query string.
    pub url: String,
    /// Query parameters.
    pub query: Vec<(String, String)>,
    /// Bearer token, if authenticated.
    pub bearer: Option<String>,
    /// Optional body.
    pub body: Option<Body>,
}

/// Status and body of a completed exchange, whatever the status.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Parsed JSON body; `None` when empty or not JSON.
    pub body: Option<Value>,
    /// Raw body text.
    pub text: String,
}

impl Response {
    /// Build a response from raw text, parsing JSON when possible.
    pub fn new(status: u16, text: impl Into<String>) -> Self {
        let text = text.into();
        let body = if text.trim().is_empty() {
            None
        } else {
            serde_json::from_str(&text).ok()
        };
        Self { status, body, text }
    }

    fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport seam. Returns `Ok` for every status; `Err(Error::Connection)`
/// only when no response was received.
pub trait HttpClient: Send + Sync {
    /// Perform one exchange.
    fn send(&self, req: &Request) -> Result<Response>;
}

/// Blocking client backed by a `ureq` agent.
pub struct UreqClient {
    agent: ureq::Agent,
}

impl UreqClient {
    /// Create a client with a per-request timeout.
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }
}

impl HttpClient for UreqClient {
    fn send(&self, req: &Request) -> Result<Response> {
        let mut r = self.agent.request(req.method.as_str(), &req.url);
        for (k, v) in &req.query {
            r = r.query(k, v);
        }
        if let Some(token) = &req.bearer {
            r = r.set("Authorization", &format!("Bearer {token}"));
        }
        let result = match &req.body {
            Some(Body::Json(v)) => r
                .set("Content-Type", "application/json")
                .send_string(&v.to_string()),
            Some(Body::Form(fields)) => {
                let pairs: Vec<(&str, &str)> = fields
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str()))
                    .collect();
                r.send_form(&pairs)
            }
            None => r.call(),
        };
        let resp = match result {
            Ok(resp) => resp,
            Err(ureq::Error::Status(_, resp)) => resp,
            Err(ureq::Error::Transport(t)) => return Err(Error::Connection(t.to_string())),
        };
        let status = resp.status();
        let text = resp.into_string()?;
        Ok(Response::new(status, text))
    }
}

/// Authenticated Web API client.
pub struct WebApi {
    http: Arc<dyn HttpClient>,
    api_url: String,
    refresh_url: String,
    client_id: Option<String>,
    retries: u32,
    tokens: Mutex<TokenStore>,
    notifier: NotificationDispatcher,
    player_errors: BTreeMap<String, String>,
}

impl WebApi {
    /// Build a client from explicit parts.
    pub fn new(
        http: Arc<dyn HttpClient>,
        settings: &Settings,
        tokens: TokenStore,
        notifier: NotificationDispatcher,
    ) -> Self {
        Self {
            http,
            api_url: settings.web.api_url.clone(),
            refresh_url: settings.web.refresh_url.clone(),
            client_id: settings.client_id.clone(),
            retries: settings.web.retries,
            tokens: Mutex::new(tokens),
            notifier,
            player_errors: settings.player_errors.clone(),
        }
    }

    /// Build the production client: `ureq` transport and the token file
    /// named in `settings`.
    pub fn from_settings(settings: &Settings, notifier: NotificationDispatcher) -> Result<Self> {
        let tokens = TokenStore::load(&settings.token_path())?;
        let http = Arc::new(UreqClient::new(Duration::from_millis(
            settings.web.timeout_ms,
        )));
        Ok(Self::new(http, settings, tokens, notifier))
    }

    /// GET `endpoint`.
    pub fn get(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Value> {
        self.call(Method::Get, endpoint, query, None)
    }

    /// PUT `endpoint` with an optional JSON body.
    pub fn put(&self, endpoint: &str, query: &[(&str, String)], body: Option<Value>) -> Result<Value> {
        self.call(Method::Put, endpoint, query, body)
    }

    /// POST `endpoint` with an optional JSON body.
    pub fn post(&self, endpoint: &str, query: &[(&str, String)], body: Option<Value>) -> Result<Value> {
        self.call(Method::Post, endpoint, query, body)
    }

    /// DELETE `endpoint` with an optional JSON body.
    pub fn delete(&self, endpoint: &str, query: &[(&str, String)], body: Option<Value>) -> Result<Value> {
        self.call(Method::Delete, endpoint, query, body)
    }

    /// Issue a request and interpret the status.
    ///
    /// Returns the JSON body (`Value::Null` when empty) for 2xx. A 204 from
    /// `GET me/player` means no active device. Error bodies carrying a player
    /// `reason` are shown to the user. Everything else is an [`Error::Http`].
    pub fn call(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<Value> {
        let req = Request {
            method,
            url: format!("{}{}", self.api_url, endpoint),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            bearer: Some(self.access_token()?),
            body: body.map(Body::Json),
        };
        let resp = self.send_with_retry(&req)?;
        trace!(%method, endpoint, status = resp.status, "web_response");

        if resp.status == 204 && method == Method::Get && endpoint == "me/player" {
            self.notifier.send_error("Error", "No device found");
            return Err(Error::Notified);
        }
        if resp.is_success() {
            return Ok(resp.body.unwrap_or(Value::Null));
        }

        let error = resp.body.as_ref().and_then(|b| b.get("error"));
        if let Some(reason) = error.and_then(|e| e.get("reason")).and_then(Value::as_str) {
            let message = self
                .player_errors
                .get(reason)
                .cloned()
                .unwrap_or_else(|| format!("The player refused the request ({reason})."));
            self.notifier.send_error("Player Error", &message);
            return Err(Error::Notified);
        }
        let message = error
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| resp.text.clone());
        warn!(%method, endpoint, status = resp.status, "request_failed: {}", message);
        Err(Error::Http {
            endpoint: endpoint.to_string(),
            status: resp.status,
            message,
        })
    }

    fn send_with_retry(&self, req: &Request) -> Result<Response> {
        let mut attempt = 0;
        loop {
            match self.http.send(req) {
                Err(Error::Connection(msg)) if attempt < self.retries => {
                    attempt += 1;
                    debug!(url = %req.url, attempt, "retrying_after_transport_error: {}", msg);
                }
                other => return other,
            }
        }
    }

    fn access_token(&self) -> Result<String> {
        let mut store = self.tokens.lock();
        if store.is_expired(unix_now()) {
            self.refresh(&mut store)?;
        }
        Ok(store.tokens().access_token.clone())
    }

    fn refresh(&self, store: &mut TokenStore) -> Result<()> {
        let obtained_at = unix_now();
        let mut form = vec![
            ("grant_type".to_string(), "refresh_token".to_string()),
            (
                "refresh_token".to_string(),
                store.tokens().refresh_token.clone(),
            ),
        ];
        if let Some(id) = &self.client_id {
            form.push(("client_id".to_string(), id.clone()));
        }
        let req = Request {
            method: Method::Post,
            url: self.refresh_url.clone(),
            query: Vec::new(),
            bearer: None,
            body: Some(Body::Form(form)),
        };
        let resp = self.send_with_retry(&req)?;
        if (400..500).contains(&resp.status) {
            warn!(status = resp.status, "token_refresh_rejected: {}", resp.text);
            self.notifier.send_error(
                "Authentication error",
                "Please re-authenticate, or try restarting the app.",
            );
            return Err(Error::Notified);
        }
        if !resp.is_success() {
            return Err(Error::Http {
                endpoint: self.refresh_url.clone(),
                status: resp.status,
                message: resp.text,
            });
        }
        let body = resp.body.unwrap_or(Value::Null);
        let access = str_field(&body, "access_token", "token refresh")?.to_string();
        let expires_in = body.get("expires_in").and_then(Value::as_u64).unwrap_or(3600);
        let rotated = body
            .get("refresh_token")
            .and_then(Value::as_str)
            .map(str::to_string);
        store.update(access, rotated, expires_in, obtained_at)?;
        info!(expires_in, "tokens_refreshed");
        Ok(())
    }
}

/// String at `pointer` (JSON pointer syntax, or a plain key) in `v`.
pub(crate) fn str_field<'a>(v: &'a Value, field: &'static str, endpoint: &str) -> Result<&'a str> {
    lookup(v, field)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Missing {
            endpoint: endpoint.to_string(),
            field,
        })
}

/// Value at `field`, which is a JSON pointer when it starts with `/`.
pub(crate) fn lookup<'a>(v: &'a Value, field: &str) -> Option<&'a Value> {
    if field.starts_with('/') {
        v.pointer(field)
    } else {
        v.get(field)
    }
}

/// Shorthand for a JSON body with one `ids` array.
pub(crate) fn ids_body(id: &str) -> Value {
    json!({ "ids": [id] })
}
