use crate::{
    store::{FileStore, SessionStore, StoreError},
    Config, Session, User,
};
use reqwest::{
    header::{
        HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE,
    },
    Client, Method, StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

const JSON: &str = "application/json";
const FORM: &str = "application/x-www-form-urlencoded";

/// The single choke point for talking to the backend.
///
/// Cloning an [`ApiClient`] is cheap and every clone shares the same
/// connection pool and [`SessionStore`].
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    store: SessionStore,
}

impl ApiClient {
    pub fn new<S: Into<String>>(
        base_url: S,
        store: SessionStore,
    ) -> Result<Self, ApiError> {
        let http = Client::builder()
            .user_agent(crate::DEFAULT_USER_AGENT)
            .build()?;

        Ok(ApiClient::with_http_client(http, base_url, store))
    }

    /// Create a client which persists its session to
    /// [`Config::session_path`].
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let http = Client::builder().user_agent(&config.user_agent).build()?;
        let store =
            SessionStore::new(FileStore::new(config.session_path.clone()));

        Ok(ApiClient::with_http_client(http, config.base_url.clone(), store))
    }

    pub fn with_http_client<S: Into<String>>(
        http: Client,
        base_url: S,
        store: SessionStore,
    ) -> Self {
        ApiClient {
            http,
            base_url: base_url.into(),
            store,
        }
    }

    pub fn base_url(&self) -> &str { &self.base_url }

    pub fn session_store(&self) -> &SessionStore { &self.store }

    /// The bearer token of the current session, if we are logged in.
    pub fn token(&self) -> Option<String> { self.store.token() }

    /// The profile of the logged in user.
    pub fn stored_user(&self) -> Option<User> { self.store.user() }

    /// The current session, if both the token and user were persisted.
    pub fn session(&self) -> Option<Session> { self.store.load() }

    /// Persist a freshly issued session, replacing any previous one.
    pub fn save_auth(&self, session: &Session) -> Result<(), StoreError> {
        self.store.save(session)
    }

    /// Forget the current session (i.e. log out locally).
    pub fn clear_auth(&self) -> Result<(), StoreError> { self.store.clear() }

    /// Read the token without blocking the runtime, since the store may
    /// have to hit the disk.
    async fn load_token(&self) -> Option<String> {
        let store = self.store.clone();

        match tokio::task::spawn_blocking(move || store.token()).await {
            Ok(token) => token,
            Err(e) => {
                log::warn!("Unable to read the stored token: {}", e);
                None
            },
        }
    }

    /// Send a request to `base_url + path`.
    ///
    /// The request is sent exactly once. Non-2xx responses are turned into
    /// [`ApiError::Status`] and the decoded body is returned otherwise.
    pub async fn request(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<Payload, ApiError> {
        let RequestOptions {
            method,
            headers,
            body,
            is_form,
        } = options;

        let url = format!("{}{}", self.base_url, path);
        let token = self.load_token().await;
        let headers = merge_headers(is_form, token.as_deref(), &headers);

        log::debug!("Sending a {} request to {}", method, url);
        log::trace!("Payload: {:?}", body);

        let mut request = self.http.request(method, &url).headers(headers);
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await?;
        log::trace!("Headers: {:#?}", response.headers());

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let body = response.text().await?;
        let payload = Payload::decode_lenient(&content_type, body);
        log::trace!("Response: {:?}", payload);

        if status.is_success() {
            Ok(payload)
        } else {
            let err = ApiError::from_response(status, payload);
            log::debug!("{} {} failed: {}", status, url, err);
            Err(err)
        }
    }
}

/// Build the headers for a request.
///
/// Precedence, lowest first:
///
/// 1. `Content-Type: application/json`, unless the body is form-encoded
/// 2. `Authorization: Bearer <token>`, only when there is a token
/// 3. anything in `overrides`, replacing same-named headers from above
pub fn merge_headers(
    is_form: bool,
    token: Option<&str>,
    overrides: &HeaderMap,
) -> HeaderMap {
    let mut headers = HeaderMap::new();

    if !is_form {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON));
    }

    if let Some(token) = token.filter(|t| !t.is_empty()) {
        match HeaderValue::from_str(&format!("Bearer {}", token)) {
            Ok(mut value) => {
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            },
            Err(_) => log::warn!(
                "The stored token isn't a valid header value, sending the \
                 request unauthenticated"
            ),
        }
    }

    for name in overrides.keys() {
        headers.remove(name);
    }
    for (name, value) in overrides {
        headers.append(name.clone(), value.clone());
    }

    headers
}

/// Everything needed to send a request, apart from the path.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Defaults to `GET`.
    pub method: Method,
    /// Extra headers, which win over the defaults.
    pub headers: HeaderMap,
    pub body: Option<String>,
    /// The body is form-encoded, so don't default to a JSON content type.
    pub is_form: bool,
}

impl RequestOptions {
    pub fn new() -> Self { RequestOptions::default() }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Use a JSON-serialized body.
    pub fn json<T>(mut self, body: &T) -> Result<Self, ApiError>
    where
        T: Serialize + ?Sized,
    {
        let body = serde_json::to_string(body).map_err(ApiError::Encode)?;
        self.body = Some(body);
        self.is_form = false;
        Ok(self)
    }

    /// Use an already URL-encoded form body.
    pub fn form<S: Into<String>>(self, body: S) -> Self {
        let mut options =
            self.header(CONTENT_TYPE, HeaderValue::from_static(FORM));
        options.body = Some(body.into());
        options.is_form = true;
        options
    }
}

/// A decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
}

impl Payload {
    /// Decode a body according to its `Content-Type`.
    ///
    /// Anything claiming to be `application/json` is parsed as JSON, and a
    /// body which fails to parse becomes an empty object instead of an
    /// error. Everything else is kept as text.
    pub fn decode_lenient(content_type: &str, body: String) -> Payload {
        if !content_type.contains(JSON) {
            return Payload::Text(body);
        }

        match serde_json::from_str(&body) {
            Ok(value) => Payload::Json(value),
            Err(e) => {
                log::debug!("Treating a malformed JSON body as {{}}: {}", e);
                Payload::Json(Value::Object(Map::new()))
            },
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            Payload::Json(_) => None,
        }
    }

    /// Deserialize the body into a strongly typed value.
    ///
    /// Text bodies are parsed as JSON too, in case the server forgot to set
    /// a content type.
    pub fn into_json<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        let result = match self {
            Payload::Json(value) => serde_json::from_value(value),
            Payload::Text(text) => serde_json::from_str(&text),
        };

        result.map_err(ApiError::UnexpectedResponse)
    }

    /// The server's `detail` message, if it sent a non-empty one.
    fn detail(&self) -> Option<&str> {
        self.as_json()?
            .get("detail")?
            .as_str()
            .filter(|detail| !detail.is_empty())
    }
}

/// Errors that may be returned when talking to the backend.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP client encountered an error.
    #[error("Unable to send the request")]
    Transport(#[from] reqwest::Error),
    /// The server responded with a non-2xx status code.
    #[error("{}", message)]
    Status {
        /// The server's `detail` message, or `HTTP <status>`.
        message: String,
        status: StatusCode,
        /// The full decoded body, for callers wanting field-level detail.
        data: Payload,
    },
    #[error("The response didn't have the expected shape")]
    UnexpectedResponse(#[source] serde_json::Error),
    /// The login succeeded but the backend didn't say who we are.
    #[error("The login response didn't include the user's profile")]
    MissingProfile,
    #[error("Unable to serialize the request body")]
    Encode(#[source] serde_json::Error),
    #[error("Unable to update the stored session")]
    Store(#[from] StoreError),
}

impl ApiError {
    pub(crate) fn from_response(status: StatusCode, data: Payload) -> Self {
        let message = match data.detail() {
            Some(detail) => detail.to_string(),
            None => format!("HTTP {}", status.as_u16()),
        };

        ApiError::Status {
            message,
            status,
            data,
        }
    }

    /// The HTTP status code, if the server sent a response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status(),
            _ => None,
        }
    }

    /// The decoded error body, if the server sent a response.
    pub fn data(&self) -> Option<&Payload> {
        match self {
            ApiError::Status { data, .. } => Some(data),
            _ => None,
        }
    }

    /// Was the token missing, expired, or revoked? The only way back is to
    /// log in again.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }
}
