use crate::{ApiClient, ApiError, RequestOptions, Session, User};
use reqwest::Method;
use serde_derive::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{self, Debug, Formatter};
use url::form_urlencoded;

pub const LOGIN_PATH: &str = "/users_root/login";

/// A root user's login details.
#[derive(Copy, Clone, PartialEq)]
pub struct Credentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

impl<'a> Credentials<'a> {
    pub fn new(email: &'a str, password: &'a str) -> Self {
        Credentials { email, password }
    }

    /// The password-grant form body, which expects the email under the
    /// `username` field.
    fn to_form(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair("username", self.email)
            .append_pair("password", self.password)
            .finish()
    }
}

impl Debug for Credentials<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// What the backend sends back after a successful login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(alias = "token")]
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Plain password-grant backends only send the token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LoginResponse {
    /// A session needs the user's profile as well as the token.
    pub fn into_session(self) -> Result<Session, ApiError> {
        match self.user {
            Some(user) => Ok(Session::new(self.access_token, user)),
            None => Err(ApiError::MissingProfile),
        }
    }
}

/// Authenticate a root user.
///
/// This only talks to the server. Use [`login()`] to also persist the
/// resulting [`Session`].
pub async fn login_root(
    client: &ApiClient,
    credentials: Credentials<'_>,
) -> Result<LoginResponse, ApiError> {
    log::debug!("Logging in as {}", credentials.email);

    let options = RequestOptions::new()
        .method(Method::POST)
        .form(credentials.to_form());

    client.request(LOGIN_PATH, options).await?.into_json()
}

/// Authenticate a root user and make them the current [`Session`].
pub async fn login(
    client: &ApiClient,
    credentials: Credentials<'_>,
) -> Result<Session, ApiError> {
    let session = login_root(client, credentials).await?.into_session()?;
    client.save_auth(&session)?;

    log::info!("Logged in as {}", credentials.email);

    Ok(session)
}
