use crate::{ApiClient, ApiError, RequestOptions, User};
use reqwest::Method;
use serde_derive::Serialize;
use std::fmt::{self, Debug, Formatter};

pub const REGISTER_PATH: &str = "/users_root/";

/// The details needed to sign up a new root user.
#[derive(Clone, PartialEq, Serialize)]
pub struct NewRootUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

impl Debug for NewRootUser<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewRootUser")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Create a new root user account. This doesn't log the user in.
pub async fn register_root(
    client: &ApiClient,
    user: &NewRootUser<'_>,
) -> Result<User, ApiError> {
    log::debug!("Registering a new root user, {}", user.email);

    let options = RequestOptions::new().method(Method::POST).json(user)?;

    client.request(REGISTER_PATH, options).await?.into_json()
}
