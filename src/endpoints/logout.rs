use crate::{ApiClient, StoreError};

/// Forget the current session.
///
/// The backend has no notion of logging out, so this is purely local.
/// Requests already in flight may still complete with the old token.
pub fn logout(client: &ApiClient) -> Result<(), StoreError> {
    match client.stored_user() {
        Some(user) => log::info!("Logging out user {}", user.id),
        None => log::debug!("Logging out without a stored user"),
    }

    client.clear_auth()
}
