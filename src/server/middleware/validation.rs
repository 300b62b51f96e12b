use crate::server::message::ClientMessage;
use crate::server::session::LoginError;

/// Longest accepted username, in bytes.
pub const MAX_USERNAME_LEN: usize = 32;

/// Validates a client request before it is dispatched.
///
/// # Returns
///
/// * `Ok(())` if the request may be handled.
/// * `Err(LoginError::InvalidUsername)` if a login name is blank or longer than
///   [`MAX_USERNAME_LEN`] bytes.
pub fn validate_request(msg: &ClientMessage) -> Result<(), LoginError> {
    match msg {
        ClientMessage::Login { username }
            if username.trim().is_empty() || username.len() > MAX_USERNAME_LEN =>
        {
            Err(LoginError::InvalidUsername)
        }
        _ => Ok(()),
    }
}
