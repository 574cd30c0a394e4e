//! Access-token loading for the chat connection.
//!
//! The token is produced out-of-band by an OAuth flow and stored as a single
//! line in a file. Twitch expects it with an `oauth:` scheme prefix on the
//! PASS line; the stored value may or may not already carry it.

use std::path::Path;

use tracing::debug;

use crate::error::{ChatvoxError, Result};

const TOKEN_SCHEME: &str = "oauth:";

/// Load the access token from `path`, prepending `oauth:` if absent.
///
/// A missing, unreadable, or empty token file is a fatal startup condition —
/// there is nothing to retry.
pub fn load_access_token(path: &Path) -> Result<String> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        ChatvoxError::Credential(format!("token file {}: {e}", path.display()))
    })?;

    let token = raw.trim();
    if token.is_empty() {
        return Err(ChatvoxError::Credential(format!(
            "token file {} is empty",
            path.display()
        )));
    }

    if token.starts_with(TOKEN_SCHEME) {
        debug!("loaded access token (already prefixed)");
        Ok(token.to_string())
    } else {
        debug!("loaded access token, adding {TOKEN_SCHEME} prefix");
        Ok(format!("{TOKEN_SCHEME}{token}"))
    }
}
