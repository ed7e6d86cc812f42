//! Access token loading.
//!
//! Obtaining and refreshing OAuth credentials happens outside this tool. We only
//! read an already issued bearer token, either from the environment or from the
//! token file written by an installed-app OAuth flow.

use serde::Deserialize;
use std::path::Path;

use crate::{DriveScribeError, Result};

/// Environment variable holding a raw bearer token
pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

#[derive(Debug, Deserialize)]
struct TokenFile {
    token: Option<String>,
    access_token: Option<String>,
}

/// Load a bearer token from `$GOOGLE_OAUTH_ACCESS_TOKEN` or the token file
pub fn load_access_token(token_path: &Path) -> Result<String> {
    if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
        let token = token.trim();
        if !token.is_empty() {
            tracing::debug!("using access token from {}", ACCESS_TOKEN_ENV);
            return Ok(token.to_string());
        }
    }

    read_token_file(token_path)
}

fn read_token_file(token_path: &Path) -> Result<String> {
    if !token_path.exists() {
        return Err(DriveScribeError::Auth(format!(
            "token file not found: {}. Set {} or point --token at an OAuth token file",
            token_path.display(),
            ACCESS_TOKEN_ENV
        )));
    }

    let content = fs_err::read_to_string(token_path)?;
    let parsed: TokenFile = serde_json::from_str(&content).map_err(|e| {
        DriveScribeError::Auth(format!("invalid token file {}: {}", token_path.display(), e))
    })?;

    parsed
        .token
        .or(parsed.access_token)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            DriveScribeError::Auth(format!(
                "token file {} has no access token",
                token_path.display()
            ))
        })
}
