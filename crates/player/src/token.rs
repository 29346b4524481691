//! Stored OAuth tokens.
//!
//! The token file is JSON: `{"access_token", "refresh_token", "expires_at"}`
//! with `expires_at` in Unix seconds. Obtaining the first token pair is done
//! outside this program; here they are only read, refreshed and written back.

use std::{
    fs,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

/// Access and refresh tokens with the access token's expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tokens {
    /// Bearer token for API calls.
    pub access_token: String,
    /// Long-lived token used to obtain new access tokens.
    pub refresh_token: String,
    /// Unix time (seconds) after which `access_token` is stale.
    pub expires_at: u64,
}

/// Tokens plus where they live on disk.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: Option<PathBuf>,
    tokens: Tokens,
}

impl TokenStore {
    /// Read tokens from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            Error::Token(format!(
                "cannot read token file {}: {e}. Authenticate once and save the tokens there",
                path.display()
            ))
        })?;
        let tokens: Tokens = serde_json::from_str(&text)?;
        debug!(path = %path.display(), expires_at = tokens.expires_at, "tokens_loaded");
        Ok(Self {
            path: Some(path.to_path_buf()),
            tokens,
        })
    }

    /// A store that never touches disk.
    pub fn in_memory(tokens: Tokens) -> Self {
        Self { path: None, tokens }
    }

    /// Current tokens.
    pub fn tokens(&self) -> &Tokens {
        &self.tokens
    }

    /// True if the access token is stale at `now` (Unix seconds).
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.tokens.expires_at
    }

    /// Install a refreshed access token and persist the store.
    ///
    /// The refresh token is kept unless the server rotated it.
    pub fn update(
        &mut self,
        access_token: String,
        refresh_token: Option<String>,
        expires_in: u64,
        obtained_at: u64,
    ) -> Result<()> {
        self.tokens.access_token = access_token;
        if let Some(r) = refresh_token {
            self.tokens.refresh_token = r;
        }
        self.tokens.expires_at = obtained_at.saturating_add(expires_in);
        self.save()
    }

    fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let text = serde_json::to_string_pretty(&self.tokens)?;
        fs::write(path, text)?;
        debug!(path = %path.display(), "tokens_saved");
        Ok(())
    }
}

/// Seconds since the Unix epoch.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
