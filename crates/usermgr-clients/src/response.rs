//! Typed response bodies for the sibling-daemon wire contracts.

use serde::Deserialize;

/// Response from the home-directory daemon's create/delete endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct HomedirResponse {
    /// Machine-readable status: `ok`, `in_progress`, `again`,
    /// `user_not_found`, `homedir_exists`, `copy_skeleton_failed`,
    /// `token_invalid`, `token_expired`, or `user_exists`.
    pub status: String,
    /// Present only on the first `DELETE /user/<name>` call (`again`).
    #[serde(default)]
    pub token: Option<String>,
}

impl HomedirResponse {
    /// Whether `status` is `"ok"`.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Response from the cache-flush daemon.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheFlushResponse {
    /// `ok`, `sss_failed`, or `nscd_failed`.
    pub status: String,
    /// The failing subprocess's exit code, present on failure.
    #[serde(default)]
    pub code: Option<i32>,
}

impl CacheFlushResponse {
    /// Whether `status` is `"ok"`.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_homedir_again_with_token() {
        let body: HomedirResponse =
            serde_json::from_str(r#"{"status":"again","token":"abc123"}"#).unwrap();
        assert_eq!(body.token.as_deref(), Some("abc123"));
        assert!(!body.is_ok());
    }

    #[test]
    fn parses_cacheflush_ok() {
        let body: CacheFlushResponse = serde_json::from_str(r#"{"status":"ok"}"#).unwrap();
        assert!(body.is_ok());
        assert_eq!(body.code, None);
    }
}
