use thiserror::Error;

/// Every failure the controller session and the SSID routines can report.
///
/// `main` wraps these in `anyhow` context; nothing below the CLI decides
/// how an error is displayed or which exit code it maps to.
#[derive(Debug, Error)]
pub enum OmadaError {
    /// Connection refused, TLS handshake failure, timeout, unreadable body.
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid controller URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Login rejected or the controller handed back no token.
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("site '{0}' is not visible to this account")]
    SiteNotFound(String),

    /// A call was made before `login` or after `logout`.
    #[error("no active controller session")]
    NoSession,

    #[error("SSID '{name}' not found{}", skipped_note(.skipped))]
    NotFound { name: String, skipped: usize },

    /// A response (or one entry of it) lacked the fields the walk relies on.
    #[error("malformed controller response: {0}")]
    Malformed(String),

    /// HTTP error status or a non-zero `errorCode` in the response envelope.
    #[error("controller rejected {operation} (HTTP {status}, errorCode {code}): {message}")]
    Rejected {
        operation: String,
        status: u16,
        code: i64,
        message: String,
    },
}

fn skipped_note(skipped: &usize) -> String {
    match skipped {
        0 => String::new(),
        1 => " (1 unreadable entry skipped, rerun with --debug)".to_string(),
        n => format!(" ({n} unreadable entries skipped, rerun with --debug)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_mentions_skipped_entries_only_when_present() {
        let plain = OmadaError::NotFound {
            name: "Ghost".into(),
            skipped: 0,
        };
        assert_eq!(plain.to_string(), "SSID 'Ghost' not found");

        let partial = OmadaError::NotFound {
            name: "Ghost".into(),
            skipped: 2,
        };
        assert!(partial.to_string().contains("2 unreadable entries skipped"));
    }
}
