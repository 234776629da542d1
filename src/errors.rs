//! Typed error hierarchy for the live preview.
//!
//! Two enums cover the two failure domains:
//! - `PreviewError`: render session, inbound requests and configuration
//! - `ChannelError`: the push connection to the coordinator
//!
//! Channel errors never reach callers of the preview; the channel logs them
//! and reconnects. They are typed so transports and tests can match on them.

use thiserror::Error;

use crate::preview::models::Generation;

/// Errors from the render session and its HTTP surface.
#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("Render host has stopped")]
    HostStopped,

    #[error("Generation {generation} is not being served")]
    UnknownGeneration { generation: Generation },

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Failed to read payload at {path}: {source}")]
    PayloadReadFailed {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration in {path}: {message}")]
    InvalidConfig {
        path: std::path::PathBuf,
        message: String,
    },
}

/// Errors from the push connection to the coordinator.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Failed to connect to {url}: {message}")]
    Connect { url: String, message: String },

    #[error("Connection attempt timed out after {0:?}")]
    ConnectTimeout(std::time::Duration),

    #[error("Failed to send to coordinator: {0}")]
    Send(String),

    #[error("Connection error: {0}")]
    Transport(String),

    #[error("Malformed coordinator message: {0}")]
    Protocol(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_error_unknown_generation_carries_token() {
        let err = PreviewError::UnknownGeneration {
            generation: Generation(12),
        };
        match &err {
            PreviewError::UnknownGeneration { generation } => {
                assert_eq!(*generation, Generation(12))
            }
            _ => panic!("Expected UnknownGeneration"),
        }
        assert!(err.to_string().contains("12"));
    }

    #[test]
    fn preview_error_payload_read_failed_carries_path() {
        use std::path::PathBuf;
        let path = PathBuf::from("/tmp/payload.json");
        let err = PreviewError::PayloadReadFailed {
            path: path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        match &err {
            PreviewError::PayloadReadFailed { path: p, source } => {
                assert_eq!(p, &path);
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            _ => panic!("Expected PayloadReadFailed"),
        }
    }

    #[test]
    fn channel_error_connect_mentions_url() {
        let err = ChannelError::Connect {
            url: "ws://localhost:4000/ws".into(),
            message: "refused".into(),
        };
        assert!(err.to_string().contains("ws://localhost:4000/ws"));
        assert!(err.to_string().contains("refused"));
    }

    #[test]
    fn channel_error_connect_timeout_mentions_duration() {
        let err = ChannelError::ConnectTimeout(std::time::Duration::from_secs(10));
        assert!(err.to_string().contains("10s"));
    }

    #[test]
    fn channel_error_converts_from_serde() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{nope");
        let err: ChannelError = parse.unwrap_err().into();
        assert!(matches!(err, ChannelError::Protocol(_)));
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&PreviewError::HostStopped);
        assert_std_error(&ChannelError::Send("closed".into()));
    }
}
