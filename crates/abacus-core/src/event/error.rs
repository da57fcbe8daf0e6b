//! # Abacus Event System Errors
//!
//! Errors raised while delivering config change notifications. A failing
//! watcher is reported here and never prevents delivery to the others.
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventSystemError {
    #[error("Watcher {watcher_id} for plugin '{plugin_id}' failed: {message}")]
    WatcherFailed {
        plugin_id: String,
        watcher_id: u64,
        message: String,
    },

    #[error("Subscriber lagged behind and skipped {0} event(s)")]
    Lagged(u64),

    #[error("Internal event system error: {0}")]
    InternalError(String),
}

impl From<tokio_stream::wrappers::errors::BroadcastStreamRecvError> for EventSystemError {
    fn from(err: tokio_stream::wrappers::errors::BroadcastStreamRecvError) -> Self {
        match err {
            tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(skipped) => {
                EventSystemError::Lagged(skipped)
            }
        }
    }
}
