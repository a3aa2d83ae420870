use uuid::Uuid;

/// Everything the operator workflow can fail with.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// No credential in the session; nothing was sent.
    #[error("not signed in: no session token")]
    AuthMissing,

    /// Transport failure (connect, timeout, undecodable body).
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-2xx status and `{message}`.
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    /// The alarm output refused to play.
    #[error("sound playback blocked ({reason}). Please retry enabling sound")]
    PlaybackBlocked { reason: String },

    #[error("sound is not enabled")]
    SoundDisabled,

    /// Status control is locked until the order is paid.
    #[error("order {0} is not paid; its status cannot be changed")]
    NotPaid(Uuid),

    #[error("order {0} is not on the board")]
    UnknownOrder(Uuid),

    #[error("session file: {0}")]
    SessionIo(#[from] std::io::Error),

    #[error("session file is not valid JSON: {0}")]
    SessionFormat(#[from] serde_json::Error),
}

impl WatchError {
    pub fn playback_blocked(reason: impl Into<String>) -> Self {
        WatchError::PlaybackBlocked {
            reason: reason.into(),
        }
    }

    /// The credential is missing or the server no longer accepts it.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            WatchError::AuthMissing | WatchError::Server { status: 401, .. }
        )
    }
}

impl From<reqwest::Error> for WatchError {
    fn from(err: reqwest::Error) -> Self {
        WatchError::Network(err.to_string())
    }
}

pub type WatchResult<T> = Result<T, WatchError>;
