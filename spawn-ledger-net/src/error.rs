use thiserror::Error;

/// Errors from the remote protocol layer.
#[derive(Debug, Error)]
pub enum NetError {
    /// Could not resolve or reach the server at all. Kept separate from
    /// other transport failures because the sync layer backs off its
    /// status probe on these.
    #[error("cannot reach server: {0}")]
    HostUnreachable(String),

    /// Any other transport failure (timeout, broken connection, TLS).
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non-success HTTP status.
    #[error("HTTP {0} from server")]
    Http(u16),

    /// The response envelope could not be decoded.
    #[error("malformed response: {0}")]
    Envelope(String),

    /// A lookup the server refused outright (auth failure, server error).
    /// "Not found" is never reported this way — that is an empty result.
    #[error("server rejected the request: {0}")]
    Rejected(crate::status::ProtocolStatus),

    /// Missing or unusable credentials.
    #[error("credentials: {0}")]
    Credentials(String),

    /// I/O while spooling a download to disk.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NetError {
    pub fn envelope(msg: impl Into<String>) -> Self {
        Self::Envelope(msg.into())
    }

    pub fn credentials(msg: impl Into<String>) -> Self {
        Self::Credentials(msg.into())
    }

    /// True for DNS/connect-level failures, the trigger for the status
    /// probe's backoff.
    pub fn is_host_unreachable(&self) -> bool {
        matches!(self, Self::HostUnreachable(_))
    }
}

impl From<reqwest::Error> for NetError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            Self::HostUnreachable(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}
