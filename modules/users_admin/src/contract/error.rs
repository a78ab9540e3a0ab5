use thiserror::Error;

/// Failures reported by a remote user directory.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Remote returned HTTP {status}")]
    Status { status: u16 },

    #[error("Invalid payload: {message}")]
    Decode { message: String },
}

impl RemoteError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self::Status { status }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            Self::status(status.as_u16())
        } else if e.is_decode() {
            Self::decode(e.to_string())
        } else {
            Self::transport(e.to_string())
        }
    }
}
