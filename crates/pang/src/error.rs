use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Photo does not fit in {budget} bytes (smallest encoding was {smallest} bytes)")]
    PayloadTooLarge { budget: usize, smallest: usize },

    #[error("Photo cooldown active, try again in {remaining_seconds}s")]
    CooldownActive { remaining_seconds: u64 },

    #[error("Remote write failed: {0}")]
    RemoteWriteFailed(String),

    #[error("Receiving surface is not available")]
    TransportDropped,

    #[error("Message text is empty")]
    EmptyText,

    #[error("Message text is {len} characters, limit is {max}")]
    TextTooLong { len: usize, max: usize },

    #[error("{count} emojis selected, limit is {max}")]
    TooManyEmojis { count: usize, max: usize },

    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// How an error is presented to the person at the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    /// Inline message that clears itself; the attempt is discarded.
    Transient,
    /// Inline message with a retry gesture.
    Retry,
    /// Logged only.
    Silent,
}

impl Error {
    pub fn feedback(&self) -> Feedback {
        match self {
            Error::PayloadTooLarge { .. }
            | Error::CooldownActive { .. }
            | Error::EmptyText
            | Error::TextTooLong { .. }
            | Error::TooManyEmojis { .. }
            | Error::Image(_) => Feedback::Transient,
            Error::RemoteWriteFailed(_) | Error::Storage(_) | Error::Io(_) => Feedback::Retry,
            Error::TransportDropped | Error::MalformedEvent(_) | Error::Json(_) => {
                Feedback::Silent
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
