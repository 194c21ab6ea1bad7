use thiserror::Error;

#[derive(Debug, Error)]
pub enum PicoError {
    /// Malformed JSON or a schema mismatch on an inbound object.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame that inflated past the configured cap.
    #[error("frame exceeds {max} bytes")]
    FrameTooLarge { max: usize },
}
