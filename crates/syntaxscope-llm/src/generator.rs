//! The text-generation seam used by the augmentor.

/// Failure of one generation or probe call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerateError {
    #[error("failed to reach {endpoint}: {message}")]
    Transport { endpoint: String, message: String },
    #[error("request to {endpoint} timed out")]
    Timeout { endpoint: String },
    #[error("http error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid response: {0}")]
    Decode(String),
}

impl GenerateError {
    /// Whether another attempt may succeed. A response that arrived but could
    /// not be decoded will not improve on retry.
    pub fn is_transient(&self) -> bool {
        !matches!(self, GenerateError::Decode(_))
    }
}

/// A blocking prompt → text service.
pub trait TextGenerator {
    fn generate(&self, prompt: &str) -> Result<String, GenerateError>;

    /// Cheap liveness check, called once before a batch.
    fn probe(&self) -> Result<(), GenerateError>;

    /// Human-readable backend description for logs.
    fn describe(&self) -> String;
}

impl<T: TextGenerator + ?Sized> TextGenerator for &T {
    fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        (**self).generate(prompt)
    }

    fn probe(&self) -> Result<(), GenerateError> {
        (**self).probe()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_decode_errors_are_permanent() {
        assert!(GenerateError::Timeout {
            endpoint: "x".into()
        }
        .is_transient());
        assert!(GenerateError::Status {
            status: 503,
            body: String::new()
        }
        .is_transient());
        assert!(!GenerateError::Decode("eof".into()).is_transient());
    }
}
