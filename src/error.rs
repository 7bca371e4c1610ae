use crate::schema::ValidationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MidiSpecError {
    /// The input text is not JSON at all.
    #[error("JSON parse error: {0}")]
    Parse(#[source] serde_json::Error),

    /// The input is JSON but does not match the document schema.
    #[error("validation failed at {0}")]
    Validation(#[from] ValidationError),

    /// A sliced tree could not be turned into typed values.
    #[error("failed to decode validated document: {0}")]
    Decode(#[source] serde_json::Error),
}

impl MidiSpecError {
    /// The validation failure, if that is what this error is.
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            MidiSpecError::Validation(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn only_schema_failures_carry_a_path() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(MidiSpecError::Parse(parse).validation().is_none());

        let err: MidiSpecError = ValidationError::new(&[], "object", None).into();
        assert_eq!(err.validation().unwrap().found, "nothing");
        assert_eq!(err.to_string(), "validation failed at <root>: expected object, found nothing");
    }
}
