pub type StripIndexResult<T> = Result<T, StripIndexError>;

#[derive(thiserror::Error, Debug)]
pub enum StripIndexError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("edit error: {0}")]
    Edit(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StripIndexError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn edit(msg: impl Into<String>) -> Self {
        Self::Edit(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            StripIndexError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(StripIndexError::edit("x").to_string().contains("edit error:"));
        assert!(
            StripIndexError::serde("x")
                .to_string()
                .contains("serialization error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = StripIndexError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
