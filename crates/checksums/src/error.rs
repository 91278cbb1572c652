use thiserror::Error;

/// Error returned when an algorithm name does not match any built-in algorithm.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("unknown {kind} checksum algorithm '{name}'")]
pub struct UnknownAlgorithmError {
    kind: &'static str,
    name: String,
}

impl UnknownAlgorithmError {
    pub(crate) fn weak(name: &str) -> Self {
        Self {
            kind: "weak",
            name: name.to_owned(),
        }
    }

    pub(crate) fn strong(name: &str) -> Self {
        Self {
            kind: "strong",
            name: name.to_owned(),
        }
    }

    /// Returns the name that failed to parse.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}
