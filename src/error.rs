use thiserror::Error;

/// Failures of the two upstream collaborators of a chat turn.
#[derive(Debug, Error)]
pub enum Error {
    /// The knowledge graph could not be reached, or the query failed or
    /// timed out.
    #[error("knowledge graph unavailable: {0}")]
    GraphUnavailable(String),
    /// The language model request failed, including timeouts, rejected
    /// credentials and rate limits.
    #[error("{0}")]
    ModelCall(String),
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn display() {
        let err = Error::GraphUnavailable("connection refused".to_string());
        assert_eq!(
            err.to_string(),
            "knowledge graph unavailable: connection refused"
        );

        let err = Error::ModelCall("status 429: too many requests".to_string());
        assert_eq!(err.to_string(), "status 429: too many requests");
    }
}
