//! Error taxonomy for the fleet provider boundary.

use thiserror::Error;

/// Result type alias for fleet client operations.
pub type FleetResult<T> = Result<T, FleetError>;

/// Errors surfaced by a fleet provider client.
#[derive(Debug, Clone, Error)]
pub enum FleetError {
    #[error("cannot reach fleet API: {0}")]
    Connection(String),

    #[error("fleet API request timed out: {0}")]
    Timeout(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("fleet API error: {0}")]
    Api(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl FleetError {
    /// API error built from the provider's structured error messages.
    pub fn api_messages<S: AsRef<str>>(messages: &[S]) -> Self {
        let joined = messages
            .iter()
            .map(|m| m.as_ref())
            .collect::<Vec<_>>()
            .join("; ");
        FleetError::Api(joined)
    }

    /// Whether this is the provider's capacity-exhaustion response
    /// ("there are no longer any instances available with the requested
    /// specifications").
    pub fn is_capacity_exhausted(&self) -> bool {
        self.to_string()
            .to_lowercase()
            .contains("no longer any instances available")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_exhaustion_matches_case_insensitively() {
        let err = FleetError::Api(
            "There are no longer any instances available with the requested specifications"
                .to_string(),
        );
        assert!(err.is_capacity_exhausted());

        let upper = FleetError::Api("NO LONGER ANY INSTANCES AVAILABLE".to_string());
        assert!(upper.is_capacity_exhausted());

        let other = FleetError::Api("insufficient balance".to_string());
        assert!(!other.is_capacity_exhausted());

        let timeout = FleetError::Timeout("30s elapsed".to_string());
        assert!(!timeout.is_capacity_exhausted());
    }

    #[test]
    fn api_messages_join_with_semicolons() {
        let err = FleetError::api_messages(&["first failure", "second failure"]);
        assert_eq!(
            err.to_string(),
            "fleet API error: first failure; second failure"
        );
    }
}
