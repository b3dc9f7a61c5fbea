//! Error types for fwset.

use std::net::IpAddr;

use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, FwsetError>;

#[derive(Error, Debug)]
pub enum FwsetError {
    /// Malformed address, bad prefix, mixed families or a reversed range.
    #[error("Invalid network spec '{token}': {reason}")]
    InvalidNetworkSpec { token: String, reason: String },

    #[error("Address overflow: {0} has no successor")]
    AddressOverflow(IpAddr),

    #[error("Address underflow: {0} has no predecessor")]
    AddressUnderflow(IpAddr),

    /// The backend has no set with the expected name (usually `create` was not run).
    #[error("Set not found: {0}")]
    SetNotFound(String),

    #[error("Backend failure: {0}")]
    BackendFailure(String),

    #[error("Firewall type not implemented: {0}")]
    NotImplemented(String),
}

impl FwsetError {
    pub(crate) fn invalid(token: &str, reason: impl Into<String>) -> Self {
        Self::InvalidNetworkSpec {
            token: token.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn backend(message: impl Into<String>) -> Self {
        Self::BackendFailure(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_network_spec_message_names_token() {
        let err = FwsetError::invalid("10.0.0.300", "invalid IP address syntax");
        assert_eq!(
            err.to_string(),
            "Invalid network spec '10.0.0.300': invalid IP address syntax"
        );
    }

    #[test]
    fn test_overflow_message() {
        let err = FwsetError::AddressOverflow("255.255.255.255".parse().unwrap());
        assert!(err.to_string().contains("255.255.255.255"));
    }

    #[test]
    fn test_backend_helper() {
        let err = FwsetError::backend("nft failed");
        assert!(matches!(err, FwsetError::BackendFailure(ref m) if m == "nft failed"));
    }
}
