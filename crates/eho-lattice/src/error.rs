use eho_core::CoreError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LatticeError {
    #[error(transparent)]
    InputShape(#[from] CoreError),

    /// The key source refused to supply material for this identity.
    #[error("cannot derive keys for identity {identity:?}: {reason}")]
    IdentityDerivation { identity: String, reason: String },

    #[error("signing failed: {0}")]
    Signing(String),
}

pub type Result<T> = std::result::Result<T, LatticeError>;
