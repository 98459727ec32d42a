use erpmod_core::StoreKey;

/// Store-level failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("store not found: {0}")]
    NotFound(StoreKey),
    #[error("action `{action}` is not defined for store `{store}`")]
    UnknownAction { store: StoreKey, action: String },
}
