//! Counters collected while the checks walk a contract.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractMetrics {
    /// `define-public` forms found
    pub public_functions: usize,
    /// public functions with state writes or value-moving calls
    pub sensitive_functions: usize,
    /// public functions accepted by at least one guard recognizer
    pub guarded_functions: usize,
    pub missing_authorization: usize,
    pub weak_authorization: usize,
    /// token-moving calls seen, wrapped or not
    pub token_calls: usize,
    pub unchecked_calls: usize,
    pub bound_unchecked_calls: usize,
    /// unchecked calls followed by a state write in the same function
    pub escalated_calls: usize,
    pub has_token_trait: bool,
}

impl ContractMetrics {
    pub fn new() -> Self {
        Self::default()
    }
}
