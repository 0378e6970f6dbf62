// Shared error taxonomy for the protocol core.
//
// Every subsystem keeps its own error enum (ledger, conditional, market,
// oracle, governor, treasury) but all of them classify into one of four
// kinds, which is what the HTTP layer and callers branch on.

use serde::{Deserialize, Serialize};

/// Classification of a core error.
///
/// - `Validation`: malformed input or a precondition not met
/// - `Authorization`: caller lacks a required capability or role
/// - `Economic`: bond/amount mismatch or insufficient funds
/// - `Duplicate`: the operation already happened (report, finalize, execute)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Validation,
    Authorization,
    Economic,
    Duplicate,
}

impl ErrorKind {
    /// HTTP status code the API layer maps this kind to.
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::Authorization => 403,
            ErrorKind::Economic => 402,
            ErrorKind::Duplicate => 409,
        }
    }
}
