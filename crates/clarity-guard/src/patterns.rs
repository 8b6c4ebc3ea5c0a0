//! Regex building blocks shared by the checks.

use once_cell::sync::Lazy;
use regex::Regex;

/// Caller identity primitives.
pub const CALLER: &str = r"(?:tx-sender|contract-caller)";

/// An atom or a single-level parenthesized form, e.g. `OWNER` or `(var-get owner)`.
pub const OPERAND: &str = r"(?:\([^()]*\)|[^\s()]+)";

/// Forms that consume a response and stop a failed call from being ignored.
pub const RESULT_HANDLERS: &str =
    r"(?:try!|unwrap!|unwrap-panic|unwrap-err!|unwrap-err-panic|match)";

/// Data-var and map writes.
pub static STATE_WRITE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\((var-set|map-set|map-insert|map-delete)[\s)]").unwrap());

/// Calls that move value or leave the contract.
pub static VALUE_MOVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\((stx-transfer\?|stx-transfer-memo\?|stx-burn\?|n?ft-transfer\?|n?ft-mint\?|n?ft-burn\?|contract-call\?)[\s)]",
    )
    .unwrap()
});

pub static CALLER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"(?:^|[\s(]){CALLER}(?:$|[\s)])")).unwrap());

/// Token-moving calls whose response must be checked: cross-contract
/// `transfer`/`mint`/`burn` and the native fungible/STX operations.
pub static TOKEN_CALL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\((?:contract-call\?\s+[^\s()]+\s+(?P<op>transfer|mint|burn)|(?P<native>ft-transfer|ft-mint|ft-burn|stx-transfer|stx-burn)\?)[\s)]",
    )
    .unwrap()
});

/// `sip-010-trait` import.
pub static TOKEN_TRAIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(use-trait\s+sip-010-trait[\s)]").unwrap());
