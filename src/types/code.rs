//! Standard response codes.
//!
//! `0` is success; every other value is an application defined error whose meaning is scoped by the response's
//! `codespace`.

/// Success
pub const OK: u32 = 0;
/// Transaction or query data could not be decoded
pub const ENCODING: u32 = 1;
/// Nonce is out of order
pub const BAD_NONCE: u32 = 2;
/// Sender is not authorized
pub const UNAUTHORIZED: u32 = 3;
/// Sender cannot cover the cost
pub const INSUFFICIENT_FUNDS: u32 = 4;
/// Request (or query path) is not understood
pub const UNKNOWN_REQUEST: u32 = 5;
/// Address is malformed
pub const INVALID_ADDRESS: u32 = 6;
/// Address is unknown
pub const UNKNOWN_ADDRESS: u32 = 7;

/// Returns `true` if `code` means success
pub fn is_ok(code: u32) -> bool {
    code == OK
}

/// Returns `true` if `code` is an error
pub fn is_err(code: u32) -> bool {
    code != OK
}
