//! Edge validation of wire formats. The engine re-checks semantics; these
//! guards reject malformed shapes before any state is touched.

use crate::error::ApiError;

fn is_hex(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// 0x-prefixed 20-byte hex (checksum verification happens in the engine).
pub fn require_address(label: &str, value: &str) -> Result<(), ApiError> {
    let body = value.strip_prefix("0x").unwrap_or("");
    if body.len() == 40 && is_hex(body) {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!(
            "{label} must be a 0x-prefixed 20-byte hex address"
        )))
    }
}

/// Decimal string of digits, no sign, no prefix.
pub fn require_decimal(label: &str, value: &str) -> Result<(), ApiError> {
    if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!(
            "{label} must be a decimal string"
        )))
    }
}

/// 0x-prefixed hex of exactly `len` bytes.
pub fn require_hex_bytes(label: &str, value: &str, len: usize) -> Result<(), ApiError> {
    let body = value.strip_prefix("0x").unwrap_or("");
    if body.len() == len * 2 && is_hex(body) {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!(
            "{label} must be 0x-prefixed {len}-byte hex"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_address() {
        assert!(require_address("payer", "0xAAAAaAaaaAAAAaaAAaaaaAAaAaaaAaaaaaaaAaA0").is_ok());
        assert!(require_address("payer", "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa").is_ok());
        assert!(require_address("payer", "0x1234").is_err());
        assert!(require_address("payer", "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa").is_err());
        assert!(require_address("payer", "0xzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz").is_err());
    }

    #[test]
    fn test_require_decimal() {
        assert!(require_decimal("amount", "12500000").is_ok());
        assert!(require_decimal("amount", "0").is_ok());
        assert!(require_decimal("amount", "-1").is_err());
        assert!(require_decimal("amount", "0x10").is_err());
        assert!(require_decimal("amount", "").is_err());
    }

    #[test]
    fn test_require_hex_bytes() {
        let salt = format!("0x{}", "ab".repeat(32));
        assert!(require_hex_bytes("salt", &salt, 32).is_ok());
        assert!(require_hex_bytes("salt", &salt, 65).is_err());
        let sig = format!("0x{}", "cd".repeat(65));
        assert!(require_hex_bytes("signature", &sig, 65).is_ok());
        assert!(require_hex_bytes("salt", "0xab", 32).is_err());
        assert!(require_hex_bytes("salt", "ab", 1).is_err());
    }
}
