use alloy::primitives::{keccak256, Address, Signature, B256, U256};
use alloy::sol_types::SolStruct;

use crate::{ApproveSplit, ChainSettings, SplitsError};

/// Build the EIP-712 domain for the configured chain and coordinator.
pub fn approve_split_domain(settings: &ChainSettings) -> alloy::sol_types::Eip712Domain {
    alloy::sol_types::Eip712Domain {
        name: Some(std::borrow::Cow::Owned(settings.eip712_name.clone())),
        version: Some(std::borrow::Cow::Owned(settings.eip712_version.clone())),
        chain_id: Some(U256::from(settings.chain_id)),
        verifying_contract: Some(settings.coordinator),
        salt: None,
    }
}

/// Compute the EIP-712 signing digest for an ApproveSplit message
/// (domain separator and struct hash under the 0x1901 prefix).
pub fn signing_hash(settings: &ChainSettings, message: &ApproveSplit) -> B256 {
    message.eip712_signing_hash(&approve_split_domain(settings))
}

/// Recover the signer address from a digest and a 65-byte r||s||v signature.
pub fn recover_signer(digest: &B256, signature_bytes: &[u8]) -> Result<Address, SplitsError> {
    if signature_bytes.len() != 65 {
        return Err(SplitsError::InvalidInput(format!(
            "signature must be 65 bytes, got {}",
            signature_bytes.len()
        )));
    }
    let sig = Signature::from_raw(signature_bytes)
        .map_err(|e| SplitsError::InvalidInput(format!("invalid signature: {e}")))?;
    sig.recover_address_from_prehash(digest)
        .map_err(|e| SplitsError::InvalidInput(format!("recovery failed: {e}")))
}

/// Verify a signature over an ApproveSplit message and return the signer.
pub fn verify(
    settings: &ChainSettings,
    message: &ApproveSplit,
    signature_bytes: &[u8],
) -> Result<Address, SplitsError> {
    let digest = signing_hash(settings, message);
    recover_signer(&digest, signature_bytes)
}

/// Generate a random 32-byte salt (keccak256 of 32 random bytes).
pub fn random_salt() -> B256 {
    let mut bytes = [0u8; 32];
    rand::fill(&mut bytes);
    keccak256(bytes)
}
