use alloy::primitives::Address;

/// Default EIP-712 domain name for ApproveSplit intents.
pub const DEFAULT_DOMAIN_NAME: &str = "Accountant";

/// Default EIP-712 domain version.
pub const DEFAULT_DOMAIN_VERSION: &str = "1";

/// Runtime chain configuration. Decouples the engine from compile-time
/// constants so one binary can serve any chain/coordinator pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainSettings {
    pub chain_id: u64,
    /// Address of the split coordinator contract. Also the EIP-712
    /// verifying contract and the ERC-20 spender participants approve.
    pub coordinator: Address,
    pub eip712_name: String,
    pub eip712_version: String,
}

impl ChainSettings {
    pub fn new(chain_id: u64, coordinator: Address) -> Self {
        Self {
            chain_id,
            coordinator,
            eip712_name: DEFAULT_DOMAIN_NAME.to_string(),
            eip712_version: DEFAULT_DOMAIN_VERSION.to_string(),
        }
    }

    pub fn with_domain(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.eip712_name = name.into();
        self.eip712_version = version.into();
        self
    }
}
