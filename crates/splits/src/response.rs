//! Wire-format views of persisted state. Integers go out as decimal
//! strings, addresses EIP-55 checksummed, hashes and salts 0x-hex,
//! timestamps RFC-3339.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::db::{ParticipantRow, SignatureRow, SplitRow, TokenRow};
use crate::{ApproveSplit, ChainSettings};

fn iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
        .unwrap_or_default()
}

fn iso_opt(ts: Option<i64>) -> Option<String> {
    ts.map(iso)
}

fn hex_bytes(bytes: &[u8]) -> String {
    format!("0x{}", alloy::hex::encode(bytes))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSplitResponse {
    pub id: i64,
    /// Null when the split was created off-chain only.
    pub tx_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleResponse {
    pub tx_hash: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowanceView {
    pub token: String,
    pub owner: String,
    pub spender: String,
    pub allowance: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenView {
    pub chain_id: u64,
    pub address: String,
    pub symbol: String,
    pub name: String,
    pub decimals: u32,
}

impl TokenView {
    pub fn from_row(row: TokenRow) -> Self {
        Self {
            chain_id: row.chain_id,
            address: row.address,
            symbol: row.symbol,
            name: row.name,
            decimals: row.decimals,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantView {
    pub id: i64,
    pub participant: String,
    pub amount: String,
    pub approved_offchain_at: Option<String>,
    pub used_onchain_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureView {
    pub id: i64,
    pub participant: String,
    pub amount: String,
    pub deadline: Option<String>,
    pub salt: String,
    /// Null until a valid signature has been recorded.
    pub signature: Option<String>,
    pub status: String,
    pub reason: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl SignatureView {
    pub fn from_row(row: &SignatureRow) -> Self {
        Self {
            id: row.id,
            participant: row.participant.clone(),
            amount: row.amount.clone(),
            deadline: iso_opt(row.deadline),
            salt: hex_bytes(&row.salt),
            signature: if row.signature.is_empty() {
                None
            } else {
                Some(hex_bytes(&row.signature))
            },
            status: row.status.as_str().to_string(),
            reason: row.reason.clone(),
            created_at: iso(row.created_at),
            updated_at: iso(row.updated_at),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitView {
    pub id: i64,
    pub chain_id: u64,
    pub contract: String,
    pub split_id_onchain: Option<String>,
    pub payer: String,
    pub token: String,
    pub total_amount: String,
    pub deadline: Option<String>,
    pub meta_hash: Option<String>,
    pub settled: bool,
    pub created_at: String,
    pub updated_at: String,
    pub participants: Vec<ParticipantView>,
    pub signatures: Vec<SignatureView>,
}

impl SplitView {
    pub fn from_rows(
        split: &SplitRow,
        participants: &[ParticipantRow],
        signatures: &[SignatureRow],
    ) -> Self {
        Self {
            id: split.id,
            chain_id: split.chain_id,
            contract: split.contract.clone(),
            split_id_onchain: split.split_id_onchain.clone(),
            payer: split.payer.clone(),
            token: split.token.clone(),
            total_amount: split.total_amount.clone(),
            deadline: iso_opt(split.deadline),
            meta_hash: split.meta_hash.as_deref().map(hex_bytes),
            settled: split.settled,
            created_at: iso(split.created_at),
            updated_at: iso(split.updated_at),
            participants: participants
                .iter()
                .map(|p| ParticipantView {
                    id: p.id,
                    participant: p.participant.clone(),
                    amount: p.amount.clone(),
                    approved_offchain_at: iso_opt(p.approved_offchain_at),
                    used_onchain_at: iso_opt(p.used_onchain_at),
                })
                .collect(),
            signatures: signatures.iter().map(SignatureView::from_row).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TypedDataField {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub ty: &'static str,
}

fn field(name: &'static str, ty: &'static str) -> TypedDataField {
    TypedDataField { name, ty }
}

/// EIP-712 message view with every integer as a decimal string, ready for
/// `eth_signTypedData_v4` on the client side.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveSplitMessage {
    pub participant: String,
    pub split_id: String,
    pub token: String,
    pub payer: String,
    pub amount: String,
    pub deadline: String,
    pub salt: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainView {
    pub name: String,
    pub version: String,
    pub chain_id: String,
    pub verifying_contract: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedDataPayload {
    pub domain: DomainView,
    pub types: BTreeMap<&'static str, Vec<TypedDataField>>,
    pub primary_type: &'static str,
    pub message: ApproveSplitMessage,
}

impl TypedDataPayload {
    pub fn new(settings: &ChainSettings, message: &ApproveSplit) -> Self {
        let mut types = BTreeMap::new();
        types.insert(
            "EIP712Domain",
            vec![
                field("name", "string"),
                field("version", "string"),
                field("chainId", "uint256"),
                field("verifyingContract", "address"),
            ],
        );
        types.insert(
            "ApproveSplit",
            vec![
                field("participant", "address"),
                field("splitId", "uint256"),
                field("token", "address"),
                field("payer", "address"),
                field("amount", "uint256"),
                field("deadline", "uint256"),
                field("salt", "bytes32"),
            ],
        );

        Self {
            domain: DomainView {
                name: settings.eip712_name.clone(),
                version: settings.eip712_version.clone(),
                chain_id: settings.chain_id.to_string(),
                verifying_contract: format!("{}", settings.coordinator),
            },
            types,
            primary_type: "ApproveSplit",
            message: ApproveSplitMessage {
                participant: format!("{}", message.participant),
                split_id: format!("{}", message.splitId),
                token: format!("{}", message.token),
                payer: format!("{}", message.payer),
                amount: format!("{}", message.amount),
                deadline: format!("{}", message.deadline),
                salt: format!("{}", message.salt),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, B256, U256};

    #[test]
    fn test_typed_data_payload_shape() {
        let settings = ChainSettings::new(534352, Address::new([0x11; 20]));
        let message = ApproveSplit {
            participant: Address::new([0xcc; 20]),
            splitId: U256::from(9u64),
            token: Address::new([0xbb; 20]),
            payer: Address::new([0xaa; 20]),
            amount: U256::from(12_500_000u64),
            deadline: U256::ZERO,
            salt: B256::new([0x42; 32]),
        };

        let payload = TypedDataPayload::new(&settings, &message);
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["primaryType"], "ApproveSplit");
        assert_eq!(json["domain"]["name"], "Accountant");
        assert_eq!(json["domain"]["chainId"], "534352");
        assert_eq!(json["message"]["splitId"], "9");
        assert_eq!(json["message"]["amount"], "12500000");
        assert_eq!(json["message"]["deadline"], "0");
        assert_eq!(
            json["message"]["salt"],
            format!("0x{}", alloy::hex::encode([0x42; 32]))
        );
        assert_eq!(json["types"]["ApproveSplit"][1]["name"], "splitId");
        assert_eq!(json["types"]["EIP712Domain"][3]["type"], "address");
    }

    #[test]
    fn test_iso_rendering() {
        assert_eq!(iso(0), "1970-01-01T00:00:00Z");
        assert_eq!(iso_opt(None), None);
    }
}
