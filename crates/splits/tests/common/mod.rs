//! Shared fixtures: a recording chain gateway plus signing helpers.
#![allow(dead_code)]

use std::sync::Mutex;

use alloy::primitives::{Address, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;

use splits::coordinator::{ChainGateway, OnchainCreate};
use splits::response::TypedDataPayload;
use splits::{ApproveSplit, ChainSettings, Database, SplitsEngine, SplitsError};

pub const CHAIN_ID: u64 = 534352;

pub fn coordinator_address() -> Address {
    Address::new([0x11; 20])
}

pub fn settings() -> ChainSettings {
    ChainSettings::new(CHAIN_ID, coordinator_address())
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedSettle {
    pub split_id: U256,
    pub participants: Vec<Address>,
    pub amounts: Vec<U256>,
    pub deadlines: Vec<U256>,
    pub salts: Vec<B256>,
    pub vs: Vec<u8>,
}

/// In-memory gateway that records calls and answers with canned results.
#[derive(Default)]
pub struct MockGateway {
    pub minted_split_id: Option<U256>,
    pub fail_create: bool,
    pub fail_settle: bool,
    pub allowance: U256,
    pub settle_calls: Mutex<Vec<RecordedSettle>>,
}

impl ChainGateway for MockGateway {
    async fn create_split(
        &self,
        _payer: Address,
        _token: Address,
        _legs: Vec<(Address, U256)>,
        _deadline: U256,
        _meta_hash: B256,
    ) -> Result<OnchainCreate, SplitsError> {
        if self.fail_create {
            return Err(SplitsError::ChainFailed("createSplit reverted".to_string()));
        }
        Ok(OnchainCreate {
            tx_hash: "0xfeedc0de".to_string(),
            split_id: self.minted_split_id,
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn settle_split(
        &self,
        split_id: U256,
        participants: Vec<Address>,
        amounts: Vec<U256>,
        deadlines: Vec<U256>,
        salts: Vec<B256>,
        vs: Vec<u8>,
        _rs: Vec<B256>,
        _ss: Vec<B256>,
    ) -> Result<String, SplitsError> {
        if self.fail_settle {
            return Err(SplitsError::ChainFailed("settleSplit reverted".to_string()));
        }
        self.settle_calls.lock().unwrap().push(RecordedSettle {
            split_id,
            participants,
            amounts,
            deadlines,
            salts,
            vs,
        });
        Ok("0xdeadbeef".to_string())
    }

    async fn erc20_allowance(
        &self,
        _token: Address,
        _owner: Address,
        _spender: Address,
    ) -> Result<U256, SplitsError> {
        Ok(self.allowance)
    }
}

pub fn engine(gateway: MockGateway) -> SplitsEngine<MockGateway> {
    SplitsEngine::new(Database::new(":memory:").unwrap(), gateway, settings())
}

pub fn engine_with_db(gateway: MockGateway) -> (SplitsEngine<MockGateway>, Database) {
    let db = Database::new(":memory:").unwrap();
    (SplitsEngine::new(db.clone(), gateway, settings()), db)
}

/// Rebuild the ApproveSplit message from a typed-data payload and sign its
/// digest, exactly as a wallet implementing eth_signTypedData_v4 would.
pub fn sign_intent(payload: &TypedDataPayload, signer: &PrivateKeySigner) -> String {
    let message = ApproveSplit {
        participant: payload.message.participant.parse().unwrap(),
        splitId: payload.message.split_id.parse().unwrap(),
        token: payload.message.token.parse().unwrap(),
        payer: payload.message.payer.parse().unwrap(),
        amount: payload.message.amount.parse().unwrap(),
        deadline: payload.message.deadline.parse().unwrap(),
        salt: payload.message.salt.parse().unwrap(),
    };
    let digest = splits::eip712::signing_hash(&settings(), &message);
    let sig = signer.sign_hash_sync(&digest).unwrap();
    format!("0x{}", alloy::hex::encode(sig.as_bytes()))
}
