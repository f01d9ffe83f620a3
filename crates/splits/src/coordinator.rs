use alloy::network::EthereumWallet;
use alloy::primitives::{Address, B256, U256};
use alloy::providers::{
    fillers::{
        BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller, WalletFiller,
    },
    Identity, ProviderBuilder, RootProvider,
};
use alloy::rpc::types::Log;
use alloy::signers::local::PrivateKeySigner;

use crate::{IERC20, SplitCoordinator, SplitsError};

/// Concrete provider type from `ProviderBuilder::new().wallet(...).connect_http(...)`.
pub type WalletProvider = FillProvider<
    JoinFill<
        JoinFill<
            Identity,
            JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
        >,
        WalletFiller<EthereumWallet>,
    >,
    RootProvider,
>;

/// Outcome of an on-chain createSplit call: the transaction hash plus the
/// minted split id when the SplitCreated event was decodable from the receipt.
#[derive(Debug, Clone)]
pub struct OnchainCreate {
    pub tx_hash: String,
    pub split_id: Option<U256>,
}

/// Chain capability the engine is constructed with. The production
/// implementation talks JSON-RPC; tests substitute a recording mock.
pub trait ChainGateway: Send + Sync {
    /// Submit createSplit and wait for the receipt. The gateway decodes the
    /// SplitCreated event itself so callers never touch raw logs.
    fn create_split(
        &self,
        payer: Address,
        token: Address,
        legs: Vec<(Address, U256)>,
        deadline: U256,
        meta_hash: B256,
    ) -> impl std::future::Future<Output = Result<OnchainCreate, SplitsError>> + Send;

    /// Submit settleSplit with parallel per-leg arrays and wait for the
    /// receipt. Returns the transaction hash.
    fn settle_split(
        &self,
        split_id: U256,
        participants: Vec<Address>,
        amounts: Vec<U256>,
        deadlines: Vec<U256>,
        salts: Vec<B256>,
        vs: Vec<u8>,
        rs: Vec<B256>,
        ss: Vec<B256>,
    ) -> impl std::future::Future<Output = Result<String, SplitsError>> + Send;

    /// Read `allowance(owner, spender)` on an ERC-20 token.
    fn erc20_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> impl std::future::Future<Output = Result<U256, SplitsError>> + Send;
}

/// JSON-RPC gateway to the coordinator contract. Carries a read-only handle
/// and, when an executor key is configured, a wallet-backed write handle.
pub struct CoordinatorGateway {
    read: RootProvider,
    write: Option<WalletProvider>,
    contract: Address,
}

impl CoordinatorGateway {
    pub fn new(
        rpc_url: &str,
        contract: Address,
        executor_key: Option<&str>,
    ) -> Result<Self, SplitsError> {
        let url = rpc_url
            .parse()
            .map_err(|_| SplitsError::Misconfigured(format!("invalid RPC url: {rpc_url}")))?;
        let read = RootProvider::<alloy::network::Ethereum>::new_http(url);

        let write = match executor_key {
            Some(key) => {
                let signer: PrivateKeySigner = key.parse().map_err(|_| {
                    SplitsError::Misconfigured("invalid executor private key".to_string())
                })?;
                let url = rpc_url.parse().map_err(|_| {
                    SplitsError::Misconfigured(format!("invalid RPC url: {rpc_url}"))
                })?;
                Some(
                    ProviderBuilder::new()
                        .wallet(EthereumWallet::from(signer))
                        .connect_http(url),
                )
            }
            None => None,
        };

        Ok(Self {
            read,
            write,
            contract,
        })
    }

    pub fn contract_address(&self) -> Address {
        self.contract
    }

    fn write_handle(&self) -> Result<&WalletProvider, SplitsError> {
        self.write.as_ref().ok_or_else(|| {
            SplitsError::Misconfigured(
                "EXECUTOR_PRIVATE_KEY is not configured; write operations are disabled"
                    .to_string(),
            )
        })
    }
}

impl ChainGateway for CoordinatorGateway {
    async fn create_split(
        &self,
        payer: Address,
        token: Address,
        legs: Vec<(Address, U256)>,
        deadline: U256,
        meta_hash: B256,
    ) -> Result<OnchainCreate, SplitsError> {
        let provider = self.write_handle()?;
        let contract = SplitCoordinator::new(self.contract, provider);

        let legs: Vec<SplitCoordinator::Leg> = legs
            .into_iter()
            .map(|(participant, amount)| SplitCoordinator::Leg {
                participant,
                amount,
            })
            .collect();

        let pending = contract
            .createSplit(payer, token, legs, deadline, meta_hash)
            .send()
            .await
            .map_err(|e| SplitsError::ChainFailed(format!("createSplit send failed: {e}")))?;

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| SplitsError::ChainFailed(format!("createSplit receipt failed: {e}")))?;

        if !receipt.status() {
            return Err(SplitsError::ChainFailed("createSplit reverted".to_string()));
        }

        let split_id = parse_split_created(receipt.inner.logs(), self.contract);
        Ok(OnchainCreate {
            tx_hash: format!("{}", receipt.transaction_hash),
            split_id,
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
        rs: Vec<B256>,
        ss: Vec<B256>,
    ) -> Result<String, SplitsError> {
        let provider = self.write_handle()?;
        let contract = SplitCoordinator::new(self.contract, provider);

        let pending = contract
            .settleSplit(split_id, participants, amounts, deadlines, salts, vs, rs, ss)
            .send()
            .await
            .map_err(|e| SplitsError::ChainFailed(format!("settleSplit send failed: {e}")))?;

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| SplitsError::ChainFailed(format!("settleSplit receipt failed: {e}")))?;

        if !receipt.status() {
            return Err(SplitsError::ChainFailed("settleSplit reverted".to_string()));
        }

        Ok(format!("{}", receipt.transaction_hash))
    }

    async fn erc20_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, SplitsError> {
        let erc20 = IERC20::new(token, &self.read);
        erc20
            .allowance(owner, spender)
            .call()
            .await
            .map_err(|e| SplitsError::ChainFailed(format!("allowance failed: {e}")))
    }
}

/// Scan receipt logs for a SplitCreated event emitted by `contract` and
/// return its split id. Logs from other addresses and undecodable logs are
/// skipped.
pub fn parse_split_created(logs: &[Log], contract: Address) -> Option<U256> {
    logs.iter()
        .filter(|log| log.address() == contract)
        .find_map(|log| {
            log.log_decode::<SplitCoordinator::SplitCreated>()
                .ok()
                .map(|decoded| decoded.inner.data.splitId)
        })
}
