use alloy::primitives::Address;
use std::env;

const DEFAULT_PORT: u16 = 4024;
const DEFAULT_DB_PATH: &str = "./splits.db";
const DEFAULT_RATE_LIMIT_RPM: u64 = 60;

#[derive(Clone)]
pub struct ServiceConfig {
    /// EVM chain every split is bound to.
    pub chain_id: u64,
    /// Split coordinator contract address.
    pub coordinator: Address,
    /// JSON-RPC endpoint.
    pub rpc_url: String,
    /// EIP-712 domain name for ApproveSplit intents.
    pub eip712_name: String,
    /// EIP-712 domain version.
    pub eip712_version: String,
    /// Executor key for on-chain writes. Absent = read-only service.
    pub executor_private_key: Option<String>,
    /// SQLite database path.
    pub db_path: String,
    /// Server port.
    pub port: u16,
    /// CORS allowed origins.
    pub allowed_origins: Vec<String>,
    /// Rate limit requests per minute.
    pub rate_limit_rpm: u64,
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("chain_id", &self.chain_id)
            .field("coordinator", &self.coordinator)
            .field("rpc_url", &self.rpc_url)
            .field("eip712_name", &self.eip712_name)
            .field("eip712_version", &self.eip712_version)
            .field(
                "executor_private_key",
                &self.executor_private_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("db_path", &self.db_path)
            .field("port", &self.port)
            .field("allowed_origins", &self.allowed_origins)
            .field("rate_limit_rpm", &self.rate_limit_rpm)
            .finish()
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let chain_id_str =
            env::var("CHAIN_ID").map_err(|_| ConfigError::MissingRequired("CHAIN_ID"))?;
        let chain_id: u64 = chain_id_str
            .parse()
            .map_err(|_| ConfigError::InvalidNumber("CHAIN_ID", chain_id_str))?;

        let coordinator_str = env::var("SPLIT_COORDINATOR_ADDRESS")
            .map_err(|_| ConfigError::MissingRequired("SPLIT_COORDINATOR_ADDRESS"))?;
        let coordinator: Address = coordinator_str
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(coordinator_str))?;

        let rpc_url =
            env::var("RPC_URL_SCROLL").map_err(|_| ConfigError::MissingRequired("RPC_URL_SCROLL"))?;

        let eip712_name = env::var("EIP712_NAME")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| splits::constants::DEFAULT_DOMAIN_NAME.to_string());
        let eip712_version = env::var("EIP712_VERSION")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| splits::constants::DEFAULT_DOMAIN_VERSION.to_string());

        let executor_private_key = env::var("EXECUTOR_PRIVATE_KEY")
            .ok()
            .filter(|s| !s.is_empty());
        if executor_private_key.is_none() {
            tracing::warn!(
                "EXECUTOR_PRIVATE_KEY not set — on-chain create and settle are disabled"
            );
        }

        let db_path = env::var("DB_PATH").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());

        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let allowed_origins: Vec<String> = env::var("ALLOWED_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let rate_limit_rpm = env::var("RATE_LIMIT_RPM")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_RATE_LIMIT_RPM);

        Ok(Self {
            chain_id,
            coordinator,
            rpc_url,
            eip712_name,
            eip712_version,
            executor_private_key,
            db_path,
            port,
            allowed_origins,
            rate_limit_rpm,
        })
    }

    pub fn chain_settings(&self) -> splits::ChainSettings {
        splits::ChainSettings::new(self.chain_id, self.coordinator)
            .with_domain(self.eip712_name.clone(), self.eip712_version.clone())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingRequired(&'static str),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid value for {0}: {1}")]
    InvalidNumber(&'static str, String),
}
