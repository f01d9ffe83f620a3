// Core types and modules
pub mod constants;
pub mod coordinator;
pub mod db;
pub mod eip712;
pub mod engine;
pub mod error;
pub mod response;

use alloy::sol;

// EIP-712 struct each participant signs to authorize pulling their leg --
// the sol! macro derives SolStruct which gives us eip712_signing_hash().
sol! {
    #[derive(Debug)]
    struct ApproveSplit {
        address participant;
        uint256 splitId;
        address token;
        address payer;
        uint256 amount;
        uint256 deadline;
        bytes32 salt;
    }
}

// Coordinator contract surface: createSplit mints an on-chain split id,
// settleSplit consumes all per-leg signatures in one transaction.
sol! {
    #[sol(rpc)]
    interface SplitCoordinator {
        struct Leg {
            address participant;
            uint256 amount;
        }

        event SplitCreated(uint256 indexed splitId, address indexed payer, address token, uint256 totalAmount);

        function createSplit(
            address payer,
            address token,
            Leg[] calldata legs,
            uint256 deadline,
            bytes32 metaHash
        ) external returns (uint256 splitId);

        function settleSplit(
            uint256 splitId,
            address[] calldata participants,
            uint256[] calldata amounts,
            uint256[] calldata deadlines,
            bytes32[] calldata salts,
            uint8[] calldata vs,
            bytes32[] calldata rs,
            bytes32[] calldata ss
        ) external;
    }
}

// ERC-20 read used by the allowance probe.
sol! {
    #[sol(rpc)]
    interface IERC20 {
        function allowance(address owner, address spender) external view returns (uint256);
    }
}

// Re-exports
pub use constants::ChainSettings;
pub use coordinator::{ChainGateway, CoordinatorGateway, OnchainCreate};
pub use db::{Database, SignatureStatus};
pub use engine::SplitsEngine;
pub use error::SplitsError;
