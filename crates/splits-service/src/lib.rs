pub mod config;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod state;
pub mod validation;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use state::AppState;
