use splits::{CoordinatorGateway, SplitsEngine};

/// Shared application state for the splits service.
pub struct AppState {
    pub engine: SplitsEngine<CoordinatorGateway>,
}
