use graphql_cost_analysis::{AnalysisError, ConfigurationError, ExtractError};

#[derive(Debug, thiserror::Error)]
pub enum CostControlError {
    #[error("Estimated field cost of {field_cost} exceeds maximum operation field cost of {limit}.")]
    CostLimitExceeded { field_cost: f64, limit: f64 },
    #[error("could not parse operation: {0}")]
    InvalidOperation(#[from] async_graphql_parser::Error),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error("invalid supergraph schema: {0}")]
    InvalidSchema(#[from] ExtractError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

impl CostControlError {
    /// Whether the operation must not be executed.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            CostControlError::CostLimitExceeded { .. }
                | CostControlError::InvalidOperation(_)
                | CostControlError::Analysis(_)
        )
    }
}
