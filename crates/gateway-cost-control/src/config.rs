use std::time::Duration;

use duration_str::deserialize_option_duration;
use graphql_cost_analysis::DEFAULT_SCHEMA_FETCH_TIMEOUT;

/// Field cost allowed when limits are enforced without an explicit limit.
pub const DEFAULT_MAX_FIELD_COST: f64 = 100.0;

#[derive(Debug, Default, serde::Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CostControlConfig {
    pub mode: Option<CostControlMode>,
    /// Maximum estimated field cost of an operation.
    pub max_field_cost: Option<f64>,
    /// How long to wait for each subgraph schema when building the cost map.
    #[serde(deserialize_with = "deserialize_option_duration")]
    pub subgraph_schema_timeout: Option<Duration>,
}

impl CostControlConfig {
    pub fn subgraph_schema_timeout(&self) -> Duration {
        self.subgraph_schema_timeout.unwrap_or(DEFAULT_SCHEMA_FETCH_TIMEOUT)
    }
}

#[derive(Debug, serde::Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum CostControlMode {
    Measure,
    Enforce,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum CostLimit {
    #[default]
    Disabled,
    /// Operations estimated above the limit are rejected.
    Enforce { limit: f64 },
    /// Costs are computed and reported.
    ///
    /// Operations above the limit, if any, are logged but executed.
    Measure { limit: Option<f64> },
}

impl CostLimit {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, CostLimit::Disabled)
    }

    pub fn is_enforce(&self) -> bool {
        matches!(self, CostLimit::Enforce { .. })
    }

    pub fn limit(&self) -> Option<f64> {
        match self {
            CostLimit::Disabled => None,
            CostLimit::Enforce { limit } => Some(*limit),
            CostLimit::Measure { limit } => *limit,
        }
    }
}

impl From<&CostControlConfig> for CostLimit {
    fn from(config: &CostControlConfig) -> Self {
        match (config.mode, config.max_field_cost) {
            (None, _) => CostLimit::Disabled,
            (Some(CostControlMode::Enforce), Some(limit)) => CostLimit::Enforce { limit },
            (Some(CostControlMode::Enforce), None) => {
                tracing::warn!(
                    "Cost control is configured to enforce limits but no max_field_cost was set. Assuming a max_field_cost of {DEFAULT_MAX_FIELD_COST}"
                );
                CostLimit::Enforce {
                    limit: DEFAULT_MAX_FIELD_COST,
                }
            }
            (Some(CostControlMode::Measure), limit) => CostLimit::Measure { limit },
        }
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Debug, serde::Deserialize)]
    struct Config {
        #[serde(default)]
        cost_control: CostControlConfig,
    }

    #[test]
    fn defaults() {
        let config: Config = toml::from_str("").unwrap();

        assert_eq!(config.cost_control, CostControlConfig::default());
        assert_eq!(CostLimit::from(&config.cost_control), CostLimit::Disabled);
        assert_eq!(config.cost_control.subgraph_schema_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn enforce() {
        let input = indoc! {r#"
            [cost_control]
            mode = "enforce"
            max_field_cost = 250
            subgraph_schema_timeout = "2s"
        "#};

        let config: Config = toml::from_str(input).unwrap();

        assert_eq!(
            CostLimit::from(&config.cost_control),
            CostLimit::Enforce { limit: 250.0 }
        );
        assert_eq!(CostLimit::from(&config.cost_control).limit(), Some(250.0));
        assert_eq!(config.cost_control.subgraph_schema_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn enforce_without_limit() {
        let input = indoc! {r#"
            [cost_control]
            mode = "enforce"
        "#};

        let config: Config = toml::from_str(input).unwrap();

        assert_eq!(
            CostLimit::from(&config.cost_control),
            CostLimit::Enforce {
                limit: DEFAULT_MAX_FIELD_COST
            }
        );
    }

    #[test]
    fn measure() {
        let input = indoc! {r#"
            [cost_control]
            mode = "measure"
        "#};

        let config: Config = toml::from_str(input).unwrap();
        let limit = CostLimit::from(&config.cost_control);

        assert_eq!(limit, CostLimit::Measure { limit: None });
        assert!(limit.is_enabled());
        assert!(!limit.is_enforce());
        assert_eq!(limit.limit(), None);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let input = indoc! {r#"
            [cost_control]
            max_type_cost = 10
        "#};

        assert!(toml::from_str::<Config>(input).is_err());
    }
}
