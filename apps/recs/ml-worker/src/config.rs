use core_config::broker::BrokerConfig;
use core_config::{env_optional, env_or_default, env_parse, env_required, ConfigError, FromEnv};
use domain_recommendations::StrategyKind;

pub const DEFAULT_RESULT_ENDPOINT: &str = "http://app:8080/api/recommendation/send_task_result";

/// Worker settings loaded from the environment
#[derive(Clone, Debug)]
pub struct MlWorkerConfig {
    pub broker: BrokerConfig,
    /// Where finished rankings are posted
    pub result_endpoint: String,
    /// Personalized strategy for users with a preference vector
    pub strategy: StrategyKind,
    pub scorer_model_path: Option<String>,
    pub projection_model_path: Option<String>,
    /// JSON snapshot of users, items and likes
    pub catalog_path: String,
    /// Prometheus and health endpoint; disabled when unset
    pub metrics_port: Option<u16>,
}

impl FromEnv for MlWorkerConfig {
    /// Reads the broker settings plus:
    /// - RESULT_ENDPOINT
    /// - RANKING_STRATEGY (pairwise | index, default pairwise)
    /// - SCORER_MODEL_PATH (optional)
    /// - PROJECTION_MODEL_PATH (required for index)
    /// - CATALOG_PATH (required)
    /// - METRICS_PORT (optional)
    fn from_env() -> Result<Self, ConfigError> {
        let strategy = env_parse("RANKING_STRATEGY", StrategyKind::Pairwise)?;
        let projection_model_path = env_optional("PROJECTION_MODEL_PATH");
        if strategy == StrategyKind::Index && projection_model_path.is_none() {
            return Err(ConfigError::MissingEnvVar("PROJECTION_MODEL_PATH".to_string()));
        }

        let metrics_port = match env_optional("METRICS_PORT") {
            Some(_) => Some(env_parse("METRICS_PORT", 0u16)?),
            None => None,
        };

        Ok(Self {
            broker: BrokerConfig::from_env()?,
            result_endpoint: env_or_default("RESULT_ENDPOINT", DEFAULT_RESULT_ENDPOINT),
            strategy,
            scorer_model_path: env_optional("SCORER_MODEL_PATH"),
            projection_model_path,
            catalog_path: env_required("CATALOG_PATH")?,
            metrics_port,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEYS: [&str; 6] = [
        "RESULT_ENDPOINT",
        "RANKING_STRATEGY",
        "SCORER_MODEL_PATH",
        "PROJECTION_MODEL_PATH",
        "CATALOG_PATH",
        "METRICS_PORT",
    ];

    fn vars(set: &[(&'static str, &'static str)]) -> Vec<(&'static str, Option<&'static str>)> {
        KEYS.iter()
            .map(|key| {
                let value = set.iter().find(|(k, _)| k == key).map(|(_, v)| *v);
                (*key, value)
            })
            .collect()
    }

    #[test]
    fn test_defaults() {
        temp_env::with_vars(vars(&[("CATALOG_PATH", "/data/catalog.json")]), || {
            let config = MlWorkerConfig::from_env().unwrap();
            assert_eq!(config.result_endpoint, DEFAULT_RESULT_ENDPOINT);
            assert_eq!(config.strategy, StrategyKind::Pairwise);
            assert_eq!(config.catalog_path, "/data/catalog.json");
            assert_eq!(config.scorer_model_path, None);
            assert_eq!(config.metrics_port, None);
        });
    }

    #[test]
    fn test_catalog_path_required() {
        temp_env::with_vars(vars(&[]), || {
            let err = MlWorkerConfig::from_env().unwrap_err();
            assert!(matches!(err, ConfigError::MissingEnvVar(key) if key == "CATALOG_PATH"));
        });
    }

    #[test]
    fn test_index_strategy_needs_projection() {
        let index_only = [
            ("CATALOG_PATH", "/data/catalog.json"),
            ("RANKING_STRATEGY", "index"),
        ];
        temp_env::with_vars(vars(&index_only), || {
            let err = MlWorkerConfig::from_env().unwrap_err();
            assert!(matches!(err, ConfigError::MissingEnvVar(key) if key == "PROJECTION_MODEL_PATH"));
        });

        let complete = [
            ("CATALOG_PATH", "/data/catalog.json"),
            ("RANKING_STRATEGY", "index"),
            ("PROJECTION_MODEL_PATH", "/models/projection.json"),
            ("METRICS_PORT", "9100"),
        ];
        temp_env::with_vars(vars(&complete), || {
            let config = MlWorkerConfig::from_env().unwrap();
            assert_eq!(config.strategy, StrategyKind::Index);
            assert_eq!(config.metrics_port, Some(9100));
        });
    }

    #[test]
    fn test_unknown_strategy() {
        let set = [
            ("CATALOG_PATH", "/data/catalog.json"),
            ("RANKING_STRATEGY", "faiss"),
        ];
        temp_env::with_vars(vars(&set), || {
            let err = MlWorkerConfig::from_env().unwrap_err();
            assert!(matches!(err, ConfigError::ParseError { key, .. } if key == "RANKING_STRATEGY"));
        });
    }
}
