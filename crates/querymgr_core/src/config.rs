use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::duration::serde_duration;
use crate::errors::{ManagerError, Result};

/// Configuration for the query manager.
///
/// Read only once the manager is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryManagerConfig {
    /// Number of finished queries kept with full detail.
    pub max_query_history: usize,
    /// Minimum time a finished query is kept before removal.
    #[serde(with = "serde_duration")]
    pub min_query_expire_age: Duration,
    /// Queries without a heartbeat for this long are failed.
    #[serde(with = "serde_duration")]
    pub client_timeout: Duration,
    /// Max query text length in characters.
    pub max_query_length: usize,
    /// Delay between the end of one maintenance tick and the start of the
    /// next.
    #[serde(with = "serde_duration")]
    pub management_interval: Duration,
    pub management_executor_pool_size: usize,
    pub query_executor_pool_size: usize,
}

impl Default for QueryManagerConfig {
    fn default() -> Self {
        QueryManagerConfig {
            max_query_history: 100,
            min_query_expire_age: Duration::from_secs(15 * 60),
            client_timeout: Duration::from_secs(5 * 60),
            max_query_length: 1_000_000,
            management_interval: Duration::from_secs(1),
            management_executor_pool_size: 5,
            query_executor_pool_size: num_cpus::get(),
        }
    }
}

impl QueryManagerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_query_length == 0 {
            return Err(ManagerError::InvalidConfig(
                "max_query_length must be greater than zero".to_string(),
            ));
        }
        if self.management_interval.is_zero() {
            return Err(ManagerError::InvalidConfig(
                "management_interval must be greater than zero".to_string(),
            ));
        }
        if self.management_executor_pool_size == 0 {
            return Err(ManagerError::InvalidConfig(
                "management_executor_pool_size must be greater than zero".to_string(),
            ));
        }
        if self.query_executor_pool_size == 0 {
            return Err(ManagerError::InvalidConfig(
                "query_executor_pool_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_max_query_history(mut self, max_query_history: usize) -> Self {
        self.max_query_history = max_query_history;
        self
    }

    pub fn with_min_query_expire_age(mut self, age: Duration) -> Self {
        self.min_query_expire_age = age;
        self
    }

    pub fn with_client_timeout(mut self, timeout: Duration) -> Self {
        self.client_timeout = timeout;
        self
    }

    pub fn with_max_query_length(mut self, max_query_length: usize) -> Self {
        self.max_query_length = max_query_length;
        self
    }

    pub fn with_management_interval(mut self, interval: Duration) -> Self {
        self.management_interval = interval;
        self
    }

    pub fn with_management_executor_pool_size(mut self, size: usize) -> Self {
        self.management_executor_pool_size = size;
        self
    }

    pub fn with_query_executor_pool_size(mut self, size: usize) -> Self {
        self.query_executor_pool_size = size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        QueryManagerConfig::default().validate().unwrap();
    }

    #[test]
    fn validate_rejects_zero() {
        let conf = QueryManagerConfig::default().with_max_query_length(0);
        assert!(matches!(
            conf.validate(),
            Err(ManagerError::InvalidConfig(_))
        ));

        let conf = QueryManagerConfig::default().with_management_interval(Duration::ZERO);
        assert!(conf.validate().is_err());

        let conf = QueryManagerConfig::default().with_query_executor_pool_size(0);
        assert!(conf.validate().is_err());
    }

    #[test]
    fn deserialize_partial() {
        let conf: QueryManagerConfig = serde_json::from_str(
            r#"{"max_query_history": 2, "min_query_expire_age": "30s", "client_timeout": "1.5m"}"#,
        )
        .unwrap();

        assert_eq!(2, conf.max_query_history);
        assert_eq!(Duration::from_secs(30), conf.min_query_expire_age);
        assert_eq!(Duration::from_secs(90), conf.client_timeout);
        assert_eq!(1_000_000, conf.max_query_length);
    }

    #[test]
    fn serialize_durations_as_strings() {
        let value = serde_json::to_value(QueryManagerConfig::default()).unwrap();
        assert_eq!("15.00m", value["min_query_expire_age"]);
        assert_eq!("1.00s", value["management_interval"]);
    }
}
