use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, Utc};
use parking_lot::Mutex;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::errors::{ManagerError, Result};

/// Identifier for a query.
///
/// Generated ids have the form `YYYYMMDD_HHMMSS_NNNNN_xxxxx` and sort in the
/// order they were issued by a single generator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryId(String);

impl QueryId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for QueryId {
    type Err = ManagerError;

    fn from_str(s: &str) -> Result<Self> {
        let valid = !s.is_empty()
            && s.bytes()
                .all(|b| b == b'_' || b.is_ascii_lowercase() || b.is_ascii_digit());
        if !valid {
            return Err(ManagerError::InvalidArgument(format!(
                "Invalid query id: '{s}'"
            )));
        }
        Ok(QueryId(s.to_string()))
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for a stage within a query, `{query_id}.{n}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StageId {
    pub query_id: QueryId,
    pub id: u32,
}

impl StageId {
    pub fn new(query_id: QueryId, id: u32) -> Self {
        StageId { query_id, id }
    }
}

impl FromStr for StageId {
    type Err = ManagerError;

    fn from_str(s: &str) -> Result<Self> {
        let (query_id, id) = s
            .rsplit_once('.')
            .ok_or_else(|| ManagerError::InvalidArgument(format!("Invalid stage id: '{s}'")))?;
        let id = id
            .parse()
            .map_err(|_| ManagerError::InvalidArgument(format!("Invalid stage id: '{s}'")))?;
        Ok(StageId {
            query_id: query_id.parse()?,
            id,
        })
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.query_id, self.id)
    }
}

/// Characters used for the coordinator suffix. Omits characters that are easy
/// to confuse with each other.
const COORDINATOR_ID_CHARS: &[u8] = b"abcdefghijkmnpqrstuvwxyz23456789";
const COORDINATOR_ID_LEN: usize = 5;

/// Max number of ids handed out per day before waiting for the next second.
const MAX_IDS_PER_DAY: u32 = 100_000;

#[derive(Debug)]
struct GeneratorState {
    last_second: i64,
    last_day: i32,
    last_timestamp: String,
    counter: u32,
}

/// Issues unique, monotonically increasing query ids.
#[derive(Debug)]
pub struct QueryIdGenerator {
    coordinator_id: String,
    clock: Arc<dyn Clock>,
    state: Mutex<GeneratorState>,
}

impl QueryIdGenerator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let mut rng = rand::rng();
        let coordinator_id = (0..COORDINATOR_ID_LEN)
            .map(|_| COORDINATOR_ID_CHARS[rng.random_range(0..COORDINATOR_ID_CHARS.len())] as char)
            .collect();

        QueryIdGenerator {
            coordinator_id,
            clock,
            state: Mutex::new(GeneratorState {
                last_second: i64::MIN,
                last_day: i32::MIN,
                last_timestamp: String::new(),
                counter: 0,
            }),
        }
    }

    pub fn coordinator_id(&self) -> &str {
        &self.coordinator_id
    }

    pub fn create_next_query_id(&self) -> QueryId {
        let mut state = self.state.lock();

        if state.counter >= MAX_IDS_PER_DAY {
            // Out of ids, wait for the second to roll over.
            while self.clock.now().timestamp() == state.last_second {
                std::thread::sleep(Duration::from_millis(10));
            }
            state.counter = 0;
        }

        let now = self.clock.now();
        if now.timestamp() != state.last_second {
            state.last_second = now.timestamp();
            state.last_timestamp = format_timestamp(now);

            let day = now.num_days_from_ce();
            if day != state.last_day {
                state.last_day = day;
                state.counter = 0;
            }
        }

        let id = format!(
            "{}_{:05}_{}",
            state.last_timestamp, state.counter, self.coordinator_id
        );
        state.counter += 1;

        QueryId(id)
    }
}

fn format_timestamp(time: DateTime<Utc>) -> String {
    time.format("%Y%m%d_%H%M%S").to_string()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::clock::ManualClock;

    fn generator() -> (Arc<ManualClock>, QueryIdGenerator) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap(),
        ));
        let generator = QueryIdGenerator::new(clock.clone());
        (clock, generator)
    }

    #[test]
    fn id_format() {
        let (_, generator) = generator();
        let id = generator.create_next_query_id();
        assert_eq!(
            format!("20240301_123005_00000_{}", generator.coordinator_id()),
            id.to_string()
        );
    }

    #[test]
    fn ids_increase() {
        let (clock, generator) = generator();
        let mut ids = Vec::new();
        for _ in 0..5 {
            ids.push(generator.create_next_query_id());
            clock.advance(Duration::from_millis(400));
        }

        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(sorted, ids);
        assert!(ids.windows(2).all(|w| w[0] != w[1]));
    }

    #[test]
    fn counter_resets_on_new_day() {
        let (clock, generator) = generator();
        generator.create_next_query_id();
        generator.create_next_query_id();
        // 12:30:05 to midnight.
        clock.advance(Duration::from_secs(11 * 3600 + 29 * 60 + 55));
        let id = generator.create_next_query_id();
        assert!(id.as_str().starts_with("20240302_000000_00000_"));
    }

    #[test]
    fn parse_stage_id() {
        let stage: StageId = "20240301_123005_00000_abcde.3".parse().unwrap();
        assert_eq!("20240301_123005_00000_abcde", stage.query_id.as_str());
        assert_eq!(3, stage.id);
        assert_eq!("20240301_123005_00000_abcde.3", stage.to_string());

        assert!("no_dot".parse::<StageId>().is_err());
        assert!("Bad-Id.1".parse::<StageId>().is_err());
    }
}
