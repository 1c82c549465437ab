use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;

use serde::Serialize;

use crate::duration::{parse_duration, serde_duration};
use crate::errors::{ManagerError, Result};

/// Per-session properties the manager reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionProperties {
    #[serde(with = "serde_duration")]
    pub query_max_run_time: Duration,
    pub parse_decimal_literals_as_double: bool,
}

impl Default for SessionProperties {
    fn default() -> Self {
        SessionProperties {
            query_max_run_time: DEFAULT_QUERY_MAX_RUN_TIME,
            parse_decimal_literals_as_double: false,
        }
    }
}

impl SessionProperties {
    pub fn set_from_str(&mut self, name: &str, value: &str) -> Result<()> {
        let func = SET_FUNCTIONS.get(name).ok_or_else(|| {
            ManagerError::InvalidSessionProperty(format!("Unknown session property '{name}'"))
        })?;

        (func.set)(value, self)
    }
}

struct SettingFunctions {
    set: fn(value: &str, props: &mut SessionProperties) -> Result<()>,
}

impl SettingFunctions {
    const fn new<S: SessionSetting>() -> Self {
        SettingFunctions {
            set: S::set_from_str as _,
        }
    }
}

fn insert_setting<S: SessionSetting>(map: &mut HashMap<&'static str, SettingFunctions>) {
    if map.insert(S::NAME, SettingFunctions::new::<S>()).is_some() {
        panic!("Duplicate settings names: {}", S::NAME);
    }
}

static SET_FUNCTIONS: LazyLock<HashMap<&'static str, SettingFunctions>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    insert_setting::<QueryMaxRunTime>(&mut map);
    insert_setting::<ParseDecimalLiteralsAsDouble>(&mut map);

    map
});

pub trait SessionSetting: Sync + Send + 'static {
    const NAME: &'static str;
    const DESCRIPTION: &'static str;

    fn set_from_str(value: &str, props: &mut SessionProperties) -> Result<()>;
}

pub const DEFAULT_QUERY_MAX_RUN_TIME: Duration = Duration::from_secs(100 * 24 * 60 * 60);

pub struct QueryMaxRunTime;

impl SessionSetting for QueryMaxRunTime {
    const NAME: &'static str = "query_max_run_time";
    const DESCRIPTION: &'static str = "Maximum run time of a query measured from its creation";

    fn set_from_str(value: &str, props: &mut SessionProperties) -> Result<()> {
        let dur = parse_duration(value).ok_or_else(|| {
            ManagerError::InvalidSessionProperty(format!(
                "{} is invalid: '{value}' is not a duration",
                Self::NAME
            ))
        })?;
        props.query_max_run_time = dur;
        Ok(())
    }
}

pub struct ParseDecimalLiteralsAsDouble;

impl SessionSetting for ParseDecimalLiteralsAsDouble {
    const NAME: &'static str = "parse_decimal_literals_as_double";
    const DESCRIPTION: &'static str = "Parse decimal literals as DOUBLE instead of DECIMAL";

    fn set_from_str(value: &str, props: &mut SessionProperties) -> Result<()> {
        let val = if value.eq_ignore_ascii_case("true") {
            true
        } else if value.eq_ignore_ascii_case("false") {
            false
        } else {
            return Err(ManagerError::InvalidSessionProperty(format!(
                "{} is invalid: '{value}' is not a boolean",
                Self::NAME
            )));
        };
        props.parse_decimal_literals_as_double = val;
        Ok(())
    }
}
