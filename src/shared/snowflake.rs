//! Snowflake ID Generator
//!
//! Time-ordered unique ID generation plus helpers for carrying IDs as JSON
//! strings (64-bit integers do not survive JavaScript clients).

use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// Default epoch (2024-01-01T00:00:00.000Z)
pub const DEFAULT_EPOCH: u64 = 1_704_067_200_000;

const SEQUENCE_MASK: u64 = 0xFFF;

#[derive(Debug, Default)]
struct GeneratorState {
    last_timestamp: u64,
    sequence: u64,
}

/// Snowflake ID generator
#[derive(Debug)]
pub struct SnowflakeGenerator {
    epoch: u64,
    machine_id: u64,
    state: Mutex<GeneratorState>,
}

impl SnowflakeGenerator {
    /// Create a new snowflake generator
    pub fn new(machine_id: u64, epoch: u64) -> Self {
        Self {
            epoch,
            machine_id: machine_id & 0x3FF, // 10 bits
            state: Mutex::new(GeneratorState::default()),
        }
    }

    /// Generate a new snowflake ID
    ///
    /// Timestamp and sequence advance together under one lock. When the
    /// 4096 sequence slots of a millisecond are used up, waits for the next
    /// millisecond. A clock that steps backwards is held at the last value.
    pub fn generate(&self) -> i64 {
        let mut state = self.state.lock();
        let mut timestamp = self.current_timestamp().max(state.last_timestamp);

        if timestamp == state.last_timestamp {
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                while timestamp <= state.last_timestamp {
                    std::hint::spin_loop();
                    timestamp = self.current_timestamp();
                }
            }
        } else {
            state.sequence = 0;
        }
        state.last_timestamp = timestamp;

        let id = (timestamp.saturating_sub(self.epoch) << 22) | (self.machine_id << 12) | state.sequence;

        id as i64
    }

    /// Get current timestamp in milliseconds
    fn current_timestamp(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(self.epoch)
    }
}

/// Parse snowflake from string
pub fn from_string(s: &str) -> Result<i64, std::num::ParseIntError> {
    s.trim().parse()
}

/// Serde adapter for a single ID carried as a JSON string.
///
/// Numbers are accepted on input as well.
pub mod id_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    pub(super) enum RawId {
        Str(String),
        Num(i64),
    }

    impl RawId {
        pub(super) fn into_id(self) -> Result<i64, String> {
            match self {
                RawId::Num(n) => Ok(n),
                RawId::Str(s) => super::from_string(&s).map_err(|_| s),
            }
        }
    }

    pub fn serialize<S: Serializer>(id: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&id.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        RawId::deserialize(deserializer)?
            .into_id()
            .map_err(|raw| de::Error::custom(format!("invalid id: {}", raw)))
    }
}

/// Serde adapter for a list of IDs carried as JSON strings.
pub mod id_string_vec {
    use serde::{de, ser::SerializeSeq, Deserialize, Deserializer, Serializer};

    use super::id_string::RawId;

    pub fn serialize<S: Serializer>(ids: &[i64], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(ids.len()))?;
        for id in ids {
            seq.serialize_element(&id.to_string())?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<i64>, D::Error> {
        Vec::<RawId>::deserialize(deserializer)?
            .into_iter()
            .map(|raw| {
                raw.into_id()
                    .map_err(|raw| de::Error::custom(format!("invalid id: {}", raw)))
            })
            .collect()
    }
}

/// Serde adapter for an optional ID carried as a JSON string.
pub mod id_string_opt {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::id_string::RawId;

    pub fn serialize<S: Serializer>(id: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error> {
        match id {
            Some(id) => serializer.serialize_some(&id.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<i64>, D::Error> {
        let raw = Option::<RawId>::deserialize(deserializer)?;
        raw.map(|r| {
            r.into_id()
                .map_err(|raw| serde::de::Error::custom(format!("invalid id: {}", raw)))
        })
        .transpose()
    }
}
