//! Core tunables

use serde::{Deserialize, Serialize};

/// Settings consumed by the substrate itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Slots in the first segment of every concurrent index map. Each
    /// following segment doubles the previous one.
    pub index_map_segment_capacity: usize,
    /// Number of ticks kept for each execution group's rolling tick time.
    pub tick_history: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            index_map_segment_capacity: 32,
            tick_history: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: CoreConfig = serde_json::from_str(r#"{ "tick_history": 8 }"#).unwrap();
        assert_eq!(config.tick_history, 8);
        assert_eq!(config.index_map_segment_capacity, 32);
    }
}
