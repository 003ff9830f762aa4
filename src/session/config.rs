use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// How often the session snapshots the fused state and asks for an intervention.
    pub tick_secs: u64,
    /// Tick used instead of `tick_secs` when debug mode is on.
    pub debug_tick_secs: u64,
    /// Events buffered per subscriber before slow receivers start lagging.
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_secs: 5,
            debug_tick_secs: 1,
            event_capacity: 64,
        }
    }
}

impl SessionConfig {
    pub fn tick_interval(&self, debug: bool) -> Duration {
        let secs = if debug {
            self.debug_tick_secs
        } else {
            self.tick_secs
        };
        Duration::from_secs(secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_secs == 0 {
            return Err(ConfigError::InvalidDuration { name: "tick_secs" });
        }
        if self.debug_tick_secs == 0 {
            return Err(ConfigError::InvalidDuration {
                name: "debug_tick_secs",
            });
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::InvalidCapacity {
                name: "event_capacity",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_mode_shortens_tick() {
        let config = SessionConfig::default();
        assert_eq!(config.tick_interval(false), Duration::from_secs(5));
        assert_eq!(config.tick_interval(true), Duration::from_secs(1));
    }

    #[test]
    fn zero_tick_is_rejected() {
        let config = SessionConfig {
            tick_secs: 0,
            ..SessionConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidDuration { name: "tick_secs" })
        );
    }
}
