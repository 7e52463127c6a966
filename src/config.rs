//! Runtime configuration for statement counterpart processing

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::types::*;

/// Settings shared by the statement line operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterpartConfig {
    /// Company timezone as seconds east of UTC; account dates are entered in it
    pub timezone_offset_secs: i32,
    /// Attach a counterpart automatically when exactly one line matches the
    /// unexplained amount of a statement line
    pub auto_match: bool,
}

impl Default for CounterpartConfig {
    fn default() -> Self {
        Self {
            timezone_offset_secs: 0,
            auto_match: true,
        }
    }
}

impl CounterpartConfig {
    /// Parse a configuration from JSON; missing keys keep their defaults
    pub fn from_json(json: &str) -> LedgerResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| LedgerError::Validation(format!("invalid configuration: {}", e)))
    }

    /// Company timezone
    pub fn timezone(&self) -> LedgerResult<FixedOffset> {
        FixedOffset::east_opt(self.timezone_offset_secs).ok_or_else(|| {
            LedgerError::Validation(format!(
                "timezone offset {}s is out of range",
                self.timezone_offset_secs
            ))
        })
    }
}
