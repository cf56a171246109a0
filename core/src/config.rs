//! Engine settings with defaults and allowed ranges.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Defaults and bounds used by the workload queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Hop bound for friend-of-friend search.
    pub max_hops: u32,
    /// Hop bound for shortest-path length; large enough to act as "no path".
    pub path_max_hops: u32,
    /// Matches reported by person search; 0 = unbounded.
    pub result_limit: usize,
    /// Messages returned by the recent-messages query.
    pub message_limit: usize,
    /// Longest reply chain walked when looking for the originating post.
    pub reply_chain_max_hops: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_hops: 3,
            path_max_hops: 10,
            result_limit: 20,
            message_limit: 10,
            reply_chain_max_hops: 64,
        }
    }
}

const MAX_HOPS_RANGE: (u32, u32) = (1, 64);
const PATH_MAX_HOPS_RANGE: (u32, u32) = (1, 1024);
const RESULT_LIMIT_MAX: usize = 100_000;
const MESSAGE_LIMIT_RANGE: (usize, usize) = (1, 10_000);
const REPLY_CHAIN_RANGE: (u32, u32) = (1, 100_000);

impl EngineConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> EngineResult<Self> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> EngineResult<()> {
        check_range("max_hops", self.max_hops, MAX_HOPS_RANGE)?;
        check_range("path_max_hops", self.path_max_hops, PATH_MAX_HOPS_RANGE)?;
        check_range("result_limit", self.result_limit, (0, RESULT_LIMIT_MAX))?;
        check_range("message_limit", self.message_limit, MESSAGE_LIMIT_RANGE)?;
        check_range("reply_chain_max_hops", self.reply_chain_max_hops, REPLY_CHAIN_RANGE)
    }
}

fn check_range<T>(name: &str, value: T, (min, max): (T, T)) -> EngineResult<()>
where
    T: PartialOrd + std::fmt::Display,
{
    if value < min || value > max {
        return Err(EngineError::Config(format!(
            "{} must be between {} and {}, got {}",
            name, min, max, value
        )));
    }
    Ok(())
}
