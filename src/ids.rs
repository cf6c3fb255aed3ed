//! Pack identifiers and public short ids.

use log::warn;
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Tunables for short-id generation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ShortIdConfig {
    /// Characters per id, drawn from `[A-Za-z0-9]`
    pub length: usize,
    /// Candidates tried before giving up
    pub max_attempts: u32,
}

/// Shortest id accepted from configuration
pub const MIN_SHORT_ID_LENGTH: usize = 8;

impl Default for ShortIdConfig {
    fn default() -> Self {
        Self {
            length: 8,
            max_attempts: 10,
        }
    }
}

impl ShortIdConfig {
    /// Reject configs that would hand out empty or guessable ids, or never
    /// try a single candidate.
    pub fn validate(&self) -> CoreResult<()> {
        if self.length < MIN_SHORT_ID_LENGTH {
            return Err(CoreError::invalid(format!(
                "short id length must be at least {MIN_SHORT_ID_LENGTH} (got {})",
                self.length
            )));
        }
        if self.max_attempts == 0 {
            return Err(CoreError::invalid("short id max attempts must be at least 1"));
        }
        Ok(())
    }
}

pub fn new_pack_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Draw a short id with the default config. See [`new_short_id_with`].
pub fn new_short_id<F>(exists: F) -> CoreResult<String>
where
    F: FnMut(&str) -> CoreResult<bool>,
{
    new_short_id_with(&ShortIdConfig::default(), exists)
}

/// Draw random alphanumeric candidates until `exists` reports one as free.
///
/// Fails with [`CoreError::ExhaustedRetries`] once `max_attempts` candidates have
/// all collided. An error from `exists` aborts the loop immediately.
pub fn new_short_id_with<F>(config: &ShortIdConfig, mut exists: F) -> CoreResult<String>
where
    F: FnMut(&str) -> CoreResult<bool>,
{
    for _ in 0..config.max_attempts {
        let candidate: String = OsRng
            .sample_iter(&Alphanumeric)
            .take(config.length)
            .map(char::from)
            .collect();

        if !exists(&candidate)? {
            return Ok(candidate);
        }
    }

    warn!(
        "Short id generation exhausted after {} attempts",
        config.max_attempts
    );
    Err(CoreError::ExhaustedRetries {
        attempts: config.max_attempts,
    })
}
