//! Solver configuration.

use std::time::Duration;

use crate::error::ConfigError;

/// Largest accepted computed table size, in bits.
pub const MAX_CACHE_BITS: usize = 24;

/// Sizing and limits of a solver session.
///
/// Values are validated on construction, so a `SolverConfig` is always usable.
///
/// ```
/// use std::time::Duration;
/// use nqueens_bdd::config::SolverConfig;
///
/// let config = SolverConfig::default()
///     .with_storage_bits(22)?
///     .with_timeout(Some(Duration::from_secs(5)));
/// assert_eq!(config.storage_bits(), 22);
/// # Ok::<(), nqueens_bdd::error::ConfigError>(())
/// ```
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct SolverConfig {
    storage_bits: usize,
    cache_bits: usize,
    timeout: Option<Duration>,
}

impl Default for SolverConfig {
    /// 20 bits (about a million nodes) are enough for boards up to 10x10.
    fn default() -> Self {
        Self {
            storage_bits: 20,
            cache_bits: 16,
            timeout: None,
        }
    }
}

impl SolverConfig {
    /// Unique table size: the session can hold up to `2^bits` BDD nodes.
    pub fn with_storage_bits(mut self, bits: usize) -> Result<Self, ConfigError> {
        if !(1..=31).contains(&bits) {
            return Err(ConfigError::StorageBits(bits));
        }
        self.storage_bits = bits;
        Ok(self)
    }

    /// Computed table size: `2^bits` entries.
    pub fn with_cache_bits(mut self, bits: usize) -> Result<Self, ConfigError> {
        if !(1..=MAX_CACHE_BITS).contains(&bits) {
            return Err(ConfigError::CacheBits {
                bits,
                max: MAX_CACHE_BITS,
            });
        }
        self.cache_bits = bits;
        Ok(self)
    }

    /// Wall-clock budget of a single `check`. `None` means unlimited.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn storage_bits(&self) -> usize {
        self.storage_bits
    }

    pub fn cache_bits(&self) -> usize {
        self.cache_bits
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}
