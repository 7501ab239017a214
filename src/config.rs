//! Validator Configuration
//!
//! Everything that is a deployment decision rather than an algorithm:
//! the speed bound, how samples decode, which hash backs the chain,
//! and the fee with its destination.

use std::str::FromStr;

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::hash::HashScheme;
use crate::core::path::SampleLayout;
use crate::ledger::{AccountId, FeeGate, DEFAULT_VALIDATION_FEE};
use crate::validator::speed::{SpeedPolicy, DEFAULT_MAX_STEP};

/// Default treasury, used when `PATH_TREASURY` is unset.
pub const DEFAULT_TREASURY: AccountId = AccountId::new([
    0x0c, 0x5e, 0x2a, 0x71, 0x9d, 0x44, 0x3b, 0xe8,
    0x16, 0xa0, 0x7f, 0x52, 0xc9, 0x0b, 0x6d, 0x23,
    0x98, 0x4e, 0xf1, 0x37, 0x85, 0xda, 0x60, 0x1c,
    0xb4, 0x29, 0x73, 0x0e, 0xc6, 0x5b, 0x91, 0xaf,
]);

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A variable was set but could not be parsed.
    #[error("invalid value for {key}: {reason}")]
    InvalidValue {
        /// Variable name.
        key: &'static str,
        /// Parse failure.
        reason: String,
    },
}

/// Validator configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Largest allowed step between consecutive samples.
    pub max_step: u32,
    /// Sample decoding.
    pub sample_layout: SampleLayout,
    /// Hash backing the commitment chain.
    pub hash_scheme: HashScheme,
    /// Fee per accepted path, in base units.
    pub fee: u64,
    /// Fee collection account.
    pub treasury: AccountId,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_step: DEFAULT_MAX_STEP,
            sample_layout: SampleLayout::default(),
            hash_scheme: HashScheme::default(),
            fee: DEFAULT_VALIDATION_FEE,
            treasury: DEFAULT_TREASURY,
        }
    }
}

impl ValidatorConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            max_step: parse_var(&lookup, "PATH_MAX_STEP")?.unwrap_or(defaults.max_step),
            sample_layout: parse_var(&lookup, "PATH_SAMPLE_LAYOUT")?
                .unwrap_or(defaults.sample_layout),
            hash_scheme: parse_var(&lookup, "PATH_HASH_SCHEME")?.unwrap_or(defaults.hash_scheme),
            fee: parse_var(&lookup, "PATH_VALIDATION_FEE")?.unwrap_or(defaults.fee),
            treasury: parse_var(&lookup, "PATH_TREASURY")?.unwrap_or(defaults.treasury),
        })
    }

    /// Speed policy derived from this config.
    pub fn speed_policy(&self) -> SpeedPolicy {
        SpeedPolicy::new(self.max_step, self.sample_layout)
    }

    /// Fee gate derived from this config.
    pub fn fee_gate(&self) -> FeeGate {
        FeeGate::new(self.treasury, self.fee)
    }
}

/// Parse `key` if set. Unset and empty both mean "use the default".
pub(crate) fn parse_var<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue { key, reason: e.to_string() }),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = ValidatorConfig::from_vars(vars(&[])).unwrap();
        assert_eq!(config, ValidatorConfig::default());
        assert_eq!(config.max_step, 1);
        assert_eq!(config.hash_scheme, HashScheme::Keccak256);
        assert_eq!(config.sample_layout, SampleLayout::Scalar);
    }

    #[test]
    fn test_overrides() {
        let treasury = AccountId::new([9; 32]);
        let treasury_hex = treasury.to_string();
        let config = ValidatorConfig::from_vars(vars(&[
            ("PATH_MAX_STEP", "3"),
            ("PATH_SAMPLE_LAYOUT", "planar"),
            ("PATH_HASH_SCHEME", "sha256"),
            ("PATH_VALIDATION_FEE", "42"),
            ("PATH_TREASURY", treasury_hex.as_str()),
        ]))
        .unwrap();

        assert_eq!(config.speed_policy(), SpeedPolicy::new(3, SampleLayout::Planar));
        assert_eq!(config.hash_scheme, HashScheme::Sha256);
        assert_eq!(config.fee_gate(), FeeGate::new(treasury, 42));
    }

    #[test]
    fn test_empty_value_uses_default() {
        let config = ValidatorConfig::from_vars(vars(&[("PATH_MAX_STEP", "  ")])).unwrap();
        assert_eq!(config.max_step, DEFAULT_MAX_STEP);
    }

    #[test]
    fn test_malformed_values_rejected() {
        let err = ValidatorConfig::from_vars(vars(&[("PATH_MAX_STEP", "fast")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "PATH_MAX_STEP", .. }));

        let err = ValidatorConfig::from_vars(vars(&[("PATH_TREASURY", "abcd")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "PATH_TREASURY", .. }));

        let err = ValidatorConfig::from_vars(vars(&[("PATH_HASH_SCHEME", "md5")])).unwrap_err();
        assert!(err.to_string().contains("PATH_HASH_SCHEME"));
    }
}
