//! Node configuration

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use robofleet_shared::{limits, CalibrationProfile};
use std::str::FromStr;
use std::time::Duration;

/// Configuration for a fleet node
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Identifier stamped on every response
    pub node_id: String,
    /// Address the node listens on
    pub bind_addr: String,
    /// Close client sessions that stay silent this long
    pub session_idle_timeout: Duration,
    /// Fixed seed for simulated sensor noise; `None` seeds from entropy
    pub rng_seed: Option<u64>,
    /// Calibration tolerances
    pub calibration: CalibrationProfile,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: "fleet-node-01".into(),
            bind_addr: limits::DEFAULT_NODE_ADDR.into(),
            session_idle_timeout: Duration::from_millis(limits::SESSION_IDLE_TIMEOUT_MS),
            rng_seed: None,
            calibration: CalibrationProfile::default(),
        }
    }
}

impl NodeConfig {
    /// Defaults overridden by `ROBOFLEET_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each known key
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(node_id) = lookup("ROBOFLEET_NODE_ID") {
            config.node_id = node_id;
        }
        if let Some(bind_addr) = lookup("ROBOFLEET_BIND") {
            config.bind_addr = bind_addr;
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "ROBOFLEET_SESSION_IDLE_SECS")? {
            config.session_idle_timeout = Duration::from_secs(secs);
        }
        config.rng_seed = parse_var(&lookup, "ROBOFLEET_RNG_SEED")?;
        if let Some(fraction) = parse_var(&lookup, "ROBOFLEET_MAX_OFFSET_FRACTION")? {
            config.calibration.max_offset_fraction = fraction;
        }
        if let Some(fraction) = parse_var(&lookup, "ROBOFLEET_DRIFT_FRACTION")? {
            config.calibration.drift_fraction = fraction;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let CalibrationProfile {
            max_offset_fraction,
            drift_fraction,
        } = self.calibration;
        if !(0.0..=1.0).contains(&max_offset_fraction) {
            anyhow::bail!(
                "max offset fraction must be between 0 and 1, got {}",
                max_offset_fraction
            );
        }
        if !(0.0..=1.0).contains(&drift_fraction) {
            anyhow::bail!(
                "drift fraction must be between 0 and 1, got {}",
                drift_fraction
            );
        }
        if self.session_idle_timeout.is_zero() {
            anyhow::bail!("session idle timeout must be positive");
        }
        Ok(())
    }

    /// Generator for simulated sensor noise
    pub fn build_rng(&self) -> StdRng {
        match self.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("invalid value for {}: {:?}", key, raw))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = NodeConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.node_id, "fleet-node-01");
        assert_eq!(config.bind_addr, "127.0.0.1:7070");
        assert_eq!(config.session_idle_timeout, Duration::from_secs(300));
        assert_eq!(config.rng_seed, None);
        assert_eq!(config.calibration, CalibrationProfile::default());
    }

    #[test]
    fn test_overrides() {
        let config = NodeConfig::from_lookup(lookup(&[
            ("ROBOFLEET_NODE_ID", "bay-7"),
            ("ROBOFLEET_BIND", "0.0.0.0:9100"),
            ("ROBOFLEET_SESSION_IDLE_SECS", "30"),
            ("ROBOFLEET_RNG_SEED", "1234"),
            ("ROBOFLEET_MAX_OFFSET_FRACTION", "0.2"),
            ("ROBOFLEET_DRIFT_FRACTION", " 0.15 "),
        ]))
        .unwrap();

        assert_eq!(config.node_id, "bay-7");
        assert_eq!(config.bind_addr, "0.0.0.0:9100");
        assert_eq!(config.session_idle_timeout, Duration::from_secs(30));
        assert_eq!(config.rng_seed, Some(1234));
        assert_eq!(config.calibration.max_offset_fraction, 0.2);
        assert_eq!(config.calibration.drift_fraction, 0.15);
    }

    #[test]
    fn test_bad_values_rejected() {
        let err = NodeConfig::from_lookup(lookup(&[("ROBOFLEET_RNG_SEED", "abc")])).unwrap_err();
        assert!(err.to_string().contains("ROBOFLEET_RNG_SEED"));

        assert!(NodeConfig::from_lookup(lookup(&[("ROBOFLEET_DRIFT_FRACTION", "-0.1")])).is_err());
        assert!(NodeConfig::from_lookup(lookup(&[("ROBOFLEET_SESSION_IDLE_SECS", "0")])).is_err());
    }

    #[test]
    fn test_fractions_capped_at_whole_width() {
        for value in ["1e307", "1.5", "NaN", "inf"] {
            let err = NodeConfig::from_lookup(lookup(&[("ROBOFLEET_MAX_OFFSET_FRACTION", value)]))
                .unwrap_err();
            assert!(err.to_string().contains("between 0 and 1"), "{}: {}", value, err);
        }
        assert!(NodeConfig::from_lookup(lookup(&[("ROBOFLEET_DRIFT_FRACTION", "2")])).is_err());

        let config =
            NodeConfig::from_lookup(lookup(&[("ROBOFLEET_MAX_OFFSET_FRACTION", "1")])).unwrap();
        assert_eq!(config.calibration.max_offset_fraction, 1.0);
    }

    #[test]
    fn test_seeded_rng_repeats() {
        let config = NodeConfig {
            rng_seed: Some(99),
            ..Default::default()
        };
        let a: u64 = config.build_rng().gen();
        let b: u64 = config.build_rng().gen();
        assert_eq!(a, b);
    }
}
