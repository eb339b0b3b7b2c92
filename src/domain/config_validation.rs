//! Configuration loading and validation.
//!
//! Every key is optional and falls back to its default. A key that is present
//! but unparsable or out of range is rejected before anything runs.

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::RegimeTraderError;
use crate::domain::regime::RegimeConfig;
use crate::domain::simulator::SimulationConfig;
use crate::ports::config_port::ConfigPort;

const KNOWN_SECTIONS: [&str; 5] = ["backtest", "regime", "strategy", "data", "report"];

pub const MAX_COOLDOWN_HOURS: i64 = 1_000_000;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), RegimeTraderError> {
    load_backtest_config(config).map(|_| ())
}

pub fn load_backtest_config(
    config: &dyn ConfigPort,
) -> Result<BacktestConfig, RegimeTraderError> {
    for section in config.sections() {
        if !KNOWN_SECTIONS.contains(&section.as_str()) {
            tracing::warn!("ignoring unknown config section [{}]", section);
        }
    }

    let sim_defaults = SimulationConfig::default();
    let regime_defaults = RegimeConfig::default();

    let initial_capital =
        read_f64(config, "backtest", "initial_capital", sim_defaults.initial_capital)?;
    require(initial_capital > 0.0, "backtest", "initial_capital", "must be positive")?;

    let leverage = read_f64(config, "backtest", "leverage", sim_defaults.leverage)?;
    require(leverage > 0.0, "backtest", "leverage", "must be positive")?;

    let min_entry_votes = read_i64(
        config,
        "strategy",
        "min_entry_votes",
        sim_defaults.min_entry_votes as i64,
    )?;
    require(
        (0..=8).contains(&min_entry_votes),
        "strategy",
        "min_entry_votes",
        "must be between 0 and 8",
    )?;

    let cooldown_hours = read_i64(
        config,
        "strategy",
        "cooldown_hours",
        sim_defaults.cooldown_hours,
    )?;
    require(cooldown_hours >= 0, "strategy", "cooldown_hours", "must be non-negative")?;
    require(
        cooldown_hours <= MAX_COOLDOWN_HOURS,
        "strategy",
        "cooldown_hours",
        "must not exceed 1000000 (about 114 years)",
    )?;

    let n_components = read_i64(
        config,
        "regime",
        "n_components",
        regime_defaults.n_components as i64,
    )?;
    require(n_components >= 2, "regime", "n_components", "must be at least 2")?;

    let random_state = read_i64(
        config,
        "regime",
        "random_state",
        regime_defaults.random_state as i64,
    )?;
    require(random_state >= 0, "regime", "random_state", "must be non-negative")?;

    let n_iter = read_i64(config, "regime", "n_iter", regime_defaults.n_iter as i64)?;
    require(n_iter >= 1, "regime", "n_iter", "must be at least 1")?;

    let tol = read_f64(config, "regime", "tol", regime_defaults.tol)?;
    require(tol > 0.0, "regime", "tol", "must be positive")?;

    let min_covar = read_f64(config, "regime", "min_covar", regime_defaults.min_covar)?;
    require(min_covar > 0.0, "regime", "min_covar", "must be positive")?;

    Ok(BacktestConfig {
        simulation: SimulationConfig {
            initial_capital,
            leverage,
            min_entry_votes: min_entry_votes as u8,
            cooldown_hours,
        },
        regime: RegimeConfig {
            n_components: n_components as usize,
            random_state: random_state as u64,
            n_iter: n_iter as usize,
            tol,
            min_covar,
        },
    })
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> RegimeTraderError {
    RegimeTraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn require(ok: bool, section: &str, key: &str, reason: &str) -> Result<(), RegimeTraderError> {
    if ok {
        Ok(())
    } else {
        Err(invalid(section, key, format!("{} {}", key, reason)))
    }
}

fn read_f64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, RegimeTraderError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(invalid(section, key, format!("expected a number, got '{}'", raw))),
        },
    }
}

fn read_i64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<i64, RegimeTraderError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid(section, key, format!("expected an integer, got '{}'", raw))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    fn assert_invalid(content: &str, expected_key: &str) {
        match validate_config(&make_config(content)) {
            Err(RegimeTraderError::ConfigInvalid { key, .. }) => assert_eq!(key, expected_key),
            other => panic!("expected ConfigInvalid for {}, got {:?}", expected_key, other),
        }
    }

    #[test]
    fn empty_config_uses_defaults() {
        let loaded = load_backtest_config(&make_config("[backtest]\n")).unwrap();
        assert_eq!(loaded, BacktestConfig::default());
    }

    #[test]
    fn full_config_is_read() {
        let content = r#"
[backtest]
initial_capital = 5000
leverage = 1.5

[regime]
n_components = 4
random_state = 7
n_iter = 100
tol = 0.001
min_covar = 0.01

[strategy]
min_entry_votes = 6
cooldown_hours = 24
"#;
        let loaded = load_backtest_config(&make_config(content)).unwrap();
        assert!((loaded.simulation.initial_capital - 5000.0).abs() < f64::EPSILON);
        assert!((loaded.simulation.leverage - 1.5).abs() < f64::EPSILON);
        assert_eq!(loaded.simulation.min_entry_votes, 6);
        assert_eq!(loaded.simulation.cooldown_hours, 24);
        assert_eq!(loaded.regime.n_components, 4);
        assert_eq!(loaded.regime.random_state, 7);
        assert_eq!(loaded.regime.n_iter, 100);
        assert!((loaded.regime.tol - 0.001).abs() < f64::EPSILON);
        assert!((loaded.regime.min_covar - 0.01).abs() < f64::EPSILON);
    }

    #[test]
    fn initial_capital_must_be_positive() {
        assert_invalid("[backtest]\ninitial_capital = 0\n", "initial_capital");
        assert_invalid("[backtest]\ninitial_capital = -10\n", "initial_capital");
    }

    #[test]
    fn cooldown_hours_is_bounded() {
        assert_invalid("[strategy]\ncooldown_hours = -1\n", "cooldown_hours");
        assert_invalid("[strategy]\ncooldown_hours = 5000000000\n", "cooldown_hours");
        let content = "[strategy]\ncooldown_hours = 1000000\n";
        let at_limit = load_backtest_config(&make_config(content)).unwrap();
        assert_eq!(at_limit.simulation.cooldown_hours, MAX_COOLDOWN_HOURS);
    }

    #[test]
    fn non_numeric_value_fails() {
        assert_invalid("[backtest]\nleverage = lots\n", "leverage");
        assert_invalid("[regime]\nn_components = seven\n", "n_components");
    }

    #[test]
    fn leverage_must_be_positive() {
        assert_invalid("[backtest]\nleverage = 0\n", "leverage");
    }

    #[test]
    fn min_entry_votes_range() {
        assert_invalid("[strategy]\nmin_entry_votes = 9\n", "min_entry_votes");
        assert_invalid("[strategy]\nmin_entry_votes = -1\n", "min_entry_votes");
        assert!(validate_config(&make_config("[strategy]\nmin_entry_votes = 8\n")).is_ok());
        assert!(validate_config(&make_config("[strategy]\nmin_entry_votes = 0\n")).is_ok());
    }

    #[test]
    fn cooldown_negative_fails() {
        assert_invalid("[strategy]\ncooldown_hours = -1\n", "cooldown_hours");
    }

    #[test]
    fn regime_bounds() {
        assert_invalid("[regime]\nn_components = 1\n", "n_components");
        assert_invalid("[regime]\nrandom_state = -3\n", "random_state");
        assert_invalid("[regime]\nn_iter = 0\n", "n_iter");
        assert_invalid("[regime]\ntol = 0\n", "tol");
        assert_invalid("[regime]\nmin_covar = -0.1\n", "min_covar");
    }
}
