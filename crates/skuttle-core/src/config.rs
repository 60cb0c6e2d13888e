//! Reconciler configuration and startup validation

use crate::error::ConfigError;
use std::time::Duration;

/// Settings the decision engine consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Log deletion decisions instead of executing them
    pub dry_run: bool,

    /// How long a node may stay NotReady before the provider is consulted
    pub not_ready_tolerance: Duration,
}

impl ReconcilerConfig {
    pub fn new(dry_run: bool, not_ready_tolerance: Duration) -> Result<Self, ConfigError> {
        if not_ready_tolerance.is_zero() {
            return Err(ConfigError::ZeroDuration {
                name: "not-ready-duration",
            });
        }

        Ok(Self {
            dry_run,
            not_ready_tolerance,
        })
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            not_ready_tolerance: Duration::from_secs(10 * 60),
        }
    }
}

/// Parse a Go-style duration such as `10m`, `1h30m`, `1.5h` or `500ms`
pub fn parse_duration(value: &str) -> Result<Duration, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidDuration {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(invalid("empty duration"));
    }
    if trimmed == "0" {
        return Ok(Duration::ZERO);
    }

    let is_number = |c: char| c.is_ascii_digit() || c == '.';
    let mut total = Duration::ZERO;
    let mut rest = trimmed;

    while !rest.is_empty() {
        let number_len = rest.find(|c: char| !is_number(c)).unwrap_or(rest.len());
        if number_len == 0 {
            return Err(invalid("expected a number"));
        }
        let (number, tail) = rest.split_at(number_len);

        let unit_len = tail.find(is_number).unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);

        let number: f64 = number.parse().map_err(|_| invalid("malformed number"))?;
        let seconds_per_unit = match unit {
            "ns" => 1e-9,
            "us" | "µs" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            "" => return Err(invalid("missing unit")),
            other => return Err(invalid(&format!("unknown unit {:?}", other))),
        };

        let part = Duration::try_from_secs_f64(number * seconds_per_unit)
            .map_err(|_| invalid("out of range"))?;
        total = total
            .checked_add(part)
            .ok_or_else(|| invalid("out of range"))?;
        rest = tail;
    }

    Ok(total)
}

/// Split and validate a comma-separated provider list against the prefixes
/// this build can construct
pub fn parse_provider_prefixes(
    value: &str,
    available: &[&str],
) -> Result<Vec<String>, ConfigError> {
    let mut prefixes: Vec<String> = Vec::new();

    for prefix in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if !available.contains(&prefix) {
            return Err(ConfigError::UnknownProvider(prefix.to_string()));
        }
        if prefixes.iter().any(|p| p == prefix) {
            return Err(ConfigError::DuplicateProvider(prefix.to_string()));
        }
        prefixes.push(prefix.to_string());
    }

    if prefixes.is_empty() {
        return Err(ConfigError::NoProviders);
    }

    Ok(prefixes)
}
