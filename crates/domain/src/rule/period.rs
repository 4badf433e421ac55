//! Check-period grammar: a bare integer is milliseconds, otherwise an
//! integer immediately followed by a unit keyword (`MILLISECONDS`,
//! `SECONDS`, `MINUTES`, `HOURS`). No whitespace anywhere.

use super::Rule;
use super::error::RuleError;

/// Parse an optional period string into milliseconds. `None` means no
/// period and yields 0; anything outside the grammar is rejected.
pub fn parse_period(period: Option<&str>) -> Result<i64, RuleError> {
    let Some(period) = period else {
        return Ok(0);
    };
    let digits_end = period
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(period.len());
    let (digits, unit) = period.split_at(digits_end);
    let value: i64 = digits
        .parse()
        .map_err(|_| RuleError::InvalidPeriodSyntax(period.to_string()))?;
    let multiplier = match unit {
        "" | "MILLISECONDS" => 1,
        "SECONDS" => 1_000,
        "MINUTES" => 60_000,
        "HOURS" => 3_600_000,
        _ => return Err(RuleError::InvalidPeriodSyntax(period.to_string())),
    };
    Ok(value * multiplier)
}

/// The shortest period across `rules` in milliseconds. Rules without
/// a period contribute 0. Returns `None` only when there are no rules
/// at all.
pub fn oldest_period(rules: &[Rule]) -> Result<Option<i64>, RuleError> {
    let mut oldest = None;
    for rule in rules {
        let period = parse_period(rule.period.as_deref())?;
        if oldest.is_none_or(|current| period < current) {
            oldest = Some(period);
        }
    }
    Ok(oldest)
}
