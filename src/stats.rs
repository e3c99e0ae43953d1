// Ratio derivation over summed raw counters.
//
// Both functions here are pure: ratios are always computed from re-summed
// raw numbers at the target granularity, never by combining ratios that
// were already derived at a finer one.
use crate::types::{Counters, StatBlock};
use crate::util::{round1, round2};
use std::collections::BTreeMap;

/// Derive the per-group statistics block from summed raw counters.
///
/// - frequency index = 4-day-plus accidents per 1,000 workers (1 decimal);
/// - severity rate = lost workdays per 1,000 hours worked (2 decimals);
/// - either ratio is 0 when its denominator is 0.
///
/// The counters themselves truncate to whole numbers here; fractional
/// accumulation is preserved up to this point.
pub fn derive(c: &Counters) -> StatBlock {
    let frequency_index = if c.workforce > 0.0 {
        round1(c.lost_time_accidents / c.workforce * 1000.0)
    } else {
        0.0
    };
    let severity_rate = if c.hours_worked > 0.0 {
        round2(c.lost_workdays / (c.hours_worked / 1000.0))
    } else {
        0.0
    };
    StatBlock {
        workforce: c.workforce as u64,
        hours_worked: c.hours_worked as u64,
        establishments: c.establishments as u64,
        first_settlements: c.first_settlements as u64,
        lost_time_accidents: c.lost_time_accidents as u64,
        new_disabilities: c.new_disabilities as u64,
        deaths: c.deaths as u64,
        lost_workdays: c.lost_workdays as u64,
        frequency_index,
        severity_rate,
    }
}

/// Convert a group's summed raw cause counts into percentages of that same
/// group's 4-day-plus accident total, 1 decimal each.
///
/// A zero total maps every cause to 0 rather than omitting it. Percentages
/// are rounded independently, so they need not sum to exactly 100.
pub fn normalize_causes(cause_sums: &BTreeMap<String, f64>, total: f64) -> BTreeMap<String, f64> {
    cause_sums
        .iter()
        .map(|(name, count)| {
            let pct = if total > 0.0 {
                round1(count / total * 100.0)
            } else {
                0.0
            };
            (name.clone(), pct)
        })
        .collect()
}
