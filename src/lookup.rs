// Point lookups and substring search against an assembled hierarchy.
//
// Everything here reads an explicitly passed `&Hierarchy` snapshot; there is
// no interior state, so any number of readers can query concurrently.
use crate::types::{Hierarchy, Level, SearchIndexEntry, StatBlock};
use crate::util::round1;
use serde::Serialize;
use std::collections::BTreeMap;

pub const MAX_SEARCH_RESULTS: usize = 20;

/// One ratio compared against the national baseline.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RatioComparison {
    pub sector: f64,
    pub national: f64,
    /// Percent deviation from the baseline; 0 when the baseline itself is 0.
    pub deviation_pct: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VsNational {
    pub frequency_index: RatioComparison,
    pub severity_rate: RatioComparison,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntryDetails {
    pub code: String,
    pub level: Level,
    pub label: String,
    pub stats: StatBlock,
    pub risk_causes: BTreeMap<String, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medium_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coarse_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fine_codes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vs_national: Option<VsNational>,
}

/// Lookup result: either the entry, or a structured miss naming the code
/// and the level that was tried. A miss is a normal outcome, not an error.
#[derive(Debug, Clone, Serialize)]
pub enum LookupOutcome {
    Found(Box<EntryDetails>),
    NotFound { code: String, level: Level },
}

/// Classify an input code into a granularity level.
///
/// Format heuristics first (5 chars ending in a letter / 4 digits / any 2
/// chars), then membership probes in fine → medium → coarse order, and
/// finally a deliberate fine default so the subsequent lookup reports a
/// plain "not found".
pub fn resolve_level(h: &Hierarchy, code: &str) -> Level {
    let code = code.trim();
    if code.len() == 5 && code.chars().last().is_some_and(|c| c.is_ascii_alphabetic()) {
        return Level::Fine;
    }
    if code.len() == 4 && code.chars().all(|c| c.is_ascii_digit()) {
        return Level::Medium;
    }
    if code.len() == 2 {
        return Level::Coarse;
    }
    if h.by_fine.contains_key(code) {
        return Level::Fine;
    }
    if h.by_medium.contains_key(code) {
        return Level::Medium;
    }
    if h.by_coarse.contains_key(code) {
        return Level::Coarse;
    }
    Level::Fine
}

/// Resolve a code to its entry, optionally annotated with the deviation of
/// both ratios from the national baseline.
pub fn get_entry(h: &Hierarchy, code: &str, compare_national: bool) -> LookupOutcome {
    let code = code.trim().to_uppercase();
    let level = resolve_level(h, &code);

    let details = match level {
        Level::Fine => h.by_fine.get(&code).map(|e| EntryDetails {
            code: code.clone(),
            level,
            label: e.label.clone(),
            stats: e.stats.clone(),
            risk_causes: e.risk_causes.clone(),
            medium_code: Some(e.medium_code.clone()),
            coarse_code: Some(e.coarse_code.clone()),
            fine_codes: None,
            vs_national: None,
        }),
        Level::Medium => h.by_medium.get(&code).map(|e| EntryDetails {
            code: code.clone(),
            level,
            label: e.label.clone(),
            stats: e.stats.clone(),
            risk_causes: e.risk_causes.clone(),
            medium_code: None,
            coarse_code: Some(e.coarse_code.clone()),
            fine_codes: Some(e.fine_codes.clone()),
            vs_national: None,
        }),
        Level::Coarse => h.by_coarse.get(&code).map(|e| EntryDetails {
            code: code.clone(),
            level,
            label: e.label.clone(),
            stats: e.stats.clone(),
            risk_causes: e.risk_causes.clone(),
            medium_code: None,
            coarse_code: None,
            fine_codes: None,
            vs_national: None,
        }),
    };

    match details {
        None => LookupOutcome::NotFound { code, level },
        Some(mut d) => {
            if compare_national {
                d.vs_national = Some(compare_to_national(&d.stats, &h.meta.national));
            }
            LookupOutcome::Found(Box::new(d))
        }
    }
}

fn compare_to_national(sector: &StatBlock, national: &StatBlock) -> VsNational {
    VsNational {
        frequency_index: compare_ratio(sector.frequency_index, national.frequency_index),
        severity_rate: compare_ratio(sector.severity_rate, national.severity_rate),
    }
}

fn compare_ratio(sector: f64, national: f64) -> RatioComparison {
    let deviation_pct = if national > 0.0 {
        round1((sector - national) / national * 100.0)
    } else {
        0.0
    };
    RatioComparison {
        sector,
        national,
        deviation_pct,
    }
}

/// Case-insensitive substring search over codes and labels, honoring an
/// optional level filter. Returns at most `MAX_SEARCH_RESULTS` entries in
/// index order; truncation is first-match-wins, not relevance-ranked.
pub fn search(h: &Hierarchy, query: &str, level_filter: Option<Level>) -> Vec<SearchIndexEntry> {
    let query = query.trim().to_lowercase();
    let mut results: Vec<SearchIndexEntry> = Vec::new();
    for entry in &h.search_index {
        if let Some(level) = level_filter {
            if entry.level != level {
                continue;
            }
        }
        if entry.code.to_lowercase().contains(&query)
            || entry.label.to_lowercase().contains(&query)
        {
            results.push(entry.clone());
        }
        if results.len() >= MAX_SEARCH_RESULTS {
            break;
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy;
    use crate::types::{Counters, RawRecord};

    fn record(fine: &str, label: &str, workforce: f64, at_4j: f64) -> RawRecord {
        RawRecord {
            fine_code: fine.to_string(),
            coarse_code: fine.get(..2).unwrap_or(fine).to_string(),
            label: label.to_string(),
            coarse_label: String::new(),
            counters: Counters {
                workforce,
                hours_worked: workforce * 1600.0,
                lost_time_accidents: at_4j,
                lost_workdays: at_4j * 32.0,
                ..Counters::default()
            },
            risk_causes: BTreeMap::from([("Chutes de hauteur".to_string(), at_4j)]),
        }
    }

    fn sample() -> Hierarchy {
        hierarchy::build(
            &[
                record("4711D", "Supermarches", 100.0, 20.0),
                record("4399C", "Travaux de maconnerie", 50.0, 10.0),
                record("4399D", "Chutes de hauteur specialisees", 25.0, 5.0),
            ],
            "test",
        )
    }

    #[test]
    fn resolve_level_uses_format_heuristics() {
        let h = sample();
        assert_eq!(resolve_level(&h, "4711D"), Level::Fine);
        assert_eq!(resolve_level(&h, "4711"), Level::Medium);
        assert_eq!(resolve_level(&h, "47"), Level::Coarse);
        assert_eq!(resolve_level(&h, " 4399C "), Level::Fine);
        // No format match and no membership anywhere: deliberate fine default.
        assert_eq!(resolve_level(&h, "43999"), Level::Fine);
        assert_eq!(resolve_level(&h, "unknown-code"), Level::Fine);
    }

    #[test]
    fn get_entry_round_trips_each_level() {
        let h = sample();
        for (code, level) in [
            ("4711D", Level::Fine),
            ("4399", Level::Medium),
            ("43", Level::Coarse),
        ] {
            match get_entry(&h, code, false) {
                LookupOutcome::Found(d) => {
                    assert_eq!(d.code, code);
                    assert_eq!(d.level, level);
                }
                LookupOutcome::NotFound { .. } => panic!("{code} should resolve"),
            }
        }
    }

    #[test]
    fn get_entry_normalizes_case_and_whitespace() {
        let h = sample();
        match get_entry(&h, " 4711d ", false) {
            LookupOutcome::Found(d) => {
                assert_eq!(d.code, "4711D");
                assert_eq!(d.medium_code.as_deref(), Some("4711"));
                assert_eq!(d.coarse_code.as_deref(), Some("47"));
            }
            LookupOutcome::NotFound { .. } => panic!("lowercase input should resolve"),
        }
    }

    #[test]
    fn get_entry_reports_attempted_level_on_miss() {
        let h = sample();
        match get_entry(&h, "99", true) {
            LookupOutcome::NotFound { code, level } => {
                assert_eq!(code, "99");
                assert_eq!(level, Level::Coarse);
            }
            LookupOutcome::Found(_) => panic!("99 is not in any level"),
        }
    }

    #[test]
    fn national_comparison_deviation() {
        let h = sample();
        // National: 35 accidents / 175 workers => IF 200.0.
        let LookupOutcome::Found(d) = get_entry(&h, "4711D", true) else {
            panic!("4711D should resolve");
        };
        let vs = d.vs_national.expect("comparison requested");
        assert_eq!(vs.frequency_index.sector, 200.0);
        assert_eq!(vs.frequency_index.national, 200.0);
        assert_eq!(vs.frequency_index.deviation_pct, 0.0);
        assert_eq!(vs.severity_rate.national, 4.0);
    }

    #[test]
    fn deviation_is_zero_when_baseline_is_zero() {
        let c = compare_ratio(12.5, 0.0);
        assert_eq!(c.deviation_pct, 0.0);
        let c = compare_ratio(30.0, 20.0);
        assert_eq!(c.deviation_pct, 50.0);
    }

    #[test]
    fn search_matches_codes_and_labels_case_insensitively() {
        let h = sample();
        let results = search(&h, "CHUTES", None);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].code, "4399D");
        assert_eq!(results[0].level, Level::Fine);
        let by_code = search(&h, "4711", None);
        assert!(by_code.iter().any(|e| e.code == "4711D"));
        assert!(by_code.iter().any(|e| e.code == "4711"));
    }

    #[test]
    fn search_respects_level_filter_and_index_order() {
        let h = sample();
        let results = search(&h, "43", Some(Level::Fine));
        let codes: Vec<&str> = results.iter().map(|e| e.code.as_str()).collect();
        assert_eq!(codes, vec!["4399C", "4399D"]);
        assert!(results.iter().all(|e| e.level == Level::Fine));
    }

    #[test]
    fn search_truncates_at_the_result_cap() {
        let records: Vec<RawRecord> = (0..30)
            .map(|i| record(&format!("10{:02}A", i), "Fabrication", 10.0, 1.0))
            .collect();
        let h = hierarchy::build(&records, "test");
        let results = search(&h, "fabrication", None);
        assert_eq!(results.len(), MAX_SEARCH_RESULTS);
    }
}
