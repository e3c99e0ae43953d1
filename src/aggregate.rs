// Single-pass grouping of raw records by a caller-supplied key.
use crate::types::{Counters, RawRecord};
use std::collections::{BTreeMap, HashMap};

/// Running sums for one group during an aggregation pass. Transient: frozen
/// into a `StatBlock` + cause distribution by the hierarchy builder, then
/// discarded.
#[derive(Debug, Default)]
pub struct AggregateGroup {
    pub counters: Counters,
    pub cause_sums: BTreeMap<String, f64>,
    /// Fine codes that contributed to this group, in input order and with
    /// duplicates; consumers sort/de-duplicate as needed.
    pub source_codes: Vec<String>,
    pub label: String,
}

/// Group records by `key_fn`, summing the eight counters and the raw cause
/// counts per key. A `None` or empty key skips the record. `label_fn` picks
/// which label field feeds the group label; the first non-empty value seen
/// wins, a documented tie-break that depends on input order.
///
/// The returned map carries no ordering guarantee; consumers impose order by
/// sorting. No entry exists for a key never seen in the input.
pub fn group_by<'a, K, L>(
    records: &'a [RawRecord],
    key_fn: K,
    label_fn: L,
) -> HashMap<String, AggregateGroup>
where
    K: Fn(&'a RawRecord) -> Option<&'a str>,
    L: Fn(&'a RawRecord) -> &'a str,
{
    let mut groups: HashMap<String, AggregateGroup> = HashMap::new();
    for r in records {
        let key = match key_fn(r) {
            Some(k) if !k.is_empty() => k,
            _ => continue,
        };
        let g = groups.entry(key.to_string()).or_default();
        g.counters.add(&r.counters);
        for (cause, val) in &r.risk_causes {
            *g.cause_sums.entry(cause.clone()).or_insert(0.0) += val;
        }
        g.source_codes.push(r.fine_code.clone());
        if g.label.is_empty() {
            let label = label_fn(r);
            if !label.is_empty() {
                g.label = label.to_string();
            }
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn record(fine: &str, label: &str, workforce: f64, at_4j: f64) -> RawRecord {
        RawRecord {
            fine_code: fine.to_string(),
            coarse_code: fine.get(..2).unwrap_or(fine).to_string(),
            label: label.to_string(),
            coarse_label: String::new(),
            counters: Counters {
                workforce,
                lost_time_accidents: at_4j,
                ..Counters::default()
            },
            risk_causes: BTreeMap::from([("Chutes de hauteur".to_string(), at_4j)]),
        }
    }

    #[test]
    fn duplicate_keys_sum_instead_of_overwriting() {
        let records = vec![
            record("4711D", "Supermarches", 100.0, 10.0),
            record("4711D", "Supermarches", 50.0, 5.0),
        ];
        let groups = group_by(&records, |r| Some(r.fine_code.as_str()), |r| r.label.as_str());
        assert_eq!(groups.len(), 1);
        let g = &groups["4711D"];
        assert_eq!(g.counters.workforce, 150.0);
        assert_eq!(g.counters.lost_time_accidents, 15.0);
        assert_eq!(g.cause_sums["Chutes de hauteur"], 15.0);
        assert_eq!(g.source_codes, vec!["4711D", "4711D"]);
    }

    #[test]
    fn none_key_skips_the_record() {
        let records = vec![record("4711D", "a", 1.0, 0.0), record("0113Z", "b", 2.0, 0.0)];
        let groups = group_by(
            &records,
            |r| if r.fine_code.starts_with('0') { None } else { Some(r.fine_code.as_str()) },
            |r| r.label.as_str(),
        );
        assert_eq!(groups.len(), 1);
        assert!(groups.contains_key("4711D"));
    }

    #[test]
    fn first_non_empty_label_wins() {
        let records = vec![
            record("4711D", "", 1.0, 0.0),
            record("4711D", "Supermarches", 1.0, 0.0),
            record("4711D", "Hypermarches", 1.0, 0.0),
        ];
        let groups = group_by(&records, |r| Some(r.fine_code.as_str()), |r| r.label.as_str());
        assert_eq!(groups["4711D"].label, "Supermarches");
    }

    #[test]
    fn unseen_keys_have_no_entry() {
        let records = vec![record("4711D", "a", 1.0, 0.0)];
        let groups = group_by(&records, |r| Some(r.medium_code()), |r| r.label.as_str());
        assert_eq!(groups.len(), 1);
        assert!(groups.contains_key("4711"));
        assert!(!groups.contains_key("4711D"));
    }
}
