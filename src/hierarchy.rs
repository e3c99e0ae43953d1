// Assembly of the three-level summary, the national baseline and the
// flattened search index.
use crate::aggregate::group_by;
use crate::stats;
use crate::types::{
    coarse_prefix, medium_prefix, CoarseEntry, Counters, FineEntry, Hierarchy, Level, MediumEntry,
    Meta, RawRecord, SearchIndexEntry,
};
use chrono::Local;
use std::collections::BTreeMap;

/// Build the full hierarchy from cleaned records in three aggregation
/// passes (fine, medium, coarse), plus the national baseline.
///
/// The baseline sums raw counters over every fine-level group before any
/// ratio is derived; it is never a combination of per-group ratios.
pub fn build(records: &[RawRecord], source: &str) -> Hierarchy {
    // Fine pass keys on the exact fine code, which merges duplicate codes
    // appearing under different committee classifications in the raw file.
    let fine_groups = group_by(records, |r| Some(r.fine_code.as_str()), |r| r.label.as_str());
    let mut by_fine: BTreeMap<String, FineEntry> = BTreeMap::new();
    for (code, g) in &fine_groups {
        by_fine.insert(
            code.clone(),
            FineEntry {
                label: g.label.clone(),
                medium_code: medium_prefix(code).to_string(),
                coarse_code: coarse_prefix(code).to_string(),
                stats: stats::derive(&g.counters),
                risk_causes: stats::normalize_causes(&g.cause_sums, g.counters.lost_time_accidents),
            },
        );
    }

    let medium_groups = group_by(records, |r| Some(r.medium_code()), |r| r.label.as_str());
    let mut by_medium: BTreeMap<String, MediumEntry> = BTreeMap::new();
    for (code, g) in &medium_groups {
        let mut fine_codes: Vec<String> = g.source_codes.clone();
        fine_codes.sort();
        fine_codes.dedup();
        by_medium.insert(
            code.clone(),
            MediumEntry {
                label: g.label.clone(),
                coarse_code: coarse_prefix(code).to_string(),
                fine_codes,
                stats: stats::derive(&g.counters),
                risk_causes: stats::normalize_causes(&g.cause_sums, g.counters.lost_time_accidents),
            },
        );
    }

    // Coarse pass keys on the coarse code carried by the record (the loader
    // already applied the fine-prefix fallback) and prefers the dedicated
    // coarse label over the fine one.
    let coarse_groups = group_by(
        records,
        |r| Some(r.coarse_code.as_str()),
        |r| {
            if r.coarse_label.is_empty() {
                r.label.as_str()
            } else {
                r.coarse_label.as_str()
            }
        },
    );
    let mut by_coarse: BTreeMap<String, CoarseEntry> = BTreeMap::new();
    for (code, g) in &coarse_groups {
        by_coarse.insert(
            code.clone(),
            CoarseEntry {
                label: g.label.clone(),
                stats: stats::derive(&g.counters),
                risk_causes: stats::normalize_causes(&g.cause_sums, g.counters.lost_time_accidents),
            },
        );
    }

    let mut national = Counters::default();
    for g in fine_groups.values() {
        national.add(&g.counters);
    }

    let search_index = build_search_index(&by_fine, &by_medium, &by_coarse);

    Hierarchy {
        meta: Meta {
            source: source.to_string(),
            generated: Local::now().format("%Y-%m-%d").to_string(),
            national: stats::derive(&national),
        },
        by_fine,
        by_medium,
        by_coarse,
        search_index,
    }
}

/// Flatten the three level maps into one list ordered by (level, code),
/// where the level order is the fixed fine < medium < coarse total order.
pub fn build_search_index(
    by_fine: &BTreeMap<String, FineEntry>,
    by_medium: &BTreeMap<String, MediumEntry>,
    by_coarse: &BTreeMap<String, CoarseEntry>,
) -> Vec<SearchIndexEntry> {
    let mut index: Vec<SearchIndexEntry> = Vec::new();
    for (code, e) in by_fine {
        index.push(SearchIndexEntry {
            code: code.clone(),
            label: e.label.clone(),
            level: Level::Fine,
        });
    }
    for (code, e) in by_medium {
        index.push(SearchIndexEntry {
            code: code.clone(),
            label: e.label.clone(),
            level: Level::Medium,
        });
    }
    for (code, e) in by_coarse {
        index.push(SearchIndexEntry {
            code: code.clone(),
            label: e.label.clone(),
            level: Level::Coarse,
        });
    }
    index.sort_by(|a, b| a.level.cmp(&b.level).then_with(|| a.code.cmp(&b.code)));
    index
}
