use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tabled::Tabled;

/// The twelve risk-cause columns of the source table, in file order.
/// Names are kept verbatim so output keys match the published dataset.
pub const RISK_CAUSES: [&str; 12] = [
    "Manutention manuelle",
    "Chutes de plain-pied",
    "Risque chimique",
    "Chutes de hauteur",
    "Risque physique",
    "Risque machines",
    "Outillage a main",
    "Risque routier",
    "Agressions",
    "Manutention mecanique",
    "Autres risques",
    "Autres vehicules",
];

#[derive(Debug, Deserialize)]
pub struct RawRow {
    #[serde(rename = "ctn")]
    pub ctn: Option<String>,
    #[serde(rename = "naf5")]
    pub fine_code: Option<String>,
    #[serde(rename = "libelle_naf")]
    pub label: Option<String>,
    #[serde(rename = "naf2")]
    pub coarse_code: Option<String>,
    #[serde(rename = "libelle_naf2")]
    pub coarse_label: Option<String>,
    #[serde(rename = "nb_salaries")]
    pub workforce: Option<String>,
    #[serde(rename = "nb_heures")]
    pub hours_worked: Option<String>,
    #[serde(rename = "nb_siret")]
    pub establishments: Option<String>,
    #[serde(rename = "at_1er_reglement")]
    pub first_settlements: Option<String>,
    #[serde(rename = "at_4j_arret")]
    pub lost_time_accidents: Option<String>,
    #[serde(rename = "nouvelles_ip")]
    pub new_disabilities: Option<String>,
    #[serde(rename = "deces")]
    pub deaths: Option<String>,
    #[serde(rename = "journees_it")]
    pub lost_workdays: Option<String>,
    #[serde(rename = "Manutention manuelle")]
    pub cause_manual_handling: Option<String>,
    #[serde(rename = "Chutes de plain-pied")]
    pub cause_same_level_falls: Option<String>,
    #[serde(rename = "Risque chimique")]
    pub cause_chemical: Option<String>,
    #[serde(rename = "Chutes de hauteur")]
    pub cause_falls_from_height: Option<String>,
    #[serde(rename = "Risque physique")]
    pub cause_physical: Option<String>,
    #[serde(rename = "Risque machines")]
    pub cause_machinery: Option<String>,
    #[serde(rename = "Outillage a main")]
    pub cause_hand_tools: Option<String>,
    #[serde(rename = "Risque routier")]
    pub cause_road: Option<String>,
    #[serde(rename = "Agressions")]
    pub cause_assault: Option<String>,
    #[serde(rename = "Manutention mecanique")]
    pub cause_mechanical_handling: Option<String>,
    #[serde(rename = "Autres risques")]
    pub cause_other: Option<String>,
    #[serde(rename = "Autres vehicules")]
    pub cause_other_vehicles: Option<String>,
}

/// The eight additive counters. Kept as `f64` while accumulating because the
/// source sheet occasionally carries fractional values; truncation to whole
/// numbers happens only when a `StatBlock` is derived.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Counters {
    pub workforce: f64,
    pub hours_worked: f64,
    pub establishments: f64,
    pub first_settlements: f64,
    pub lost_time_accidents: f64,
    pub new_disabilities: f64,
    pub deaths: f64,
    pub lost_workdays: f64,
}

impl Counters {
    pub fn add(&mut self, other: &Counters) {
        self.workforce += other.workforce;
        self.hours_worked += other.hours_worked;
        self.establishments += other.establishments;
        self.first_settlements += other.first_settlements;
        self.lost_time_accidents += other.lost_time_accidents;
        self.new_disabilities += other.new_disabilities;
        self.deaths += other.deaths;
        self.lost_workdays += other.lost_workdays;
    }
}

/// One cleaned input row. Produced once by the loader and immutable from
/// then on; the aggregation core never re-validates these fields.
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub fine_code: String,
    pub coarse_code: String,
    pub label: String,
    pub coarse_label: String,
    pub counters: Counters,
    pub risk_causes: BTreeMap<String, f64>,
}

impl RawRecord {
    /// Medium-granularity code: the 4-character prefix of the fine code.
    pub fn medium_code(&self) -> &str {
        medium_prefix(&self.fine_code)
    }
}

pub fn medium_prefix(code: &str) -> &str {
    code.get(..4).unwrap_or(code)
}

pub fn coarse_prefix(code: &str) -> &str {
    code.get(..2).unwrap_or(code)
}

/// Raw sums plus the two derived ratios for one group. Built once per group
/// by `stats::derive` and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatBlock {
    pub workforce: u64,
    pub hours_worked: u64,
    pub establishments: u64,
    pub first_settlements: u64,
    pub lost_time_accidents: u64,
    pub new_disabilities: u64,
    pub deaths: u64,
    pub lost_workdays: u64,
    pub frequency_index: f64,
    pub severity_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Fine,
    Medium,
    Coarse,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Fine => "fine",
            Level::Medium => "medium",
            Level::Coarse => "coarse",
        }
    }

    /// Parse a user-supplied level filter; anything unrecognized (including
    /// the empty string) means "all levels".
    pub fn from_input(s: &str) -> Option<Level> {
        match s.trim().to_lowercase().as_str() {
            "fine" => Some(Level::Fine),
            "medium" => Some(Level::Medium),
            "coarse" => Some(Level::Coarse),
            _ => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FineEntry {
    pub label: String,
    pub medium_code: String,
    pub coarse_code: String,
    pub stats: StatBlock,
    pub risk_causes: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MediumEntry {
    pub label: String,
    pub coarse_code: String,
    /// Sorted, de-duplicated fine codes that fed this group.
    pub fine_codes: Vec<String>,
    pub stats: StatBlock,
    pub risk_causes: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoarseEntry {
    pub label: String,
    pub stats: StatBlock,
    pub risk_causes: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct SearchIndexEntry {
    #[tabled(rename = "Code")]
    pub code: String,
    #[tabled(rename = "Libelle")]
    pub label: String,
    #[tabled(rename = "Level")]
    pub level: Level,
}

#[derive(Debug, Clone, Serialize)]
pub struct Meta {
    pub source: String,
    pub generated: String,
    pub national: StatBlock,
}

/// The assembled three-level summary. Immutable once built; refresh means
/// rebuilding the whole value and swapping it in as one snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct Hierarchy {
    pub meta: Meta,
    pub by_fine: BTreeMap<String, FineEntry>,
    pub by_medium: BTreeMap<String, MediumEntry>,
    pub by_coarse: BTreeMap<String, CoarseEntry>,
    pub search_index: Vec<SearchIndexEntry>,
}
