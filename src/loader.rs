use crate::types::{coarse_prefix, Counters, RawRecord, RawRow, RISK_CAUSES};
use crate::util::num_or_zero;
use csv::ReaderBuilder;
use std::collections::BTreeMap;
use std::error::Error;
use std::io::Read;

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub total_rows: usize,
    pub kept_rows: usize,
    pub skipped_no_code: usize,
    pub parse_errors: usize,
}

pub fn load_and_clean(path: &str) -> Result<(Vec<RawRecord>, LoadReport), Box<dyn Error>> {
    let rdr = ReaderBuilder::new().flexible(true).from_path(path)?;
    Ok(clean_rows(rdr))
}

/// Clean an already-open CSV reader. Split out from `load_and_clean` so
/// tests can feed in-memory data through the same path.
pub fn clean_rows<R: Read>(mut rdr: csv::Reader<R>) -> (Vec<RawRecord>, LoadReport) {
    let mut total_rows = 0usize;
    let mut skipped_no_code = 0usize;
    let mut parse_errors = 0usize;
    let mut records: Vec<RawRecord> = Vec::new();

    for result in rdr.deserialize::<RawRow>() {
        total_rows += 1;
        let row = match result {
            Ok(r) => r,
            Err(_) => {
                parse_errors += 1;
                continue;
            }
        };

        // Rows without a fine sector code carry no usable statistics.
        let fine_code = match row.fine_code.as_deref().map(str::trim) {
            Some(c) if !c.is_empty() => c.to_string(),
            _ => {
                skipped_no_code += 1;
                continue;
            }
        };

        // The coarse code is sourced directly; blank cells fall back to the
        // leading two characters of the fine code.
        let coarse_code = match row.coarse_code.as_deref().map(str::trim) {
            Some(c) if !c.is_empty() => c.to_string(),
            _ => coarse_prefix(&fine_code).to_string(),
        };

        let label = row.label.as_deref().unwrap_or("").trim().to_string();
        let coarse_label = row.coarse_label.as_deref().unwrap_or("").trim().to_string();

        let counters = Counters {
            workforce: num_or_zero(row.workforce.as_deref()),
            hours_worked: num_or_zero(row.hours_worked.as_deref()),
            establishments: num_or_zero(row.establishments.as_deref()),
            first_settlements: num_or_zero(row.first_settlements.as_deref()),
            lost_time_accidents: num_or_zero(row.lost_time_accidents.as_deref()),
            new_disabilities: num_or_zero(row.new_disabilities.as_deref()),
            deaths: num_or_zero(row.deaths.as_deref()),
            lost_workdays: num_or_zero(row.lost_workdays.as_deref()),
        };

        let cause_values = [
            row.cause_manual_handling.as_deref(),
            row.cause_same_level_falls.as_deref(),
            row.cause_chemical.as_deref(),
            row.cause_falls_from_height.as_deref(),
            row.cause_physical.as_deref(),
            row.cause_machinery.as_deref(),
            row.cause_hand_tools.as_deref(),
            row.cause_road.as_deref(),
            row.cause_assault.as_deref(),
            row.cause_mechanical_handling.as_deref(),
            row.cause_other.as_deref(),
            row.cause_other_vehicles.as_deref(),
        ];
        let risk_causes: BTreeMap<String, f64> = RISK_CAUSES
            .iter()
            .zip(cause_values)
            .map(|(name, val)| (name.to_string(), num_or_zero(val)))
            .collect();

        records.push(RawRecord {
            fine_code,
            coarse_code,
            label,
            coarse_label,
            counters,
            risk_causes,
        });
    }

    let report = LoadReport {
        total_rows,
        kept_rows: records.len(),
        skipped_no_code,
        parse_errors,
    };
    (records, report)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "ctn,naf5,libelle_naf,naf2,libelle_naf2,nb_salaries,nb_heures,nb_siret,at_1er_reglement,at_4j_arret,nouvelles_ip,deces,journees_it,Manutention manuelle,Chutes de plain-pied,Risque chimique,Chutes de hauteur,Risque physique,Risque machines,Outillage a main,Risque routier,Agressions,Manutention mecanique,Autres risques,Autres vehicules";

    fn load(body: &str) -> (Vec<RawRecord>, LoadReport) {
        let data = format!("{HEADER}\n{body}");
        let rdr = ReaderBuilder::new()
            .flexible(true)
            .from_reader(data.as_bytes());
        clean_rows(rdr)
    }

    #[test]
    fn drops_rows_without_fine_code() {
        let (records, report) = load(
            "A,4711D,Supermarches,47,Commerce,100,150000,10,12,10,1,0,500,2,1,0,3,0,0,0,1,0,0,3,0\n\
             B,,Sans code,47,Commerce,50,80000,5,6,5,0,0,200,1,0,0,1,0,0,0,0,0,0,3,0",
        );
        assert_eq!(report.total_rows, 2);
        assert_eq!(report.kept_rows, 1);
        assert_eq!(report.skipped_no_code, 1);
        assert_eq!(records[0].fine_code, "4711D");
    }

    #[test]
    fn coerces_bad_numerics_to_zero() {
        let (records, _) = load("A,4711D,Supermarches,47,Commerce,abc,,10,12,n/a,1,0,500,,,,,,,,,,,,");
        let c = &records[0].counters;
        assert_eq!(c.workforce, 0.0);
        assert_eq!(c.hours_worked, 0.0);
        assert_eq!(c.lost_time_accidents, 0.0);
        assert_eq!(c.establishments, 10.0);
        assert!(records[0].risk_causes.values().all(|v| *v == 0.0));
        assert_eq!(records[0].risk_causes.len(), RISK_CAUSES.len());
    }

    #[test]
    fn coarse_code_falls_back_to_prefix() {
        let (records, _) = load("A,4711D,Supermarches,,,100,150000,10,12,10,1,0,500,0,0,0,0,0,0,0,0,0,0,0,0");
        assert_eq!(records[0].coarse_code, "47");
    }
}
