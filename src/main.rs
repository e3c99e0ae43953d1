// Entry point and high-level CLI flow.
//
// - Option [1] loads and cleans the CSV, builds the hierarchy and prints
//   diagnostics.
// - Option [2] exports the assembled structure as JSON.
// - Options [3] and [4] query the in-memory hierarchy (search / lookup).
use at_report::types::{Hierarchy, Level};
use at_report::{hierarchy, loader, lookup, output, util};
use once_cell::sync::Lazy;
use std::io::{self, Write};
use std::sync::Mutex;

const CSV_PATH: &str = "at-by-sector.csv";
const JSON_PATH: &str = "at-data.json";
const SOURCE_LABEL: &str = "Ameli - Risque AT par CTN x NAF 2023";

// Simple in-memory app state so we build the hierarchy once but can query
// it any number of times in a single run. The hierarchy itself is immutable;
// reloading replaces the whole snapshot.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState { hierarchy: None }));

struct AppState {
    hierarchy: Option<Hierarchy>,
}

/// Print a prompt and read a single trimmed line of input.
fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Handle option [1]: load the CSV, build the hierarchy, print diagnostics.
fn handle_load() {
    match loader::load_and_clean(CSV_PATH) {
        Ok((records, report)) => {
            println!(
                "Processing dataset... ({} rows read, {} kept)",
                util::format_int(report.total_rows as i64),
                util::format_int(report.kept_rows as i64)
            );
            if report.skipped_no_code > 0 {
                println!(
                    "Note: {} rows skipped (missing sector code).",
                    util::format_int(report.skipped_no_code as i64)
                );
            }
            if report.parse_errors > 0 {
                println!(
                    "Note: {} rows skipped due to parse errors.",
                    util::format_int(report.parse_errors as i64)
                );
            }

            let h = hierarchy::build(&records, SOURCE_LABEL);
            println!(
                "Built hierarchy: {} fine / {} medium / {} coarse codes, {} index entries.",
                util::format_int(h.by_fine.len() as i64),
                util::format_int(h.by_medium.len() as i64),
                util::format_int(h.by_coarse.len() as i64),
                util::format_int(h.search_index.len() as i64)
            );
            println!(
                "National baseline: frequency index {} / severity rate {}\n",
                util::format_number(h.meta.national.frequency_index, 1),
                util::format_number(h.meta.national.severity_rate, 2)
            );
            let mut state = APP_STATE.lock().unwrap();
            state.hierarchy = Some(h);
        }
        Err(e) => {
            eprintln!("Failed to load file: {}\n", e);
        }
    }
}

/// Handle option [2]: write the assembled structure to `at-data.json`.
fn handle_export() {
    let state = APP_STATE.lock().unwrap();
    let Some(h) = state.hierarchy.as_ref() else {
        println!("Error: No data loaded. Please load the CSV file first (option 1).\n");
        return;
    };
    match output::write_json(JSON_PATH, h) {
        Ok(()) => println!("Exported hierarchy to {}\n", JSON_PATH),
        Err(e) => eprintln!("Write error: {}\n", e),
    }
}

/// Handle option [3]: substring search over codes and labels.
fn handle_search() {
    let query = read_line("Search term (code or label): ");
    let level = Level::from_input(&read_line("Level filter (fine/medium/coarse, empty for all): "));

    let state = APP_STATE.lock().unwrap();
    let Some(h) = state.hierarchy.as_ref() else {
        println!("Error: No data loaded. Please load the CSV file first (option 1).\n");
        return;
    };
    let results = lookup::search(h, &query, level);
    println!(
        "{} match(es) (capped at {}):\n",
        results.len(),
        lookup::MAX_SEARCH_RESULTS
    );
    output::preview_table_rows(&results, lookup::MAX_SEARCH_RESULTS);
}

/// Handle option [4]: resolve one code and print its statistics next to the
/// national baseline.
fn handle_lookup() {
    let code = read_line("Sector code (e.g. 4711D, 4711 or 47): ");

    let state = APP_STATE.lock().unwrap();
    let Some(h) = state.hierarchy.as_ref() else {
        println!("Error: No data loaded. Please load the CSV file first (option 1).\n");
        return;
    };
    match lookup::get_entry(h, &code, true) {
        lookup::LookupOutcome::NotFound { code, level } => {
            println!("Code {} not found at level {}.\n", code, level);
        }
        lookup::LookupOutcome::Found(d) => {
            println!("\n{} [{}] {}", d.code, d.level, d.label);
            if let Some(medium) = &d.medium_code {
                println!("  medium: {}", medium);
            }
            if let Some(coarse) = &d.coarse_code {
                println!("  coarse: {}", coarse);
            }
            if let Some(fine_codes) = &d.fine_codes {
                println!("  fine codes: {}", fine_codes.join(", "));
            }
            println!(
                "  workforce: {}  hours: {}  establishments: {}",
                util::format_int(d.stats.workforce),
                util::format_int(d.stats.hours_worked),
                util::format_int(d.stats.establishments)
            );
            println!(
                "  accidents (1st settlement / 4d+): {} / {}  disabilities: {}  deaths: {}  lost days: {}",
                util::format_int(d.stats.first_settlements),
                util::format_int(d.stats.lost_time_accidents),
                util::format_int(d.stats.new_disabilities),
                util::format_int(d.stats.deaths),
                util::format_int(d.stats.lost_workdays)
            );
            if let Some(vs) = &d.vs_national {
                println!(
                    "  frequency index: {} (national {}, {:+.1}%)",
                    util::format_number(vs.frequency_index.sector, 1),
                    util::format_number(vs.frequency_index.national, 1),
                    vs.frequency_index.deviation_pct
                );
                println!(
                    "  severity rate: {} (national {}, {:+.1}%)",
                    util::format_number(vs.severity_rate.sector, 2),
                    util::format_number(vs.severity_rate.national, 2),
                    vs.severity_rate.deviation_pct
                );
            }
            let mut causes: Vec<(&String, &f64)> = d.risk_causes.iter().collect();
            causes.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap_or(std::cmp::Ordering::Equal));
            println!("  top risk causes:");
            for (name, pct) in causes.into_iter().take(3) {
                println!("    {}: {}%", name, util::format_number(*pct, 1));
            }
            println!();
        }
    }
}

fn main() {
    loop {
        println!("[1] Load data and build hierarchy");
        println!("[2] Export JSON");
        println!("[3] Search sectors");
        println!("[4] Sector lookup");
        println!("[5] Exit\n");
        match read_line("Enter choice: ").as_str() {
            "1" => handle_load(),
            "2" => handle_export(),
            "3" => handle_search(),
            "4" => handle_lookup(),
            "5" => {
                println!("Exiting the program.");
                break;
            }
            _ => {
                println!("Invalid choice. Please enter 1-5.\n");
            }
        }
    }
}
