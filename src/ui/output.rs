use crate::ensemble::containers::RankedHost;
use crate::ensemble::core::EacOutcome;
use ansi_term::Colour;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Everything the run produced, in one serializable report.
#[derive(Serialize)]
struct RankedReport<'a> {
    generated_at: String,
    n_members: usize,
    ranking: &'a [RankedHost],
}

pub fn print_results(outcome: &EacOutcome, top: usize) {
    println!("\n\u{250F}\u{2501}\u{2501}\u{2501}\u{2501} Results");
    println!("\u{2503}");
    println!(
        "\u{2503} Ensemble members : {}",
        Colour::Red.paint(outcome.n_members.to_string())
    );
    println!(
        "\u{2503} Hosts ranked     : {}",
        Colour::Red.paint(outcome.table.len().to_string())
    );
    println!("\u{2503}");
    println!("\u{2503} {:<24} {:>8} {:>16}", "host", "cluster", "outlier score");

    for row in outcome.table.iter().take(top) {
        println!(
            "\u{2503} {:<24} {:>8} {:>16}",
            Colour::Fixed(226).paint(&row.host),
            row.label,
            format!("{:.4}", row.score),
        );
    }
    if outcome.table.len() > top {
        println!("\u{2503} ... {} more", outcome.table.len() - top);
    }
    println!("\u{2503}");
}

pub fn data_as_json(outcome: &EacOutcome) -> Result<String, serde_json::Error> {
    let report = RankedReport {
        generated_at: chrono::Utc::now().to_rfc3339(),
        n_members: outcome.n_members,
        ranking: &outcome.table,
    };
    serde_json::to_string_pretty(&report)
}

pub fn data_to_file(data: String, file_path: &Path) -> std::io::Result<()> {
    fs::write(file_path, data)
}

/// Persists the ranked table as `ranked_hosts.csv` (rows already sorted by
/// score descending) plus a `ranked_hosts.types.json` sidecar naming each
/// column's type, so the evaluation side reloads it without guessing.
pub fn save_ranked_table(outcome: &EacOutcome, dir: &Path) -> std::io::Result<()> {
    let mut csv = String::from("host,label,score\n");
    for row in &outcome.table {
        csv.push_str(&format!("{},{},{}\n", row.host, row.label, row.score));
    }
    let csv_path = dir.join("ranked_hosts.csv");
    fs::write(&csv_path, csv)?;

    let types = serde_json::json!({
        "host": "str",
        "label": "int64",
        "score": "float64",
    });
    fs::write(dir.join("ranked_hosts.types.json"), types.to_string())?;

    log::info!("Ranked table written to {}", csv_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn outcome() -> EacOutcome {
        EacOutcome {
            table: vec![
                RankedHost { host: "10.0.0.9".into(), label: 1, score: 7.25 },
                RankedHost { host: "10.0.0.1".into(), label: 0, score: 1.5 },
            ],
            n_members: 3,
        }
    }

    #[test]
    fn csv_keeps_rank_order_and_sidecar_names_types() {
        let dir = tempfile::tempdir().unwrap();
        save_ranked_table(&outcome(), dir.path()).unwrap();

        let csv = std::fs::read_to_string(dir.path().join("ranked_hosts.csv")).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "host,label,score");
        assert_eq!(lines[1], "10.0.0.9,1,7.25");
        assert_eq!(lines[2], "10.0.0.1,0,1.5");

        let sidecar = std::fs::read_to_string(dir.path().join("ranked_hosts.types.json")).unwrap();
        let types: HashMap<String, String> = serde_json::from_str(&sidecar).unwrap();
        assert_eq!(types["host"], "str");
        assert_eq!(types["label"], "int64");
        assert_eq!(types["score"], "float64");
    }

    #[test]
    fn json_report_carries_the_ranking() {
        let json = data_as_json(&outcome()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["n_members"], 3);
        assert_eq!(value["ranking"][0]["host"], "10.0.0.9");
        assert_eq!(value["ranking"][0]["score"], 7.25);
    }
}
