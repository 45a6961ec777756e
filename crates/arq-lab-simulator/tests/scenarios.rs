//! Runs every scenario file shipped in the repository's `scenarios/` folder.

use std::fs;
use std::path::PathBuf;

use arq_lab_simulator::scenario_runner::{parse_scenario, run, run_scenario};

fn scenario_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../scenarios")
}

#[test]
fn bundled_scenarios_pass() {
    let mut paths: Vec<PathBuf> = fs::read_dir(scenario_dir())
        .expect("scenarios directory")
        .map(|entry| entry.expect("dir entry").path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    paths.sort();
    assert!(!paths.is_empty());

    for path in paths {
        if let Err(err) = run_scenario(&path) {
            panic!("{} failed: {err:#}", path.display());
        }
    }
}

#[test]
fn report_serialises_to_json() {
    let scenario = parse_scenario(
        r#"
name = "json"
protocol = "gbn"
window_size = 2

[[actions]]
type = "send"
text = "x"

[[actions]]
type = "run_until_idle"
max_ticks = 3
"#,
    )
    .unwrap();
    let report = run(&scenario).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["config"]["protocol"], "go-back-n");
    assert_eq!(json["timeline"][0]["event"]["type"], "packet_sent");
    assert_eq!(json["stats"]["packets_sent"], 1);
}
