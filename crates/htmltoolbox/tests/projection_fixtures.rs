use htmltoolbox_test_support::fixtures::{load_fixtures, run_case};
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn projection_fixtures() {
    let cases = load_fixtures(&fixture_path("projection.toml"));
    assert!(!cases.is_empty(), "no fixture cases loaded");
    let failures: Vec<String> = cases
        .iter()
        .filter_map(|case| run_case(case).err())
        .collect();
    assert!(
        failures.is_empty(),
        "{} of {} fixture cases failed:\n{}",
        failures.len(),
        cases.len(),
        failures.join("\n")
    );
}
