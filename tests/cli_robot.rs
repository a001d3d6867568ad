use assert_cmd::Command;
use predicates::str::contains;
use serde_json::Value;

mod util;
use util::repo_path;

fn base_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("lsearch"));
    cmd.env_remove("LSEARCH_DATASET");
    cmd.env("RUST_LOG", "warn");
    cmd
}

fn dataset_arg() -> String {
    repo_path("datasets/pokedex.toml").display().to_string()
}

#[test]
fn help_lists_subcommands() {
    base_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("tui"))
        .stdout(contains("search"))
        .stdout(contains("fields"));
}

#[test]
fn search_json_reports_rows_and_exact_hits() {
    let output = base_cmd()
        .args(["search", "pika", "--dataset", &dataset_arg(), "--json"])
        .assert()
        .success()
        .get_output()
        .clone();
    let json: Value = serde_json::from_slice(&output.stdout).expect("valid search json");
    assert_eq!(json["query"], "pika");
    assert_eq!(json["exact_hits"], 1);
    assert_eq!(json["headers"][0], "Name");
    let rows = json["rows"].as_array().expect("rows array");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["cells"][0], "Pikachu");
    assert_eq!(rows[0]["cells"][2], "electric");
}

#[test]
fn search_sorted_orders_by_attack() {
    let output = base_cmd()
        .args([
            "search",
            "electric",
            "--dataset",
            &dataset_arg(),
            "--sorted",
            "--truncate",
            "--json",
        ])
        .assert()
        .success()
        .get_output()
        .clone();
    let json: Value = serde_json::from_slice(&output.stdout).expect("valid search json");
    let names: Vec<&str> = json["rows"]
        .as_array()
        .expect("rows array")
        .iter()
        .map(|r| r["cells"][0].as_str().unwrap_or_default())
        .collect();
    assert_eq!(names, vec!["Zapdos 🌟", "Raichu", "Pikachu", "Pichu"]);
}

#[test]
fn dataset_can_come_from_env() {
    base_cmd()
        .env("LSEARCH_DATASET", dataset_arg())
        .args(["search", "mew"])
        .assert()
        .success()
        .stdout(contains("Mew 🌟"));
}

#[test]
fn fields_detects_optional_and_array_paths() {
    let data = repo_path("datasets/pokedex.sample.json");
    let output = base_cmd()
        .args(["fields", "--data", data.to_str().unwrap(), "--json"])
        .assert()
        .success()
        .get_output()
        .clone();
    let fields: Value = serde_json::from_slice(&output.stdout).expect("valid fields json");
    let find = |name: &str| {
        fields
            .as_array()
            .unwrap()
            .iter()
            .find(|f| f["name"] == name)
            .cloned()
            .unwrap_or_else(|| panic!("field {name} missing"))
    };
    assert_eq!(find("type2")["optional"], true);
    assert_eq!(find("abilities")["is_array"], true);
    assert_eq!(find("attack")["kind"], "Number");
}

#[test]
fn tui_once_prints_a_single_frame() {
    base_cmd()
        .args([
            "tui",
            "--dataset",
            &dataset_arg(),
            "--once",
            "--no-gate",
            "--query",
            "pika",
        ])
        .assert()
        .success()
        .stdout(contains("query: \"pika\""))
        .stdout(contains("Name | Pokedex # | Types"))
        .stdout(contains("Pikachu | 25 | electric"));
}

#[test]
fn missing_dataset_fails_with_message() {
    base_cmd()
        .args(["search", "pika", "--dataset", "/nonexistent/lsearch.toml"])
        .assert()
        .failure()
        .stderr(contains("error:"))
        .stderr(contains("loading dataset"));
}

#[test]
fn source_is_required() {
    base_cmd().args(["search", "pika"]).assert().failure();
}
