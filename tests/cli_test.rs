//! CLI integration tests for compound-resolver binary.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("compound-resolver"))
}

// Helper to create a temp file
fn write_temp_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

const USER: &str = r#"{
    "data": {
        "type": "users",
        "id": "1",
        "relationships": {
            "citizenships": { "data": [{ "type": "countries", "id": "TG" }] }
        }
    }
}"#;

const COUNTRIES: &str = r#"{
    "data": [
        {
            "type": "countries",
            "id": "TG",
            "relationships": {
                "currencies": { "data": [{ "type": "currencies", "id": "XOF" }] }
            }
        },
        { "type": "countries", "id": "GH" }
    ]
}"#;

const CURRENCIES: &str = r#"{
    "data": [
        { "type": "currencies", "id": "XOF", "attributes": { "name": "West African CFA franc" } }
    ]
}"#;

/// Temp dir holding `user.json` and a `fixtures/` directory.
fn workspace() -> (TempDir, std::path::PathBuf, std::path::PathBuf) {
    let dir = TempDir::new().unwrap();
    let document = write_temp_file(&dir, "user.json", USER);
    let fixtures = dir.path().join("fixtures");
    fs::create_dir(&fixtures).unwrap();
    fs::write(fixtures.join("countries.json"), COUNTRIES).unwrap();
    fs::write(fixtures.join("currencies.json"), CURRENCIES).unwrap();
    (dir, document, fixtures)
}

mod resolve_command {
    use super::*;

    #[test]
    fn resolves_two_hops_from_fixtures() {
        let (_dir, document, fixtures) = workspace();

        let output = cmd()
            .args([
                "resolve",
                document.to_str().unwrap(),
                "--include",
                "citizenships.currencies",
                "--fixtures",
                fixtures.to_str().unwrap(),
            ])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();

        let resolved: Value = serde_json::from_slice(&output).unwrap();
        let included = resolved["included"].as_array().unwrap();
        assert_eq!(included.len(), 2);
        assert_eq!(included[0]["id"], "TG");
        assert_eq!(included[1]["id"], "XOF");
    }

    #[test]
    fn hop_limit_flag_stops_early() {
        let (_dir, document, fixtures) = workspace();

        let output = cmd()
            .args([
                "resolve",
                document.to_str().unwrap(),
                "--include",
                "citizenships.currencies",
                "--fixtures",
                fixtures.to_str().unwrap(),
                "--hop-limit",
                "1",
            ])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();

        let resolved: Value = serde_json::from_slice(&output).unwrap();
        let included = resolved["included"].as_array().unwrap();
        assert_eq!(included.len(), 1);
        assert_eq!(included[0]["id"], "TG");
    }

    #[test]
    fn no_include_prints_document_unchanged() {
        let (_dir, document, fixtures) = workspace();

        let output = cmd()
            .args([
                "resolve",
                document.to_str().unwrap(),
                "--fixtures",
                fixtures.to_str().unwrap(),
            ])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();

        assert_eq!(String::from_utf8(output).unwrap(), format!("{}\n", USER));
    }

    #[test]
    fn unresolvable_include_echoes_input_bytes() {
        let dir = TempDir::new().unwrap();
        let fixtures = dir.path().join("fixtures");
        fs::create_dir(&fixtures).unwrap();
        let text = "{ \"data\": { \"type\": \"users\", \"id\": \"1\" },\n  \"meta\": { \"score\": 1.50 } }";
        let document = write_temp_file(&dir, "user.json", text);

        cmd()
            .args([
                "resolve",
                document.to_str().unwrap(),
                "--include",
                "citizenships",
                "--fixtures",
                fixtures.to_str().unwrap(),
            ])
            .assert()
            .success()
            .stdout(predicate::str::diff(format!("{}\n", text)));
    }

    #[test]
    fn missing_endpoint_fails_by_default() {
        let dir = TempDir::new().unwrap();
        let document = write_temp_file(&dir, "user.json", USER);

        cmd()
            .args([
                "resolve",
                document.to_str().unwrap(),
                "--include",
                "citizenships",
            ])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("no endpoint registered for type 'countries'"));
    }

    #[test]
    fn ignore_keeps_what_resolved() {
        let (_dir, document, fixtures) = workspace();
        fs::remove_file(fixtures.join("currencies.json")).unwrap();

        let output = cmd()
            .args([
                "resolve",
                document.to_str().unwrap(),
                "--include",
                "citizenships.currencies",
                "--fixtures",
                fixtures.to_str().unwrap(),
                "--on-error",
                "ignore",
            ])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();

        let resolved: Value = serde_json::from_slice(&output).unwrap();
        let included = resolved["included"].as_array().unwrap();
        assert_eq!(included.len(), 1);
        assert_eq!(included[0]["type"], "countries");
    }

    #[test]
    fn relationship_document() {
        let (dir, _document, fixtures) = workspace();
        let relationship = write_temp_file(
            &dir,
            "citizenships.json",
            r#"{"data": [{"type": "countries", "id": "GH"}]}"#,
        );

        cmd()
            .args([
                "resolve",
                relationship.to_str().unwrap(),
                "--relationship",
                "citizenships",
                "--include",
                "citizenships",
                "--fixtures",
                fixtures.to_str().unwrap(),
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                r#""included":[{"type":"countries","id":"GH"}]"#,
            ));
    }

    #[test]
    fn reads_stdin_and_writes_output_file() {
        let (dir, _document, fixtures) = workspace();
        let output = dir.path().join("resolved.json");

        cmd()
            .args([
                "resolve",
                "-",
                "--include",
                "citizenships",
                "--fixtures",
                fixtures.to_str().unwrap(),
                "--output",
                output.to_str().unwrap(),
            ])
            .write_stdin(USER)
            .assert()
            .success()
            .stdout(predicate::str::is_empty());

        let content = fs::read_to_string(&output).unwrap();
        assert!(content.contains(r#""included":[{"type":"countries","id":"TG""#));
    }

    #[test]
    fn pretty_output() {
        let (_dir, document, fixtures) = workspace();

        cmd()
            .args([
                "resolve",
                document.to_str().unwrap(),
                "--fixtures",
                fixtures.to_str().unwrap(),
                "--pretty",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("{\n"));
    }

    #[test]
    fn document_without_data_is_rejected() {
        let dir = TempDir::new().unwrap();
        let document = write_temp_file(&dir, "bad.json", r#"{"meta": {}}"#);

        cmd()
            .args(["resolve", document.to_str().unwrap(), "--include", "a"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("missing 'data' member"));
    }

    #[test]
    fn missing_document_file() {
        cmd()
            .args(["resolve", "/nonexistent/user.json"])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("file not found"));
    }

    #[test]
    fn malformed_header_argument() {
        let (_dir, document, _fixtures) = workspace();

        cmd()
            .args([
                "resolve",
                document.to_str().unwrap(),
                "--header",
                "no-colon-here",
            ])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("expected NAME:VALUE"));
    }

    #[test]
    fn malformed_endpoint_argument() {
        let (_dir, document, _fixtures) = workspace();

        cmd()
            .args([
                "resolve",
                document.to_str().unwrap(),
                "--endpoint",
                "countries",
            ])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("expected TYPE=URL"));
    }
}

mod plan_command {
    use super::*;

    #[test]
    fn prints_every_hop() {
        let output = cmd()
            .args(["plan", "--include", "a,b.c,b.d.e"])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();

        let plans: Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(
            plans,
            serde_json::json!([
                { "a": [], "b": ["c", "d"] },
                { "c": [], "d": ["e"] },
                { "e": [] }
            ])
        );
    }

    #[test]
    fn prints_single_hop() {
        let output = cmd()
            .args(["plan", "--include", "a,b.c", "--hop", "3"])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();

        let plan: Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(plan, serde_json::json!({}));
    }
}

mod links_command {
    use super::*;

    #[test]
    fn prints_hop_result() {
        let (_dir, document, _fixtures) = workspace();

        let output = cmd()
            .args(["links", document.to_str().unwrap()])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();

        let links: Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(links["referencesByType"]["countries"], serde_json::json!(["TG"]));
        assert_eq!(
            links["relationshipNamesByType"]["countries"],
            serde_json::json!(["citizenships"])
        );
    }

    #[test]
    fn invalid_json_exit_code() {
        let dir = TempDir::new().unwrap();
        let document = write_temp_file(&dir, "bad.json", "not json");

        cmd()
            .args(["links", document.to_str().unwrap()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("invalid JSON"));
    }
}
