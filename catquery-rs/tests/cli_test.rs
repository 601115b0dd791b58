//! Integration tests for the catquery CLI using fixture files.

use std::path::PathBuf;
use std::process::Command;

/// Get the path to a fixture file.
fn fixture_path(name: &str) -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir)
        .parent()
        .unwrap()
        .join("fixtures")
        .join(name)
}

/// Run catquery and return (stdout, stderr, exit code).
fn run_catquery(args: &[&str]) -> (String, String, i32) {
    let binary = env!("CARGO_BIN_EXE_catquery");

    let output = Command::new(binary)
        .env("CATQUERY_CONFIG", fixture_path("default.toml"))
        .args(args)
        .output()
        .expect("Failed to execute catquery");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn fixture(name: &str) -> String {
    fixture_path(name).to_string_lossy().to_string()
}

mod tokenize_command {
    use super::*;

    #[test]
    fn tokenize_operators() {
        let (stdout, _, code) = run_catquery(&["tokenize", "refund AND NEAR/3"]);
        assert_eq!(code, 0);
        let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
        let kinds: Vec<&str> = json["tokens"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["kind"].as_str().unwrap())
            .collect();
        assert_eq!(kinds, vec!["WORD", "AND", "NEAR", "EOF"]);
    }
}

mod parse_command {
    use super::*;

    #[test]
    fn parse_prints_tree() {
        let (stdout, _, code) = run_catquery(&["parse", "a AND b OR c"]);
        assert_eq!(code, 0);
        assert!(stdout.contains("\"rendered\": \"((a AND b) OR c)\""));
        assert!(stdout.contains("\"type\": \"or\""));
    }

    #[test]
    fn parse_optimize() {
        let (stdout, _, code) = run_catquery(&[
            "parse",
            "NOT NOT refund",
            "--optimize",
        ]);
        assert_eq!(code, 0);
        assert!(stdout.contains("\"rendered\": \"refund\""));
    }

    #[test]
    fn parse_error_exit_code() {
        let (stdout, _, code) = run_catquery(&["parse", "(a OR b"]);
        assert_eq!(code, 2);
        assert!(stdout.contains("UNBALANCED_PARENTHESES"));
    }
}

mod validate_command {
    use super::*;

    #[test]
    fn validate_valid_query() {
        let (stdout, _, code) = run_catquery(&["validate", "refund OR return"]);
        assert_eq!(code, 0);
        assert!(stdout.contains("\"is_valid\": true"));
    }

    #[test]
    fn validate_invalid_query() {
        let (stdout, _, code) = run_catquery(&["validate", "refund AND"]);
        assert_eq!(code, 2);
        assert!(stdout.contains("\"is_valid\": false"));
        assert!(stdout.contains("DANGLING_OPERATOR"));
    }

    #[test]
    fn validate_uses_config_limits() {
        // strict.toml caps queries at 40 characters
        let long = "refund OR return OR exchange OR replacement";
        let (stdout, _, code) = run_catquery(&["--config", &fixture("strict.toml"), "validate", long]);
        assert_eq!(code, 2);
        assert!(stdout.contains("QUERY_TOO_LONG"));
    }

    #[test]
    fn validate_yaml_output() {
        let (stdout, _, code) = run_catquery(&[
            "--yaml",
            "validate",
            "refund",
        ]);
        assert_eq!(code, 0);
        assert!(stdout.contains("is_valid: true"));
    }

    #[test]
    fn missing_config_file() {
        let (_, stderr, code) = run_catquery(&["--config", &fixture("nope.toml"), "validate", "refund"]);
        assert_eq!(code, 4);
        assert!(stderr.contains("Config error"));
    }
}

mod evaluate_command {
    use super::*;

    #[test]
    fn evaluate_inline_text() {
        let (stdout, _, code) = run_catquery(&[
            "evaluate",
            "refund OR return",
            "--text",
            "I want a return",
        ]);
        assert_eq!(code, 0);
        let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
        assert_eq!(json["matched"], true);
        assert_eq!(json["terms"], serde_json::json!(["return"]));
        assert_eq!(json["spans"][0]["text"], "return");
    }

    #[test]
    fn evaluate_transcript_file() {
        let (stdout, _, code) = run_catquery(&[
            "evaluate",
            "cancel NEAR/3 subscription",
            "--transcript",
            &fixture("transcripts/cancel.txt"),
        ]);
        assert_eq!(code, 0);
        assert!(stdout.contains("\"matched\": true"));
    }

    #[test]
    fn evaluate_no_match() {
        let (stdout, _, code) = run_catquery(&[
            "evaluate",
            "refund",
            "--transcript",
            &fixture("transcripts/greeting.json"),
        ]);
        assert_eq!(code, 0);
        assert!(stdout.contains("\"matched\": false"));
    }

    #[test]
    fn evaluate_invalid_query() {
        let (_, stderr, code) = run_catquery(&[
            "evaluate",
            "(refund",
            "--text",
            "refund",
        ]);
        assert_eq!(code, 2);
        assert!(stderr.contains("Invalid query"));
    }
}

mod classify_command {
    use super::*;

    fn categories_by_id(stdout: &str) -> Vec<(String, Vec<String>)> {
        let json: serde_json::Value = serde_json::from_str(stdout).unwrap();
        json["report"]["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| {
                let id = PathBuf::from(r["id"].as_str().unwrap())
                    .file_name()
                    .unwrap()
                    .to_string_lossy()
                    .to_string();
                let cats = r["categories"]
                    .as_array()
                    .unwrap()
                    .iter()
                    .map(|c| c["category"].as_str().unwrap().to_string())
                    .collect();
                (id, cats)
            })
            .collect()
    }

    #[test]
    fn classify_glob() {
        let pattern = format!("{}/*", fixture("transcripts"));
        let (stdout, _, code) = run_catquery(&[
            "classify",
            "--categories",
            &fixture("categories.yaml"),
            &pattern,
        ]);
        assert_eq!(code, 0);
        assert_eq!(
            categories_by_id(&stdout),
            vec![
                ("cancel.txt".to_string(), vec!["cancellation".to_string()]),
                (
                    "escalation.json".to_string(),
                    vec!["escalation".to_string(), "billing".to_string()]
                ),
                ("greeting.json".to_string(), vec![]),
                ("refund.txt".to_string(), vec!["refund-request".to_string()]),
            ]
        );
    }

    #[test]
    fn classify_matched_only_with_toml_categories() {
        let pattern = format!("{}/*.txt", fixture("transcripts"));
        let (stdout, _, code) = run_catquery(&[
            "classify",
            "--matched-only",
            "--categories",
            &fixture("categories.toml"),
            &pattern,
            &fixture("transcripts/greeting.json"),
        ]);
        assert_eq!(code, 0);
        let ids: Vec<String> = categories_by_id(&stdout).into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["cancel.txt", "refund.txt"]);
    }

    #[test]
    fn classify_reports_rejected_categories() {
        let (stdout, stderr, code) = run_catquery(&[
            "classify",
            "--categories",
            &fixture("invalid_categories.json"),
            &fixture("transcripts/refund.txt"),
        ]);
        assert_eq!(code, 3);
        assert!(stderr.contains("category 'broken' skipped"));
        assert!(stdout.contains("\"rejected\""));
        assert!(stdout.contains("refund-request"));
    }

    #[test]
    fn classify_missing_category_file() {
        let (_, _, code) = run_catquery(&[
            "classify",
            "--categories",
            &fixture("missing.yaml"),
            &fixture("transcripts/refund.txt"),
        ]);
        assert_eq!(code, 1);
    }
}
