#![deny(clippy::all, clippy::pedantic)]

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use std::io::Write;
use tempfile::NamedTempFile;

const DOCUMENT: &str = "# Guide\n\n## Install\n\nRun it.\n\n<script>alert(1)</script>\n";

fn markdown_file(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".md")
        .tempfile()
        .expect("tmp file");
    file.write_all(contents.as_bytes()).expect("write markdown");
    file
}

fn inkpress() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("inkpress"));
    cmd.env_remove("INKPRESS_CONFIG_FILE")
        .env("INKPRESS__LOGGING__LEVEL", "warn");
    cmd
}

#[test]
fn renders_a_file_to_sanitized_html() {
    let input = markdown_file(DOCUMENT);
    let assert = inkpress()
        .arg("render")
        .arg(input.path())
        .assert()
        .success()
        .stdout(contains(
            "<h2 id=\"install\"><a class=\"heading-anchor\" href=\"#install\">Install</a></h2>",
        ));

    let output = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(!output.contains("<script"), "{output}");
}

#[test]
fn json_output_carries_headings() {
    let input = markdown_file(DOCUMENT);
    let assert = inkpress()
        .args(["render", "--format", "json"])
        .arg(input.path())
        .assert()
        .success();

    let output: serde_json::Value =
        serde_json::from_slice(&assert.get_output().stdout).expect("json output");
    assert_eq!(
        output["headings"],
        serde_json::json!([{ "id": "install", "text": "Install", "level": 2 }])
    );
    assert!(output["html"].as_str().is_some_and(|html| html.contains("Run it.")));
}

#[test]
fn toc_output_uses_the_given_title() {
    let input = markdown_file(DOCUMENT);
    inkpress()
        .args(["render", "--format", "toc", "--toc-title", "On this page"])
        .arg(input.path())
        .assert()
        .success()
        .stdout(contains("<h2 class=\"toc-title\">On this page</h2>"))
        .stdout(contains("<a href=\"#install\">Install</a>"));
}

#[test]
fn reads_markdown_from_stdin() {
    inkpress()
        .args(["render", "--no-heading-anchors", "-"])
        .write_stdin("## From stdin\n")
        .assert()
        .success()
        .stdout("<h2 id=\"from-stdin\">From stdin</h2>\n");
}

#[test]
fn schema_lists_the_allowed_elements() {
    inkpress()
        .args(["schema", "--pretty"])
        .assert()
        .success()
        .stdout(contains("\"blockquote\""))
        .stdout(contains("\"javascript\"").not());
}

#[test]
fn invalid_configuration_exits_with_code_two() {
    let mut config = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("tmp file");
    writeln!(config, "[render]\ntoc_min_level = 5\ntoc_max_level = 2").expect("write config");

    let input = markdown_file(DOCUMENT);
    inkpress()
        .arg("--config-file")
        .arg(config.path())
        .arg("render")
        .arg(input.path())
        .assert()
        .code(2)
        .stderr(contains("render.toc_levels"));
}

#[test]
fn oversized_input_fails() {
    let input = markdown_file(DOCUMENT);
    inkpress()
        .args(["render", "--max-input-bytes", "4"])
        .arg(input.path())
        .assert()
        .code(1)
        .stderr(contains("byte limit"));
}
