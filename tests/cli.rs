//! Integration tests for the tmplwire binary

use assert_cmd::assert::OutputAssertExt;
use assert_cmd::cargo_bin;
use predicates::prelude::*;
use std::fs;
use std::process::Command;

fn tmplwire() -> Command {
    Command::new(cargo_bin!(env!("CARGO_PKG_NAME")))
}

#[test]
fn test_cli_help_lists_commands() {
    tmplwire()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("canon"))
        .stdout(predicate::str::contains("render"))
        .stdout(predicate::str::contains("bundle"));
}

#[test]
fn test_canon_prints_tree_json() {
    let temp = tempfile::tempdir().unwrap();
    let src = temp.path().join("page.html");
    fs::write(&src, "a{{.Foo}}").unwrap();

    let out = tmplwire()
        .args(["canon", "--in"])
        .arg(&src)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let doc: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(
        doc,
        serde_json::json!({
            "type": "ListNode",
            "items": [
                {"type": "TextNode", "content": "a"},
                {"type": "ActionNode", "pipe": {
                    "type": "PipeNode", "isAssign": false, "decl": [],
                    "cmds": [{"type": "CommandNode", "args": [{"type": "FieldNode", "ident": ["Foo"]}]}]
                }}
            ]
        })
    );
}

#[test]
fn test_render_from_source_and_from_tree() {
    let temp = tempfile::tempdir().unwrap();
    let src = temp.path().join("t.html");
    let data = temp.path().join("data.json");
    let tree = temp.path().join("tree.json");
    fs::write(&src, "a{{range $x := .things}}a{{$x.c}}b{{end}}b").unwrap();
    fs::write(&data, r#"{"things": [{"c": 5}, {"c": 17}]}"#).unwrap();

    tmplwire()
        .args(["render", "--in"])
        .arg(&src)
        .arg("--data")
        .arg(&data)
        .assert()
        .success()
        .stdout("aa5ba17bb");

    let canon = tmplwire()
        .args(["canon", "--in"])
        .arg(&src)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    fs::write(&tree, canon).unwrap();

    tmplwire()
        .args(["render", "--tree"])
        .arg(&tree)
        .arg("--data")
        .arg(&data)
        .assert()
        .success()
        .stdout("aa5ba17bb");
}

#[test]
fn test_render_with_custom_delimiters() {
    let temp = tempfile::tempdir().unwrap();
    let src = temp.path().join("t.txt");
    fs::write(&src, "{{keep}} <<.>>").unwrap();

    tmplwire()
        .args(["render", "--left-delim", "<<", "--right-delim", ">>", "--in"])
        .arg(&src)
        .assert()
        .success()
        .stdout("{{keep}} ");
}

#[test]
fn test_render_error_exits_nonzero() {
    let temp = tempfile::tempdir().unwrap();
    let src = temp.path().join("t.html");
    let data = temp.path().join("data.json");
    fs::write(&src, "{{range .s}}{{end}}").unwrap();
    fs::write(&data, r#"{"s": "text"}"#).unwrap();

    tmplwire()
        .args(["render", "--in"])
        .arg(&src)
        .arg("--data")
        .arg(&data)
        .assert()
        .failure()
        .stderr(predicate::str::contains("range can't iterate over string value"));
}

#[test]
fn test_canon_rejects_unsupported_syntax() {
    let temp = tempfile::tempdir().unwrap();
    let src = temp.path().join("t.html");
    fs::write(&src, "{{with .x}}{{end}}").unwrap();

    tmplwire()
        .args(["canon", "--in"])
        .arg(&src)
        .assert()
        .failure()
        .stderr(predicate::str::contains("WithNode"));
}

#[test]
fn test_render_requires_an_input() {
    tmplwire()
        .arg("render")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--in"));
}

#[test]
fn test_bundle_collects_templates_by_name() {
    let temp = tempfile::tempdir().unwrap();
    fs::write(temp.path().join("b.html"), "B{{.x}}").unwrap();
    fs::write(temp.path().join("a.html"), "A").unwrap();
    fs::write(temp.path().join("notes.txt"), "{{with .skip}}{{end}}").unwrap();

    let out = tmplwire()
        .args(["bundle", "--dir"])
        .arg(temp.path())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let doc: serde_json::Value = serde_json::from_slice(&out).unwrap();
    let names: Vec<&String> = doc.as_object().unwrap().keys().collect();
    assert_eq!(names, ["a.html", "b.html"]);
    assert_eq!(doc["a.html"]["items"][0]["content"], "A");
}

#[test]
fn test_bundle_pretty_is_indented() {
    let temp = tempfile::tempdir().unwrap();
    fs::write(temp.path().join("a.html"), "A{{.x}}").unwrap();

    let out = tmplwire()
        .args(["bundle", "--pretty", "--dir"])
        .arg(temp.path())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("{\n  \"a.html\": {"), "got {text}");
    assert!(text.ends_with("}\n"));
    let doc: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(doc["a.html"]["items"][1]["type"], "ActionNode");
}

#[test]
fn test_bundle_reports_the_failing_template() {
    let temp = tempfile::tempdir().unwrap();
    fs::write(temp.path().join("ok.html"), "fine").unwrap();
    fs::write(temp.path().join("bad.html"), "{{if .x}}").unwrap();

    tmplwire()
        .args(["bundle", "--dir"])
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("bad.html"));
}
