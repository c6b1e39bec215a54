//! Integration tests for the `clipper` command-line interface.
//!
//! Drives the built binary against temporary source trees.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const GENESIS_GO: &str = r#"package mars

type GenesisState struct {
	Params Params
}

func DefaultGenesis() *GenesisState {
	return &GenesisState{
		Params: DefaultParams(),
	}
}
"#;

const GENESIS_PROTO: &str = r#"syntax = "proto3";
package cosmonaut.mars.mars;

option go_package = "github.com/cosmonaut/mars/x/mars/types";

message GenesisState {
  Params params = 1;
}
"#;

const LIST_PLAN: &str = r#"[meta]
name = "post list"

[[clips]]
id = "genesis-state-field"
file = "x/mars/types/genesis.go"
selector = "go-struct-new-field"
mode = "go-struct-field"
snippet = "PostList []Post"

[clips.options]
structName = "GenesisState"

[[clips]]
id = "default-genesis"
file = "x/mars/types/genesis.go"
selector = "go-returning-composite-new-argument"
mode = "go-returning-composite-argument"
snippet = "PostList: []Post{}"

[clips.options]
functionName = "DefaultGenesis"

[[clips]]
id = "proto-field"
file = "proto/mars/genesis.proto"
selector = "proto-new-message-field"
snippet = "  repeated Post postList = {next_field_number};\n"

[clips.options]
name = "GenesisState"
"#;

const MISSING_PLAN: &str = r#"[meta]
name = "broken"

[[clips]]
id = "export-genesis"
file = "x/mars/types/genesis.go"
selector = "go-before-function-returns"
snippet = "x := 1\n\t"

[clips.options]
functionName = "ExportGenesis"
"#;

/// Helper to create a source tree with a clip plan
fn setup_test_workspace() -> TempDir {
    let dir = TempDir::new().unwrap();

    fs::create_dir_all(dir.path().join("x/mars/types")).unwrap();
    fs::create_dir_all(dir.path().join("proto/mars")).unwrap();
    fs::create_dir_all(dir.path().join("plans")).unwrap();

    fs::write(dir.path().join("x/mars/types/genesis.go"), GENESIS_GO).unwrap();
    fs::write(dir.path().join("proto/mars/genesis.proto"), GENESIS_PROTO).unwrap();
    fs::write(dir.path().join("plans/list.toml"), LIST_PLAN).unwrap();

    dir
}

fn clipper(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_clipper"))
        .args(args)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn path_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_apply_help() {
    let output = clipper(&["apply", "--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Apply clip plans to a source tree"));
    assert!(stdout.contains("--dry-run"));
}

#[test]
fn test_apply_writes_files() {
    let workspace = setup_test_workspace();
    let root = workspace.path();

    let output = clipper(&[
        "apply",
        path_arg(&root.join("plans/list.toml")),
        "--root",
        path_arg(root),
    ]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "{stdout}");
    assert!(stdout.contains("Applying"));
    assert!(stdout.contains("genesis-state-field"));
    assert!(stdout.contains("Summary:"));
    assert!(stdout.contains("3 applied"));

    let go = fs::read_to_string(root.join("x/mars/types/genesis.go")).unwrap();
    assert!(go.contains("\tParams Params\n\tPostList []Post\n}"));
    assert!(go.contains("\t\tPostList: []Post{},\n\t}"));

    let proto = fs::read_to_string(root.join("proto/mars/genesis.proto")).unwrap();
    assert!(proto.contains("  Params params = 1;\n  repeated Post postList = 2;\n}"));
}

#[test]
fn test_apply_directory_of_plans() {
    let workspace = setup_test_workspace();
    let root = workspace.path();

    let output = clipper(&["apply", path_arg(&root.join("plans")), "--root", path_arg(root)]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("list.toml"));
    assert!(stdout.contains("post list"));
}

#[test]
fn test_apply_dry_run_leaves_files() {
    let workspace = setup_test_workspace();
    let root = workspace.path();

    let output = clipper(&[
        "apply",
        path_arg(&root.join("plans/list.toml")),
        "--root",
        path_arg(root),
        "--dry-run",
    ]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("DRY RUN"));
    assert!(stdout.contains("Would apply to"));

    let go = fs::read_to_string(root.join("x/mars/types/genesis.go")).unwrap();
    assert_eq!(go, GENESIS_GO);
    let proto = fs::read_to_string(root.join("proto/mars/genesis.proto")).unwrap();
    assert_eq!(proto, GENESIS_PROTO);
}

#[test]
fn test_apply_with_diff() {
    let workspace = setup_test_workspace();
    let root = workspace.path();

    let output = clipper(&[
        "apply",
        path_arg(&root.join("plans/list.toml")),
        "--root",
        path_arg(root),
        "--dry-run",
        "--diff",
    ]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("(original)"));
    assert!(stdout.contains("+\tPostList []Post"));
    assert!(stdout.contains("+  repeated Post postList = 2;"));
}

#[test]
fn test_apply_reports_misses() {
    let workspace = setup_test_workspace();
    let root = workspace.path();
    fs::write(root.join("plans/missing.toml"), MISSING_PLAN).unwrap();

    let output = clipper(&[
        "apply",
        path_arg(&root.join("plans/missing.toml")),
        "--root",
        path_arg(root),
    ]);

    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stdout.contains("1 missed"));
    assert!(stderr.contains("export-genesis: Missed"));
    assert!(stderr.contains("code in improper structure:"));
    assert!(stderr.contains("◦ cannot find function ExportGenesis in"));

    let go = fs::read_to_string(root.join("x/mars/types/genesis.go")).unwrap();
    assert_eq!(go, GENESIS_GO);
}

#[test]
fn test_apply_invalid_plan() {
    let workspace = setup_test_workspace();
    let root = workspace.path();
    fs::write(
        root.join("plans/invalid.toml"),
        "[[clips]]\nid = \"a\"\nfile = \"a.go\"\nselector = \"go-nowhere\"\nsnippet = \"x\"\n",
    )
    .unwrap();

    let output = clipper(&[
        "apply",
        path_arg(&root.join("plans/invalid.toml")),
        "--root",
        path_arg(root),
    ]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid clip plan"));
    assert!(stderr.contains("unknown selector `go-nowhere`"));
}

#[test]
fn test_missing_plan_file() {
    let output = clipper(&["apply", "/nonexistent/plan.toml"]);

    assert!(!output.status.success());
}

#[test]
fn test_select_prints_json() {
    let workspace = setup_test_workspace();
    let file = workspace.path().join("x/mars/types/genesis.go");

    let output = clipper(&[
        "select",
        path_arg(&file),
        "--selector",
        "go-struct-new-field",
        "-o",
        "structName=GenesisState",
    ]);

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["selector"], "go-struct-new-field");
    assert_eq!(json["found"], true);
    let offset = json["offset"].as_u64().unwrap() as usize;
    assert_eq!(&GENESIS_GO[offset..offset + 1], "}");
    assert_eq!(json["data"]["kind"], "go_struct_new_field");
    assert_eq!(json["data"]["needs_leading_new_line"], false);
}

#[test]
fn test_select_miss_exits_non_zero() {
    let workspace = setup_test_workspace();
    let file = workspace.path().join("proto/mars/genesis.proto");

    let output = clipper(&[
        "select",
        path_arg(&file),
        "--selector",
        "proto-new-service-method",
        "-o",
        "name=Query",
    ]);

    assert!(!output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["found"], false);
    assert_eq!(json["offset"], -1);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("◦ cannot find service Query in"));
}

#[test]
fn test_select_rejects_bad_option() {
    let output = clipper(&[
        "select",
        "genesis.go",
        "--selector",
        "go-new-import",
        "-o",
        "novalue",
    ]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("expected key=value"));
}

#[test]
fn test_list_command() {
    let output = clipper(&["list"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("go-new-import"));
    assert!(stdout.contains("proto-new-oneof-field [messageName, oneOfName]"));
    assert!(stdout.contains("go-struct-new-field [structName]"));
}
