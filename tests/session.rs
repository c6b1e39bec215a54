//! Session behavior: lenient splices, miss aggregation and the combined
//! report with placeholder errors.

use code_clipper::{
    splice, Clipper, ClipperError, GoSelector, ParseError, ProtoSelector, SelectOptions, Selector,
};

const HANDLER_GO_FILE: &str = r#"package mars

func NewHandler() int {
	a := 5
	return a
}

func InitGenesis() {
	setup()
}
"#;

fn function(name: &str) -> SelectOptions {
    SelectOptions::new().with("functionName", name)
}

#[test]
fn five_splices_with_two_misses() {
    let mut clipper = Clipper::new();
    let calls: [(GoSelector, SelectOptions, &str); 5] = [
        (GoSelector::BeforeFunctionReturns, function("NewHandler"), "b := 6\n\t"),
        (GoSelector::StartOfFunction, function("InitGenesis"), "\n\tprepare()"),
        (GoSelector::StartOfFunction, function("ExportGenesis"), "\n\tnever()"),
        (GoSelector::NewGlobal, SelectOptions::new(), "\n\nconst version = 2"),
        (GoSelector::BeforeFunctionReturns, function("BeginBlock"), "never()"),
    ];

    let mut code = HANDLER_GO_FILE.to_string();
    for (selector, options, snippet) in &calls {
        code = clipper
            .paste_code_snippet_at("handler.go", &code, *selector, options, snippet)
            .unwrap();
    }

    // The same three successful splices, applied strictly.
    let mut expected = HANDLER_GO_FILE.to_string();
    for (selector, options, snippet) in [&calls[0], &calls[1], &calls[3]] {
        expected = splice("handler.go", &expected, *selector, options, |_| snippet.to_string())
            .unwrap();
    }
    assert_eq!(code, expected);
    assert!(code.contains("\tb := 6\n\treturn a"));
    assert!(code.contains("func InitGenesis() {\n\tprepare()\n\tsetup()"));
    assert!(code.starts_with("package mars\n\nconst version = 2\n"));
    assert!(!code.contains("never()"));

    let missing = clipper.missing_selections();
    assert_eq!(missing.len(), 2);
    assert_eq!(missing[0].options.get("functionName"), "ExportGenesis");
    assert_eq!(missing[1].options.get("functionName"), "BeginBlock");

    let err = clipper.err().unwrap();
    assert_eq!(
        err.missing_selections(),
        [
            "◦ cannot find function ExportGenesis in handler.go",
            "◦ cannot find function BeginBlock in handler.go",
        ]
    );
    assert!(err.tracer_error().is_none());
    assert_eq!(
        err.to_string(),
        "code in improper structure:\n\
         ◦ cannot find function ExportGenesis in handler.go\n\
         ◦ cannot find function BeginBlock in handler.go"
    );
}

#[test]
fn misses_are_reported_per_target_in_call_order() {
    let mut clipper = Clipper::new();
    let proto = "syntax = \"proto3\";\npackage mars;\n\nmessage Params {\n}\n";

    clipper
        .paste_code_snippet_at(
            "types.go",
            "package types\n",
            GoSelector::StructNewField,
            &SelectOptions::new().with("structName", "GenesisState"),
            "\tPosts []Post\n",
        )
        .unwrap();
    clipper
        .paste_code_snippet_at(
            "query.proto",
            proto,
            ProtoSelector::NewServiceMethod,
            &SelectOptions::new().with("name", "Query"),
            "  rpc Post(Req) returns (Res);\n",
        )
        .unwrap();
    clipper
        .paste_code_snippet_at(
            "packet.proto",
            proto,
            ProtoSelector::NewOneOfField,
            &SelectOptions::new()
                .with("messageName", "Params")
                .with("oneOfName", "packet"),
            "  string name = 2;\n",
        )
        .unwrap();
    clipper
        .paste_code_snippet_at(
            "genesis.go",
            "package types\n\nfunc DefaultGenesis() int {\n\treturn 0\n}\n",
            GoSelector::ReturningCompositeNewArgument,
            &function("DefaultGenesis"),
            "Posts: nil",
        )
        .unwrap();

    let err = clipper.err().unwrap();
    assert_eq!(
        err.missing_selections(),
        [
            "◦ cannot find struct GenesisState in types.go",
            "◦ cannot find service Query in query.proto",
            "◦ cannot find message Params with oneof field packet in packet.proto",
            "◦ cannot find function DefaultGenesis which is returning value with a map/struct call in genesis.go",
        ]
    );
    let selectors: Vec<Selector> = clipper
        .missing_selections()
        .iter()
        .map(|m| m.selector)
        .collect();
    assert_eq!(
        selectors,
        [
            Selector::Go(GoSelector::StructNewField),
            Selector::Proto(ProtoSelector::NewServiceMethod),
            Selector::Proto(ProtoSelector::NewOneOfField),
            Selector::Go(GoSelector::ReturningCompositeNewArgument),
        ]
    );
}

#[test]
fn clean_session_has_no_error() {
    let mut clipper = Clipper::new();
    let code = clipper
        .paste_code_snippet_at(
            "main.go",
            "package main\n\nfunc main() {}\n",
            GoSelector::StartOfFunction,
            &function("main"),
            "\n\trun()\n",
        )
        .unwrap();
    assert_eq!(code, "package main\n\nfunc main() {\n\trun()\n}\n");
    assert!(clipper.err().is_none());
    assert!(clipper.missing_selections().is_empty());
}

#[test]
fn parse_error_is_returned_not_recorded() {
    let mut clipper = Clipper::new();
    let err = clipper
        .paste_code_snippet_at(
            "broken.go",
            "package main\n\nfunc main( {\n",
            GoSelector::NewImport,
            &SelectOptions::new(),
            "\nimport \"fmt\"",
        )
        .unwrap_err();

    assert!(matches!(err, ClipperError::Parse(ParseError::Syntax { .. })));
    assert!(clipper.err().is_none());
}

#[test]
fn strict_splice_reports_no_position() {
    let err = splice(
        "genesis.proto",
        "syntax = \"proto3\";\n",
        ProtoSelector::NewMessageField,
        &SelectOptions::new().with("name", "GenesisState"),
        |_| "  string a = 1;\n".to_string(),
    )
    .unwrap_err();

    match err {
        ClipperError::NoPosition { selector, path } => {
            assert_eq!(selector, Selector::Proto(ProtoSelector::NewMessageField));
            assert_eq!(path.to_str(), Some("genesis.proto"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn generator_reads_next_field_number() {
    let code = "message GenesisState {\n  Params params = 1;\n  repeated Post posts = 4;\n}\n";
    let generated = splice(
        "genesis.proto",
        code,
        ProtoSelector::NewMessageField,
        &SelectOptions::new().with("name", "GenesisState"),
        |data| {
            let next = data.highest_field_number().unwrap_or(0) + 1;
            format!("  uint64 count = {next};\n")
        },
    )
    .unwrap();
    assert!(generated.ends_with("  repeated Post posts = 4;\n  uint64 count = 5;\n}\n"));
}

#[test]
fn placeholder_and_selection_errors_combine() {
    let mut clipper = Clipper::new();

    let content = "// scaffold # 1\nfunc a() {}\n";
    let replaced = clipper.replace(content, "// scaffold # 1", "// scaffold # 1\nfunc b() {}");
    assert!(replaced.contains("func b() {}"));
    let untouched = clipper.replace(content, "// scaffold # 2", "func c() {}");
    assert_eq!(untouched, content);

    clipper
        .paste_code_snippet_at(
            "main.go",
            "package main\n",
            GoSelector::StartOfFunction,
            &function("main"),
            "x",
        )
        .unwrap();

    let err = clipper.err().unwrap();
    assert_eq!(
        err.to_string(),
        "missing placeholders: // scaffold # 2\n\n\
         code in improper structure:\n\
         ◦ cannot find function main in main.go"
    );
    assert!(err.tracer_error().is_some());
    assert_eq!(
        clipper.tracer_err().map(|e| e.to_string()),
        Some("missing placeholders: // scaffold # 2".to_string())
    );
}
