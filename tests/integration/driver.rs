//! File-level compilation: prelude, dependencies and user program are
//! assembled into one translation input.

use std::fs;

use indexmap::IndexMap;

use jscc::driver::{compile_file, parse_dependency_list};

#[test]
fn test_compile_file_includes_prelude_and_dependencies() {
    let dir = tempfile::tempdir().expect("should create temp dir");

    let dep_path = dir.path().join("assert.js");
    fs::write(
        &dep_path,
        "exports.ok = function (value) {\n  if (!value) {\n    throw new Error(\"assertion failed\");\n  }\n};\n",
    )
    .expect("should write dependency");

    let program_path = dir.path().join("main.js");
    fs::write(
        &program_path,
        "modules[\"assert\"].ok(1 < 2);\nreturn parseInt(\"42\");\n",
    )
    .expect("should write program");

    let mut deps = IndexMap::new();
    deps.insert("assert".to_string(), dep_path);

    let c_source = compile_file(&program_path, &deps).expect("should compile");

    // Prelude names flow through: the module table and parseInt exist.
    assert!(c_source.contains("js_declare_variable(binding, \"modules\", js_new_undefined());"));
    assert!(c_source.contains("\"parseInt\""));
    // The wrapped dependency registers itself under its name.
    assert!(c_source.contains("js_new_string(\"assert\")"));
}

#[test]
fn test_missing_file_reports_its_path() {
    let error = compile_file(std::path::Path::new("no/such/program.js"), &IndexMap::new())
        .expect_err("should fail");
    assert!(format!("{error:#}").contains("no/such/program.js"));
}

#[test]
fn test_missing_dependency_reports_its_name() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let program_path = dir.path().join("main.js");
    fs::write(&program_path, "f();\n").expect("should write program");

    let deps = parse_dependency_list("assert=no/such/assert.js").expect("should parse");
    let error = compile_file(&program_path, &deps).expect_err("should fail");
    assert!(format!("{error:#}").contains("assert"));
}
