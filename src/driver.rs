//! Source assembly and file-level compilation.
//!
//! A compilation unit is assembled as plain text before it ever reaches the
//! parser: the shipped prelude first, then each dependency wrapped in a
//! module-registration template, then the user program. Dependencies keep
//! their command-line order, and a wrapped module sees only the `exports`
//! object it is handed, so later modules can read earlier ones through
//! `modules["name"]`.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use thiserror::Error;
use tracing::debug;

use crate::{backend, frontend, Context as _, Result};

/// The runtime library compiled in front of every program: the module
/// table, array and string polyfills, the error constructors and
/// `parseInt`.
pub const PRELUDE: &str = include_str!("prelude.js");

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("malformed dependency \"{0}\": expected name=path")]
    MalformedDependency(String),
}

/// Parse a `name=path,name=path` dependency list, preserving order. An
/// empty string yields an empty map.
pub fn parse_dependency_list(text: &str) -> Result<IndexMap<String, PathBuf>, DriverError> {
    let mut deps = IndexMap::new();
    for entry in text.split(',').filter(|entry| !entry.is_empty()) {
        let (name, path) = entry
            .split_once('=')
            .ok_or_else(|| DriverError::MalformedDependency(entry.to_string()))?;
        if name.is_empty() || path.is_empty() {
            return Err(DriverError::MalformedDependency(entry.to_string()));
        }
        deps.insert(name.to_string(), PathBuf::from(path));
    }
    Ok(deps)
}

/// Wrap a dependency source in the module-registration template. The
/// module body runs immediately against a fresh `exports` object stored in
/// the module table under its name. The whole wrapper is one line; the
/// source is spliced in with a space on each side.
pub fn wrap_module(name: &str, source: &str) -> String {
    format!(
        "modules[\"{name}\"] = {{}};\n\
         function (exports) {{ {source} }}(modules[\"{name}\"]);\n"
    )
}

/// Assemble one translation input: prelude, wrapped dependencies in order,
/// then the user program.
pub fn assemble(user_source: &str, deps: &IndexMap<String, String>) -> String {
    let mut out = String::from(PRELUDE);
    out.push('\n');
    for (name, source) in deps {
        out.push_str(&wrap_module(name, source));
        out.push('\n');
    }
    out.push_str(user_source);
    out
}

/// Read, assemble, parse and compile one program file.
pub fn compile_file(path: &Path, deps: &IndexMap<String, PathBuf>) -> Result<String> {
    let user_source = fs::read_to_string(path)
        .with_context(|| format!("failed to read program {}", path.display()))?;

    let mut dep_sources = IndexMap::new();
    for (name, dep_path) in deps {
        let source = fs::read_to_string(dep_path).with_context(|| {
            format!("failed to read dependency {name} from {}", dep_path.display())
        })?;
        dep_sources.insert(name.clone(), source);
    }

    let assembled = assemble(&user_source, &dep_sources);
    debug!(
        bytes = assembled.len(),
        dependencies = deps.len(),
        "assembled compilation input"
    );

    let program = frontend::parse(&assembled)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    let c_source = backend::compile(&program)
        .with_context(|| format!("failed to compile {}", path.display()))?;
    Ok(c_source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_list_keeps_order() {
        let deps = parse_dependency_list("b=lib/b.js,a=lib/a.js").expect("should parse");
        let names: Vec<_> = deps.keys().cloned().collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(deps["b"], PathBuf::from("lib/b.js"));
    }

    #[test]
    fn test_empty_dependency_list() {
        assert!(parse_dependency_list("").expect("should parse").is_empty());
    }

    #[test]
    fn test_malformed_dependency_is_rejected() {
        assert!(parse_dependency_list("assert").is_err());
        assert!(parse_dependency_list("=lib/a.js").is_err());
        assert!(parse_dependency_list("a=").is_err());
    }

    #[test]
    fn test_wrapped_module_registers_and_runs() {
        let text = wrap_module("assert", "exports.ok = 1;");
        assert_eq!(
            text,
            "modules[\"assert\"] = {};\n\
             function (exports) { exports.ok = 1; }(modules[\"assert\"]);\n"
        );
    }

    #[test]
    fn test_wrapped_module_parses() {
        let text = wrap_module("assert", "exports.ok = function () { return 1; };");
        assert!(frontend::parse(&text).is_ok());
    }

    #[test]
    fn test_assembly_order() {
        let mut deps = IndexMap::new();
        deps.insert("lib".to_string(), "exports.x = 1;".to_string());
        let text = assemble("f();", &deps);
        let prelude = text.find("var modules = {};").expect("prelude present");
        let module = text.find("modules[\"lib\"]").expect("module present");
        let user = text.rfind("f();").expect("user program present");
        assert!(prelude < module && module < user);
    }
}
