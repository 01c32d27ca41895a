//! jscc — an ahead-of-time compiler from a small prototype-based scripting
//! language (a JavaScript subset) to C source text.
//!
//! The pipeline is a backtracking parser-combinator frontend producing a
//! syntax tree, and a backend that hoists declarations, lowers control flow
//! and emits one self-contained C translation unit over a fixed runtime
//! surface.
//!
//! # Example
//!
//! ```no_run
//! use jscc::{compile_source, Result};
//!
//! fn main() -> Result<()> {
//!     let c_source = compile_source("return 2 + 3;")?;
//!     print!("{c_source}");
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/jscc")]
#![warn(rust_2018_idioms)]

// Public modules
pub mod backend;
pub mod driver;
pub mod frontend;

// Utility modules
pub mod util;

// Re-exports
pub use anyhow::{Context, Result};
pub use thiserror::Error;

use tracing::debug;

/// Compiler version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Compiler name
pub const NAME: &str = "jscc";

/// Compile source text (without prelude or dependencies) to C.
pub fn compile_source(source: &str) -> Result<String> {
    debug!(bytes = source.len(), "compiling source");
    let program = frontend::parse(source).context("failed to parse program")?;
    debug!(statements = program.len(), "parsed program");
    let c_source = backend::compile(&program).context("failed to generate C")?;
    Ok(c_source)
}

use std::path::Path;

/// Compile a program file with the prelude and its dependencies; see
/// [`driver::compile_file`].
pub fn compile_file(path: &Path) -> Result<String> {
    driver::compile_file(path, &indexmap::IndexMap::new())
}
