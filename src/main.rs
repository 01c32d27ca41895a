//! jscc - CLI

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use jscc::util::logger::{self, LogLevel};
use jscc::{driver, frontend, NAME, VERSION};

/// An ahead-of-time compiler from a prototype-based scripting language to C
#[derive(Parser, Debug)]
#[command(name = "jscc")]
#[command(version = VERSION)]
#[command(about = NAME, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile a source file to C
    Compile {
        /// Source file to compile
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Dependencies as a name=path,name=path list, compiled in order
        /// before the program
        #[arg(short, long, default_value = "")]
        dependencies: String,

        /// Write the generated C here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Parse a source file and dump its syntax tree
    Parse {
        /// Source file to parse
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Print version information
    Version,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.verbose {
        logger::init_with_level(LogLevel::Debug);
    } else {
        logger::init();
    }

    match args.command {
        Commands::Compile {
            file,
            dependencies,
            output,
        } => {
            let deps = driver::parse_dependency_list(&dependencies)
                .context("failed to parse dependency list")?;
            let c_source = driver::compile_file(&file, &deps)
                .with_context(|| format!("failed to compile: {}", file.display()))?;
            match output {
                Some(path) => fs::write(&path, c_source)
                    .with_context(|| format!("failed to write: {}", path.display()))?,
                None => print!("{c_source}"),
            }
        }
        Commands::Parse { file } => {
            let source = fs::read_to_string(&file)
                .with_context(|| format!("failed to read: {}", file.display()))?;
            let program = frontend::parse(&source)
                .with_context(|| format!("failed to parse: {}", file.display()))?;
            for stmt in &program {
                println!("{stmt:#?}");
            }
        }
        Commands::Version => {
            println!("{} {}", NAME, VERSION);
        }
    }

    Ok(())
}
