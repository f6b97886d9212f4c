//! CLI command definitions and handlers

pub mod inspect;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

const LONG_ABOUT: &str = r#"
Documentation model for C and C++ sources.

Reads translation units dumped by a clang-based front end, builds the
documentation tree (symbols, comments, categories, class hierarchy) and
resolves <Name> references inside comments.

COMMENT MARKUP:
    /// Brief line.                  Doc comment attached to the next declaration
    //- internal note                Ignored comment
    // cldoc:begin-category(Name)    Group following declarations
    // cldoc:end-category()          Close the innermost category
    <Name>, <[label]A::b>, $<re>     References resolved against the tree

DESCRIPTION FILES (--merge):
    #<cldoc:ns::Class>               Replace the description of ns::Class
    #<cldoc:index>                   Describe the root
    #<cldoc:include>(part.md)        Splice in another file

LOGGING:
    CXXDOC_LOG=debug cxxdoc inspect --ast dump.json

EXAMPLES:
    cxxdoc inspect --ast dump.json                Outline every unit in the dump
    cxxdoc inspect --ast dump.json include/a.h    Document selected files only
    cxxdoc inspect --ast dump.json --stats        Tree statistics
    cxxdoc inspect --ast dump.json --json         JSON outline for scripting
    cxxdoc inspect --ast dump.json --merge docs/  Merge markdown descriptions
"#;

/// Documentation model for C and C++ sources
#[derive(Parser, Debug)]
#[command(name = "cxxdoc")]
#[command(author, version)]
#[command(about = "Documentation model for C and C++ sources")]
#[command(long_about = LONG_ABOUT)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (default: $CXXDOC_HOME/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the documentation tree from an AST dump and print it
    #[command(visible_alias = "i")]
    Inspect(InspectArgs),
}

/// Arguments for the inspect command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:
    cxxdoc inspect --ast dump.json              Indented outline
    cxxdoc inspect --ast dump.json --json       JSON output
    cxxdoc inspect --ast dump.json --stats      Counts only")]
pub struct InspectArgs {
    /// JSON dump produced by the clang front end
    #[arg(short, long)]
    pub ast: PathBuf,

    /// Files to document (default: every unit in the dump)
    pub files: Vec<PathBuf>,

    /// Description files or directories to merge into the documentation
    #[arg(short, long, value_name = "PATH")]
    pub merge: Vec<PathBuf>,

    /// Program each description file is passed through before merging
    #[arg(long, value_name = "PROGRAM")]
    pub merge_filter: Option<PathBuf>,

    /// Print statistics instead of the outline
    #[arg(long)]
    pub stats: bool,

    /// JSON output
    #[arg(long)]
    pub json: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl InspectArgs {
    pub fn format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}
