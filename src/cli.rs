use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "variation-extract",
    version,
    about = "Extract variation variables and levels from variation definition documents"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Extract(ExtractArgs),
    Edit(EditArgs),
    Inspect(InspectArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    /// Local path (.pdf, .json layout, or text) or http(s) URL.
    #[arg(long)]
    pub source: String,

    #[arg(long = "format", value_enum, default_value_t = FormatHint::Standard)]
    pub format_hint: FormatHint,

    #[arg(long, default_value = "parsed_variations.json")]
    pub output: PathBuf,

    #[arg(long)]
    pub report_path: Option<PathBuf>,

    #[arg(long)]
    pub profile_path: Option<PathBuf>,

    /// Level edit in the form "Variable:ID=New Value".
    #[arg(long = "edit")]
    pub edits: Vec<String>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum FormatHint {
    Standard,
    #[value(alias = "south_carolina")]
    SouthCarolina,
}

impl FormatHint {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::SouthCarolina => "south_carolina",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    #[arg(long)]
    pub input: PathBuf,

    /// Defaults to rewriting the input file.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// "Variable:ID=New Value"
    #[arg(long = "update")]
    pub updates: Vec<String>,

    /// "Variable=Value" or "Variable=Value [CODE]"
    #[arg(long = "add")]
    pub additions: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    #[arg(long)]
    pub source: String,

    #[arg(long, default_value = "pdf_structure.json")]
    pub output: PathBuf,
}
