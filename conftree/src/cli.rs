use std::path::PathBuf;

use clap::{Args, Parser, ValueEnum};
use conftree_core::Platform;

#[derive(Parser, Debug)]
#[command(name = "conftree")]
#[command(about = "Parse, diff and search network device configurations")]
pub struct Cli {
    /// Log debug details to stderr (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Parse one config and print it in a normalized form.
    Parse(ParseArgs),
    /// Compute the commands turning a current config into a target config.
    Diff(DiffArgs),
    /// Print the lines of a config matching text or tags.
    Search(SearchArgs),
    /// Show the parsed tree of a config with its tags.
    Inspect(InspectArgs),
}

/// How every input config is read.
#[derive(Args, Debug)]
pub struct InputArgs {
    #[arg(long, value_enum)]
    pub platform: PlatformArg,
    /// Template file annotating lines with explicit undo commands.
    #[arg(long)]
    pub template: Option<PathBuf>,
    /// Tagging rules TOML file. Defaults to the embedded rules.
    #[arg(long)]
    pub tags: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct ParseArgs {
    pub file: PathBuf,
    #[command(flatten)]
    pub input: InputArgs,
    #[arg(long, value_enum, default_value_t = TreeFormat::Config)]
    pub format: TreeFormat,
    /// Replace secrets with a mask.
    #[arg(long)]
    pub masked: bool,
}

#[derive(Parser, Debug)]
pub struct DiffArgs {
    pub current: PathBuf,
    pub target: PathBuf,
    #[command(flatten)]
    pub input: InputArgs,
    /// Formal-path regex of a section replaced whole when it differs.
    #[arg(long = "no-diff")]
    pub no_diff: Vec<String>,
    /// Formal-path regex of a section whose line order matters.
    #[arg(long)]
    pub ordered: Vec<String>,
    /// Treat the top level as an ordered section.
    #[arg(long)]
    pub reorder_root: bool,
    /// Skip platform post-processing.
    #[arg(long)]
    pub raw: bool,
    #[arg(long, value_enum, default_value_t = DiffFormat::Patch)]
    pub format: DiffFormat,
    /// With --format human, show only changed lines and their sections.
    #[arg(long)]
    pub diff_only: bool,
    /// Order each level as pre-tagged, untagged, then post-tagged commands.
    #[arg(long)]
    pub staged: bool,
    #[arg(long)]
    pub masked: bool,
    /// Print addition and removal counts instead of the diff.
    #[arg(long, conflicts_with_all = ["format", "output"])]
    pub summary: bool,
    /// Write the rendered diff to a file instead of stdout.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct SearchArgs {
    pub file: PathBuf,
    #[command(flatten)]
    pub input: InputArgs,
    /// Regex matched anywhere in a line.
    #[arg(long)]
    pub string: Option<String>,
    /// Tag a line must carry; prefix with `re:` for a pattern.
    #[arg(long = "include-tag")]
    pub include_tags: Vec<String>,
    #[arg(long = "exclude-tag")]
    pub exclude_tags: Vec<String>,
    /// How include tags combine: or, and.
    #[arg(long, default_value = "or")]
    pub mode: String,
    /// Keep everything below a matched line.
    #[arg(long)]
    pub children: bool,
    #[arg(long, value_enum, default_value_t = TreeFormat::Config)]
    pub format: TreeFormat,
}

#[derive(Parser, Debug)]
pub struct InspectArgs {
    pub file: PathBuf,
    #[command(flatten)]
    pub input: InputArgs,
    #[arg(long, default_value_t = 3)]
    pub depth: usize,
    /// Start from this top-level section.
    #[arg(long)]
    pub section: Option<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum PlatformArg {
    Huawei,
    CiscoIos,
    CiscoNxos,
    Arista,
}

impl From<PlatformArg> for Platform {
    fn from(arg: PlatformArg) -> Self {
        match arg {
            PlatformArg::Huawei => Platform::Huawei,
            PlatformArg::CiscoIos => Platform::CiscoIos,
            PlatformArg::CiscoNxos => Platform::CiscoNxos,
            PlatformArg::Arista => Platform::Arista,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum TreeFormat {
    Config,
    Patch,
    Formal,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum DiffFormat {
    Patch,
    Config,
    Human,
    Json,
}
