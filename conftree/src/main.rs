use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use conftree::inspect::render_tree;
use conftree::report::{render_human, render_summary};
use conftree::rules::resolve_tag_rules;
use conftree_core::{
    diff_with_options, human_diff_with_options, parse_with_options, search, to_json, DiffOptions,
    HumanDiffMode, IncludeMode, Node, ParseOptions, Platform, SearchOptions, TaggingRules,
    Template, POST_TAG, PRE_TAG,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod cli;
mod path_guard;

use cli::{Cli, Command, DiffArgs, DiffFormat, InputArgs, InspectArgs, ParseArgs, SearchArgs, TreeFormat};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Parse(args) => run_parse(args),
        Command::Diff(args) => run_diff(args),
        Command::Search(args) => run_search(args),
        Command::Inspect(args) => run_inspect(args),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Template and tagging rules shared by every config read in one command.
struct Loader {
    platform: Platform,
    template: Option<Template>,
    tagging: TaggingRules,
}

impl Loader {
    fn new(input: &InputArgs) -> Result<Self> {
        let platform = Platform::from(input.platform);
        let template = match &input.template {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("failed to read template {}", path.display()))?;
                let template = Template::parse(&text, platform)
                    .with_context(|| format!("failed to compile template {}", path.display()))?;
                Some(template)
            }
            None => None,
        };
        let (rules, source) = resolve_tag_rules(input.tags.as_deref());
        debug!(source = %source, rules = rules.len(), "loaded tagging rules");
        let tagging = TaggingRules::new(&rules)
            .with_context(|| format!("invalid tagging rules from {source}"))?;

        Ok(Self {
            platform,
            template,
            tagging,
        })
    }

    fn load(&self, path: &Path) -> Result<Node> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let options = ParseOptions {
            template: self.template.as_ref(),
            tagging: Some(&self.tagging),
        };
        parse_with_options(&text, self.platform, &options)
            .with_context(|| format!("failed to parse {}", path.display()))
    }
}

fn run_parse(args: ParseArgs) -> Result<()> {
    let loader = Loader::new(&args.input)?;
    let tree = loader.load(&args.file)?;
    print!("{}", render_tree_format(&tree, args.format, args.masked));
    Ok(())
}

fn run_diff(args: DiffArgs) -> Result<()> {
    let loader = Loader::new(&args.input)?;
    let current = loader.load(&args.current)?;
    let target = loader.load(&args.target)?;

    let mut opts = DiffOptions::for_platform(loader.platform);
    opts.no_diff_sections.extend(args.no_diff);
    opts.ordered_sections = args.ordered;
    opts.reorder_root = args.reorder_root;
    if args.raw {
        opts = opts.raw();
    }

    let rendered = if matches!(args.format, DiffFormat::Human) {
        let mode = if args.diff_only {
            HumanDiffMode::DiffOnly
        } else {
            HumanDiffMode::Full
        };
        let raw = human_diff_with_options(&current, &target, mode, &opts, args.masked)
            .context("failed to compare configs")?;
        if args.output.is_some() {
            raw
        } else {
            render_human(&raw)
        }
    } else {
        let mut diff = diff_with_options(&current, &target, &opts)
            .context("failed to diff configs")?;
        if args.staged {
            diff.reorder(&[POST_TAG], true);
            diff.reorder(&[PRE_TAG], false);
        }
        if args.summary {
            println!("{}", render_summary(&diff));
            return Ok(());
        }

        match args.format {
            DiffFormat::Config if args.masked => diff.masked_config(),
            DiffFormat::Config => diff.config(),
            DiffFormat::Json => format!("{}\n", to_json(&diff)),
            DiffFormat::Patch | DiffFormat::Human if args.masked => diff.masked_patch(),
            DiffFormat::Patch | DiffFormat::Human => diff.patch(),
        }
    };

    match &args.output {
        Some(out_path) => {
            path_guard::ensure_output_not_input(out_path, &[&args.current, &args.target])?;
            fs::write(out_path, rendered)
                .with_context(|| format!("failed to write diff {}", out_path.display()))?;
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

fn run_search(args: SearchArgs) -> Result<()> {
    let include_mode: IncludeMode = args.mode.parse()?;
    let loader = Loader::new(&args.input)?;
    let tree = loader.load(&args.file)?;

    let opts = SearchOptions {
        string: args.string,
        include_tags: args.include_tags,
        exclude_tags: args.exclude_tags,
        include_mode,
        include_children: args.children,
    };
    let found = search(&tree, &opts).context("search failed")?;
    print!("{}", render_tree_format(&found, args.format, false));
    Ok(())
}

fn run_inspect(args: InspectArgs) -> Result<()> {
    let loader = Loader::new(&args.input)?;
    let tree = loader.load(&args.file)?;

    let start = if let Some(section) = args.section {
        tree.child(&section)
            .with_context(|| format!("section '{}' not found", section))?
    } else {
        &tree
    };

    print!("{}", render_tree(start, args.depth));
    Ok(())
}

fn render_tree_format(tree: &Node, format: TreeFormat, masked: bool) -> String {
    match format {
        TreeFormat::Config if masked => tree.masked_config(),
        TreeFormat::Config => tree.config(),
        TreeFormat::Patch if masked => tree.masked_patch(),
        TreeFormat::Patch => tree.patch(),
        TreeFormat::Formal => tree.formal_config(),
        TreeFormat::Json => format!("{}\n", to_json(tree)),
    }
}
