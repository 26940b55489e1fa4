use std::{
    fs::File,
    io::{BufReader, Write as _},
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use tracing::level_filters::LevelFilter;

#[derive(Parser, Debug)]
#[command(name = "tmplwire", version)]
struct Cli {
    /// Log progress to stderr (repeat for more detail).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the canonical JSON tree of a template.
    Canon(CanonArgs),
    /// Render a template or canonical tree against a JSON data document.
    Render(RenderArgs),
    /// Print the canonical trees of every template in a directory as one JSON object.
    Bundle(BundleArgs),
}

#[derive(Args, Debug)]
struct SyntaxArgs {
    /// Left action delimiter.
    #[arg(long, default_value = "{{")]
    left_delim: String,

    /// Right action delimiter.
    #[arg(long, default_value = "}}")]
    right_delim: String,

    /// Keep comments in the syntax tree (canonicalization then rejects them).
    #[arg(long)]
    keep_comments: bool,
}

impl SyntaxArgs {
    fn options(&self) -> tmplwire::ParseOptions {
        tmplwire::ParseOptions::new()
            .with_delims(&self.left_delim, &self.right_delim)
            .with_comments(self.keep_comments)
    }
}

#[derive(Parser, Debug)]
struct CanonArgs {
    /// Template source file.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Pretty-print the JSON.
    #[arg(long)]
    pretty: bool,

    #[command(flatten)]
    syntax: SyntaxArgs,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Template source file.
    #[arg(long = "in", conflicts_with = "tree", required_unless_present = "tree")]
    in_path: Option<PathBuf>,

    /// Canonical tree JSON file, as printed by `canon`.
    #[arg(long)]
    tree: Option<PathBuf>,

    /// Data JSON file; `null` when omitted.
    #[arg(long)]
    data: Option<PathBuf>,

    #[command(flatten)]
    syntax: SyntaxArgs,
}

#[derive(Parser, Debug)]
struct BundleArgs {
    /// Directory holding the templates.
    #[arg(long)]
    dir: PathBuf,

    /// File extension of the templates to load.
    #[arg(long, default_value = "html")]
    ext: String,

    /// Pretty-print the JSON.
    #[arg(long)]
    pretty: bool,

    #[command(flatten)]
    syntax: SyntaxArgs,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.cmd {
        Command::Canon(args) => cmd_canon(args),
        Command::Render(args) => cmd_render(args),
        Command::Bundle(args) => cmd_bundle(args),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn read_source(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("read template '{}'", path.display()))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> anyhow::Result<T> {
    let f = File::open(path).with_context(|| format!("open {what} '{}'", path.display()))?;
    let r = BufReader::new(f);
    serde_json::from_reader(r).with_context(|| format!("parse {what} JSON '{}'", path.display()))
}

fn write_stdout(text: &str) -> anyhow::Result<()> {
    let mut out = std::io::stdout().lock();
    out.write_all(text.as_bytes()).context("write stdout")?;
    out.flush().context("flush stdout")
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> anyhow::Result<String> {
    let mut json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    json.push('\n');
    Ok(json)
}

fn cmd_canon(args: CanonArgs) -> anyhow::Result<()> {
    let source = read_source(&args.in_path)?;
    let tree = tmplwire::compile_with(&source, &args.syntax.options())
        .with_context(|| format!("compile '{}'", args.in_path.display()))?;
    write_stdout(&to_json(&tree, args.pretty)?)
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let tree: tmplwire::Node = match (&args.in_path, &args.tree) {
        (_, Some(tree_path)) => read_json(tree_path, "canonical tree")?,
        (Some(in_path), None) => {
            let source = read_source(in_path)?;
            tmplwire::compile_with(&source, &args.syntax.options())
                .with_context(|| format!("compile '{}'", in_path.display()))?
        }
        (None, None) => anyhow::bail!("one of --in or --tree is required"),
    };

    let data = match &args.data {
        Some(path) => read_json(path, "data")?,
        None => tmplwire::Value::Null,
    };

    let out = tmplwire::render(&tree, &data).context("render template")?;
    tracing::info!(bytes = out.len(), "rendered");
    write_stdout(&out)
}

fn cmd_bundle(args: BundleArgs) -> anyhow::Result<()> {
    let set = tmplwire::TemplateSet::load_dir(&args.dir, &args.ext, &args.syntax.options())
        .with_context(|| format!("load templates from '{}'", args.dir.display()))?;
    tracing::info!(templates = set.len(), "bundled");
    let mut json = if args.pretty {
        set.to_json_pretty()
    } else {
        set.to_json()
    }
    .context("serialize bundle")?;
    json.push('\n');
    write_stdout(&json)
}
