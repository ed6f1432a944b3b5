use anyhow::{Context, Result, bail};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;
use taskmark::config::MetadataParseMode;
use taskmark::inherit::FileMetadata;
use taskmark::time::ClockTimeParser;
use taskmark::{MarkdownTaskParser, MetadataSources, ParserConfig};

#[derive(Debug, Default)]
struct Args {
    file: Option<PathBuf>,
    config: Option<PathBuf>,
    frontmatter: Option<PathBuf>,
    project_config: Option<PathBuf>,
    legacy: bool,
    verbose: bool,
}

fn parse_args(raw: &[String]) -> Result<Args> {
    let mut args = Args::default();
    let mut iter = raw.iter();
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| -> Result<PathBuf> {
            iter.next()
                .map(PathBuf::from)
                .with_context(|| format!("{} expects a path", flag))
        };
        match arg.as_str() {
            "--config" | "-c" => args.config = Some(value(arg)?),
            "--frontmatter" => args.frontmatter = Some(value(arg)?),
            "--project-config" => args.project_config = Some(value(arg)?),
            "--legacy" => args.legacy = true,
            "--verbose" | "-v" => args.verbose = true,
            other if other.starts_with('-') => bail!("Unknown option '{}'", other),
            other => {
                if args.file.is_some() {
                    bail!("Only one input file is supported");
                }
                args.file = Some(PathBuf::from(other));
            }
        }
    }
    Ok(args)
}

fn load_json_map(path: &Path) -> Result<FileMetadata> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read '{}'", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("'{}' is not a JSON object", path.display()))
}

fn main() -> Result<()> {
    let raw: Vec<String> = env::args().skip(1).collect();
    if raw.is_empty() || raw.iter().any(|a| a == "--help" || a == "-h" || a == "help") {
        print_help();
        return Ok(());
    }
    let args = parse_args(&raw)?;

    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )?;

    let file = args.file.context("No input file given")?;
    let config = match &args.config {
        Some(path) => ParserConfig::load(path)?,
        None => ParserConfig::default(),
    };
    let sources = MetadataSources {
        frontmatter: args.frontmatter.as_deref().map(load_json_map).transpose()?,
        project_config: args
            .project_config
            .as_deref()
            .map(load_json_map)
            .transpose()?,
        fallback_project: None,
    };

    let input = fs::read_to_string(&file)
        .with_context(|| format!("Failed to read '{}'", file.display()))?;
    let file_path = file.to_string_lossy();
    let parser = MarkdownTaskParser::new(config).with_time_parser(Box::new(ClockTimeParser::new()));

    let output = if args.legacy {
        serde_json::to_string_pretty(&parser.parse_legacy(&input, &file_path, &sources))?
    } else {
        serde_json::to_string_pretty(&parser.parse(&input, &file_path, &sources))?
    };
    println!("{}", output);
    Ok(())
}

fn print_help() {
    println!(
        "Taskmark v{} - Extract tasks and their metadata from markdown",
        env!("CARGO_PKG_VERSION")
    );
    println!();
    println!("USAGE:");
    println!("    taskmark <file.md> [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -c, --config <file.toml>          Parser configuration");
    println!("    --frontmatter <file.json>         File-level metadata to inherit");
    println!("    --project-config <file.json>      Project-level metadata to inherit");
    println!("    --legacy                          Emit the flattened legacy task shape");
    println!("    -v, --verbose                     Debug logging on stderr");
    println!("    -h, --help                        Show this help message");
    println!();
    println!("INLINE SYNTAX:");
    println!("    - [ ] text                        Task (status char between brackets)");
    println!("    [due:: 2025-01-01]                Dataview field");
    println!("    📅 ⏳ 🛫 ✅ ➕ ❌                  Due, scheduled, start, done, created, cancelled");
    println!("    🔺 ⏫ 🔼 🔽 ⏬                    Priority, highest to lowest");
    println!("    #tag  #project/Name  @context     Tags, prefixed fields, context");
    println!();
    println!("METADATA MODES (metadata_parse_mode in the config file):");
    for mode in MetadataParseMode::iter() {
        println!("    {:<34}{}", format!("{:?}", mode), mode);
    }
}
