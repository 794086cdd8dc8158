//! sift - command-line front end

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sift_engine::score::TextScorer;
use sift_engine::{Catalog, Engine, EngineConfig, Mode, StoredOptions};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Engine configuration (JSON); missing keys use defaults
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify an HTML page and print the classified nodes
    Classify {
        /// HTML file
        html: PathBuf,
        /// Rule catalog (JSON); defaults to the bundled one
        #[arg(long, value_name = "FILE")]
        catalog: Option<PathBuf>,
        /// Stored options (JSON); defaults to the catalog defaults
        #[arg(long, value_name = "FILE")]
        options: Option<PathBuf>,
        /// Override the stored mode (0 off, 1 normal, 2 extreme)
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=2))]
        mode: Option<u8>,
    },
    /// Score text read from a file or stdin, printed as JSON
    Score {
        file: Option<PathBuf>,
    },
    /// Show how an extended selector is split up
    Compile {
        selector: String,
    },
    /// Print the default stored options for a catalog
    Defaults {
        #[arg(long, value_name = "FILE")]
        catalog: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Classify { html, catalog, options, mode } => {
            classify(config, &html, catalog.as_deref(), options.as_deref(), mode)
        }
        Command::Score { file } => score(&config, file.as_deref()),
        Command::Compile { selector } => compile(&selector),
        Command::Defaults { catalog } => {
            let catalog = load_catalog(&config, catalog.as_deref())?;
            println!("{}", StoredOptions::defaults(&catalog).to_json()?);
            Ok(())
        }
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_json(&read(path)?)
            .with_context(|| format!("Invalid configuration in {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn load_catalog(config: &EngineConfig, path: Option<&Path>) -> Result<Catalog> {
    let catalog = match path {
        Some(path) => Catalog::from_json(&read(path)?, config)
            .with_context(|| format!("Invalid catalog in {}", path.display()))?,
        None => Catalog::bundled(config)?,
    };
    Ok(catalog)
}

fn classify(
    config: EngineConfig,
    html: &Path,
    catalog: Option<&Path>,
    options: Option<&Path>,
    mode: Option<u8>,
) -> Result<()> {
    let catalog = load_catalog(&config, catalog)?;
    let mut stored = match options {
        Some(path) => StoredOptions::from_json(&read(path)?)
            .with_context(|| format!("Invalid options in {}", path.display()))?,
        None => StoredOptions::defaults(&catalog),
    };
    if let Some(mode) = mode {
        stored.mode = Mode::try_from(mode).map_err(anyhow::Error::msg)?;
    }

    let source = read(html)?;
    let mut document = sift_html::HtmlParser::new().parse_with_url(&source, &html.display().to_string());
    let attribute = config.classification_attribute.clone();
    let mut engine = Engine::new(config, catalog).context("Failed to build engine")?;

    let report = engine.apply_options(document.tree_mut(), &stored);
    for id in &report.invalid {
        tracing::warn!("Rule '{}' has an invalid selector", id);
    }
    if report.errors > 0 {
        tracing::warn!("{} nodes could not be reverted", report.errors);
    }

    let tree = document.tree();
    for (node, record) in engine.record().nodes() {
        let rules: Vec<&str> = record.entries.iter().map(|e| e.rule_id.as_str()).collect();
        let classes: Vec<&str> = record.entries.iter().map(|e| e.applied_class.as_str()).collect();
        println!(
            "{node}\t<{}>\t{}={}\t[{}]\t{}",
            tree.tag_name(node).unwrap_or("?"),
            attribute,
            tree.get_attribute(node, &attribute).unwrap_or(""),
            rules.join(","),
            classes.join(" "),
        );
    }
    println!(
        "classified {} nodes ({} candidates, {} scored, {} errors), noise ratio {}%",
        engine.record().len(),
        report.batch.candidates,
        report.batch.scored,
        report.batch.errors,
        engine.noise_ratio(tree),
    );
    if !report.purged.is_empty() {
        println!("purged: {}", report.purged.join(", "));
    }
    Ok(())
}

fn score(config: &EngineConfig, file: Option<&Path>) -> Result<()> {
    let text = match file {
        Some(path) => read(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };
    let result = TextScorer::new(config.thresholds.clone()).score(&text);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn compile(selector: &str) -> Result<()> {
    let compiled = sift_engine::css::compile(selector)?;
    println!("base: {}", compiled.base());
    if let Err(err) = compiled.structural() {
        println!("  (structural part does not evaluate: {err})");
    }
    for (i, clause) in compiled.has_clauses().iter().enumerate() {
        for pair in clause.pairs() {
            println!("has[{i}]: {} => {}", pair.sub_selector(), pair.predicate());
        }
    }
    for predicate in compiled.contains_predicates() {
        println!("contains: {predicate}");
    }
    Ok(())
}
