use std::path::PathBuf;
use std::process::ExitCode;
use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use clap::error::ErrorKind;
use log::{error, info, warn};
use crate::config::Config;
use crate::svg::SankeyRenderer;

mod config;
mod csv_handler;
mod filter;
mod flow_engine;
mod layout;
mod output;
mod record;
mod svg;

/// Draw a Sankey-style SVG of the money flowing between parties in a CSV ledger.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// JSON parameter file
    #[arg(short, long)]
    params: Option<PathBuf>,
    /// CSV file with the transactions (overrides `source_path`)
    #[arg(short, long)]
    input: Option<PathBuf>,
    /// Where to write the SVG (overrides `output_path`)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Only keep transactions sent or received by this party; may be repeated
    #[arg(short, long = "entity")]
    entities: Vec<String>,
    /// First day to include, YYYY-MM-DD
    #[arg(long)]
    from: Option<NaiveDate>,
    /// Last day to include, YYYY-MM-DD
    #[arg(long)]
    to: Option<NaiveDate>,
    #[arg(long)]
    width: Option<u32>,
    #[arg(long)]
    height: Option<u32>,
    #[arg(long)]
    margin: Option<u32>,
    #[arg(long)]
    node_width: Option<u32>,
}

impl Args {
    fn into_config(self) -> anyhow::Result<Config> {
        let mut config = match &self.params {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(input) = self.input {
            config.source_path = Some(input);
        }
        if let Some(output) = self.output {
            config.output_path = output;
        }
        if !self.entities.is_empty() {
            config.entities = self.entities;
        }
        config.from = self.from.or(config.from);
        config.to = self.to.or(config.to);
        config.canvas_width = self.width.unwrap_or(config.canvas_width);
        config.canvas_height = self.height.unwrap_or(config.canvas_height);
        config.canvas_margin = self.margin.unwrap_or(config.canvas_margin);
        config.node_width = self.node_width.unwrap_or(config.node_width);
        config.validate()?;
        Ok(config)
    }
}

/// How a completed run ended. Every variant has written an SVG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Rendered,
    SourceMissing,
    NoFlows,
}

impl Outcome {
    fn exit_code(self) -> ExitCode {
        match self {
            Outcome::Rendered => ExitCode::SUCCESS,
            Outcome::SourceMissing => ExitCode::from(2),
            Outcome::NoFlows => ExitCode::from(3),
        }
    }
}

fn run(config: &Config) -> anyhow::Result<Outcome> {
    let source_path = config.source_path()?;
    let source_missing = !source_path.exists();
    if source_missing {
        warn!("Input file {} does not exist", source_path.display());
    }

    let records = csv_handler::load_csv_file(source_path);
    let filtered = filter::filter_records(&records, &config.predicate(), &config.columns);
    let flows = flow_engine::aggregate(&filtered, &config.columns);

    let renderer = SankeyRenderer {
        currency: config.currency.clone(),
        period: config.period(),
        ..SankeyRenderer::new(config.canvas())
    };
    let document = renderer.render(&flows);
    output::write_atomically(&config.output_path, &document)
        .with_context(|| format!("Failed to save the diagram to {}", config.output_path.display()))?;
    info!("Wrote {}", config.output_path.display());

    println!("Records read: {}", records.len());
    println!("After filtering: {}", filtered.len());
    println!("Unique flows: {}", flows.len());
    if let Some((name, total)) = flows.largest_sender() {
        println!("Largest sender: {} ({})", name, svg::format_amount(total));
    }
    if let Some((name, total)) = flows.largest_receiver() {
        println!("Largest receiver: {} ({})", name, svg::format_amount(total));
    }
    println!("Diagram: {}", config.output_path.display());

    Ok(if source_missing {
        Outcome::SourceMissing
    } else if flows.is_empty() {
        Outcome::NoFlows
    } else {
        Outcome::Rendered
    })
}

fn main() -> ExitCode {
    env_logger::init();
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            // clap's own exit status (2) is reserved for a missing input file.
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let result = args.into_config().and_then(|config| run(&config));
    match result {
        Ok(outcome) => {
            match outcome {
                Outcome::Rendered => {}
                Outcome::SourceMissing => eprintln!("Input file not found, wrote an empty diagram"),
                Outcome::NoFlows => eprintln!("No flows left after filtering, wrote an empty diagram"),
            }
            outcome.exit_code()
        }
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
