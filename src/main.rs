use std::io::Read;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use katori::config::Config;
use katori::embedder::Embedder;
use katori::embedder::http::HttpEmbedder;
use katori::embedder::mock::MockEmbedder;
use katori::engine::http::HttpGenerator;
use katori::engine::mock::MockGenerator;
use katori::engine::{Generator, NutritionEstimate};
use katori::pipeline::{EstimateError, Pipeline, parse_batch_input};

#[derive(Parser)]
#[command(name = "katori", version, about = "Indian dish nutrition estimator")]
struct Cli {
    /// Path to the JSON config file (defaults to katori.json)
    #[arg(long, default_value = "")]
    config: String,

    /// Use the offline mock capabilities instead of HTTP endpoints
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the index and write the config template, then exit
    Init,

    /// Estimate nutrition for a single dish name
    Estimate { dish: String },

    /// Estimate a dish with declared data-quality issues
    Messy {
        dish: String,
        /// Declared issue, repeatable (e.g. -i "quantity missing")
        #[arg(short = 'i', long = "issue", required = true)]
        issues: Vec<String>,
    },

    /// Process a JSON array of {"dish", "issues"} entries (file path or '-')
    Batch { path: String },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = Config::load(&cli.config)?;
    config.validate()?;

    let (embedder, generator): (Arc<dyn Embedder>, Arc<dyn Generator>) = if cli.mock {
        (
            Arc::new(MockEmbedder::new(config.embedding.dimensions)),
            Arc::new(MockGenerator::canned()),
        )
    } else {
        (
            Arc::new(HttpEmbedder::new(&config.embedding).context("embedding capability")?),
            Arc::new(HttpGenerator::new(&config.generation).context("generative capability")?),
        )
    };

    let pipeline =
        Pipeline::initialize(config, embedder, generator).context("pipeline start-up failed")?;

    match cli.command {
        Command::Init => {
            println!("Index built; configuration ready.");
        }
        Command::Estimate { dish } => {
            render_outcome(&dish, &pipeline.estimate(&dish));
        }
        Command::Messy { dish, issues } => {
            render_outcome(&dish, &pipeline.estimate_messy(&dish, &issues));
        }
        Command::Batch { path } => {
            let json = read_batch_source(&path)?;
            match parse_batch_input(&json) {
                // Malformed input renders once, above all rows
                Err(e) => println!("{e}"),
                Ok(entries) => {
                    for outcome in pipeline.estimate_batch(&entries) {
                        render_outcome(&outcome.dish, &outcome.result);
                        println!();
                    }
                }
            }
        }
    }

    pipeline.shutdown();
    Ok(())
}

fn read_batch_source(path: &str) -> Result<String> {
    if path == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read batch input from stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(path).with_context(|| format!("failed to read batch file: {path}"))
    }
}

/// Per-item rendering: an estimate or an inline error scoped to the dish.
fn render_outcome(dish: &str, result: &Result<NutritionEstimate, EstimateError>) {
    println!("Dish: {dish}");
    match result {
        Ok(estimate) => render_estimate(estimate),
        Err(e) => println!("  error: {e}"),
    }
}

fn render_estimate(estimate: &NutritionEstimate) {
    println!("Ingredients Used:");
    for ingredient in &estimate.ingredients {
        println!(
            "- {}: {} {}",
            ingredient.name, ingredient.quantity, ingredient.unit
        );
    }

    let n = &estimate.nutrition_per_serving;
    println!("Nutrition (per 1 katori):");
    println!("- Calories: {:.0} kcal", n.calories);
    println!("- Protein: {:.1} g", n.protein_g);
    println!("- Fat: {:.1} g", n.fat_g);
    println!("- Carbs: {:.1} g", n.carbs_g);

    println!("Dish Type: {}", estimate.dish_type);

    if !estimate.assumptions.is_empty() {
        println!("Assumptions:");
        for assumption in &estimate.assumptions {
            println!("- {assumption}");
        }
    }
}
