use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use foodscan::config;
use foodscan::lookup::Dispatcher;
use foodscan::model::FoodItem;
use foodscan::scan::{self, ScanOutcome};

#[derive(Debug, Parser)]
#[command(author, version, about = "Look up foods by barcode or name")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Scan a barcode (spaces and dashes are ignored)
    Scan {
        raw: String,
        /// Print nutrition for this many servings
        #[arg(long, default_value_t = 1.0)]
        quantity: f64,
    },
    /// Search foods by name
    Search {
        query: String,
        #[arg(long, default_value_t = 0)]
        min_healthiness: u8,
    },
    /// Print an example config file
    ExampleConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    if let Command::ExampleConfig = args.command {
        print!("{}", config::example());
        return Ok(());
    }

    let cfg = config::load(Some(&args.config))
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    let client = cfg.backend_client()?;

    match args.command {
        Command::Scan { raw, quantity } => {
            let dispatcher = Dispatcher::new(Arc::new(client), cfg.retry_policy());
            let outcome = scan::scan(&raw, &dispatcher).await;
            report(&outcome, quantity)?;
            if let ScanOutcome::Invalid { .. } = outcome {
                bail!("not a barcode: {:?}", raw);
            }
        }
        Command::Search {
            query,
            min_healthiness,
        } => {
            let results = client.search_foods(&query, min_healthiness).await?;
            info!(count = results.len(), "search finished");
            for item in &results {
                println!(
                    "{:<40} {:>7.1} kcal  health {}/10",
                    item.display_name(),
                    item.calories,
                    item.healthiness()
                );
            }
        }
        Command::ExampleConfig => {}
    }
    Ok(())
}

fn report(outcome: &ScanOutcome, quantity: f64) -> Result<()> {
    match outcome {
        ScanOutcome::Invalid { raw } => {
            println!("Ignored {:?}: a barcode has 8 to 14 digits.", raw);
        }
        ScanOutcome::Found { barcode, food } => {
            let food = food.scaled(quantity)?;
            println!("Barcode {}", barcode);
            print_food(&food);
        }
        ScanOutcome::NotFound { barcode } => {
            println!("No product found for barcode {}.", barcode);
        }
        ScanOutcome::ProviderMisconfigured { barcode, message } => {
            error!(%barcode, "lookup blocked by provider");
            println!("{}", message);
        }
    }
    println!("Next: {}", outcome.next_step());
    Ok(())
}

fn print_food(food: &FoodItem) {
    println!("{}", food.display_name());
    println!(
        "  serving      {} x {} ({:.0} g)",
        food.serving_qty, food.serving_unit, food.serving_weight_grams
    );
    println!("  calories     {:.1} kcal", food.calories);
    println!("  protein      {:.1} g", food.proteins);
    println!(
        "  carbs        {:.1} g (sugar {:.1} g, fiber {:.1} g)",
        food.carbs, food.sugar, food.fiber
    );
    println!("  fat          {:.1} g (saturated {:.1} g)", food.fats, food.saturated_fat);
    println!("  sodium       {:.0} mg", food.sodium);
    println!("  healthiness  {}/10", food.healthiness());
}
