use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use foodscan::barcode::Barcode;
use foodscan::config;
use foodscan::error::{classify, Disposition};

#[derive(Parser, Debug)]
#[command(about = "Send a single barcode lookup to the backend, without retries")]
struct Args {
    /// Path to YAML config
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Barcode to look up
    #[arg(long)]
    barcode: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    let client = cfg.backend_client()?;

    let barcode = Barcode::parse(&args.barcode)?;
    println!("Normalized: {} (GTIN-13 {})", barcode, barcode.gtin13());

    match client.lookup_barcode(&barcode).await {
        Ok(Some(item)) => println!("{}", serde_json::to_string_pretty(&item)?),
        Ok(None) => println!("not found"),
        Err(err) => {
            let verdict = match classify(&err) {
                Disposition::Fatal(_) => "fatal",
                Disposition::Absent => "absent",
                Disposition::Transient => "transient",
            };
            println!("error ({}): {}", verdict, err);
        }
    }
    Ok(())
}
