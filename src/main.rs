use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mouros_roster::config::Config;
use mouros_roster::display::{print_roster, write_roster_to_file};
use mouros_roster::export::export_roster_to_csv;
use mouros_roster::parser::load_members;
use mouros_roster::schedule::calendar::validate_year;
use mouros_roster::schedule::{RngSource, RosterGenerator, ScaleDefinition};
use mouros_roster::web::{self, AppState};

#[derive(Parser)]
#[command(name = "mouros-roster", about = "Duty roster for the club's first and last weekends")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the roster API
    Web {
        /// Port to listen on, overrides ROSTER_PORT
        port: Option<u16>,
    },
    /// Generate a roster for one year and write it to disk
    Generate {
        year: i32,
        /// Member directory CSV, overrides ROSTER_MEMBERS_CSV
        #[arg(long)]
        members: Option<PathBuf>,
        /// Shuffle seed for a reproducible roster, overrides ROSTER_SEED
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, default_value = "escala.txt")]
        output: PathBuf,
        #[arg(long)]
        csv: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("mouros_roster=info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Command::Web { port } => {
            let port = port.unwrap_or(config.port);
            // The API can still take a directory upload when the file is missing
            let members = match load_members(&config.members_csv) {
                Ok(members) => Some(members),
                Err(e) => {
                    warn!(path = %config.members_csv.display(), "No member directory loaded at startup: {e}");
                    None
                }
            };
            info!("Access the API at http://localhost:{}", port);
            web::start_server(port, AppState::new(config.admin_password, members, config.seed)).await?;
        }
        Command::Generate { year, members, seed, output, csv } => {
            let year = validate_year(year)?;
            let members_path = members.unwrap_or(config.members_csv);
            let members = load_members(&members_path)
                .with_context(|| format!("Failed to load members from {}", members_path.display()))?;

            let definition = ScaleDefinition::default_weekends();
            let generator = RosterGenerator::new(&members, &definition);
            let report = match seed.or(config.seed) {
                Some(seed) => generator.generate(year, &mut RngSource::seeded(seed)),
                None => generator.generate(year, &mut RngSource::from_entropy()),
            };

            print_roster(&report);
            write_roster_to_file(&report, &output)?;
            println!("\nRoster saved to {}", output.display());
            if let Some(csv_path) = csv {
                export_roster_to_csv(&report.entries, &csv_path)?;
                println!("CSV saved to {}", csv_path.display());
            }
        }
    }

    Ok(())
}
