//! Point d'entrée CLI pour flood-impact

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

mod cli;

use cli::Commands;

/// Classer la vulnérabilité des actifs et composer les cartes d'impact
#[derive(Parser)]
#[command(name = "flood-impact")]
#[command(author, version)]
#[command(about = "Classify asset vulnerability from flood water-level rasters")]
#[command(long_about = "Classe la vulnérabilité des actifs exposés (bâtiments, routes, centres d'évacuation, équipements communaux) pour chaque pas de temps d'une simulation d'inondation.\n\nProduit un conteneur vectoriel et un raster d'impact par pas de temps.")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Configurer le logging
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Run { config, report } => {
            info!(config = %config.display(), "Impact run");
            cli::cmd_run(&config, report.as_deref())?;
        }
        Commands::Summarize {
            vector,
            category,
            zones,
            zone_type,
            config,
        } => {
            info!(vector = %vector.display(), category = ?category, "Summarize container");
            cli::cmd_summarize(
                &vector,
                category,
                zones.as_deref(),
                zone_type.as_deref(),
                config.as_deref(),
            )?;
        }
        Commands::Guide { config } => {
            cli::cmd_guide(config.as_deref())?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
