use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "medtrack-cli", version, about = "Medtrack CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Patient and caretaker profiles
    Patient {
        #[command(subcommand)]
        action: commands::patient::PatientAction,
    },
    /// Medication schedule management
    Med {
        #[command(subcommand)]
        action: commands::med::MedAction,
    },
    /// Intake recording
    Intake {
        #[command(subcommand)]
        action: commands::intake::IntakeAction,
    },
    /// Per-day status
    Status {
        #[command(subcommand)]
        action: commands::status::StatusAction,
    },
    /// Adherence figures
    Adherence {
        #[command(subcommand)]
        action: commands::adherence::AdherenceAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("MEDTRACK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Patient { action } => commands::patient::run(action),
        Commands::Med { action } => commands::med::run(action),
        Commands::Intake { action } => commands::intake::run(action),
        Commands::Status { action } => commands::status::run(action),
        Commands::Adherence { action } => commands::adherence::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
