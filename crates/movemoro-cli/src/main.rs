use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "movemoro", version, about = "Pomodoro timer that earns its breaks with exercise")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive timer
    Run(commands::run::RunArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Browse the exercise catalog
    Exercises {
        #[command(subcommand)]
        action: commands::exercises::ExercisesAction,
    },
    /// Recently completed sessions and exercises
    History {
        /// Number of entries to show
        #[arg(long, default_value = "20")]
        limit: usize,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Aggregate statistics
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Unlocked and pending achievements
    Achievements {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

fn main() {
    let filter = EnvFilter::try_from_env("MOVEMORO_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Config { action } => commands::config::run(action),
        Commands::Exercises { action } => commands::exercises::run(action),
        Commands::History { limit, json } => commands::history::run(limit, json),
        Commands::Stats { json } => commands::stats::run(json),
        Commands::Achievements { json } => commands::achievements::run(json),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "movemoro", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
