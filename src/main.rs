use clap::Parser;
use openterm::cli::commands;
use openterm::cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter (e.g. `debug`, `openterm=trace`).
const LOG_ENV: &str = "OPENTERM_LOG";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => commands::init::execute(&cli),
        Commands::Status => commands::status::execute(&cli),
        Commands::Unlock => commands::unlock::execute(&cli),
        Commands::Set { ref id, ref value } => commands::set::execute(&cli, id, value.as_deref()),
        Commands::Get { ref id } => commands::get::execute(&cli, id),
        Commands::List => commands::list::execute(&cli),
        Commands::Remove { ref id, force } => commands::remove::execute(&cli, id, force),
        Commands::Clear { force } => commands::clear::execute(&cli, force),
        Commands::ChangePassword => commands::change_password::execute(&cli),
        Commands::Export { ref output } => commands::export::execute(&cli, output.as_deref()),
        Commands::Import { ref file } => commands::import_cmd::execute(&cli, file),
        Commands::Macro { ref action } => commands::macro_cmd::execute(&cli, action),
    };

    if let Err(e) = result {
        tracing::debug!(error = ?e, "command failed");
        openterm::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}
