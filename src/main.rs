use anyhow::Result;
use clap::Parser;

use todo_deck::{
    cli::{self, RootCommand},
    logging::{init_logging, print_log_location},
    settings::Settings,
};

#[derive(Parser, Debug)]
#[command(
    name = "todo-deck",
    about = "Command-line client for a remote todo service",
    long_about = "Lists, filters and edits tasks and categories stored on a REST todo service. \
                  Pinning and multi-select are available in the interactive shell.",
    version,
    author
)]
struct Cli {
    /// Base URL of the service, e.g. http://127.0.0.1:8000/api/
    #[arg(long, global = true, value_name = "URL")]
    api_url: Option<String>,

    #[arg(long, global = true)]
    json: bool,

    #[arg(long, global = true)]
    quiet: bool,

    /// Print where this run's log file is written
    #[arg(long, global = true)]
    show_log_path: bool,

    #[command(subcommand)]
    command: RootCommand,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_handle = match init_logging() {
        Ok(handle) => Some(handle),
        Err(err) => {
            eprintln!("warning: failed to initialize logging: {err:#}");
            None
        }
    };
    if cli.show_log_path {
        if let Some(handle) = log_handle.as_ref() {
            print_log_location(handle.path());
        }
    }

    let mut settings = Settings::load();
    if let Some(url) = cli.api_url.as_deref() {
        settings.override_api_url(url);
    }
    tracing::debug!(api_base_url = %settings.api_base_url, "resolved settings");

    let code = cli::run(settings, cli.command, cli.json, cli.quiet).await;

    // flush the log writer before exiting
    drop(log_handle);
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
