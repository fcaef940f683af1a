use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use credvault::cli::commands;
use credvault::cli::{output, Cli, Commands};
use credvault::errors::ErrorKind;

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so `call` keeps stdout for responses.
    let filter = EnvFilter::try_from_env("CREDVAULT_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("credvault=debug")
        } else {
            EnvFilter::new("credvault=warn")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();

    let result = match cli.command {
        Commands::Init => commands::init::execute(&cli),
        Commands::Get {
            ref namespace,
            ref key,
            base64,
        } => commands::get::execute(&cli, namespace, key, base64),
        Commands::List {
            ref namespace,
            show_values,
        } => commands::list::execute(&cli, namespace, show_values),
        Commands::Set {
            ref namespace,
            ref key,
            ref value,
            base64,
        } => commands::set::execute(&cli, namespace, key, value.as_deref(), base64),
        Commands::Delete {
            ref namespace,
            ref key,
            force,
        } => commands::delete::execute(&cli, namespace, key, force),
        Commands::Clear {
            ref namespace,
            force,
        } => commands::clear::execute(&cli, namespace, force),
        Commands::Call => commands::call::execute(&cli),
        Commands::Completions { shell } => commands::completions::execute(shell),
    };

    if let Err(e) = result {
        output::error(&e.to_string());
        if e.kind() == ErrorKind::NotFound {
            output::tip("Run `credvault list <NAMESPACE>` to see what is stored.");
        }
        std::process::exit(1);
    }
}
