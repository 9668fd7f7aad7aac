use clap::Parser;
use formpilot::cli::commands::{Resources, cmd_apply, cmd_parse, cmd_worker};
use formpilot::cli::config::{Cli, Commands, load_config};
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: u8) {
    // RUST_LOG wins over -v
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        EnvFilter::new(format!("formpilot={}", level))
    });
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = load_config(cli.config.as_deref());

    match cli.command {
        Commands::Apply { url, profile, verifier_dir } => {
            let resources = Resources::load(
                config,
                profile.as_deref(),
                cli.ollama_endpoint.as_deref(),
                cli.ollama_model.as_deref(),
            )?;
            cmd_apply(&resources, &url, verifier_dir.as_deref(), cli.verbose)?;
        }
        Commands::Worker { workers, once } => {
            let resources =
                Resources::load(config, None, cli.ollama_endpoint.as_deref(), cli.ollama_model.as_deref())?;
            cmd_worker(&resources, cli.server.as_deref(), workers, once)?;
        }
        Commands::Parse { snapshot, url } => {
            cmd_parse(&config, &snapshot, &url)?;
        }
    }

    Ok(())
}
