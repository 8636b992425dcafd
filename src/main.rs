use chunkscribe::cli::{Cli, Commands};
use chunkscribe::config::Config;
use clap::Parser;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("chunkscribe=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Transcribe(args) => {
            let config = Config::load(cli.config.as_deref())?;
            chunkscribe::commands::run_transcribe(&config, &args)
        }
        Commands::History { limit } => {
            let config = Config::load(cli.config.as_deref())?;
            chunkscribe::commands::show_history(&config.history.directory, limit)
        }
        Commands::InitConfig { path, force } => {
            chunkscribe::commands::init_config(path.as_deref(), force)
        }
    }
}
