use anyhow::Result;
use clap::Parser;
use demodeck::{config, store, tui};

#[derive(Parser, Debug)]
#[command(name = "demodeck")]
#[command(about = "Terminal dashboard for GitHub demo environment issues")]
#[command(version)]
struct Args {
    /// Path to config file
    #[arg(long, short)]
    config: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("demodeck=info".parse()?),
        )
        .init();

    let config = config::load(args.config.as_deref())?;
    let store = store::FileStore::default_location()?;

    tui::run(config, store).await
}
