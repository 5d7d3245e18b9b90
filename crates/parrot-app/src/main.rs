use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing_subscriber::EnvFilter;

pub mod controller;
pub mod events;
pub mod presenter;
pub mod profile;
pub mod sampler;
pub mod state;
pub mod watch;


use self::controller::AppController;
use self::state::AppState;

#[derive(Parser)]
#[command(name = "parrot", version, about = "Vocabulary quizzes from the pages you read")]
struct Args {
    #[arg(short, long, default_value = "main", help = "Profile name")]
    profile: String,

    #[arg(short, long, help = "Read config from a JSON file instead of a profile")]
    config: Option<PathBuf>,

    #[arg(long, help = "Emit logs as JSON")]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.json_logs);

    let config = match &args.config {
        Some(path) => profile::load_config_file(path)?,
        None => {
            let dir = profile::profiles_dir()?;
            profile::init_profiles(&dir)?;
            profile::load_profile(&dir, &args.profile)?
        }
    };
    config.validate()?;

    let state = Arc::new(AppState::new(config).await?);
    let controller = AppController::new(state);
    let mut tasks = controller.spawn_tasks().await?;

    tokio::select! {
        result = signal::ctrl_c() => {
            result?;
            tracing::info!("Shutdown requested");
        }
        Some(result) = tasks.join_next() => {
            match result {
                Ok(Ok(())) => tracing::warn!("task exited"),
                Ok(Err(e)) => tracing::error!("task failed: {e}"),
                Err(e) => tracing::error!("task panicked: {e}"),
            }
        }
    }

    controller.shutdown();
    tasks.shutdown().await;
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
