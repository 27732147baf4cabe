use std::path::PathBuf;

mod config;
mod console;
pub mod player;

use clap::Parser;
pub use config::{AppConfig, ConfigError};
use player::{command_queue, find_player, LaunchOptions, ProcessError, Supervisor};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
  #[error(transparent)]
  Config(#[from] ConfigError),
  #[error(transparent)]
  Player(#[from] ProcessError),
  #[error("Console I/O failed: {0}")]
  Io(#[from] std::io::Error),
}

/// Remote control for omxplayer.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
  /// Config file (defaults to the user config dir)
  #[arg(short, long)]
  pub config: Option<PathBuf>,

  /// omxplayer executable, overrides the config
  #[arg(short, long)]
  pub player: Option<PathBuf>,

  /// Extra omxplayer options, overrides the config
  #[arg(short, long, allow_hyphen_values = true)]
  pub options: Option<String>,
}

fn load_config(args: &Args) -> Result<AppConfig, ConfigError> {
  let mut config = match args.config.clone().or_else(AppConfig::default_path) {
    Some(path) => AppConfig::load(&path)?,
    None => AppConfig::default(),
  };

  if let Some(player) = &args.player {
    config.player_path = Some(player.to_string_lossy().into_owned());
  }
  if let Some(options) = &args.options {
    config.extra_options = options.clone();
  }
  config.validate()?;
  Ok(config)
}

pub async fn run(args: Args) -> Result<(), AppError> {
  let config = load_config(&args)?;

  // No playback without the player, so this is fatal.
  let configured = config.player_path.as_ref().map(PathBuf::from);
  let player_path = find_player(configured.as_deref())?;
  log::info!("Using player at {}", player_path.display());

  let supervisor = Supervisor::new(LaunchOptions::from_config(player_path, &config));

  // Make sure nothing is left over from a previous run
  supervisor.cleanup().await;

  let (commands, command_rx) = command_queue();
  let listener = supervisor.clone();
  tokio::spawn(async move {
    listener.run_dispatch(command_rx).await;
  });

  log::info!("Ready, type `help` for commands");
  console::serve(&supervisor, &commands, tokio::io::stdin(), tokio::io::stdout()).await?;

  supervisor.cleanup().await;
  Ok(())
}
