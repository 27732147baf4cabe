use clap::Parser;
use omxremote_lib::Args;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
  // Logs go to stderr, stdout carries console replies
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();
  if let Err(e) = omxremote_lib::run(args).await {
    log::error!("{}", e);
    std::process::exit(1);
  }
}
