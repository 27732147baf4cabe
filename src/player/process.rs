//! omxplayer binary detection and process spawning.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use thiserror::Error;
use tokio::process::{Child, Command};

use crate::config::AppConfig;

const PLAYER_NAME: &str = "omxplayer";

#[derive(Error, Debug)]
pub enum ProcessError {
  #[error("omxplayer is not installed")]
  NotInstalled,
  #[error("Failed to spawn player: {0}")]
  SpawnFailed(#[from] std::io::Error),
  #[error("Player {0} pipe unavailable")]
  MissingPipe(&'static str),
}

/// Find the player executable.
///
/// A configured path wins if it exists, then `PATH`, then common install locations.
pub fn find_player(configured: Option<&Path>) -> Result<PathBuf, ProcessError> {
  if let Some(path) = configured {
    if path.exists() {
      return Ok(path.to_path_buf());
    }
    log::warn!("Configured player {:?} does not exist, searching", path);
  }

  if let Ok(path) = which::which(PLAYER_NAME) {
    return Ok(path);
  }

  let common_paths = ["/usr/bin/omxplayer", "/usr/local/bin/omxplayer", "/opt/vc/bin/omxplayer"];
  for path in common_paths {
    let p = PathBuf::from(path);
    if p.exists() {
      return Ok(p);
    }
  }

  Err(ProcessError::NotInstalled)
}

/// Everything needed to launch the player for a target.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
  pub program: PathBuf,
  /// Flags placed before everything else.
  pub flags: Vec<String>,
  pub audio_device: Option<String>,
  pub extra_args: Vec<String>,
  /// Names passed to `killall` during cleanup.
  pub stray_names: Vec<String>,
}

impl LaunchOptions {
  /// Standard omxplayer launch: stats on stdout, stream info on stderr.
  pub fn from_config(program: PathBuf, config: &AppConfig) -> Self {
    let audio_device = Some(config.audio_device.trim())
      .filter(|dev| !dev.is_empty())
      .map(str::to_string);

    Self {
      program,
      flags: vec![
        "--stats".to_string(),     // status line with position on stdout
        "--with-info".to_string(), // stream banner with duration on stderr
        "--refresh".to_string(),   // match display refresh rate to the video
        "--blank".to_string(),     // black background
      ],
      audio_device,
      extra_args: config.extra_args(),
      stray_names: config.stray_process_names.clone(),
    }
  }

  /// Full argument list for a target, excluding the program.
  pub fn args(&self, target: &str) -> Vec<String> {
    let mut args = self.flags.clone();
    if let Some(dev) = &self.audio_device {
      args.push("--adev".to_string());
      args.push(dev.clone());
    }
    args.extend(self.extra_args.iter().cloned());
    args.push(target.to_string());
    args
  }
}

/// Spawn the player with all three standard streams piped.
pub fn spawn_player(options: &LaunchOptions, target: &str) -> Result<Child, ProcessError> {
  let args = options.args(target);
  log::info!("Spawning player: {:?} {:?}", options.program, args);

  let child = Command::new(&options.program)
    .args(&args)
    .stdin(Stdio::piped())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true)
    .spawn()?;

  Ok(child)
}

/// Run `<player> --info <target>` and return its combined output.
///
/// omxplayer exits non-zero after printing info, so the exit status is only logged.
pub async fn run_info(program: &Path, target: &str) -> Result<String, ProcessError> {
  let output = Command::new(program)
    .arg("--info")
    .arg(target)
    .stdin(Stdio::null())
    .kill_on_drop(true)
    .output()
    .await?;

  if !output.status.success() {
    log::debug!("{:?} --info exited with: {}", program, output.status);
  }

  let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
  text.push_str(&String::from_utf8_lossy(&output.stderr));
  Ok(text)
}

/// Kill any player processes by name. Fixes players orphaned by a crash.
pub async fn kill_strays(names: &[String]) {
  for name in names {
    match Command::new("killall")
      .arg(name)
      .stdin(Stdio::null())
      .stdout(Stdio::null())
      .stderr(Stdio::null())
      .status()
      .await
    {
      Ok(status) if status.success() => log::info!("Killed stray {} processes", name),
      Ok(_) => log::debug!("No stray {} processes", name),
      Err(e) => log::debug!("killall {} failed: {}", name, e),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn options(config: &AppConfig) -> LaunchOptions {
    LaunchOptions::from_config(PathBuf::from("/usr/bin/omxplayer"), config)
  }

  #[test]
  fn test_default_args() {
    let args = options(&AppConfig::default()).args("/media/movie.mkv");
    assert_eq!(
      args,
      [
        "--stats",
        "--with-info",
        "--refresh",
        "--blank",
        "--adev",
        "hdmi",
        "/media/movie.mkv"
      ]
    );
  }

  #[test]
  fn test_extra_options_before_target() {
    let config = AppConfig {
      extra_options: " --vol -600 --loop ".to_string(),
      audio_device: String::new(),
      ..AppConfig::default()
    };
    let args = options(&config).args("http://example.com/stream.mp4");
    assert_eq!(
      args,
      [
        "--stats",
        "--with-info",
        "--refresh",
        "--blank",
        "--vol",
        "-600",
        "--loop",
        "http://example.com/stream.mp4"
      ]
    );
  }

  #[test]
  fn test_stray_names_from_config() {
    let opts = options(&AppConfig::default());
    assert_eq!(opts.stray_names, ["omxplayer.bin", "omxplayer"]);
  }

  #[test]
  fn test_find_player_prefers_existing_configured_path() {
    let exe = std::env::current_exe().unwrap();
    assert_eq!(find_player(Some(exe.as_path())).unwrap(), exe);
  }

  #[tokio::test]
  async fn test_spawn_missing_program_fails() {
    let opts = LaunchOptions {
      program: PathBuf::from("/nonexistent/omxplayer"),
      flags: Vec::new(),
      audio_device: None,
      extra_args: Vec::new(),
      stray_names: Vec::new(),
    };
    let result = spawn_player(&opts, "movie.mkv");
    assert!(matches!(result, Err(ProcessError::SpawnFailed(_))));
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn test_run_info_passes_info_flag() {
    let output = run_info(Path::new("echo"), "movie.mkv").await.unwrap();
    assert_eq!(output.trim(), "--info movie.mkv");
  }
}
