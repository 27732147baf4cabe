//! Owns the single omxplayer process and delivers commands to it.

use std::process::ExitStatus;
use std::sync::Arc;

use async_channel::{Receiver, Sender};
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin};
use tokio::sync::oneshot;
use uuid::Uuid;

use super::codes;
use super::parser;
use super::process::{kill_strays, run_info, spawn_player, LaunchOptions, ProcessError};
use super::telemetry::{format_duration, Telemetry, TelemetrySnapshot};

#[derive(Error, Debug)]
pub enum PlayerError {
  #[error("Player is already running: {0}")]
  AlreadyRunning(String),
  #[error("Failed to launch player: {0}")]
  LaunchFailed(#[from] ProcessError),
}

/// Sending half of the command queue, held by the request layer.
pub type CommandSender = Sender<String>;
/// Receiving half of the command queue, consumed by [`Supervisor::run_dispatch`].
pub type CommandReceiver = Receiver<String>;

/// Create the command queue. Unbounded FIFO, one consumer.
pub fn command_queue() -> (CommandSender, CommandReceiver) {
  async_channel::unbounded()
}

/// The live playback session.
struct Session {
  id: Uuid,
  pid: Option<u32>,
  file: String,
  stdin: Arc<tokio::sync::Mutex<ChildStdin>>,
  telemetry: Arc<Telemetry>,
  /// Fires the forced kill in [`Playback::wait`]. Dropping it does too.
  kill_tx: Option<oneshot::Sender<()>>,
}

struct Shared {
  options: LaunchOptions,
  session: Mutex<Option<Session>>,
}

impl Shared {
  /// Take the session out of the slot if it is still `id`.
  fn release(&self, id: Uuid) -> Option<Session> {
    let mut slot = self.session.lock();
    if slot.as_ref().is_some_and(|s| s.id == id) {
      slot.take()
    } else {
      None
    }
  }

  /// Kill strays and clear the session.
  ///
  /// With `only` set, nothing happens unless that session is still the current one.
  async fn clear(&self, only: Option<Uuid>) {
    if let Some(id) = only {
      let owned = self.session.lock().as_ref().is_some_and(|s| s.id == id);
      if !owned {
        log::debug!("Session {} already cleared", id);
        return;
      }
    }

    // Strays are killed while the slot is still taken so a new launch cannot race it.
    kill_strays(&self.options.stray_names).await;

    let cleared = match only {
      Some(id) => self.release(id),
      None => self.session.lock().take(),
    };

    if let Some(session) = cleared {
      log::info!("Cleared session {} ({})", session.id, session.file);
    }
  }
}

/// Supervises one omxplayer process at a time.
#[derive(Clone)]
pub struct Supervisor {
  inner: Arc<Shared>,
}

impl Supervisor {
  pub fn new(options: LaunchOptions) -> Self {
    Self {
      inner: Arc::new(Shared {
        options,
        session: Mutex::new(None),
      }),
    }
  }

  /// Start the player for a target and record the session.
  ///
  /// Rejected while a session exists; the running session is left untouched.
  /// Must be called from within a tokio runtime: the output parsers are spawned here.
  pub fn launch(&self, target: &str) -> Result<Playback, PlayerError> {
    let mut slot = self.inner.session.lock();
    if let Some(current) = slot.as_ref() {
      log::warn!("Rejecting play of {}: {} is playing", target, current.file);
      return Err(PlayerError::AlreadyRunning(current.file.clone()));
    }

    // On any early return below the child is dropped, which kills it and closes its pipes.
    let mut child = spawn_player(&self.inner.options, target)?;
    let stdin = child.stdin.take().ok_or(ProcessError::MissingPipe("stdin"))?;
    let stdout = child.stdout.take().ok_or(ProcessError::MissingPipe("stdout"))?;
    let stderr = child.stderr.take().ok_or(ProcessError::MissingPipe("stderr"))?;

    let telemetry = Arc::new(Telemetry::new());
    parser::spawn(stdout, stderr, telemetry.clone());

    let (kill_tx, kill_rx) = oneshot::channel();
    let id = Uuid::new_v4();
    let pid = child.id();

    *slot = Some(Session {
      id,
      pid,
      file: target.to_string(),
      stdin: Arc::new(tokio::sync::Mutex::new(stdin)),
      telemetry,
      kill_tx: Some(kill_tx),
    });

    log::info!("Started player (pid: {:?}, session: {}) for {}", pid, id, target);

    Ok(Playback {
      id,
      child,
      kill_rx,
      shared: self.inner.clone(),
    })
  }

  /// Play a target and block until the player exits.
  pub async fn play(&self, target: &str) -> Result<(), PlayerError> {
    let playback = self.launch(target)?;
    playback.wait().await;
    Ok(())
  }

  /// Deliver one command to the running player.
  ///
  /// Never fails: idle players, unknown names and write errors are logged.
  pub async fn dispatch(&self, name: &str) {
    let stdin = {
      let slot = self.inner.session.lock();
      match slot.as_ref() {
        Some(session) => session.stdin.clone(),
        None => {
          log::debug!("Player not active, dropping command: {}", name);
          return;
        }
      }
    };

    let code = match codes::resolve(name) {
      Some(code) => code,
      None => {
        log::warn!("Unknown player command: {}", name);
        return;
      }
    };

    log::info!("Sending command to player: {}", name);
    if let Err(e) = write_code(&stdin, code).await {
      log::error!("Cant write to player: {}", e);
    }

    // The player may ignore `q` for a long time, so stop always kills.
    if name == codes::STOP {
      self.kill_current();
    }
  }

  /// Consume the command queue until every sender is gone.
  pub async fn run_dispatch(&self, commands: CommandReceiver) {
    log::info!("Player command listener started");
    while let Ok(name) = commands.recv().await {
      self.dispatch(&name).await;
    }
    log::info!("Player command queue closed");
  }

  fn kill_current(&self) {
    let mut slot = self.inner.session.lock();
    if let Some(session) = slot.as_mut() {
      if let Some(tx) = session.kill_tx.take() {
        log::info!("Killing player (pid: {:?})", session.pid);
        let _ = tx.send(());
      }
    }
  }

  /// Reset all player state and kill stray player processes.
  ///
  /// Safe to call at any time. A running session is killed.
  pub async fn cleanup(&self) {
    self.inner.clear(None).await;
  }

  /// True while a session exists. It stays true until the exit has been cleaned up.
  pub fn is_active(&self) -> bool {
    self.inner.session.lock().is_some()
  }

  /// Target of the current session.
  pub fn current_file(&self) -> Option<String> {
    self.inner.session.lock().as_ref().map(|s| s.file.clone())
  }

  /// Telemetry of the current session.
  pub fn telemetry(&self) -> Option<TelemetrySnapshot> {
    self
      .inner
      .session
      .lock()
      .as_ref()
      .map(|s| s.telemetry.snapshot())
  }

  pub fn status(&self) -> PlayerStatus {
    let slot = self.inner.session.lock();
    match slot.as_ref() {
      Some(session) => {
        let snapshot = session.telemetry.snapshot();
        PlayerStatus {
          running: true,
          file: Some(session.file.clone()),
          duration: Some(snapshot.duration()),
          position: Some(snapshot.position()),
        }
      }
      None => PlayerStatus::default(),
    }
  }

  /// Ask the player for stream info about a target without playing it.
  pub async fn probe(&self, target: &str) -> Result<MediaInfo, PlayerError> {
    let output = run_info(&self.inner.options.program, target).await?;
    Ok(MediaInfo::from_output(&output))
  }
}

async fn write_code(
  stdin: &tokio::sync::Mutex<ChildStdin>,
  code: &[u8],
) -> Result<(), std::io::Error> {
  let mut stdin = stdin.lock().await;
  stdin.write_all(code).await?;
  stdin.flush().await
}

/// A launched player, waiting to exit.
pub struct Playback {
  id: Uuid,
  child: Child,
  kill_rx: oneshot::Receiver<()>,
  shared: Arc<Shared>,
}

impl Playback {
  pub fn id(&self) -> Uuid {
    self.id
  }

  /// Wait for the player to exit, then clean up its session.
  ///
  /// Returns `None` if the exit status could not be collected.
  pub async fn wait(mut self) -> Option<ExitStatus> {
    let exited = tokio::select! {
      status = self.child.wait() => Some(status),
      _ = &mut self.kill_rx => None,
    };

    let result = match exited {
      Some(status) => status,
      None => {
        if let Err(e) = self.child.start_kill() {
          log::error!("kill() failed: {}", e);
        }
        self.child.wait().await
      }
    };

    let status = match result {
      Ok(status) => {
        if status.success() {
          log::info!("Player exited with: {}", status);
        } else {
          log::warn!("Player exited with error: {}", status);
        }
        Some(status)
      }
      Err(e) => {
        log::error!("wait() failed: {}", e);
        None
      }
    };

    self.shared.clear(Some(self.id)).await;
    status
  }
}

impl Drop for Playback {
  /// A playback dropped before exit (cancelled `play`, discarded `launch`) has its
  /// child killed by `kill_on_drop`, so its session must go too. Strays are not
  /// killed here: a new launch may already own the slot by the time they would be.
  fn drop(&mut self) {
    if let Some(session) = self.shared.release(self.id) {
      log::warn!(
        "Playback of {} dropped before exit, cleared session {}",
        session.file,
        session.id
      );
    }
  }
}

/// Player state for the status collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlayerStatus {
  pub running: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub file: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub duration: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub position: Option<String>,
}

/// Stream info reported by `--info`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MediaInfo {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub duration: Option<String>,
}

impl MediaInfo {
  fn from_output(output: &str) -> Self {
    Self {
      duration: parser::probe_duration(output).map(format_duration),
    }
  }
}
