//! Line-based control console on stdin/stdout.
//!
//! Each input line is one request, each answered with one JSON line:
//! `play <target>`, `probe <target>`, `status`, `help`, `quit`, or a player
//! command name such as `pause` or `seek_forward`.

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::player::{codes, CommandSender, Supervisor};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Request {
  Play(String),
  Probe(String),
  Status,
  Help,
  Quit,
  Command(String),
}

impl Request {
  fn parse(line: &str) -> Option<Self> {
    let line = line.trim();
    if line.is_empty() {
      return None;
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
      Some((word, rest)) => (word, rest.trim()),
      None => (line, ""),
    };

    Some(match word {
      "play" => Request::Play(rest.to_string()),
      "probe" => Request::Probe(rest.to_string()),
      "status" => Request::Status,
      "help" => Request::Help,
      "quit" | "exit" => Request::Quit,
      _ => Request::Command(line.to_string()),
    })
  }
}

#[derive(Debug, Serialize)]
struct Response {
  success: bool,
  message: String,
}

impl Response {
  fn ok() -> Self {
    Self {
      success: true,
      message: "OK".to_string(),
    }
  }

  fn error(message: impl Into<String>) -> Self {
    Self {
      success: false,
      message: message.into(),
    }
  }
}

fn to_json<T: Serialize>(value: &T) -> String {
  serde_json::to_string(value).unwrap_or_else(|e| {
    log::error!("Failed to serialize response: {}", e);
    r#"{"success":false,"message":"Internal error"}"#.to_string()
  })
}

/// Handle one request. Returns `None` when the console should stop.
async fn handle(
  supervisor: &Supervisor,
  commands: &CommandSender,
  request: Request,
) -> Option<String> {
  let reply = match request {
    Request::Play(target) if target.is_empty() => to_json(&Response::error("File is required")),
    Request::Play(target) => match supervisor.launch(&target) {
      Ok(playback) => {
        log::info!("Playing {} (session {})", target, playback.id());
        tokio::spawn(async move {
          playback.wait().await;
        });
        to_json(&Response::ok())
      }
      Err(e) => to_json(&Response::error(e.to_string())),
    },
    Request::Probe(target) if target.is_empty() => to_json(&Response::error("File is required")),
    Request::Probe(target) => match supervisor.probe(&target).await {
      Ok(info) => to_json(&info),
      Err(e) => to_json(&Response::error(e.to_string())),
    },
    Request::Status => to_json(&supervisor.status()),
    Request::Help => {
      let names: Vec<_> = codes::names().collect();
      to_json(&Response {
        success: true,
        message: format!("play <file>, probe <file>, status, quit, {}", names.join(", ")),
      })
    }
    Request::Quit => return None,
    Request::Command(name) => {
      if !codes::is_known(&name) {
        to_json(&Response::error("Invalid command"))
      } else if commands.send(name).await.is_err() {
        to_json(&Response::error("Command listener stopped"))
      } else {
        to_json(&Response::ok())
      }
    }
  };
  Some(reply)
}

/// Serve requests from `input` until it closes or `quit` is received.
pub async fn serve<R, W>(
  supervisor: &Supervisor,
  commands: &CommandSender,
  input: R,
  mut output: W,
) -> std::io::Result<()>
where
  R: AsyncRead + Unpin,
  W: AsyncWrite + Unpin,
{
  let mut lines = BufReader::new(input).lines();

  while let Some(line) = lines.next_line().await? {
    let request = match Request::parse(&line) {
      Some(request) => request,
      None => continue,
    };
    log::debug!("Console request: {:?}", request);

    let reply = match handle(supervisor, commands, request).await {
      Some(reply) => reply,
      None => break,
    };
    output.write_all(reply.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await?;
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::player::{command_queue, LaunchOptions};
  use std::path::PathBuf;

  fn supervisor(script: &str) -> Supervisor {
    Supervisor::new(LaunchOptions {
      program: PathBuf::from("/bin/sh"),
      flags: vec!["-c".to_string(), script.to_string()],
      audio_device: None,
      extra_args: Vec::new(),
      stray_names: Vec::new(),
    })
  }

  async fn run(supervisor: &Supervisor, commands: &CommandSender, input: &str) -> Vec<String> {
    let mut output = Vec::new();
    serve(supervisor, commands, input.as_bytes(), &mut output)
      .await
      .unwrap();
    String::from_utf8(output)
      .unwrap()
      .lines()
      .map(str::to_string)
      .collect()
  }

  #[test]
  fn test_parse_requests() {
    assert_eq!(Request::parse("   "), None);
    assert_eq!(
      Request::parse("play /media/My Movie.mkv"),
      Some(Request::Play("/media/My Movie.mkv".to_string()))
    );
    assert_eq!(Request::parse("play"), Some(Request::Play(String::new())));
    assert_eq!(Request::parse(" status "), Some(Request::Status));
    assert_eq!(Request::parse("exit"), Some(Request::Quit));
    assert_eq!(
      Request::parse("seek_forward"),
      Some(Request::Command("seek_forward".to_string()))
    );
  }

  #[tokio::test]
  async fn test_unknown_commands_are_not_queued() {
    let supervisor = supervisor("exit 0");
    let (tx, rx) = command_queue();

    let replies = run(&supervisor, &tx, "bogus\npause\nplay\n").await;
    assert_eq!(
      replies,
      [
        r#"{"success":false,"message":"Invalid command"}"#,
        r#"{"success":true,"message":"OK"}"#,
        r#"{"success":false,"message":"File is required"}"#,
      ]
    );

    assert_eq!(rx.try_recv().unwrap(), "pause");
    assert!(rx.try_recv().is_err());
  }

  #[tokio::test]
  async fn test_quit_stops_reading() {
    let supervisor = supervisor("exit 0");
    let (tx, _rx) = command_queue();

    let replies = run(&supervisor, &tx, "status\nquit\nstatus\n").await;
    assert_eq!(replies, [r#"{"running":false}"#]);
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn test_play_status_and_stop() {
    let supervisor = supervisor("exec sleep 30");
    let (tx, rx) = command_queue();
    let listener = supervisor.clone();
    tokio::spawn(async move { listener.run_dispatch(rx).await });

    let replies = run(&supervisor, &tx, "play first.mkv\nplay second.mkv\nstatus\n").await;
    assert_eq!(replies[0], r#"{"success":true,"message":"OK"}"#);
    assert_eq!(
      replies[1],
      r#"{"success":false,"message":"Player is already running: first.mkv"}"#
    );
    assert_eq!(
      replies[2],
      r#"{"running":true,"file":"first.mkv","duration":"00:00:00","position":"00:00:00"}"#
    );

    run(&supervisor, &tx, "stop\n").await;
    tokio::time::timeout(std::time::Duration::from_secs(10), async {
      while supervisor.is_active() {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
      }
    })
    .await
    .expect("player was not stopped");
  }
}
