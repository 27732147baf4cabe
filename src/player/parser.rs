//! Scrapes telemetry out of omxplayer's console output.
//!
//! omxplayer has no structured output. With `--with-info` it prints a stream
//! banner (including `Duration: hh:mm:ss`) on stderr, and with `--stats` it
//! rewrites a single status line on stdout, separated by `\r`, that starts
//! with `M:<microseconds>`.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;

use super::telemetry::Telemetry;

fn duration_regex() -> &'static Regex {
  static REGEX: OnceLock<Regex> = OnceLock::new();
  REGEX.get_or_init(|| Regex::new(r"Duration: (\d+):(\d+):(\d+)").unwrap())
}

/// Parse a `Duration: h:m:s` line into total seconds.
///
/// Returns `None` when the line has no duration or the numbers do not fit in u64.
pub fn parse_duration(line: &str) -> Option<u64> {
  let caps = duration_regex().captures(line)?;

  let field = |i: usize| -> Option<u64> {
    let text = &caps[i];
    match text.parse::<u64>() {
      Ok(value) => Some(value),
      Err(e) => {
        log::warn!("Cant parse duration field {:?}: {}", text, e);
        None
      }
    }
  };

  let (hours, minutes, seconds) = (field(1)?, field(2)?, field(3)?);

  let total = hours
    .checked_mul(3600)
    .and_then(|h| minutes.checked_mul(60).and_then(|m| h.checked_add(m)))
    .and_then(|hm| hm.checked_add(seconds));

  if total.is_none() {
    log::warn!("Duration out of range: {}", &caps[0]);
  }
  total
}

/// Parse a `M:<raw>` status chunk into the raw position counter.
pub fn parse_position(chunk: &str) -> Option<u64> {
  let rest = chunk.strip_prefix("M:")?.trim_start_matches(' ');
  let end = rest
    .find(|c: char| !c.is_ascii_digit())
    .unwrap_or(rest.len());
  rest[..end].parse().ok()
}

/// First duration in a block of `--info` output.
pub fn probe_duration(output: &str) -> Option<u64> {
  output.lines().find_map(parse_duration)
}

/// Read stderr line by line until the duration shows up.
///
/// Stops parsing after the first match: later banners (e.g. subtitle streams)
/// may carry their own `Duration:` that must not overwrite the media duration.
/// The rest of the stream is drained to EOF; closing the pipe early would kill
/// the player with SIGPIPE on its next write to stderr.
pub async fn watch_diagnostics<R>(reader: R, telemetry: Arc<Telemetry>)
where
  R: AsyncRead + Unpin,
{
  let mut reader = BufReader::new(reader);
  let mut buf = Vec::new();

  loop {
    buf.clear();
    match reader.read_until(b'\n', &mut buf).await {
      Ok(0) => {
        log::debug!("Player stderr closed before duration was found");
        break;
      }
      Ok(_) => {
        let line = String::from_utf8_lossy(&buf);
        if let Some(seconds) = parse_duration(&line) {
          log::info!("Media duration: {}s", seconds);
          telemetry.set_duration(seconds);
          if let Err(e) = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await {
            log::debug!("Player stderr read error: {}", e);
          }
          break;
        }
      }
      Err(e) => {
        log::debug!("Player stderr read error: {}", e);
        break;
      }
    }
  }
}

/// Read `\r`-separated status chunks from stdout and track the position.
pub async fn watch_progress<R>(reader: R, telemetry: Arc<Telemetry>)
where
  R: AsyncRead + Unpin,
{
  let mut reader = BufReader::new(reader);
  let mut buf = Vec::new();

  loop {
    buf.clear();
    match reader.read_until(b'\r', &mut buf).await {
      Ok(0) => {
        log::debug!("Player stdout closed");
        break;
      }
      Ok(_) => {
        if let Some(raw) = parse_position(&String::from_utf8_lossy(&buf)) {
          telemetry.position().set(raw);
        }
      }
      Err(e) => {
        log::info!("Player stdout read error: {}", e);
        break;
      }
    }
  }
}

/// Spawn both watchers as independent tasks.
pub fn spawn<O, E>(
  stdout: O,
  stderr: E,
  telemetry: Arc<Telemetry>,
) -> (JoinHandle<()>, JoinHandle<()>)
where
  O: AsyncRead + Send + Unpin + 'static,
  E: AsyncRead + Send + Unpin + 'static,
{
  let diag_telemetry = telemetry.clone();
  let diagnostics = tokio::spawn(async move {
    watch_diagnostics(stderr, diag_telemetry).await;
  });

  let progress = tokio::spawn(async move {
    watch_progress(stdout, telemetry).await;
  });

  (progress, diagnostics)
}
