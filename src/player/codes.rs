//! omxplayer keyboard control codes.
//!
//! omxplayer reads its controls from stdin as raw key presses, so each
//! command maps to the bytes a terminal would send for that key.

/// Name of the command that stops playback.
pub const STOP: &str = "stop";

/// Command name to the bytes written to the player's stdin.
const CODES: &[(&str, &[u8])] = &[
  ("pause", b"p"),                   // Pause/continue playback
  (STOP, b"q"),                      // Stop playback and exit
  ("volume_up", b"+"),               // +3dB
  ("volume_down", b"-"),             // -3dB
  ("subtitles", b"s"),               // Toggle subtitles
  ("seek_back", b"\x1b[D"),          // Left arrow, -30s
  ("seek_back_fast", b"\x1b[B"),     // Down arrow, -600s
  ("seek_forward", b"\x1b[C"),       // Right arrow, +30s
  ("seek_forward_fast", b"\x1b[A"),  // Up arrow, +600s
  ("next_audiotrack", b"k"),
  ("prev_audiotrack", b"j"),
];

/// Look up the control bytes for a command name (exact, case-sensitive).
pub fn resolve(name: &str) -> Option<&'static [u8]> {
  CODES
    .iter()
    .find(|(command, _)| *command == name)
    .map(|(_, code)| *code)
}

/// Check if a command name is known.
pub fn is_known(name: &str) -> bool {
  resolve(name).is_some()
}

/// All known command names, in table order.
pub fn names() -> impl Iterator<Item = &'static str> {
  CODES.iter().map(|(command, _)| *command)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_single_key_codes() {
    assert_eq!(resolve("pause"), Some(&b"p"[..]));
    assert_eq!(resolve("stop"), Some(&b"q"[..]));
    assert_eq!(resolve("volume_up"), Some(&b"+"[..]));
    assert_eq!(resolve("volume_down"), Some(&b"-"[..]));
    assert_eq!(resolve("next_audiotrack"), Some(&b"k"[..]));
    assert_eq!(resolve("prev_audiotrack"), Some(&b"j"[..]));
  }

  #[test]
  fn test_seek_codes_are_arrow_escapes() {
    assert_eq!(resolve("seek_back"), Some(&[0x1b, 0x5b, 0x44][..]));
    assert_eq!(resolve("seek_back_fast"), Some(&[0x1b, 0x5b, 0x42][..]));
    assert_eq!(resolve("seek_forward"), Some(&[0x1b, 0x5b, 0x43][..]));
    assert_eq!(resolve("seek_forward_fast"), Some(&[0x1b, 0x5b, 0x41][..]));
  }

  #[test]
  fn test_lookup_is_exact() {
    assert!(resolve("Pause").is_none());
    assert!(resolve("pause ").is_none());
    assert!(resolve("").is_none());
    assert!(!is_known("rewind"));
    assert!(is_known(STOP));
  }

  #[test]
  fn test_names_cover_table() {
    let all: Vec<_> = names().collect();
    assert_eq!(all.len(), 11);
    assert!(all.iter().all(|name| is_known(name)));
  }
}
