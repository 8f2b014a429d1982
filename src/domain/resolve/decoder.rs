//! Decoding of raw `name()` call replies
//!
//! The registrar contracts answer with an ABI-encoded string; the preamble
//! width and the NUL-terminated character scan match what those deployments
//! actually return, so the decoder works on the raw bytes instead of pulling
//! in a full ABI decoder.

/// Selector/offset preamble bytes ahead of the character data.
const HEADER_LEN: usize = 4;

/// Decode a raw contract-call reply into a printable name.
///
/// Returns `None` for the empty reply, the all-zero empty-string marker,
/// truncated payloads, and replies that decode to an empty string. Malformed
/// input never errors; the caller moves on to the next backend.
pub fn decode_name_reply(payload: &[u8]) -> Option<String> {
    if payload.is_empty() {
        return None;
    }
    if payload.len() == 32 && payload.iter().all(|b| *b == 0) {
        return None;
    }

    let data = payload.get(HEADER_LEN..)?;

    let mut name = String::new();
    for &byte in data {
        if byte == 0 {
            break;
        }
        name.push(byte as char);
    }

    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}
