//! Operator-facing text.

use pinbot_ipfs::GlobalStatus;
use std::fmt::Display;
use std::time::Duration;

/// Upstream gateway failures show up with a full HTML error page attached. The page
/// is noise on a chat line, so the message collapses to the phrase itself.
const GATEWAY_FAULTS: &[(&str, &str)] = &[
    ("504 Gateway Time-out", "504 Gateway Time-out"),
    ("504 Gateway Timeout", "504 Gateway Time-out"),
    ("502 Bad Gateway", "502 Bad Gateway"),
];

/// `"<action> failed: <error>"`, with gateway faults collapsed.
pub fn format_error(action: &str, err: &impl Display) -> String {
    let text = err.to_string();
    let text = GATEWAY_FAULTS
        .iter()
        .find(|(phrase, _)| text.contains(phrase))
        .map(|(_, short)| short.to_string())
        .unwrap_or(text);
    format!("{} failed: {}", action, text)
}

/// Per-peer status table, one line per peer, headed by the CID.
pub fn status_lines(status: &GlobalStatus) -> Vec<String> {
    let mut lines = Vec::with_capacity(status.peer_map.len() + 1);
    lines.push(format!("Status for {}:", status.cid));
    for (peer_id, info) in &status.peer_map {
        let name = if info.peer_name.is_empty() {
            peer_id.as_str()
        } else {
            info.peer_name.as_str()
        };
        lines.push(format!("  - {} : {} | {}", name, info.status, info.error));
    }
    lines
}

/// Compact elapsed time, e.g. `1h2m3s`, `10m0s`, `42s`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{}h{}m{}s", h, m, s)
    } else if m > 0 {
        format!("{}m{}s", m, s)
    } else {
        format!("{}s", s)
    }
}
