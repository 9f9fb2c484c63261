//! Change-feed subscriber for the appointment table.
//!
//! Consumes the project's server-sent event stream and reports every change
//! notification to the app over a channel. Payloads are deliberately not
//! inspected: any event of any kind triggers the same full reload, which
//! keeps the snapshot correct at the cost of redundant fetches on a dataset
//! small enough not to care.

use std::time::Duration;

use futures::StreamExt;
use reqwest::header;
use tokio::sync::mpsc;
use tracing::{debug, warn};

// ============================================================================
// Constants
// ============================================================================

/// Feed endpoint, scoped to the appointment table by query parameter
const CHANGES_PATH: &str = "/realtime/v1/changes";

/// Delay before reconnecting after the stream ends or fails, matching the
/// EventSource retry default the feed advertises
const RECONNECT_DELAY_MS: u64 = 3000;

/// Buffer size for change notifications; overlapping notifications collapse
/// into one reload anyway
const CHANNEL_BUFFER_SIZE: usize = 8;

/// Spawn the subscriber task and return the notification channel.
/// The task reconnects forever until the receiver is dropped.
pub fn spawn_change_feed(base_url: String, api_key: String) -> mpsc::Receiver<()> {
    let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
    tokio::spawn(run(base_url, api_key, tx));
    rx
}

async fn run(base_url: String, api_key: String, tx: mpsc::Sender<()>) {
    let client = match reqwest::Client::builder().build() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to build change feed client");
            return;
        }
    };

    let url = format!("{}{}", base_url.trim_end_matches('/'), CHANGES_PATH);

    loop {
        match client
            .get(&url)
            .header("apikey", &api_key)
            .header(header::ACCEPT, "text/event-stream")
            .query(&[("table", "citas")])
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                debug!("Change feed connected");
                let mut stream = response.bytes_stream();
                let mut buffer = String::new();

                while let Some(chunk) = stream.next().await {
                    match chunk {
                        Ok(bytes) => {
                            buffer.push_str(&String::from_utf8_lossy(&bytes));
                            while let Some(pos) = buffer.find('\n') {
                                let line = buffer[..pos].trim_end_matches('\r').to_string();
                                buffer.drain(..=pos);
                                if is_change_event(&line) {
                                    debug!("Change detected on citas");
                                    if tx.send(()).await.is_err() {
                                        return;
                                    }
                                }
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "Change feed stream error");
                            break;
                        }
                    }
                }
            }
            Ok(response) => {
                warn!(status = %response.status(), "Change feed rejected");
            }
            Err(e) => {
                warn!(error = %e, "Change feed connection failed");
            }
        }

        if tx.is_closed() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(RECONNECT_DELAY_MS)).await;
    }
}

/// Only data frames carry change notifications; comments, keepalives, and
/// protocol fields are ignored.
fn is_change_event(line: &str) -> bool {
    line.starts_with("data:")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_frames_count_as_changes() {
        assert!(is_change_event("data: {\"type\":\"UPDATE\"}"));
        assert!(is_change_event("data:"));
    }

    #[test]
    fn test_protocol_lines_are_ignored() {
        assert!(!is_change_event(": keepalive 1700000000"));
        assert!(!is_change_event("event: change"));
        assert!(!is_change_event("id: 42"));
        assert!(!is_change_event("retry: 3000"));
        assert!(!is_change_event(""));
    }
}
