use catalyst_models::NewsItem;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;

use crate::error::CatalystError;

/// Reads newline-delimited `NewsItem` JSON from `reader` and forwards each
/// parsed item on `tx`. A line that fails to parse is logged and skipped
/// rather than aborting the whole stream — one malformed record from an
/// upstream feed shouldn't take the rest of the batch down with it.
pub async fn ingest_ndjson<R: AsyncRead + Unpin>(reader: R, tx: mpsc::Sender<NewsItem>) -> Result<usize, CatalystError> {
    let mut lines = BufReader::new(reader).lines();
    let mut accepted = 0usize;

    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<NewsItem>(trimmed) {
            Ok(item) => {
                accepted += 1;
                if tx.send(item).await.is_err() {
                    tracing::warn!("ingest channel closed, stopping read");
                    break;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, line = trimmed, "skipping malformed NewsItem line");
            }
        }
    }

    Ok(accepted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: &str, ticker: &str) -> String {
        serde_json::json!({
            "schema_version": 1,
            "id": id,
            "ts_utc": "2024-01-10T14:30:00Z",
            "title": "Announces Closing of Offering",
            "summary": null,
            "ticker": ticker,
            "source_host": "globenewswire.com",
            "canonical_url": null,
            "raw": {},
        })
        .to_string()
    }

    #[tokio::test]
    async fn parses_each_line_and_skips_malformed_ones() {
        let ndjson = format!("{}\n\nnot json at all\n{}\n", line("a1", "POET"), line("a2", "FDAX"));
        let (tx, mut rx) = mpsc::channel(8);

        let accepted = ingest_ndjson(ndjson.as_bytes(), tx).await.unwrap();
        assert_eq!(accepted, 2);

        let first = rx.recv().await.unwrap();
        assert_eq!(first.ticker.as_deref(), Some("POET"));
        let second = rx.recv().await.unwrap();
        assert_eq!(second.ticker.as_deref(), Some("FDAX"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn empty_input_accepts_nothing() {
        let (tx, _rx) = mpsc::channel(8);
        let accepted = ingest_ndjson("".as_bytes(), tx).await.unwrap();
        assert_eq!(accepted, 0);
    }

    #[tokio::test]
    async fn stops_cleanly_when_receiver_is_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let ndjson = format!("{}\n{}\n", line("a1", "POET"), line("a2", "FDAX"));
        // Should not hang or error even though nothing is left to receive.
        let accepted = ingest_ndjson(ndjson.as_bytes(), tx).await.unwrap();
        assert!(accepted <= 1);
    }
}
