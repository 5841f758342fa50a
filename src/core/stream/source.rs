//! Recorded response streams: one wire message per line (JSON Lines).

use std::pin::Pin;

use futures::Stream;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};

use super::ChatError;
use super::error::map_service_error;

/// A boxed stream of raw wire messages.
pub type UnitStream = Pin<Box<dyn Stream<Item = Result<Value, ChatError>> + Send>>;

/// Read wire messages line by line. Blank lines are skipped; the stream ends after an I/O error.
pub fn lines<R>(reader: R) -> UnitStream
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let state: Option<Lines<BufReader<R>>> = Some(BufReader::new(reader).lines());
    Box::pin(futures::stream::unfold(state, |state| async move {
        let mut lines = state?;
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let item = parse_line(line);
                    return Some((item, Some(lines)));
                }
                Ok(None) => return None,
                Err(e) => return Some((Err(ChatError::Io(e)), None)),
            }
        }
    }))
}

/// Open a recorded stream: `-` reads stdin, anything else is a file path.
pub async fn open(source: &str) -> Result<UnitStream, ChatError> {
    if source == "-" {
        return Ok(lines(tokio::io::stdin()));
    }
    let file = tokio::fs::File::open(source).await?;
    log::debug!("Reading response stream from {}", source);
    Ok(lines(file))
}

fn parse_line(line: &str) -> Result<Value, ChatError> {
    let value: Value = serde_json::from_str(line)?;
    match map_service_error(&value) {
        Some(err) => Err(err),
        None => Ok(value),
    }
}
