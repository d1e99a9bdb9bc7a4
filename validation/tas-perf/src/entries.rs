//! Collection of entry identifiers produced in data-generation mode.

use std::path::PathBuf;

use anyhow::Context;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use crate::pool::ENTRY_LINE_PREFIX;

/// Sending half handed to iterations; cheap to clone.
#[derive(Debug, Clone)]
pub struct EntrySink(mpsc::UnboundedSender<String>);

impl EntrySink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(tx), rx)
    }

    /// Never blocks; identifiers emitted after the collector stopped are dropped.
    pub fn emit(&self, uuid: &str) {
        let _ = self.0.send(uuid.to_string());
    }
}

/// Print each identifier as `REKOR_ENTRY_UUID:<id>` on stdout and, if given,
/// append it to `output`. Returns the number collected once every sink is gone.
pub async fn collect_entries(
    mut rx: mpsc::UnboundedReceiver<String>,
    output: Option<PathBuf>,
) -> anyhow::Result<u64> {
    let mut file = match &output {
        Some(path) => Some(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await
                .with_context(|| format!("failed to open {}", path.display()))?,
        ),
        None => None,
    };

    let mut count = 0u64;
    while let Some(uuid) = rx.recv().await {
        println!("{ENTRY_LINE_PREFIX}{uuid}");
        if let Some(file) = file.as_mut() {
            file.write_all(format!("{uuid}\n").as_bytes()).await?;
        }
        count += 1;
    }

    if let Some(mut file) = file {
        file.flush().await?;
    }
    Ok(count)
}
