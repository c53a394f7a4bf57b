//! Appends every message to a file instead of delivering it

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use courier_common::{Address, Message, Transport, TransportError};
use serde::{Deserialize, Serialize};
use tokio::{fs::OpenOptions, io::AsyncWriteExt, sync::Mutex};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    pub path: PathBuf,
}

pub struct LogTransport {
    path: PathBuf,
    write: Mutex<()>,
}

impl LogTransport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Transport for LogTransport {
    async fn start(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn stop(&self) -> Result<(), TransportError> {
        Ok(())
    }

    fn is_started(&self) -> bool {
        true
    }

    async fn send(&self, message: &Message) -> Result<Vec<Address>, TransportError> {
        let mut entry = message.to_entity()?.to_log_string();
        entry.push_str("\n\n");

        let _guard = self.write.lock().await;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(entry.as_bytes()).await?;
        file.flush().await?;

        tracing::debug!(path = %self.path.display(), bytes = entry.len(), "Message logged");
        Ok(Vec::new())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
