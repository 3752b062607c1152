use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, info};

/// Receives raw page contents for diagnostics when a run has `debug` set.
#[async_trait]
pub trait DebugSink: Send + Sync {
    async fn dump(&self, source: &str, tag: &str, content: &str) -> std::io::Result<()>;
}

/// Writes `debug-<source>-<tag>.html` into a directory.
pub struct FileDebugSink {
    dir: PathBuf,
}

impl FileDebugSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, source: &str, tag: &str) -> PathBuf {
        self.dir.join(format!("debug-{source}-{tag}.html"))
    }
}

#[async_trait]
impl DebugSink for FileDebugSink {
    async fn dump(&self, source: &str, tag: &str, content: &str) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(source, tag);
        tokio::fs::write(&path, content).await?;
        info!("Wrote debug dump {}", path.display());
        Ok(())
    }
}

/// Best effort: a failing sink never affects extraction.
pub async fn dump_quietly(sink: Option<&dyn DebugSink>, source: &str, tag: &str, content: &str) {
    if let Some(sink) = sink {
        if let Err(e) = sink.dump(source, tag, content).await {
            debug!("debug dump {}-{} failed: {}", source, tag, e);
        }
    }
}
