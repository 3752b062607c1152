use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::model::JobRecord;

/// Write the records as a pretty JSON array, creating parent directories.
pub async fn write_records(path: &Path, records: &[JobRecord]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;
    }
    let json = serde_json::to_string_pretty(records)?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    info!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_record_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/jobs.json");
        let record = JobRecord {
            title: "前端工程師".into(),
            company: "ACME".into(),
            location: "台北市".into(),
            salary: String::new(),
            date: None,
            url: "https://www.104.com.tw/job/1".into(),
            page: 1,
            source: "104".into(),
        };
        write_records(&path, &[record.clone()]).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value[0]["title"], "前端工程師");
        assert_eq!(value[0]["page"], 1);
        assert!(value[0].get("date").is_none());

        let back: Vec<JobRecord> = serde_json::from_str(&text).unwrap();
        assert_eq!(back, [record]);
    }
}
