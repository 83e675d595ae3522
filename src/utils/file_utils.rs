use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;

pub async fn save_report(output_path: &Path, report: &[u8]) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(output_path, report)
        .await
        .with_context(|| format!("Failed to write report: {}", output_path.display()))?;
    Ok(())
}

pub fn sanitize_filename(name: &str) -> String {
    name.replace(|c: char| !c.is_alphanumeric() && c != '.' && c != '-', "_")
}
