use crate::utils::sanitize_filename;
use chrono::Utc;
use std::io;
use std::path::Path;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Append a timestamped line to the project's activity log,
/// `<dir>/<project id>.txt`.
pub async fn project_log(dir: &Path, project_id: &str, text: &str) -> io::Result<()> {
    fs::create_dir_all(dir).await?;
    let filename = dir.join(format!("{}.txt", sanitize_filename(project_id)));
    let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%S%.fZ");

    let log_entry = format!("{}::{}\n", timestamp, text);

    // Open the file in append mode, creating it if it doesn't exist
    let mut file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(filename)
        .await?;

    file.write_all(log_entry.as_bytes()).await?;
    file.flush().await?;

    Ok(())
}
