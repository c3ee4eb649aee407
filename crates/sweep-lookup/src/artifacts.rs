//! Optional on-disk artifacts: a JSON copy of every extracted record and
//! the raw body of every failed search.
//!
//! Artifacts are diagnostics. A write failure is logged and never fails the
//! lookup that produced it.

use crate::error::Result;
use crate::provider::RecordDetails;
use std::path::{Path, PathBuf};
use sweep_core::OutputConfig;

/// Writes artifacts into the configured directories.
///
/// A directory left unset disables that artifact kind.
#[derive(Debug, Clone, Default)]
pub struct ArtifactWriter {
    json_dir: Option<PathBuf>,
    error_html_dir: Option<PathBuf>,
}

impl ArtifactWriter {
    /// Build a writer from the output configuration.
    #[must_use]
    pub fn new(config: &OutputConfig) -> Self {
        Self {
            json_dir: config.json_dir.clone(),
            error_html_dir: config.error_html_dir.clone(),
        }
    }

    /// Save `details` as `<json_dir>/<permit_number>.json`.
    pub async fn write_record(&self, details: &RecordDetails) {
        let Some(dir) = &self.json_dir else {
            return;
        };
        let path = dir.join(format!("{}.json", file_stem(&details.permit_number)));

        let result = match serde_json::to_vec_pretty(details) {
            Ok(bytes) => write_file(&path, &bytes).await,
            Err(e) => Err(e.into()),
        };

        match result {
            Ok(()) => tracing::debug!(path = %path.display(), "Saved record JSON"),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to save record JSON"),
        }
    }

    /// Save the body of a failed search as `<error_html_dir>/<candidate>_error.html`.
    pub async fn write_error_page(&self, candidate_id: &str, body: &str) {
        let Some(dir) = &self.error_html_dir else {
            return;
        };
        let path = dir.join(format!("{}_error.html", file_stem(candidate_id)));

        match write_file(&path, body.as_bytes()).await {
            Ok(()) => tracing::debug!(path = %path.display(), "Saved error response"),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to save error response");
            }
        }
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

/// Keep identifiers from escaping the artifact directory.
fn file_stem(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn details(permit: &str) -> RecordDetails {
        RecordDetails {
            name: "Marie Tremblay".to_string(),
            permit_number: permit.to_string(),
            ..RecordDetails::default()
        }
    }

    #[tokio::test]
    async fn test_write_record_json() {
        let tmp = TempDir::new().expect("create temp dir");
        let writer = ArtifactWriter::new(&OutputConfig {
            json_dir: Some(tmp.path().join("json")),
            error_html_dir: None,
        });

        writer.write_record(&details("A145869")).await;

        let saved = std::fs::read_to_string(tmp.path().join("json").join("A145869.json"))
            .expect("read saved json");
        let parsed: RecordDetails = serde_json::from_str(&saved).expect("parse saved json");
        assert_eq!(parsed.name, "Marie Tremblay");
    }

    #[tokio::test]
    async fn test_write_error_page() {
        let tmp = TempDir::new().expect("create temp dir");
        let writer = ArtifactWriter::new(&OutputConfig {
            json_dir: None,
            error_html_dir: Some(tmp.path().to_path_buf()),
        });

        writer.write_error_page("A100001", "<html>503</html>").await;

        let saved = std::fs::read_to_string(tmp.path().join("A100001_error.html"))
            .expect("read saved page");
        assert_eq!(saved, "<html>503</html>");
    }

    #[tokio::test]
    async fn test_disabled_writer_is_noop() {
        let writer = ArtifactWriter::default();
        writer.write_record(&details("A100001")).await;
        writer.write_error_page("A100001", "body").await;
    }

    #[test]
    fn test_file_stem_sanitizes() {
        assert_eq!(file_stem("A100001"), "A100001");
        assert_eq!(file_stem("../etc/passwd"), "___etc_passwd");
    }
}
