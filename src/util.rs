// src/util.rs — Shared utility functions

use std::path::Path;

use reqwest::multipart::Part;
use tokio_util::io::ReaderStream;

/// File name component of a path, lossily converted.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Size in MiB for console output.
pub fn size_mb(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

/// Size in GiB for status messages.
pub fn size_gib(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0 * 1024.0)
}

/// "1 hour(s), 2 minute(s), 3 second(s)"
pub fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    format!("{hours} hour(s), {minutes} minute(s), {seconds} second(s)")
}

/// Multipart part that streams the file from disk instead of buffering it.
pub async fn file_part(path: &Path) -> std::io::Result<Part> {
    let file = tokio::fs::File::open(path).await?;
    let len = file.metadata().await?.len();
    let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
    Ok(Part::stream_with_length(body, len).file_name(file_name(path)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name() {
        assert_eq!(file_name(Path::new("/a/b/lineage-21.zip")), "lineage-21.zip");
        assert_eq!(file_name(Path::new("/")), "");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(
            format_duration(3723),
            "1 hour(s), 2 minute(s), 3 second(s)"
        );
        assert_eq!(format_duration(0), "0 hour(s), 0 minute(s), 0 second(s)");
    }

    #[test]
    fn test_sizes() {
        assert!((size_mb(1024 * 1024) - 1.0).abs() < f64::EPSILON);
        assert!((size_gib(3 * 1024 * 1024 * 1024) - 3.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_file_part_missing_file() {
        assert!(file_part(Path::new("/nonexistent/file.img")).await.is_err());
    }
}
