//! Flat directory of uploaded video files.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Clone, Debug)]
pub struct MediaLibrary {
    root: Arc<PathBuf>,
    buffer_size: usize,
}

impl MediaLibrary {
    pub fn new(root: impl Into<PathBuf>, buffer_size: usize) -> Self {
        Self {
            root: Arc::new(root.into()),
            buffer_size: buffer_size.max(1),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_dir(&self) -> AppResult<()> {
        fs::create_dir_all(self.root.as_path())
            .await
            .map_err(AppError::StorageWrite)
    }

    /// Fresh storage name: a random hex token, `_`, then the sanitized original name.
    /// `extension` is the already validated lowercase extension of `original`.
    pub fn generate_name(original: &str, extension: &str) -> String {
        let mut safe = sanitize_filename(original);
        if !safe.to_ascii_lowercase().ends_with(&format!(".{}", extension)) {
            safe = format!("video.{}", extension);
        }
        format!("{}_{}", Uuid::new_v4().simple(), safe)
    }

    /// Path of a stored file. Anything other than a single plain file name is rejected.
    pub fn resolve(&self, name: &str) -> AppResult<PathBuf> {
        if !is_plain_file_name(name) {
            return Err(AppError::not_found("File not found"));
        }
        Ok(self.root.join(name))
    }

    /// Stream `chunks` into a new file called `name`, failing if it already exists.
    ///
    /// The file is flushed and synced before this returns `Ok`. On any error the
    /// partially written file is removed.
    pub async fn write_stream<S, E>(&self, name: &str, chunks: S, max_bytes: u64) -> AppResult<u64>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Display,
    {
        let path = self
            .resolve(name)
            .map_err(|_| AppError::Validation(format!("Invalid storage name: {}", name)))?;

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(AppError::StorageWrite)?;
        let mut writer = BufWriter::with_capacity(self.buffer_size, file);

        let result = copy_chunks(&mut writer, chunks, max_bytes).await;
        if result.is_err() {
            drop(writer);
            self.remove_path(&path).await;
        }
        result
    }

    /// Best-effort delete of a stored file.
    pub async fn remove(&self, name: &str) {
        if let Ok(path) = self.resolve(name) {
            self.remove_path(&path).await;
        }
    }

    async fn remove_path(&self, path: &Path) {
        match fs::remove_file(path).await {
            Ok(()) => debug!("Removed {:?}", path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {:?}: {}", path, e),
        }
    }
}

async fn copy_chunks<S, E>(
    writer: &mut BufWriter<fs::File>,
    chunks: S,
    max_bytes: u64,
) -> AppResult<u64>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Display,
{
    let mut chunks = std::pin::pin!(chunks);
    let mut written = 0u64;
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.map_err(|e| AppError::Validation(format!("Failed to read file: {}", e)))?;
        written += chunk.len() as u64;
        if written > max_bytes {
            return Err(AppError::PayloadTooLarge(format!(
                "File too large. Maximum file size is {}MB.",
                max_bytes / 1024 / 1024
            )));
        }
        writer
            .write_all(&chunk)
            .await
            .map_err(AppError::StorageWrite)?;
    }
    writer.flush().await.map_err(AppError::StorageWrite)?;
    writer
        .get_ref()
        .sync_all()
        .await
        .map_err(AppError::StorageWrite)?;
    Ok(written)
}

/// Reduce an untrusted client filename to `[A-Za-z0-9_.-]`.
///
/// Path separators become word breaks, whitespace runs become `_`, everything
/// else outside the allow-list is dropped, and leading or trailing `.`/`_` are
/// trimmed so the result can never be `..` or a hidden file.
pub fn sanitize_filename(name: &str) -> String {
    let spaced: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Lowercase text after the last `.`, if there is one.
pub fn file_extension(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase())
}

fn is_plain_file_name(name: &str) -> bool {
    if name.is_empty() || name.contains('/') || name.contains('\\') {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::io;

    fn chunks(parts: &[&'static str]) -> impl Stream<Item = Result<Bytes, io::Error>> {
        stream::iter(
            parts
                .iter()
                .map(|p| Ok(Bytes::from_static(p.as_bytes())))
                .collect::<Vec<_>>(),
        )
    }

    #[test]
    fn sanitize_strips_traversal_and_unsafe_characters() {
        assert_eq!(sanitize_filename("clip.mp4"), "clip.mp4");
        assert_eq!(sanitize_filename("../../etc/passwd"), "etc_passwd");
        assert_eq!(sanitize_filename("..\\..\\evil.mkv"), "evil.mkv");
        assert_eq!(sanitize_filename("my holiday  video.MOV"), "my_holiday_video.MOV");
        assert_eq!(sanitize_filename("<script>.webm"), "script.webm");
        assert_eq!(sanitize_filename(".."), "");
    }

    #[test]
    fn extension_is_lowercased_text_after_last_dot() {
        assert_eq!(file_extension("a.b.MP4").as_deref(), Some("mp4"));
        assert_eq!(file_extension("noext"), None);
        assert_eq!(file_extension("trailing."), Some(String::new()));
    }

    #[test]
    fn generated_names_are_unique_and_keep_the_original() {
        let a = MediaLibrary::generate_name("clip.mp4", "mp4");
        let b = MediaLibrary::generate_name("clip.mp4", "mp4");
        assert_ne!(a, b);
        assert!(a.ends_with("_clip.mp4"));
        let (token, _) = a.split_once('_').unwrap();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generated_name_falls_back_when_sanitizing_eats_the_stem() {
        let name = MediaLibrary::generate_name("../.mp4", "mp4");
        assert!(name.ends_with("_video.mp4"));
    }

    #[test]
    fn resolve_rejects_anything_but_a_plain_name() {
        let library = MediaLibrary::new("/srv/uploads", 1024);
        assert!(library.resolve("abc_clip.mp4").is_ok());
        for bad in ["", "..", ".", "../secret", "a/b.mp4", "/etc/passwd", "..\\x.mp4"] {
            assert!(
                matches!(library.resolve(bad), Err(AppError::NotFound(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn write_stream_persists_all_chunks() {
        let temp = tempfile::tempdir().unwrap();
        let library = MediaLibrary::new(temp.path(), 4);

        let written = library
            .write_stream("x_clip.mp4", chunks(&["hello ", "world"]), 1024)
            .await
            .unwrap();

        assert_eq!(written, 11);
        let contents = std::fs::read(temp.path().join("x_clip.mp4")).unwrap();
        assert_eq!(contents, b"hello world");
    }

    #[tokio::test]
    async fn write_stream_never_overwrites() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("taken.mp4"), b"original").unwrap();
        let library = MediaLibrary::new(temp.path(), 1024);

        let err = library
            .write_stream("taken.mp4", chunks(&["new"]), 1024)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::StorageWrite(_)));
        assert_eq!(std::fs::read(temp.path().join("taken.mp4")).unwrap(), b"original");
    }

    #[tokio::test]
    async fn oversized_upload_leaves_no_file() {
        let temp = tempfile::tempdir().unwrap();
        let library = MediaLibrary::new(temp.path(), 1024);

        let err = library
            .write_stream("big.mp4", chunks(&["0123456789", "0123456789"]), 15)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::PayloadTooLarge(_)));
        assert!(!temp.path().join("big.mp4").exists());
    }

    #[tokio::test]
    async fn broken_body_leaves_no_file() {
        let temp = tempfile::tempdir().unwrap();
        let library = MediaLibrary::new(temp.path(), 1024);
        let body = stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        ]);

        let err = library.write_stream("cut.mp4", body, 1024).await.unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert!(!temp.path().join("cut.mp4").exists());
    }
}
