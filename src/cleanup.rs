use std::time::{Duration, SystemTime};
use tokio::fs;
use tracing::{error, info, warn};

use crate::{db::VideoStore, error::AppResult, storage::MediaLibrary};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: usize,
    pub bytes_freed: u64,
}

/// Delete files in the upload directory that no video record references.
///
/// Files modified less than `grace` ago are skipped so an upload whose record has not
/// been inserted yet is never removed.
pub async fn sweep_orphans(
    store: &VideoStore,
    library: &MediaLibrary,
    grace: Duration,
) -> AppResult<SweepReport> {
    let referenced = store.referenced_filenames().await?;
    let now = SystemTime::now();
    let mut report = SweepReport::default();

    let mut entries = fs::read_dir(library.root()).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();

        let metadata = match entry.metadata().await {
            Ok(m) => m,
            Err(e) => {
                warn!("[cleanup] Failed to get metadata for {:?}: {}", path, e);
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        if referenced.contains(&name) {
            continue;
        }

        let modified = match metadata.modified() {
            Ok(m) => m,
            Err(e) => {
                warn!("[cleanup] Failed to get modification time for {:?}: {}", path, e);
                continue;
            }
        };

        // Modified in the future counts as fresh.
        let age = now.duration_since(modified).unwrap_or_default();
        if age < grace {
            continue;
        }

        match fs::remove_file(&path).await {
            Ok(()) => {
                report.removed += 1;
                report.bytes_freed += metadata.len();
                info!(
                    "[cleanup] 🗑️  Deleted orphaned file: {:?} (age: {:.1} min, size: {:.2} MB)",
                    path,
                    age.as_secs_f64() / 60.0,
                    metadata.len() as f64 / 1024.0 / 1024.0
                );
            }
            Err(e) => {
                error!("[cleanup] ❌ Failed to delete file {:?}: {}", path, e);
            }
        }
    }

    if report.removed > 0 {
        info!(
            "[cleanup] ✅ Sweep complete: {} orphaned files deleted, {:.2} MB freed",
            report.removed,
            report.bytes_freed as f64 / 1024.0 / 1024.0
        );
    }

    Ok(report)
}

/// Start a background task that periodically sweeps orphaned uploads.
pub fn start_sweep_task(
    store: VideoStore,
    library: MediaLibrary,
    interval: Duration,
    grace: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!(
            "[cleanup] 🧹 Starting orphan sweep (interval: {:.1} min, grace: {:.1} min)",
            interval.as_secs_f64() / 60.0,
            grace.as_secs_f64() / 60.0
        );

        loop {
            ticker.tick().await;

            if let Err(e) = sweep_orphans(&store, &library, grace).await {
                error!("[cleanup] Periodic sweep error: {}", e);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn only_unreferenced_files_are_removed() {
        let temp = tempfile::tempdir().unwrap();
        let uploads = temp.path().join("uploads");
        std::fs::create_dir(&uploads).unwrap();
        std::fs::create_dir(uploads.join("nested")).unwrap();
        std::fs::write(uploads.join("kept.mp4"), b"keep").unwrap();
        std::fs::write(uploads.join("orphan.mp4"), b"orphan").unwrap();

        let store = VideoStore::connect(&temp.path().join("videos.db"), 1)
            .await
            .unwrap();
        store.initialize().await.unwrap();
        store.insert("Kept", "kept.mp4").await.unwrap();
        let library = MediaLibrary::new(&uploads, 1024);

        let report = sweep_orphans(&store, &library, Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(
            report,
            SweepReport {
                removed: 1,
                bytes_freed: 6
            }
        );
        assert!(uploads.join("kept.mp4").exists());
        assert!(!uploads.join("orphan.mp4").exists());
        assert!(uploads.join("nested").exists());
    }

    #[tokio::test]
    async fn fresh_orphans_survive_the_grace_period() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("in_flight.mp4"), b"x").unwrap();

        let store = VideoStore::connect(&temp.path().join("db").join("videos.db"), 1)
            .await
            .unwrap();
        store.initialize().await.unwrap();
        let library = MediaLibrary::new(temp.path(), 1024);

        let report = sweep_orphans(&store, &library, Duration::from_secs(3600))
            .await
            .unwrap();

        assert_eq!(report.removed, 0);
        assert!(temp.path().join("in_flight.mp4").exists());
    }
}
