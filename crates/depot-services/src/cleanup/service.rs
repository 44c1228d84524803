//! Stale-session reclamation.
//!
//! Abandoned chunked uploads would otherwise stay unmerged forever and leak
//! staging directories. The sweep removes sessions past their TTL along with
//! their staging directories, plus orphaned staging directories whose session
//! is already gone. The TTL and interval are configuration, not constants.

use depot_session::SessionStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::time::interval;

pub struct CleanupService {
    sessions: Arc<dyn SessionStore>,
    chunk_staging_dir: PathBuf,
    session_ttl: Duration,
    sweep_interval: Duration,
}

impl CleanupService {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        chunk_staging_dir: PathBuf,
        session_ttl: Duration,
        sweep_interval: Duration,
    ) -> Self {
        Self {
            sessions,
            chunk_staging_dir,
            session_ttl,
            sweep_interval,
        }
    }

    /// Start the periodic sweep. Returns a JoinHandle for shutdown.
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut sweep_interval = interval(self.sweep_interval);
            sweep_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                sweep_interval.tick().await;

                match self.sweep_once().await {
                    Ok(reclaimed) => {
                        if reclaimed > 0 {
                            tracing::info!(reclaimed, "Stale upload session sweep completed");
                        }
                    }
                    Err(e) => tracing::error!(error = %e, "Stale upload session sweep failed"),
                }
            }
        })
    }

    /// One sweep pass; returns the number of reclaimed sessions/directories.
    pub async fn sweep_once(&self) -> Result<usize, anyhow::Error> {
        let stale = self.sessions.remove_stale(self.session_ttl).await?;
        let mut reclaimed = stale.len();

        for upload_id in &stale {
            let staging = self.chunk_staging_dir.join(upload_id);
            if let Err(e) = fs::remove_dir_all(&staging).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(
                        error = %e,
                        upload_id = %upload_id,
                        "Failed to remove staging directory for stale session"
                    );
                }
            }
        }

        reclaimed += self.reclaim_orphaned_staging().await?;
        Ok(reclaimed)
    }

    /// Remove staging directories old enough to be past the TTL whose session
    /// no longer exists (e.g. store and disk fell out of sync).
    async fn reclaim_orphaned_staging(&self) -> Result<usize, anyhow::Error> {
        let mut removed = 0usize;

        let mut entries = match fs::read_dir(&self.chunk_staging_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let Ok(file_type) = entry.file_type().await else {
                continue;
            };
            if !file_type.is_dir() {
                continue;
            }

            let age = entry
                .metadata()
                .await
                .ok()
                .and_then(|m| m.modified().ok())
                .and_then(|t| t.elapsed().ok());
            let Some(age) = age else { continue };
            if age < self.session_ttl {
                continue;
            }

            let upload_id = entry.file_name().to_string_lossy().to_string();
            if self.sessions.get_session(&upload_id).await?.is_some() {
                continue;
            }

            match fs::remove_dir_all(entry.path()).await {
                Ok(()) => {
                    tracing::info!(upload_id = %upload_id, "Removed orphaned staging directory");
                    removed += 1;
                }
                Err(e) => {
                    tracing::warn!(error = %e, upload_id = %upload_id, "Failed to remove orphaned staging directory");
                }
            }
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_session::InMemorySessionStore;
    use tempfile::tempdir;

    #[tokio::test]
    async fn sweep_reclaims_stale_session_and_staging() {
        let staging_root = tempdir().unwrap();
        let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());

        sessions.record_chunk_info("stale-1", "a.bin", 3).await.unwrap();
        let dir = staging_root.path().join("stale-1");
        fs::create_dir_all(&dir).await.unwrap();
        fs::write(dir.join("chunk-0"), b"x").await.unwrap();

        let service = CleanupService::new(
            sessions.clone(),
            staging_root.path().to_path_buf(),
            Duration::ZERO,
            Duration::from_secs(3600),
        );

        let reclaimed = service.sweep_once().await.unwrap();
        assert!(reclaimed >= 1);
        assert!(sessions.get_session("stale-1").await.unwrap().is_none());
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn sweep_reclaims_orphaned_staging_dir() {
        let staging_root = tempdir().unwrap();
        let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());

        // Staging directory with no matching session.
        let dir = staging_root.path().join("orphan");
        fs::create_dir_all(&dir).await.unwrap();

        let service = CleanupService::new(
            sessions,
            staging_root.path().to_path_buf(),
            Duration::ZERO,
            Duration::from_secs(3600),
        );

        let reclaimed = service.sweep_once().await.unwrap();
        assert_eq!(reclaimed, 1);
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn fresh_sessions_survive_sweep() {
        let staging_root = tempdir().unwrap();
        let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());

        sessions.record_chunk_info("fresh", "a.bin", 2).await.unwrap();
        let dir = staging_root.path().join("fresh");
        fs::create_dir_all(&dir).await.unwrap();

        let service = CleanupService::new(
            sessions.clone(),
            staging_root.path().to_path_buf(),
            Duration::from_secs(3600),
            Duration::from_secs(3600),
        );

        let reclaimed = service.sweep_once().await.unwrap();
        assert_eq!(reclaimed, 0);
        assert!(sessions.get_session("fresh").await.unwrap().is_some());
        assert!(dir.exists());
    }

    #[tokio::test]
    async fn missing_staging_root_is_fine() {
        let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
        let service = CleanupService::new(
            sessions,
            PathBuf::from("/nonexistent/depot-staging"),
            Duration::ZERO,
            Duration::from_secs(3600),
        );
        assert_eq!(service.sweep_once().await.unwrap(), 0);
    }
}
