//! The `MediaController` collaborator interface (§6) and a bundled in-memory
//! reference implementation.
//!
//! Starting/stopping FFmpeg, reading V4L2 devices, and writing files to disk
//! are explicitly out of scope for this core (§1) -- they live behind this
//! trait in a real deployment. `InMemoryMediaController` is a deterministic
//! stand-in used by the bundled binary and the test suite; it tracks state
//! in memory rather than touching real hardware or the filesystem.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, thiserror::Error, Clone)]
pub enum ControllerError {
    #[error("camera '{0}' not found")]
    CameraNotFound(String),
    #[error("recording session for '{0}' not found")]
    SessionNotFound(String),
    #[error("file '{0}' not found")]
    FileNotFound(String),
    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CameraSummary {
    pub device: String,
    pub name: String,
    pub status: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CameraStatus {
    pub device: String,
    pub status: String,
    pub name: String,
    pub resolution: String,
    pub fps: u32,
    pub streams: Vec<String>,
    pub capabilities: Vec<String>,
    pub bytes_sent: u64,
    pub readers: u32,
    pub uptime_secs: u64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct StreamInfo {
    pub device: String,
    pub stream_name: String,
    pub stream_url: String,
    pub ready: bool,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct SnapshotOptions {
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SnapshotResult {
    pub device: String,
    pub filename: String,
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub file_size: u64,
    pub file_path: String,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct RecordingOptions {
    #[serde(default)]
    pub segment_seconds: Option<u64>,
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RecordingSession {
    pub device: String,
    pub session_id: String,
    pub filename: String,
    pub status: String,
    pub start_time: DateTime<Utc>,
    pub duration_secs: u64,
    pub format: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct FileEntry {
    pub filename: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct StorageInfo {
    pub total_space: u64,
    pub used_space: u64,
    pub available_space: u64,
    pub usage_percentage: f64,
    pub recordings_size: u64,
    pub snapshots_size: u64,
    pub low_space_warning: bool,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthSnapshot {
    pub status: String,
    pub uptime_secs: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RetentionPolicy {
    pub max_age_secs: Option<u64>,
    pub max_count: Option<u64>,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct CleanupResult {
    pub recordings_removed: u64,
    pub snapshots_removed: u64,
    pub bytes_reclaimed: u64,
}

/// The external media controller: starts/stops streams, records, snapshots,
/// and reports storage. All calls are cancel-safe ordinary futures; this
/// core never retries on the caller's behalf.
#[async_trait]
pub trait MediaController: Send + Sync {
    async fn get_camera_list(&self) -> Result<Vec<CameraSummary>, ControllerError>;
    async fn get_camera_status(&self, device: &str) -> Result<CameraStatus, ControllerError>;
    async fn validate_camera_device(&self, device: &str) -> bool;

    async fn get_streams(&self) -> Result<Vec<StreamInfo>, ControllerError>;
    async fn get_stream_url(&self, device: &str) -> Result<StreamInfo, ControllerError>;
    async fn get_stream_status(&self, stream_name: &str) -> Result<StreamInfo, ControllerError>;
    async fn start_streaming(&self, device: &str) -> Result<StreamInfo, ControllerError>;
    async fn stop_streaming(&self, device: &str) -> Result<(), ControllerError>;

    async fn take_snapshot(
        &self,
        device: &str,
        opts: SnapshotOptions,
    ) -> Result<SnapshotResult, ControllerError>;

    async fn start_recording(
        &self,
        device: &str,
        opts: RecordingOptions,
    ) -> Result<RecordingSession, ControllerError>;
    async fn stop_recording(&self, device: &str) -> Result<RecordingSession, ControllerError>;
    async fn session_id_for_device(&self, device: &str) -> Option<String>;

    async fn list_recordings(&self, limit: u32, offset: u32) -> Result<(Vec<FileEntry>, u64), ControllerError>;
    async fn list_snapshots(&self, limit: u32, offset: u32) -> Result<(Vec<FileEntry>, u64), ControllerError>;
    async fn recording_info(&self, filename: &str) -> Result<FileEntry, ControllerError>;
    async fn snapshot_info(&self, filename: &str) -> Result<FileEntry, ControllerError>;
    async fn delete_recording(&self, filename: &str) -> Result<(), ControllerError>;
    async fn delete_snapshot(&self, filename: &str) -> Result<(), ControllerError>;

    async fn storage_info(&self) -> Result<StorageInfo, ControllerError>;
    async fn health(&self) -> Result<HealthSnapshot, ControllerError>;
    async fn set_retention_policy(&self, policy: RetentionPolicy);
    async fn cleanup_old_files(&self) -> Result<CleanupResult, ControllerError>;
}

// ---------------------------------------------------------------------------
// In-memory reference implementation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct CameraFixture {
    name: String,
    resolution: String,
    fps: u32,
    capabilities: Vec<String>,
    connected: bool,
    streaming: bool,
}

struct Inner {
    cameras: RwLock<HashMap<String, CameraFixture>>,
    sessions: RwLock<HashMap<String, RecordingSession>>,
    recordings: RwLock<Vec<FileEntry>>,
    snapshots: RwLock<Vec<FileEntry>>,
    retention: RwLock<RetentionPolicy>,
    started_at: DateTime<Utc>,
    bytes_counter: AtomicU64,
}

/// Deterministic stand-in for the real media controller: no FFmpeg, no
/// V4L2, no filesystem writes. Enough state to drive every handler and the
/// end-to-end test suite through realistic request/response shapes.
#[derive(Clone)]
pub struct InMemoryMediaController {
    inner: Arc<Inner>,
}

impl Default for InMemoryMediaController {
    fn default() -> Self {
        let mut cameras = HashMap::new();
        cameras.insert(
            "camera0".to_owned(),
            CameraFixture {
                name: "Front Door".to_owned(),
                resolution: "1920x1080".to_owned(),
                fps: 30,
                capabilities: vec!["snapshot".to_owned(), "recording".to_owned(), "streaming".to_owned()],
                connected: true,
                streaming: false,
            },
        );
        cameras.insert(
            "camera1".to_owned(),
            CameraFixture {
                name: "Back Yard".to_owned(),
                resolution: "1280x720".to_owned(),
                fps: 24,
                capabilities: vec!["snapshot".to_owned(), "recording".to_owned()],
                connected: true,
                streaming: false,
            },
        );
        Self {
            inner: Arc::new(Inner {
                cameras: RwLock::new(cameras),
                sessions: RwLock::new(HashMap::new()),
                recordings: RwLock::new(Vec::new()),
                snapshots: RwLock::new(Vec::new()),
                retention: RwLock::new(RetentionPolicy::default()),
                started_at: Utc::now(),
                bytes_counter: AtomicU64::new(0),
            }),
        }
    }
}

impl InMemoryMediaController {
    pub fn new() -> Self {
        Self::default()
    }

    async fn fixture(&self, device: &str) -> Result<CameraFixture, ControllerError> {
        self.inner
            .cameras
            .read()
            .await
            .get(device)
            .cloned()
            .ok_or_else(|| ControllerError::CameraNotFound(device.to_owned()))
    }
}

#[async_trait]
impl MediaController for InMemoryMediaController {
    async fn get_camera_list(&self) -> Result<Vec<CameraSummary>, ControllerError> {
        let cameras = self.inner.cameras.read().await;
        Ok(cameras
            .iter()
            .map(|(device, fixture)| CameraSummary {
                device: device.clone(),
                name: fixture.name.clone(),
                status: if fixture.connected { "CONNECTED".to_owned() } else { "DISCONNECTED".to_owned() },
            })
            .collect())
    }

    async fn get_camera_status(&self, device: &str) -> Result<CameraStatus, ControllerError> {
        let fixture = self.fixture(device).await?;
        let uptime_secs = (Utc::now() - self.inner.started_at).num_seconds().max(0) as u64;
        Ok(CameraStatus {
            device: device.to_owned(),
            status: if fixture.connected { "CONNECTED".to_owned() } else { "DISCONNECTED".to_owned() },
            name: fixture.name,
            resolution: fixture.resolution,
            fps: fixture.fps,
            streams: if fixture.streaming { vec![format!("{device}_stream")] } else { Vec::new() },
            capabilities: fixture.capabilities,
            bytes_sent: self.inner.bytes_counter.load(Ordering::Relaxed),
            readers: 0,
            uptime_secs,
        })
    }

    async fn validate_camera_device(&self, device: &str) -> bool {
        self.inner.cameras.read().await.contains_key(device)
    }

    async fn get_streams(&self) -> Result<Vec<StreamInfo>, ControllerError> {
        let cameras = self.inner.cameras.read().await;
        Ok(cameras
            .iter()
            .filter(|(_, fixture)| fixture.streaming)
            .map(|(device, _)| StreamInfo {
                device: device.clone(),
                stream_name: format!("{device}_stream"),
                stream_url: format!("rtsp://localhost/{device}"),
                ready: true,
            })
            .collect())
    }

    async fn get_stream_url(&self, device: &str) -> Result<StreamInfo, ControllerError> {
        let fixture = self.fixture(device).await?;
        Ok(StreamInfo {
            device: device.to_owned(),
            stream_name: format!("{device}_stream"),
            stream_url: format!("rtsp://localhost/{device}"),
            ready: fixture.streaming,
        })
    }

    async fn get_stream_status(&self, stream_name: &str) -> Result<StreamInfo, ControllerError> {
        let device = stream_name.strip_suffix("_stream").unwrap_or(stream_name);
        let fixture = self.fixture(device).await?;
        Ok(StreamInfo {
            device: device.to_owned(),
            stream_name: stream_name.to_owned(),
            stream_url: format!("rtsp://localhost/{device}"),
            ready: fixture.streaming,
        })
    }

    async fn start_streaming(&self, device: &str) -> Result<StreamInfo, ControllerError> {
        let mut cameras = self.inner.cameras.write().await;
        let fixture = cameras
            .get_mut(device)
            .ok_or_else(|| ControllerError::CameraNotFound(device.to_owned()))?;
        fixture.streaming = true;
        Ok(StreamInfo {
            device: device.to_owned(),
            stream_name: format!("{device}_stream"),
            stream_url: format!("rtsp://localhost/{device}"),
            ready: true,
        })
    }

    async fn stop_streaming(&self, device: &str) -> Result<(), ControllerError> {
        let mut cameras = self.inner.cameras.write().await;
        let fixture = cameras
            .get_mut(device)
            .ok_or_else(|| ControllerError::CameraNotFound(device.to_owned()))?;
        fixture.streaming = false;
        Ok(())
    }

    async fn take_snapshot(
        &self,
        device: &str,
        opts: SnapshotOptions,
    ) -> Result<SnapshotResult, ControllerError> {
        self.fixture(device).await?;
        let ext = opts.format.unwrap_or_else(|| "jpg".to_owned());
        let timestamp = Utc::now();
        let filename = format!("{device}_{}.{ext}", timestamp.timestamp_millis());
        let file_size = 4096;
        self.inner.bytes_counter.fetch_add(file_size, Ordering::Relaxed);
        let entry = FileEntry {
            filename: filename.clone(),
            size: file_size,
            created_at: timestamp,
        };
        self.inner.snapshots.write().await.push(entry);
        Ok(SnapshotResult {
            device: device.to_owned(),
            filename: filename.clone(),
            status: "completed".to_owned(),
            timestamp,
            file_size,
            file_path: format!("/var/lib/camera-ws/snapshots/{filename}"),
        })
    }

    async fn start_recording(
        &self,
        device: &str,
        opts: RecordingOptions,
    ) -> Result<RecordingSession, ControllerError> {
        self.fixture(device).await?;
        let session_id = Uuid::new_v4().to_string();
        let start_time = Utc::now();
        let format = opts.format.unwrap_or_else(|| "mp4".to_owned());
        let filename = format!("{device}_{}.{format}", start_time.timestamp_millis());
        let session = RecordingSession {
            device: device.to_owned(),
            session_id: session_id.clone(),
            filename,
            status: "RECORDING".to_owned(),
            start_time,
            duration_secs: opts.segment_seconds.unwrap_or(0),
            format,
        };
        self.inner.sessions.write().await.insert(device.to_owned(), session.clone());
        Ok(session)
    }

    async fn stop_recording(&self, device: &str) -> Result<RecordingSession, ControllerError> {
        let mut sessions = self.inner.sessions.write().await;
        let mut session = sessions
            .remove(device)
            .ok_or_else(|| ControllerError::SessionNotFound(device.to_owned()))?;
        session.status = "STOPPED".to_owned();
        session.duration_secs = (Utc::now() - session.start_time).num_seconds().max(0) as u64;
        let entry = FileEntry {
            filename: session.filename.clone(),
            size: 1_048_576,
            created_at: session.start_time,
        };
        self.inner.recordings.write().await.push(entry);
        Ok(session)
    }

    async fn session_id_for_device(&self, device: &str) -> Option<String> {
        self.inner.sessions.read().await.get(device).map(|s| s.session_id.clone())
    }

    async fn list_recordings(&self, limit: u32, offset: u32) -> Result<(Vec<FileEntry>, u64), ControllerError> {
        let recordings = self.inner.recordings.read().await;
        Ok(page(&recordings, limit, offset))
    }

    async fn list_snapshots(&self, limit: u32, offset: u32) -> Result<(Vec<FileEntry>, u64), ControllerError> {
        let snapshots = self.inner.snapshots.read().await;
        Ok(page(&snapshots, limit, offset))
    }

    async fn recording_info(&self, filename: &str) -> Result<FileEntry, ControllerError> {
        self.inner
            .recordings
            .read()
            .await
            .iter()
            .find(|e| e.filename == filename)
            .cloned()
            .ok_or_else(|| ControllerError::FileNotFound(filename.to_owned()))
    }

    async fn snapshot_info(&self, filename: &str) -> Result<FileEntry, ControllerError> {
        self.inner
            .snapshots
            .read()
            .await
            .iter()
            .find(|e| e.filename == filename)
            .cloned()
            .ok_or_else(|| ControllerError::FileNotFound(filename.to_owned()))
    }

    async fn delete_recording(&self, filename: &str) -> Result<(), ControllerError> {
        let mut recordings = self.inner.recordings.write().await;
        let before = recordings.len();
        recordings.retain(|e| e.filename != filename);
        if recordings.len() == before {
            return Err(ControllerError::FileNotFound(filename.to_owned()));
        }
        Ok(())
    }

    async fn delete_snapshot(&self, filename: &str) -> Result<(), ControllerError> {
        let mut snapshots = self.inner.snapshots.write().await;
        let before = snapshots.len();
        snapshots.retain(|e| e.filename != filename);
        if snapshots.len() == before {
            return Err(ControllerError::FileNotFound(filename.to_owned()));
        }
        Ok(())
    }

    async fn storage_info(&self) -> Result<StorageInfo, ControllerError> {
        let recordings_size: u64 = self.inner.recordings.read().await.iter().map(|e| e.size).sum();
        let snapshots_size: u64 = self.inner.snapshots.read().await.iter().map(|e| e.size).sum();
        let total_space: u64 = 100 * 1024 * 1024 * 1024;
        let used_space = recordings_size + snapshots_size;
        let usage_percentage = (used_space as f64 / total_space as f64) * 100.0;
        Ok(StorageInfo {
            total_space,
            used_space,
            available_space: total_space.saturating_sub(used_space),
            usage_percentage,
            recordings_size,
            snapshots_size,
            low_space_warning: usage_percentage >= 80.0,
        })
    }

    async fn health(&self) -> Result<HealthSnapshot, ControllerError> {
        let uptime_secs = (Utc::now() - self.inner.started_at).num_seconds().max(0) as u64;
        Ok(HealthSnapshot {
            status: "healthy".to_owned(),
            uptime_secs,
        })
    }

    async fn set_retention_policy(&self, policy: RetentionPolicy) {
        *self.inner.retention.write().await = policy;
    }

    async fn cleanup_old_files(&self) -> Result<CleanupResult, ControllerError> {
        let policy = *self.inner.retention.read().await;
        let now = Utc::now();
        let mut recordings_removed = 0u64;
        let mut snapshots_removed = 0u64;
        let mut bytes_reclaimed = 0u64;

        if let Some(max_age_secs) = policy.max_age_secs {
            let mut recordings = self.inner.recordings.write().await;
            let before = recordings.len();
            let mut reclaimed = 0u64;
            recordings.retain(|e| {
                let keep = (now - e.created_at).num_seconds() < max_age_secs as i64;
                if !keep {
                    reclaimed += e.size;
                }
                keep
            });
            recordings_removed += (before - recordings.len()) as u64;
            bytes_reclaimed += reclaimed;

            let mut snapshots = self.inner.snapshots.write().await;
            let before = snapshots.len();
            let mut reclaimed = 0u64;
            snapshots.retain(|e| {
                let keep = (now - e.created_at).num_seconds() < max_age_secs as i64;
                if !keep {
                    reclaimed += e.size;
                }
                keep
            });
            snapshots_removed += (before - snapshots.len()) as u64;
            bytes_reclaimed += reclaimed;
        }

        Ok(CleanupResult {
            recordings_removed,
            snapshots_removed,
            bytes_reclaimed,
        })
    }
}

fn page(entries: &[FileEntry], limit: u32, offset: u32) -> (Vec<FileEntry>, u64) {
    let total = entries.len() as u64;
    let start = (offset as usize).min(entries.len());
    let end = start.saturating_add(limit as usize).min(entries.len());
    (entries[start..end].to_vec(), total)
}
