//! File and storage management methods (§4.H): `list_recordings`,
//! `list_snapshots`, `get_recording_info`, `get_snapshot_info`,
//! `delete_recording`, `delete_snapshot`, `get_storage_info`,
//! `set_retention_policy`, `cleanup_old_files`.

use super::{parse_params, HandlerContext};
use crate::connection::ClientRecord;
use crate::controller::{FileEntry, RetentionPolicy};
use crate::error::RpcError;
use crate::registry::{Handler, MethodRegistry};
use crate::thresholds;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

const DEFAULT_LIMIT: u32 = 50;

pub async fn register(registry: &MethodRegistry, ctx: Arc<HandlerContext>) {
    registry.register("list_recordings", "1.0", Arc::new(ListRecordings { ctx: ctx.clone() })).await;
    registry.register("list_snapshots", "1.0", Arc::new(ListSnapshots { ctx: ctx.clone() })).await;
    registry.register("get_recording_info", "1.0", Arc::new(GetRecordingInfo { ctx: ctx.clone() })).await;
    registry.register("get_snapshot_info", "1.0", Arc::new(GetSnapshotInfo { ctx: ctx.clone() })).await;
    registry.register("delete_recording", "1.0", Arc::new(DeleteRecording { ctx: ctx.clone() })).await;
    registry.register("delete_snapshot", "1.0", Arc::new(DeleteSnapshot { ctx: ctx.clone() })).await;
    registry.register("get_storage_info", "1.0", Arc::new(GetStorageInfo { ctx: ctx.clone() })).await;
    registry.register("set_retention_policy", "1.0", Arc::new(SetRetentionPolicy { ctx: ctx.clone() })).await;
    registry.register("cleanup_old_files", "1.0", Arc::new(CleanupOldFiles { ctx })).await;
}

#[derive(Debug, Default, Deserialize)]
struct PageParams {
    limit: Option<u32>,
    offset: Option<u32>,
}

fn page_result(entries: Vec<FileEntry>, total: u64, limit: u32, offset: u32) -> Value {
    json!({
        "files": entries,
        "total": total,
        "limit": limit,
        "offset": offset,
    })
}

#[derive(Debug, Default, Deserialize)]
struct FilenameParams {
    #[serde(default)]
    filename: String,
}

fn require_filename(params: Value) -> Result<String, RpcError> {
    let params: FilenameParams = parse_params(params)?;
    if params.filename.is_empty() {
        return Err(RpcError::InvalidParams("'filename' is required".to_owned()));
    }
    Ok(params.filename)
}

struct ListRecordings {
    ctx: Arc<HandlerContext>,
}

#[async_trait]
impl Handler for ListRecordings {
    async fn invoke(&self, params: Value, _client: &Arc<ClientRecord>) -> Result<Value, RpcError> {
        let params: PageParams = parse_params(params)?;
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
        let offset = params.offset.unwrap_or(0);
        let (entries, total) = self.ctx.controller.list_recordings(limit, offset).await?;
        Ok(page_result(entries, total, limit, offset))
    }
}

struct ListSnapshots {
    ctx: Arc<HandlerContext>,
}

#[async_trait]
impl Handler for ListSnapshots {
    async fn invoke(&self, params: Value, _client: &Arc<ClientRecord>) -> Result<Value, RpcError> {
        let params: PageParams = parse_params(params)?;
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
        let offset = params.offset.unwrap_or(0);
        let (entries, total) = self.ctx.controller.list_snapshots(limit, offset).await?;
        Ok(page_result(entries, total, limit, offset))
    }
}

struct GetRecordingInfo {
    ctx: Arc<HandlerContext>,
}

#[async_trait]
impl Handler for GetRecordingInfo {
    async fn invoke(&self, params: Value, _client: &Arc<ClientRecord>) -> Result<Value, RpcError> {
        let filename = require_filename(params)?;
        let entry = self.ctx.controller.recording_info(&filename).await?;
        serde_json::to_value(entry).map_err(|e| RpcError::Internal(e.to_string()))
    }
}

struct GetSnapshotInfo {
    ctx: Arc<HandlerContext>,
}

#[async_trait]
impl Handler for GetSnapshotInfo {
    async fn invoke(&self, params: Value, _client: &Arc<ClientRecord>) -> Result<Value, RpcError> {
        let filename = require_filename(params)?;
        let entry = self.ctx.controller.snapshot_info(&filename).await?;
        serde_json::to_value(entry).map_err(|e| RpcError::Internal(e.to_string()))
    }
}

struct DeleteRecording {
    ctx: Arc<HandlerContext>,
}

#[async_trait]
impl Handler for DeleteRecording {
    async fn invoke(&self, params: Value, _client: &Arc<ClientRecord>) -> Result<Value, RpcError> {
        let filename = require_filename(params)?;
        self.ctx.controller.delete_recording(&filename).await?;
        Ok(json!({ "filename": filename, "deleted": true }))
    }
}

struct DeleteSnapshot {
    ctx: Arc<HandlerContext>,
}

#[async_trait]
impl Handler for DeleteSnapshot {
    async fn invoke(&self, params: Value, _client: &Arc<ClientRecord>) -> Result<Value, RpcError> {
        let filename = require_filename(params)?;
        self.ctx.controller.delete_snapshot(&filename).await?;
        Ok(json!({ "filename": filename, "deleted": true }))
    }
}

struct GetStorageInfo {
    ctx: Arc<HandlerContext>,
}

#[async_trait]
impl Handler for GetStorageInfo {
    async fn invoke(&self, _params: Value, _client: &Arc<ClientRecord>) -> Result<Value, RpcError> {
        let info = self.ctx.controller.storage_info().await?;
        thresholds::check_storage(&self.ctx.events, &self.ctx.metrics, &self.ctx.config.storage_thresholds, &info).await;
        Ok(json!({
            "total_space": info.total_space,
            "used_space": info.used_space,
            "available_space": info.available_space,
            "usage_percentage": info.usage_percentage,
            "recordings_size": info.recordings_size,
            "snapshots_size": info.snapshots_size,
            "low_space_warning": info.low_space_warning,
        }))
    }
}

#[derive(Debug, Default, Deserialize)]
struct RetentionParams {
    max_age_secs: Option<u64>,
    max_count: Option<u64>,
}

struct SetRetentionPolicy {
    ctx: Arc<HandlerContext>,
}

#[async_trait]
impl Handler for SetRetentionPolicy {
    async fn invoke(&self, params: Value, _client: &Arc<ClientRecord>) -> Result<Value, RpcError> {
        let params: RetentionParams = parse_params(params)?;
        let policy = RetentionPolicy {
            max_age_secs: params.max_age_secs,
            max_count: params.max_count,
        };
        self.ctx.controller.set_retention_policy(policy).await;
        Ok(json!({
            "max_age_secs": policy.max_age_secs,
            "max_count": policy.max_count,
        }))
    }
}

struct CleanupOldFiles {
    ctx: Arc<HandlerContext>,
}

#[async_trait]
impl Handler for CleanupOldFiles {
    async fn invoke(&self, _params: Value, _client: &Arc<ClientRecord>) -> Result<Value, RpcError> {
        let result = self.ctx.controller.cleanup_old_files().await?;
        Ok(json!({
            "recordings_removed": result.recordings_removed,
            "snapshots_removed": result.snapshots_removed,
            "bytes_reclaimed": result.bytes_reclaimed,
        }))
    }
}
