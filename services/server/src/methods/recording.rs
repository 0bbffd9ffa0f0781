//! Recording and snapshot lifecycle methods (§4.H): `take_snapshot`,
//! `start_recording`, `stop_recording`.

use super::{parse_params, HandlerContext};
use crate::connection::ClientRecord;
use crate::controller::{RecordingOptions, SnapshotOptions};
use crate::error::RpcError;
use crate::registry::{Handler, MethodRegistry};
use async_trait::async_trait;
use rpc_protocol::{validate_camera_identifier, Topic};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub async fn register(registry: &MethodRegistry, ctx: Arc<HandlerContext>) {
    registry.register("take_snapshot", "1.0", Arc::new(TakeSnapshot { ctx: ctx.clone() })).await;
    registry.register("start_recording", "1.0", Arc::new(StartRecording { ctx: ctx.clone() })).await;
    registry.register("stop_recording", "1.0", Arc::new(StopRecording { ctx })).await;
}

#[derive(Debug, Default, Deserialize)]
struct SnapshotParams {
    #[serde(default)]
    device: String,
    #[serde(flatten)]
    options: SnapshotOptions,
}

#[derive(Debug, Default, Deserialize)]
struct RecordingParams {
    #[serde(default)]
    device: String,
    #[serde(flatten)]
    options: RecordingOptions,
}

#[derive(Debug, Default, Deserialize)]
struct DeviceParams {
    #[serde(default)]
    device: String,
}

fn validate_device(device: &str) -> Result<(), RpcError> {
    if !validate_camera_identifier(device) {
        return Err(RpcError::InvalidParams(format!("'{device}' is not a recognized camera identifier")));
    }
    Ok(())
}

struct TakeSnapshot {
    ctx: Arc<HandlerContext>,
}

#[async_trait]
impl Handler for TakeSnapshot {
    async fn invoke(&self, params: Value, _client: &Arc<ClientRecord>) -> Result<Value, RpcError> {
        let params: SnapshotParams = parse_params(params)?;
        validate_device(&params.device)?;
        let result = self.ctx.controller.take_snapshot(&params.device, params.options).await?;
        Ok(json!({
            "device": result.device,
            "filename": result.filename,
            "status": result.status,
            "timestamp": result.timestamp,
            "file_size": result.file_size,
            "file_path": result.file_path,
        }))
    }
}

struct StartRecording {
    ctx: Arc<HandlerContext>,
}

#[async_trait]
impl Handler for StartRecording {
    async fn invoke(&self, params: Value, _client: &Arc<ClientRecord>) -> Result<Value, RpcError> {
        let params: RecordingParams = parse_params(params)?;
        validate_device(&params.device)?;
        let session = self.ctx.controller.start_recording(&params.device, params.options).await?;
        self.ctx
            .events
            .publish(
                Topic::RecordingStarted.as_str(),
                json!({
                    "device": session.device,
                    "session_id": session.session_id,
                    "filename": session.filename,
                    "duration": session.duration_secs,
                }),
            )
            .await;
        Ok(json!({
            "device": session.device,
            "session_id": session.session_id,
            "filename": session.filename,
            "status": session.status,
            "start_time": session.start_time,
            "duration": session.duration_secs,
            "format": session.format,
        }))
    }
}

struct StopRecording {
    ctx: Arc<HandlerContext>,
}

#[async_trait]
impl Handler for StopRecording {
    async fn invoke(&self, params: Value, _client: &Arc<ClientRecord>) -> Result<Value, RpcError> {
        let params: DeviceParams = parse_params(params)?;
        validate_device(&params.device)?;
        let session = self.ctx.controller.stop_recording(&params.device).await?;
        self.ctx
            .events
            .publish(
                Topic::RecordingStopped.as_str(),
                json!({
                    "device": session.device,
                    "session_id": session.session_id,
                    "filename": session.filename,
                }),
            )
            .await;
        Ok(json!({
            "session_id": session.session_id,
            "device": session.device,
            "status": session.status,
        }))
    }
}
