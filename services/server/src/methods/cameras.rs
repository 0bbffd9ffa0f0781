//! Camera and stream query/control methods (§4.H): `get_camera_list`,
//! `get_camera_status`, `get_camera_capabilities`, `get_streams`,
//! `get_stream_url`, `get_stream_status`, `start_streaming`,
//! `stop_streaming`. All are thin delegations to the `MediaController`
//! collaborator; this module's only job is request validation and
//! response-shape assembly.

use super::{parse_params, HandlerContext};
use crate::connection::ClientRecord;
use crate::error::RpcError;
use crate::registry::{Handler, MethodRegistry};
use async_trait::async_trait;
use rpc_protocol::{validate_camera_identifier, Topic};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub async fn register(registry: &MethodRegistry, ctx: Arc<HandlerContext>) {
    registry.register("get_camera_list", "1.0", Arc::new(GetCameraList { ctx: ctx.clone() })).await;
    registry.register("get_camera_status", "1.0", Arc::new(GetCameraStatus { ctx: ctx.clone() })).await;
    registry
        .register("get_camera_capabilities", "1.0", Arc::new(GetCameraCapabilities { ctx: ctx.clone() }))
        .await;
    registry.register("get_streams", "1.0", Arc::new(GetStreams { ctx: ctx.clone() })).await;
    registry.register("get_stream_url", "1.0", Arc::new(GetStreamUrl { ctx: ctx.clone() })).await;
    registry.register("get_stream_status", "1.0", Arc::new(GetStreamStatus { ctx: ctx.clone() })).await;
    registry.register("start_streaming", "1.0", Arc::new(StartStreaming { ctx: ctx.clone() })).await;
    registry.register("stop_streaming", "1.0", Arc::new(StopStreaming { ctx })).await;
}

#[derive(Debug, Default, Deserialize)]
struct DeviceParams {
    #[serde(default)]
    device: String,
}

/// Validates the camera identifier syntax (§6); mapping the identifier to a
/// real device lives entirely in the controller.
fn require_device(params: Value) -> Result<String, RpcError> {
    let params: DeviceParams = parse_params(params)?;
    if !validate_camera_identifier(&params.device) {
        return Err(RpcError::InvalidParams(format!(
            "'{}' is not a recognized camera identifier",
            params.device
        )));
    }
    Ok(params.device)
}

struct GetCameraList {
    ctx: Arc<HandlerContext>,
}

#[async_trait]
impl Handler for GetCameraList {
    async fn invoke(&self, _params: Value, _client: &Arc<ClientRecord>) -> Result<Value, RpcError> {
        let cameras = self.ctx.controller.get_camera_list().await?;
        let connected = cameras.iter().filter(|c| c.status == "CONNECTED").count();
        Ok(json!({
            "cameras": cameras,
            "total": cameras.len(),
            "connected": connected,
        }))
    }
}

struct GetCameraStatus {
    ctx: Arc<HandlerContext>,
}

#[async_trait]
impl Handler for GetCameraStatus {
    async fn invoke(&self, params: Value, _client: &Arc<ClientRecord>) -> Result<Value, RpcError> {
        let device = require_device(params)?;
        let status = self.ctx.controller.get_camera_status(&device).await?;
        Ok(json!({
            "device": status.device,
            "status": status.status,
            "name": status.name,
            "resolution": status.resolution,
            "fps": status.fps,
            "streams": status.streams,
            "capabilities": status.capabilities,
            "metrics": {
                "bytes_sent": status.bytes_sent,
                "readers": status.readers,
                "uptime": status.uptime_secs,
            },
        }))
    }
}

struct GetCameraCapabilities {
    ctx: Arc<HandlerContext>,
}

#[async_trait]
impl Handler for GetCameraCapabilities {
    async fn invoke(&self, params: Value, _client: &Arc<ClientRecord>) -> Result<Value, RpcError> {
        let device = require_device(params)?;
        let status = self.ctx.controller.get_camera_status(&device).await?;
        Ok(json!({
            "device": device,
            "capabilities": status.capabilities,
        }))
    }
}

struct GetStreams {
    ctx: Arc<HandlerContext>,
}

#[async_trait]
impl Handler for GetStreams {
    async fn invoke(&self, _params: Value, _client: &Arc<ClientRecord>) -> Result<Value, RpcError> {
        let streams = self.ctx.controller.get_streams().await?;
        Ok(json!({ "streams": streams, "total": streams.len() }))
    }
}

struct GetStreamUrl {
    ctx: Arc<HandlerContext>,
}

#[async_trait]
impl Handler for GetStreamUrl {
    async fn invoke(&self, params: Value, _client: &Arc<ClientRecord>) -> Result<Value, RpcError> {
        let device = require_device(params)?;
        let info = self.ctx.controller.get_stream_url(&device).await?;
        Ok(json!({
            "device": info.device,
            "stream_name": info.stream_name,
            "stream_url": info.stream_url,
            "available": info.ready,
        }))
    }
}

#[derive(Debug, Default, Deserialize)]
struct StreamNameParams {
    #[serde(default)]
    stream_name: String,
}

struct GetStreamStatus {
    ctx: Arc<HandlerContext>,
}

#[async_trait]
impl Handler for GetStreamStatus {
    async fn invoke(&self, params: Value, _client: &Arc<ClientRecord>) -> Result<Value, RpcError> {
        let params: StreamNameParams = parse_params(params)?;
        if params.stream_name.is_empty() {
            return Err(RpcError::InvalidParams("'stream_name' is required".to_owned()));
        }
        let info = self.ctx.controller.get_stream_status(&params.stream_name).await?;
        Ok(json!({
            "device": info.device,
            "stream_name": info.stream_name,
            "status": if info.ready { "ACTIVE" } else { "INACTIVE" },
            "ready": info.ready,
        }))
    }
}

struct StartStreaming {
    ctx: Arc<HandlerContext>,
}

#[async_trait]
impl Handler for StartStreaming {
    async fn invoke(&self, params: Value, _client: &Arc<ClientRecord>) -> Result<Value, RpcError> {
        let device = require_device(params)?;
        let info = self.ctx.controller.start_streaming(&device).await?;
        self.ctx
            .events
            .publish(Topic::StreamStarted.as_str(), json!({ "device": info.device, "stream_name": info.stream_name }))
            .await;
        Ok(json!({
            "device": info.device,
            "stream_name": info.stream_name,
            "stream_url": info.stream_url,
            "status": "STREAMING",
            "start_time": chrono::Utc::now().to_rfc3339(),
        }))
    }
}

struct StopStreaming {
    ctx: Arc<HandlerContext>,
}

#[async_trait]
impl Handler for StopStreaming {
    async fn invoke(&self, params: Value, _client: &Arc<ClientRecord>) -> Result<Value, RpcError> {
        let device = require_device(params)?;
        // get_stream_status's `ready` flag still reflects pre-stop state here,
        // giving us the stream name without a second controller round trip.
        let info = self.ctx.controller.get_stream_url(&device).await?;
        self.ctx.controller.stop_streaming(&device).await?;
        self.ctx
            .events
            .publish(Topic::StreamStopped.as_str(), json!({ "device": device, "stream_name": info.stream_name }))
            .await;
        Ok(json!({
            "device": device,
            "stream_name": info.stream_name,
            "status": "STOPPED",
            "end_time": chrono::Utc::now().to_rfc3339(),
            "duration": 0,
        }))
    }
}
