//! Subscription management methods (§4.F/§4.H): `subscribe_events`,
//! `unsubscribe_events`, `get_subscription_stats`.

use super::{parse_params, HandlerContext};
use crate::connection::ClientRecord;
use crate::error::RpcError;
use crate::events::Filter;
use crate::registry::{Handler, MethodRegistry};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub async fn register(registry: &MethodRegistry, ctx: Arc<HandlerContext>) {
    registry.register("subscribe_events", "1.0", Arc::new(SubscribeEvents { ctx: ctx.clone() })).await;
    registry.register("unsubscribe_events", "1.0", Arc::new(UnsubscribeEvents { ctx: ctx.clone() })).await;
    registry.register("get_subscription_stats", "1.0", Arc::new(GetSubscriptionStats { ctx })).await;
}

#[derive(Debug, Default, Deserialize)]
struct SubscribeParams {
    #[serde(default)]
    topics: Vec<String>,
    filter: Option<Filter>,
}

struct SubscribeEvents {
    ctx: Arc<HandlerContext>,
}

#[async_trait]
impl Handler for SubscribeEvents {
    async fn invoke(&self, params: Value, client: &Arc<ClientRecord>) -> Result<Value, RpcError> {
        let params: SubscribeParams = parse_params(params)?;
        if params.topics.is_empty() {
            return Err(RpcError::InvalidParams("'topics' must be a non-empty array".to_owned()));
        }
        self.ctx.events.subscribe(&client.client_id, &params.topics, params.filter).await;
        let subscribed = self.ctx.events.client_subscriptions(&client.client_id).await;
        Ok(json!({ "subscribed": subscribed }))
    }
}

#[derive(Debug, Default, Deserialize)]
struct UnsubscribeParams {
    #[serde(default)]
    topics: Vec<String>,
}

struct UnsubscribeEvents {
    ctx: Arc<HandlerContext>,
}

#[async_trait]
impl Handler for UnsubscribeEvents {
    async fn invoke(&self, params: Value, client: &Arc<ClientRecord>) -> Result<Value, RpcError> {
        let params: UnsubscribeParams = parse_params(params)?;
        let removed = self.ctx.events.unsubscribe(&client.client_id, &params.topics).await;
        Ok(json!({ "unsubscribed": true, "topics": removed }))
    }
}

struct GetSubscriptionStats {
    ctx: Arc<HandlerContext>,
}

#[async_trait]
impl Handler for GetSubscriptionStats {
    async fn invoke(&self, _params: Value, client: &Arc<ClientRecord>) -> Result<Value, RpcError> {
        let stats = self.ctx.events.subscription_stats().await;
        let client_topics = self.ctx.events.client_subscriptions(&client.client_id).await;
        Ok(json!({
            "global_stats": {
                "topics": stats.topics,
                "total_subscriptions": stats.total_subscriptions,
            },
            "client_topics": client_topics,
            "client_id": client.client_id,
        }))
    }
}
