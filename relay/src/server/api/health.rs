use std::collections::BTreeMap;

use axum::{Json, extract::State};
use chrono::Utc;
use serde_json::{Value, json};
use youtube_client::quota::next_reset;

use crate::app::SharedState;

/// Liveness summary: client count and one word per connector.
pub async fn health(State(state): State<SharedState>) -> Json<Value> {
    let now = Utc::now();
    let connectors: BTreeMap<_, _> = state
        .status()
        .snapshot()
        .into_iter()
        .map(|(platform, s)| (platform, s.status))
        .collect();

    Json(json!({
        "status": "ok",
        "clients": state.broadcaster().client_count(),
        "connectors": connectors,
        "timestamp": now.to_rfc3339(),
        "uptimeSecs": (now - state.started_at()).num_seconds(),
    }))
}

/// Detailed state: connectors, quota, configuration and clients.
pub async fn status(State(state): State<SharedState>) -> Json<Value> {
    let now = Utc::now();
    let quota = state.quota().snapshot(now);

    Json(json!({
        "connectors": state.status().snapshot(),
        "quota": {
            "unitsUsedToday": quota.units_used_today,
            "dailyLimit": quota.daily_limit,
            "dayKey": quota.day_key,
            "remaining": quota.remaining(),
            "usedFraction": quota.used_fraction(),
            "resetsAt": next_reset(now).to_rfc3339(),
        },
        "features": state.feature_status(),
        "settings": state.settings(),
        "clients": state.broadcaster().client_infos(),
        "timestamp": now.to_rfc3339(),
    }))
}
