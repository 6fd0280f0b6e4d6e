//! Chat preset handlers under `/api/chats`.
//!
//! Managing presets needs an admin token; replies need a session token.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};

use bazaar_core::ChatPresetId;

use crate::error::Result;
use crate::extract::JsonBody;
use crate::middleware::{RequireAdmin, RequireUser};
use crate::models::{ChatPreset, NewChatPreset};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PresetListResponse {
    pub success: bool,
    pub presets: Vec<ChatPreset>,
}

#[derive(Debug, Serialize)]
pub struct PresetResponse {
    pub success: bool,
    pub message: &'static str,
    pub preset: ChatPreset,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub success: bool,
    pub message: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct ReplyRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ReplyResponse {
    pub success: bool,
    pub reply: String,
}

/// GET /api/chats/presets
///
/// # Errors
///
/// Returns `AppError` if the store fails.
pub async fn list(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<Json<PresetListResponse>> {
    let presets = state.presets().list().await?;
    Ok(Json(PresetListResponse {
        success: true,
        presets,
    }))
}

/// POST /api/chats/presets
///
/// # Errors
///
/// Returns `AppError` for invalid presets and storage faults.
pub async fn create(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    JsonBody(req): JsonBody<NewChatPreset>,
) -> Result<Json<PresetResponse>> {
    let preset = state.presets().create(req).await?;
    Ok(Json(PresetResponse {
        success: true,
        message: "Preset created",
        preset,
    }))
}

/// PUT /api/chats/presets/{id}
///
/// # Errors
///
/// Returns `AppError` for invalid presets, unknown ids and storage faults.
pub async fn update(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<i32>,
    JsonBody(req): JsonBody<NewChatPreset>,
) -> Result<Json<PresetResponse>> {
    let preset = state
        .presets()
        .update(ChatPresetId::new(id), req)
        .await?;
    Ok(Json(PresetResponse {
        success: true,
        message: "Preset updated",
        preset,
    }))
}

/// DELETE /api/chats/presets/{id}
///
/// # Errors
///
/// Returns `AppError` for unknown ids and storage faults.
pub async fn delete(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<i32>,
) -> Result<Json<DeletedResponse>> {
    state.presets().delete(ChatPresetId::new(id)).await?;
    Ok(Json(DeletedResponse {
        success: true,
        message: "Preset deleted",
    }))
}

/// POST /api/chats/reply
///
/// # Errors
///
/// Returns `AppError` if the store fails.
pub async fn reply(
    State(state): State<AppState>,
    RequireUser(account_id): RequireUser,
    JsonBody(req): JsonBody<ReplyRequest>,
) -> Result<Json<ReplyResponse>> {
    let reply = state.presets().reply(&req.message).await?;
    tracing::debug!(account_id = %account_id, preset_id = ?reply.preset_id, "Chat reply chosen");
    Ok(Json(ReplyResponse {
        success: true,
        reply: reply.text,
    }))
}
