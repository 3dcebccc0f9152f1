//! JSON API handlers.
//!
//! ```text
//! POST   /api/generate       -> generate_image
//! DELETE /api/delete/{id}    -> delete_image
//! GET    /api/models         -> list_models
//! ```

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};

use crate::catalog::{self, DEFAULT_MODEL, ModelInfo};
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::storage::LocalFileStorage;
use crate::store::{ImageId, ImageRecord, NewImageRecord};

pub const MAX_PROMPT_CHARS: usize = 1000;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub prompt: String,
    pub model_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub image_id: ImageId,
    pub filename: String,
    pub download_url: String,
    pub model_name: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: &'static [ModelInfo],
}

/// Trims `prompt` and checks it is non-empty and at most
/// [`MAX_PROMPT_CHARS`] characters.
pub fn validate_prompt(prompt: &str) -> AppResult<&str> {
    let trimmed = prompt.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Prompt is required".to_string()));
    }
    if trimmed.chars().count() > MAX_PROMPT_CHARS {
        return Err(AppError::Validation(format!(
            "Prompt is too long (max {MAX_PROMPT_CHARS} characters)"
        )));
    }
    Ok(trimmed)
}

pub fn download_url(filename: &str) -> String {
    format!("/download/{filename}")
}

/// POST /api/generate
pub async fn generate_image(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> AppResult<Json<GenerateResponse>> {
    let Json(request) = payload.map_err(|rejection| {
        AppError::Validation(format!("Invalid request body: {}", rejection.body_text()))
    })?;
    let prompt = validate_prompt(&request.prompt)?;
    let model = request
        .model_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_MODEL);

    let filename = LocalFileStorage::generate_filename();
    let path = state.storage.resolve_path(&filename);

    let generation = match state.inference.generate(prompt, model, &path).await {
        Ok(generation) => generation,
        Err(err) => {
            discard_file(&state.storage, &filename).await;
            return Err(err.into());
        }
    };

    let record = match persist_record(&state, prompt, &generation.model_used, &filename).await {
        Ok(record) => record,
        Err(err) => {
            discard_file(&state.storage, &filename).await;
            return Err(err);
        }
    };
    tracing::info!(
        image_id = record.id,
        model = %record.model_name,
        fallback = generation.fallback,
        "generated image stored"
    );

    Ok(Json(GenerateResponse {
        success: true,
        image_id: record.id,
        download_url: download_url(&record.filename),
        filename: record.filename,
        model_name: record.model_name,
        message: generation.message,
    }))
}

async fn persist_record(
    state: &AppState,
    prompt: &str,
    model: &str,
    filename: &str,
) -> AppResult<ImageRecord> {
    let file_size = state.storage.size(filename).await?;
    let file_size = i64::try_from(file_size)
        .map_err(|_| AppError::Internal(format!("file size {file_size} out of range")))?;
    let record = state
        .store
        .create(&NewImageRecord {
            prompt: prompt.to_string(),
            model_name: model.to_string(),
            filename: filename.to_string(),
            file_size,
        })
        .await?;
    Ok(record)
}

async fn discard_file(storage: &LocalFileStorage, filename: &str) {
    if let Err(err) = storage.remove(filename).await {
        tracing::warn!(filename, error = %err, "failed to remove orphaned image file");
    }
}

/// DELETE /api/delete/{id}
///
/// Removes the record, then its file. A file that is already gone is not an
/// error.
pub async fn delete_image(
    State(state): State<AppState>,
    id: Result<Path<ImageId>, PathRejection>,
) -> AppResult<Json<SuccessResponse>> {
    let not_found = || AppError::NotFound("Image not found".to_string());
    let Path(id) = id.map_err(|_| not_found())?;
    let record = state.store.delete(id).await?.ok_or_else(not_found)?;

    match state.storage.remove(&record.filename).await {
        Ok(true) => {}
        Ok(false) => tracing::debug!(filename = %record.filename, "image file already absent"),
        Err(err) => {
            tracing::warn!(filename = %record.filename, error = %err, "failed to remove image file")
        }
    }
    tracing::info!(image_id = id, "image deleted");

    Ok(Json(SuccessResponse { success: true }))
}

/// GET /api/models
pub async fn list_models() -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: catalog::available_models(),
    })
}
