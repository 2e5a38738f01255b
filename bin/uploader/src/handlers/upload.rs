use crate::auth::ApiKey;
use crate::error::{handle_server_error, ApiError};
use crate::state::AppState;
use actix_web::{get, web, HttpResponse};
use common::file_utils::{local_metadata_path, mfs_metadata_path, validate_token_id};
use common::UploadResponse;
use std::io::ErrorKind;
use tracing::{info, warn};

/// Copy `<assets>/json/<token_id>.json` into the IPFS mutable file system at `/<token_id>.json`
#[get("/api/upload/{token_id}")]
pub async fn upload(
    _api_key: ApiKey,
    token_id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let token_id = token_id.into_inner();

    // Debug formatter escapes control characters in the raw path segment
    info!(token_id = ?token_id, "GET /api/upload - Request received");

    validate_token_id(&token_id).map_err(|e| ApiError::validation(e.message()))?;

    let local_path = local_metadata_path(&state.config.assets_dir, &token_id);
    let metadata = match tokio::fs::read(&local_path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            // Answered as a success: callers cannot tell "skipped" from "uploaded"
            warn!(
                token_id = ?token_id,
                path = ?local_path,
                "GET /api/upload - No metadata file, nothing uploaded"
            );
            return Ok(HttpResponse::Ok().json(UploadResponse::success()));
        }
        Err(e) => {
            return Err(handle_server_error(
                format!("Failed to read metadata file {:?}", local_path),
                e,
            ))
        }
    };

    let destination = mfs_metadata_path(&token_id);
    state
        .ipfs
        .write(&destination, &metadata)
        .await
        .map_err(|e| handle_server_error(format!("Failed to write {} to IPFS", destination), e))?;

    info!(
        token_id = ?token_id,
        destination = %destination,
        bytes = metadata.len(),
        "GET /api/upload - Metadata uploaded"
    );

    Ok(HttpResponse::Ok().json(UploadResponse::success()))
}
