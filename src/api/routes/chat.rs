use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::state::AppState;
use crate::infrastructure::{JobResult, ProcessChatJob, QueueJobStatus};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub user_id: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatQueuedResponse {
    pub job_id: Uuid,
    pub status: QueueJobStatus,
}

pub async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<(StatusCode, Json<ChatQueuedResponse>), StatusCode> {
    let user_id = request.user_id.trim();
    if user_id.is_empty() || request.message.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let job = ProcessChatJob::new(user_id, request.message);
    match state.job_producer.push_chat_job(&job).await {
        Ok(job_id) => Ok((
            StatusCode::ACCEPTED,
            Json(ChatQueuedResponse {
                job_id,
                status: QueueJobStatus::Pending,
            }),
        )),
        Err(e) => {
            tracing::error!(error = %e, user_id, "chat job not queued");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobResult>, StatusCode> {
    state
        .job_producer
        .get_job_status(&job_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, %job_id, "job status lookup failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}
