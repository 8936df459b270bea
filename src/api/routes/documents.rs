use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::state::AppState;
use crate::domain::DomainError;
use crate::infrastructure::{IngestDocumentJob, QueueJobStatus};

#[derive(Debug, Serialize)]
pub struct IngestQueuedResponse {
    pub job_id: Uuid,
    pub source: String,
    pub status: QueueJobStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct IngestParams {
    pub collection: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchDocumentsRequest {
    pub query: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchResultResponse {
    pub chunk_id: String,
    pub source: String,
    pub chunk: usize,
    pub text: String,
    pub distance: f32,
}

/// Keeps only the final path component; `None` for names like `..` or `/`.
fn source_name(raw: &str) -> Option<String> {
    std::path::Path::new(raw)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.trim().is_empty())
        .map(str::to_string)
}

fn ingest_job(source: &str, params: &IngestParams) -> Result<IngestDocumentJob, StatusCode> {
    let job = IngestDocumentJob::new(source);
    match params.collection.as_deref().map(str::trim) {
        None | Some("") => Ok(job),
        Some(name)
            if name.len() <= 64
                && name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') =>
        {
            Ok(job.with_collection(name))
        }
        Some(_) => Err(StatusCode::BAD_REQUEST),
    }
}

async fn queue_ingest(
    state: &AppState,
    source: String,
    params: &IngestParams,
) -> Result<(StatusCode, Json<IngestQueuedResponse>), StatusCode> {
    let job = ingest_job(&source, params)?;
    let job_id = state.job_producer.push_ingest_job(&job).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to queue ingest job");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok((
        StatusCode::ACCEPTED,
        Json(IngestQueuedResponse {
            job_id,
            source,
            status: QueueJobStatus::Pending,
        }),
    ))
}

/// Saves the uploaded `file` field into the documents directory and queues
/// its ingestion. An existing file with the same name is replaced.
pub async fn upload_document(
    State(state): State<AppState>,
    Query(params): Query<IngestParams>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<IngestQueuedResponse>), StatusCode> {
    let docs_dir = state.config.config.storage.docs_path.clone();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?
    {
        if field.name() != Some("file") {
            continue;
        }
        let source = field
            .file_name()
            .and_then(source_name)
            .ok_or(StatusCode::BAD_REQUEST)?;
        let data = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;

        tokio::fs::create_dir_all(&docs_dir).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to create documents directory");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
        tokio::fs::write(docs_dir.join(&source), &data)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, source, "Failed to store upload");
                StatusCode::INTERNAL_SERVER_ERROR
            })?;
        tracing::info!(source, bytes = data.len(), "document uploaded");

        return queue_ingest(&state, source, &params).await;
    }

    Err(StatusCode::BAD_REQUEST)
}

pub async fn ingest_document(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<IngestParams>,
) -> Result<(StatusCode, Json<IngestQueuedResponse>), StatusCode> {
    let source = source_name(&name).ok_or(StatusCode::BAD_REQUEST)?;
    let path = state.config.config.storage.docs_path.join(&source);
    if !tokio::fs::metadata(&path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
    {
        return Err(StatusCode::NOT_FOUND);
    }

    queue_ingest(&state, source, &params).await
}

/// Raw nearest chunks, without the relevance gate.
pub async fn search_documents(
    State(state): State<AppState>,
    Json(request): Json<SearchDocumentsRequest>,
) -> Result<Json<Vec<SearchResultResponse>>, StatusCode> {
    let Some(collection) = &state.collection else {
        return Ok(Json(vec![]));
    };

    let limit = request
        .limit
        .unwrap_or(state.config.config.rag.top_k)
        .max(1);
    match collection.query(&request.query, limit).await {
        Ok(results) => Ok(Json(
            results
                .into_iter()
                .map(|r| SearchResultResponse {
                    chunk_id: r.chunk.id,
                    source: r.chunk.metadata.source,
                    chunk: r.chunk.metadata.chunk,
                    text: r.chunk.text,
                    distance: r.distance,
                })
                .collect(),
        )),
        Err(DomainError::NotFound(_)) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!(error = %e, "Search failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
