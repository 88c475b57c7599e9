use std::collections::hash_map::Entry;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::state::AppState;
use crate::inference::{compute_progress, Category};
use crate::script::{section_guidance, ScriptError};
use crate::session::{Message, Role, SessionController, SessionStats};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize, Default)]
pub struct StartInterviewRequest {
    /// Optional interview ID (if not provided, generate UUID)
    pub interview_id: Option<String>,

    /// Optional agent override passed to the credential broker
    pub agent_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartInterviewResponse {
    pub interview_id: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StopInterviewResponse {
    pub interview_id: String,
    pub status: String,
    pub message: String,
    pub stats: SessionStats,
}

#[derive(Debug, Serialize)]
pub struct InterviewStatusResponse {
    pub interview_id: String,
    pub stats: SessionStats,
    /// Latest assistant utterance for live captioning
    pub current_text: String,
}

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    /// One entry per script section; empty when the script is unavailable
    pub categories: Vec<Category>,
    /// False when the script could not be loaded (valid empty state, not
    /// an error; the UI hides progress entirely)
    pub progress_available: bool,
}

#[derive(Debug, Deserialize)]
pub struct SectionRequest {
    pub section_name: String,
}

#[derive(Debug, Serialize)]
pub struct SectionResponse {
    pub section_name: String,
    pub section_info: crate::script::Section,
    pub questions: Vec<crate::script::Question>,
    pub conversation_guidance: String,
    pub total_questions: usize,
    pub estimated_time: String,
    pub next_section: Option<String>,
    pub section_order: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct QuestionRequest {
    /// Defaults to the first question when absent
    pub question_id: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SummaryRequest {
    pub transcript: Vec<TranscriptLine>,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptLine {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub note: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

// ============================================================================
// Interview Handlers
// ============================================================================

/// POST /interviews/start
/// Create a session controller and connect it
pub async fn start_interview(
    State(state): State<AppState>,
    Json(req): Json<StartInterviewRequest>,
) -> impl IntoResponse {
    let interview_id = req
        .interview_id
        .unwrap_or_else(|| format!("interview-{}", uuid::Uuid::new_v4()));

    info!("Starting interview: {}", interview_id);

    let controller = Arc::new(SessionController::new(
        interview_id.clone(),
        state.deps.clone(),
        state.reconcile.clone(),
    ));

    // Reserve the id before connecting so two racing starts with the
    // same id cannot both open a provider session.
    {
        let mut sessions = state.sessions.write().await;
        match sessions.entry(interview_id.clone()) {
            Entry::Occupied(_) => {
                return error_response(
                    StatusCode::CONFLICT,
                    format!("Interview {} is already running", interview_id),
                );
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&controller));
            }
        }
    }

    if let Err(e) = controller.connect(req.agent_id.as_deref()).await {
        error!("Failed to connect interview {}: {}", interview_id, e);
        state.sessions.write().await.remove(&interview_id);
        controller.dispose().await;
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to connect: {}", e),
        );
    }

    info!("Interview started: {}", interview_id);

    (
        StatusCode::OK,
        Json(StartInterviewResponse {
            interview_id: interview_id.clone(),
            status: "connecting".to_string(),
            message: format!("Interview {} started", interview_id),
        }),
    )
        .into_response()
}

/// POST /interviews/stop/:interview_id
/// Disconnect a session and wait for transcript reconciliation
pub async fn stop_interview(
    State(state): State<AppState>,
    Path(interview_id): Path<String>,
) -> impl IntoResponse {
    info!("Stopping interview: {}", interview_id);

    let controller = {
        let mut sessions = state.sessions.write().await;
        sessions.remove(&interview_id)
    };

    let Some(controller) = controller else {
        return error_response(
            StatusCode::NOT_FOUND,
            format!("Interview {} not found", interview_id),
        );
    };

    controller.disconnect().await;
    controller.dispose().await;

    let stats = controller.stats().await;
    info!("Interview stopped: {}", interview_id);

    // Budget exhaustion demotes the response to a timeout; the final
    // stats (and the kept partial transcript) still ship.
    let (code, status, message) = if stats.transcript_timed_out {
        (
            StatusCode::REQUEST_TIMEOUT,
            "timeout",
            "Durable transcript not ready within budget; partial record kept",
        )
    } else {
        (StatusCode::OK, "stopped", "Interview stopped")
    };

    (
        code,
        Json(StopInterviewResponse {
            interview_id,
            status: status.to_string(),
            message: message.to_string(),
            stats,
        }),
    )
        .into_response()
}

/// GET /interviews/:interview_id/status
pub async fn get_interview_status(
    State(state): State<AppState>,
    Path(interview_id): Path<String>,
) -> impl IntoResponse {
    let sessions = state.sessions.read().await;

    match sessions.get(&interview_id) {
        Some(controller) => {
            let response = InterviewStatusResponse {
                interview_id: interview_id.clone(),
                stats: controller.stats().await,
                current_text: controller.current_text().await,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("Interview {} not found", interview_id),
        ),
    }
}

/// GET /interviews/:interview_id/transcript
pub async fn get_interview_transcript(
    State(state): State<AppState>,
    Path(interview_id): Path<String>,
) -> impl IntoResponse {
    let sessions = state.sessions.read().await;

    match sessions.get(&interview_id) {
        Some(controller) => {
            let transcript: Vec<Message> = controller.messages().await;
            // A timed-out reconciliation answers 408 with the partial
            // transcript in the body rather than pretending completeness.
            let status = if controller.transcript_timed_out() {
                StatusCode::REQUEST_TIMEOUT
            } else {
                StatusCode::OK
            };
            (status, Json(transcript)).into_response()
        }
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("Interview {} not found", interview_id),
        ),
    }
}

/// GET /interviews/:interview_id/progress
/// Inferred section progress. An unavailable script degrades to an empty
/// category list, it does not fail the request.
pub async fn get_interview_progress(
    State(state): State<AppState>,
    Path(interview_id): Path<String>,
) -> impl IntoResponse {
    let messages = {
        let sessions = state.sessions.read().await;
        match sessions.get(&interview_id) {
            Some(controller) => controller.messages().await,
            None => {
                return error_response(
                    StatusCode::NOT_FOUND,
                    format!("Interview {} not found", interview_id),
                )
            }
        }
    };

    let response = match state.script.get().await {
        Ok(script) => ProgressResponse {
            categories: compute_progress(&messages, &script),
            progress_available: true,
        },
        Err(e) => {
            info!("No progress data available: {}", e);
            ProgressResponse {
                categories: Vec::new(),
                progress_available: false,
            }
        }
    };

    (StatusCode::OK, Json(response)).into_response()
}

// ============================================================================
// Script Handlers
// ============================================================================

/// GET /script
pub async fn get_script(State(state): State<AppState>) -> impl IntoResponse {
    match state.script.get().await {
        Ok(script) => (StatusCode::OK, Json(script.as_ref().clone())).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// POST /script/section
pub async fn get_section(
    State(state): State<AppState>,
    Json(req): Json<SectionRequest>,
) -> impl IntoResponse {
    let script = match state.script.get().await {
        Ok(script) => script,
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };

    let section = match script.section(&req.section_name) {
        Ok(section) => section,
        Err(e @ ScriptError::SectionNotFound { .. }) => {
            return error_response(StatusCode::NOT_FOUND, e.to_string())
        }
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };

    let questions = script.questions_for(&req.section_name);
    let guidance = section_guidance(&req.section_name, section, &questions);

    let response = SectionResponse {
        section_name: req.section_name.clone(),
        section_info: section.clone(),
        total_questions: questions.len(),
        estimated_time: section.estimated_time.clone(),
        questions: questions.into_iter().cloned().collect(),
        conversation_guidance: guidance,
        next_section: script.next_section(&req.section_name),
        section_order: script.section_order(),
    };

    (StatusCode::OK, Json(response)).into_response()
}

/// POST /script/question
pub async fn get_question(
    State(state): State<AppState>,
    Json(req): Json<QuestionRequest>,
) -> impl IntoResponse {
    let script = match state.script.get().await {
        Ok(script) => script,
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };

    let question_id = req.question_id.unwrap_or(1);
    match script.question_by_id(question_id) {
        Ok(question) => (StatusCode::OK, Json(question.clone())).into_response(),
        Err(e) => error_response(StatusCode::NOT_FOUND, e.to_string()),
    }
}

// ============================================================================
// Notes Handler
// ============================================================================

/// POST /notes/summary
/// Generate a SOAP-style summary note from a transcript
pub async fn summary_note(
    State(state): State<AppState>,
    Json(req): Json<SummaryRequest>,
) -> impl IntoResponse {
    if req.transcript.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Transcript array is required");
    }

    let transcript_text = req
        .transcript
        .iter()
        .map(|line| {
            let speaker = match line.role {
                Role::Assistant => "AI",
                Role::User => "Patient",
            };
            format!("{}: {}", speaker, line.content)
        })
        .collect::<Vec<_>>()
        .join("\n");

    match state.provider.summary_note(&transcript_text).await {
        Ok(note) => (StatusCode::OK, Json(SummaryResponse { note })).into_response(),
        Err(e) => {
            error!("Summary note generation failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
