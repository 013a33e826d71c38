use axum::{Extension, Json};
use chess_core::{RulesEngine, ShakmatyEngine};
use serde::{Deserialize, Serialize};

use crate::auth::middleware::AuthUser;
use crate::clients::gemini::{GeminiClient, NO_GAME_MESSAGE};
use crate::error::AppError;

#[derive(Deserialize)]
pub struct AnalysisRequest {
    pub pgn: String,
}

#[derive(Serialize)]
pub struct AnalysisResponse {
    pub analysis: String,
}

/// POST /api/analysis
///
/// One-shot review of a PGN document. The game is validated before it is
/// sent out; a game without moves gets the "no game" message.
pub async fn analyze_game(
    AuthUser(account): AuthUser,
    Extension(gemini): Extension<GeminiClient>,
    Json(req): Json<AnalysisRequest>,
) -> Result<Json<AnalysisResponse>, AppError> {
    if req.pgn.trim().is_empty() {
        return Ok(Json(AnalysisResponse {
            analysis: NO_GAME_MESSAGE.to_string(),
        }));
    }

    let game = ShakmatyEngine
        .load_game(&req.pgn)
        .map_err(|e| AppError::BadRequest(format!("Invalid PGN: {e}")))?;

    if game.moves.is_empty() {
        return Ok(Json(AnalysisResponse {
            analysis: NO_GAME_MESSAGE.to_string(),
        }));
    }

    tracing::info!(user_id = account.id, plies = game.moves.len(), "Analyzing game");
    let analysis = gemini.analyze(&req.pgn).await;

    Ok(Json(AnalysisResponse { analysis }))
}
