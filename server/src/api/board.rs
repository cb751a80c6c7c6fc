use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use openscale_store::{Board, Layout};
use serde::Serialize;

use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(board_info))
}

#[derive(Debug, Serialize)]
pub struct BoardInfo {
    layout: Layout,
    #[serde(flatten)]
    board: &'static Board,
}

/// GET /api/board - Pin assignments of the configured board
async fn board_info(State(state): State<Arc<AppState>>) -> Json<BoardInfo> {
    let layout = state.config.layout;
    Json(BoardInfo {
        layout,
        board: Board::for_layout(layout),
    })
}
