use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use axum_macros::debug_handler;
use log::debug;

use crate::model::{AppState, Session, User};

/// What the UI gets to see of the session. The token stays server-side.
#[derive(Debug, PartialEq, serde::Serialize)]
pub struct SessionInfo {
    pub logged_in: bool,
    pub user: Option<User>,
}

impl SessionInfo {
    fn of(session: &Session) -> SessionInfo {
        SessionInfo {
            logged_in: session.is_logged_in(),
            user: session.user().cloned(),
        }
    }
}

#[debug_handler]
pub async fn current_session(State(state): State<Arc<AppState>>) -> Json<SessionInfo> {
    let session = state.session.lock().await;
    Json(SessionInfo::of(&session))
}

#[debug_handler]
pub async fn logout(State(state): State<Arc<AppState>>) -> StatusCode {
    debug!("Logging out current session");

    let mut session = state.session.lock().await;
    session.logout();

    StatusCode::RESET_CONTENT
}
