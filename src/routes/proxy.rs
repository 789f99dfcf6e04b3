use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use axum_macros::debug_handler;
use log::{debug, error, trace, warn};

use crate::{
    config::SessionConfig,
    model::{AppState, Session},
};

/// Forwards a request under a configured prefix to its upstream origin and
/// relays the response back unchanged.
#[debug_handler]
pub async fn forward(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path();
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or(path);

    // Only configured prefixes are routed here, so a miss means the routes
    // and the config disagree
    let Some(rule) = state.config.rule_for(path) else {
        warn!("No proxy rule covers {}", path);
        return StatusCode::NOT_FOUND.into_response();
    };
    let target = rule.target_for(path_and_query);

    let mut outbound = proxied_headers(&headers);
    if !outbound.contains_key(header::AUTHORIZATION) {
        let session = state.session.lock().await;
        if let Some(value) = bearer(&session) {
            trace!("Attaching session token to {} {}", method, path);
            outbound.insert(header::AUTHORIZATION, value);
        }
    }

    trace!("Forwarding {} {} to {}", method, path, target);

    let upstream = match state
        .client
        .request(method, target.as_str())
        .headers(outbound)
        .body(body)
        .send()
        .await
    {
        Ok(response) => response,
        Err(err) => {
            error!("Failed to reach upstream {}: {}", target, err);
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    let status = upstream.status();
    let response_headers = proxied_headers(upstream.headers());
    let response_body = match upstream.bytes().await {
        Ok(bytes) => bytes,
        Err(err) => {
            error!("Failed to read response from {}: {}", target, err);
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    {
        let mut session = state.session.lock().await;
        capture_session(&mut session, &state.config.session, path, status, &response_body);
    }

    (status, response_headers, response_body).into_response()
}

/// Updates the session store from an observed authentication response.
/// Anything but a successful login or profile fetch leaves it untouched.
fn capture_session(
    session: &mut Session,
    config: &SessionConfig,
    path: &str,
    status: StatusCode,
    body: &[u8],
) {
    if !status.is_success() {
        return;
    }

    if path == config.login_path {
        match extract_token(body) {
            Some(token) => {
                debug!("Login succeeded; storing session token");
                session.set_token(token);
            }
            None => warn!("Login response carried no token field"),
        }
    } else if path == config.profile_path {
        match serde_json::from_slice(body) {
            Ok(user) => {
                debug!("Storing user record from profile response");
                session.set_user(user);
            }
            Err(err) => warn!("Profile response was not valid JSON: {}", err),
        }
    }
}

fn extract_token(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value.get("token")?.as_str().map(str::to_owned)
}

fn bearer(session: &Session) -> Option<HeaderValue> {
    if !session.is_logged_in() {
        return None;
    }
    let token = session.token()?;
    HeaderValue::from_str(&format!("Bearer {}", token)).ok()
}

/// Copies a header map, dropping the hop-by-hop headers along with `Host`
/// and `Content-Length` (the client recomputes both).
fn proxied_headers(headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::new();
    for (name, value) in headers {
        if is_hop_by_hop(name) || *name == header::HOST || *name == header::CONTENT_LENGTH {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

fn is_hop_by_hop(name: &HeaderName) -> bool {
    *name == header::CONNECTION
        || *name == header::TE
        || *name == header::TRAILER
        || *name == header::TRANSFER_ENCODING
        || *name == header::UPGRADE
        || *name == header::PROXY_AUTHENTICATE
        || *name == header::PROXY_AUTHORIZATION
        || name.as_str() == "keep-alive"
}
