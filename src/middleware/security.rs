use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::error::AppError;
use crate::state::AppState;

/// Rejects requests whose Host header is not on the configured allow-list.
/// A lone `*` entry disables the check (useful behind a trusted proxy).
pub async fn enforce_trusted_hosts(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let trusted = &state.config.trusted_hosts;
    if trusted.iter().any(|entry| entry.trim() == "*") {
        return Ok(next.run(request).await);
    }

    let host = request
        .headers()
        .get(axum::http::header::HOST)
        .and_then(|value| value.to_str().ok())
        .map(strip_port)
        .unwrap_or_default();

    if host.is_empty() || !trusted.iter().any(|entry| entry.eq_ignore_ascii_case(host)) {
        return Err(AppError::BadRequest(format!(
            "Host '{host}' is not a trusted host."
        )));
    }

    Ok(next.run(request).await)
}

fn strip_port(host: &str) -> &str {
    host.trim().rsplit_once(':').map_or(host.trim(), |(name, port)| {
        // Only treat the suffix as a port when it is numeric; IPv6 literals
        // keep their brackets and fall through unchanged.
        if port.chars().all(|c| c.is_ascii_digit()) {
            name
        } else {
            host.trim()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::strip_port;

    #[test]
    fn strips_numeric_ports_only() {
        assert_eq!(strip_port("localhost:8000"), "localhost");
        assert_eq!(strip_port("api.example.com"), "api.example.com");
        assert_eq!(strip_port(" localhost "), "localhost");
        assert_eq!(strip_port("[::1]:8000"), "[::1]");
    }
}
