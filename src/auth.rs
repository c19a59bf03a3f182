use axum::http::HeaderMap;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// Roles allowed to operate on landlord-scoped resources.
pub const LANDLORD_ROLES: &[&str] = &["landlord", "admin"];

#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub role: String,
    pub exp: usize,
}

/// Resolves the acting landlord id from the request headers.
///
/// Accepts a `Bearer` token signed with the configured HS256 secret. When dev
/// auth overrides are enabled (never in production), an `x-user-id` header is
/// honored instead so local clients can skip token minting.
pub fn require_landlord(state: &AppState, headers: &HeaderMap) -> Result<Uuid, AppError> {
    if state.config.auth_dev_overrides_enabled() {
        if let Some(raw) = header_str(headers, "x-user-id") {
            return Uuid::parse_str(raw).map_err(|_| {
                AppError::Unauthorized("Unauthorized: x-user-id is not a valid UUID.".to_string())
            });
        }
    }

    let token = bearer_token(headers).ok_or_else(|| {
        AppError::Unauthorized("Unauthorized: missing bearer token.".to_string())
    })?;

    let secret = state.config.jwt_secret.as_deref().ok_or_else(|| {
        AppError::Dependency("JWT verification is not configured. Set JWT_SECRET.".to_string())
    })?;

    let claims = decode_claims(token, secret)?;

    let role = claims.role.trim().to_ascii_lowercase();
    if !LANDLORD_ROLES.contains(&role.as_str()) {
        return Err(AppError::Forbidden(format!(
            "Forbidden: role '{role}' is not allowed for this action."
        )));
    }

    Uuid::parse_str(claims.sub.trim()).map_err(|_| {
        AppError::Unauthorized("Unauthorized: token subject is not a valid UUID.".to_string())
    })
}

pub fn decode_claims(token: &str, secret: &str) -> Result<Claims, AppError> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|error| {
        tracing::debug!(error = %error, "JWT validation failed");
        AppError::Unauthorized("Unauthorized: invalid or expired token.".to_string())
    })
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    header_str(headers, "authorization")
        .and_then(|value| value.strip_prefix("Bearer ").or_else(|| value.strip_prefix("bearer ")))
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, HeaderValue};
    use jsonwebtoken::{encode, EncodingKey, Header};

    use super::{bearer_token, decode_claims, require_landlord, Claims};
    use crate::config::AppConfig;
    use crate::error::AppError;
    use crate::state::AppState;

    fn token_for(sub: &str, role: &str, secret: &str) -> String {
        let exp = (chrono::Utc::now().timestamp() + 3600) as usize;
        let claims = serde_json::json!({ "sub": sub, "role": role, "exp": exp });
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("encode token")
    }

    fn test_state(secret: Option<&str>, dev_overrides: bool) -> AppState {
        std::env::remove_var("JWT_SECRET");
        let mut config = AppConfig::from_env();
        config.jwt_secret = secret.map(ToOwned::to_owned);
        config.environment = "test".to_string();
        config.dev_auth_overrides_enabled = dev_overrides;
        AppState {
            config,
            db_pool: None,
        }
    }

    #[test]
    fn decodes_valid_token() {
        let token = token_for("550e8400-e29b-41d4-a716-446655440000", "landlord", "s3cret");
        let claims: Claims = decode_claims(&token, "s3cret").expect("valid claims");
        assert_eq!(claims.sub, "550e8400-e29b-41d4-a716-446655440000");
        assert_eq!(claims.role, "landlord");
    }

    #[test]
    fn rejects_wrong_secret() {
        let token = token_for("550e8400-e29b-41d4-a716-446655440000", "landlord", "s3cret");
        assert!(matches!(
            decode_claims(&token, "other"),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn extracts_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer tok-123"));
        assert_eq!(bearer_token(&headers), Some("tok-123"));

        let mut lowercase = HeaderMap::new();
        lowercase.insert("authorization", HeaderValue::from_static("bearer tok-456"));
        assert_eq!(bearer_token(&lowercase), Some("tok-456"));

        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn rejects_disallowed_role() {
        let state = test_state(Some("s3cret"), false);
        let token = token_for("550e8400-e29b-41d4-a716-446655440000", "tenant", "s3cret");
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {token}")).expect("header"),
        );
        assert!(matches!(
            require_landlord(&state, &headers),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn accepts_admin_role_and_dev_override() {
        let state = test_state(Some("s3cret"), false);
        let token = token_for("550e8400-e29b-41d4-a716-446655440000", "admin", "s3cret");
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {token}")).expect("header"),
        );
        assert!(require_landlord(&state, &headers).is_ok());

        let dev_state = test_state(None, true);
        let mut dev_headers = HeaderMap::new();
        dev_headers.insert(
            "x-user-id",
            HeaderValue::from_static("550e8400-e29b-41d4-a716-446655440000"),
        );
        assert!(require_landlord(&dev_state, &dev_headers).is_ok());
    }
}
