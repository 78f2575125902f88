//! JWT identity middleware.
//!
//! Extracts `Authorization: Bearer <token>`, validates it against the
//! identity provider's shared secret, and injects a
//! [`cookery_core::Identity`] into request extensions. Requests without
//! a token pass through as anonymous — the recipe engine decides per
//! operation whether anonymous callers are acceptable (view recording
//! and published-recipe reads are; everything else returns 401 itself).

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use jsonwebtoken::{DecodingKey, Validation};
use serde::Deserialize;

use cookery_core::{Identity, Role};

/// JWT claims payload, as issued by the external identity provider.
#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    /// Subject: user id.
    pub sub: String,
    /// Role name: "admin" or "user".
    #[serde(default)]
    pub role: Option<String>,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiration (unix timestamp).
    pub exp: i64,
}

impl Claims {
    fn identity(&self) -> Identity {
        let role = match self.role.as_deref() {
            Some("admin") => Role::Admin,
            _ => Role::User,
        };
        Identity::User {
            id: self.sub.clone(),
            role,
        }
    }
}

/// Shared JWT configuration for the middleware.
#[derive(Clone)]
pub struct JwtState {
    pub decoding_key: DecodingKey,
    pub validation: Validation,
}

/// A presented-but-invalid token. Unlike a missing token (anonymous),
/// this is rejected outright so callers notice expired credentials.
#[derive(Debug)]
pub struct InvalidToken(String);

impl IntoResponse for InvalidToken {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": "UNAUTHENTICATED",
            "message": format!("invalid token: {}", self.0),
        });
        (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
    }
}

/// Middleware that resolves the caller's identity for every request.
pub async fn identity_middleware(
    State(jwt_state): State<Arc<JwtState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, InvalidToken> {
    let token = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let identity = match token {
        None => Identity::Anonymous,
        Some(token) => {
            let data = jsonwebtoken::decode::<Claims>(
                token,
                &jwt_state.decoding_key,
                &jwt_state.validation,
            )
            .map_err(|e| InvalidToken(e.to_string()))?;
            data.claims.identity()
        }
    };

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    #[test]
    fn claims_map_to_identity() {
        let admin = Claims {
            sub: "a1".into(),
            role: Some("admin".into()),
            iat: 0,
            exp: 0,
        };
        assert!(admin.identity().is_admin());

        let user = Claims {
            sub: "u1".into(),
            role: None,
            iat: 0,
            exp: 0,
        };
        assert_eq!(user.identity().user_id(), Some("u1"));
        assert!(!user.identity().is_admin());
    }

    #[test]
    fn token_roundtrip() {
        let secret = b"0123456789abcdef0123456789abcdef";
        let now = chrono_now();
        let claims = serde_json::json!({
            "sub": "u1",
            "role": "user",
            "iat": now,
            "exp": now + 3600,
        });
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap();

        let decoded = jsonwebtoken::decode::<Claims>(
            &token,
            &DecodingKey::from_secret(secret),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(decoded.claims.sub, "u1");
    }

    fn chrono_now() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64
    }
}
