use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use serde::Deserialize;

use crate::auth::jwt;
use crate::config::Config;
use crate::db::accounts::{Account, AccountStore};
use crate::error::AppError;

/// Authenticated user. Guards every board and analysis route.
///
/// The token comes from `Authorization: Bearer ...`, or from a `token`
/// query parameter for WebSocket upgrades where browsers cannot set headers.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Account);

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

fn query_token(parts: &Parts) -> Option<String> {
    let Query(query) = Query::<TokenQuery>::try_from_uri(&parts.uri).ok()?;
    query.token.filter(|t| !t.is_empty())
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let store = parts
            .extensions
            .get::<AccountStore>()
            .ok_or(AppError::Internal("Missing account store".into()))?
            .clone();

        let config = parts
            .extensions
            .get::<Config>()
            .ok_or(AppError::Internal("Missing config".into()))?
            .clone();

        let header_token = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer ").or_else(|| h.strip_prefix("bearer ")))
            .map(str::to_string);

        let token = header_token
            .or_else(|| query_token(parts))
            .ok_or(AppError::Unauthorized)?;

        let claims = jwt::verify_token(&token, &config.jwt_secret)
            .ok_or(AppError::Unauthorized)?;

        let account = store
            .get_account_by_id(claims.user_id)
            .ok_or(AppError::Unauthorized)?;

        Ok(AuthUser(account))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(uri: &str) -> Parts {
        Request::builder().uri(uri).body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_query_token() {
        assert_eq!(
            query_token(&parts("/api/board/ws?view=analysis&token=abc.def")).as_deref(),
            Some("abc.def")
        );
        assert_eq!(
            query_token(&parts("/api/board/ws?token=a%2Eb%20c")).as_deref(),
            Some("a.b c")
        );
        assert_eq!(query_token(&parts("/api/board/ws?token=")), None);
        assert_eq!(query_token(&parts("/api/board/ws?view=dashboard")), None);
        assert_eq!(query_token(&parts("/api/board/ws")), None);
    }
}
