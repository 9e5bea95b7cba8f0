//! The authentication boundary
//!
//! Token verification itself lives outside this layer. The router only
//! needs a verified [`Principal`] (or none) per request, produced by an
//! [`AuthProvider`] implementation, and consults it solely to gate access —
//! the core pipeline never reads it except through pre-filter hooks.

use crate::core::error::RestResult;
use async_trait::async_trait;
use axum::http::HeaderMap;

/// A verified caller identity
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: i64,
    pub roles: Vec<String>,
}

impl Principal {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Produces the verified principal for a request, or rejects it
///
/// Implementations typically verify a JWT from the `Authorization` header.
/// Returning `Ok(None)` admits the request anonymously; returning
/// `Err(RestError::Unauthorized(..))` rejects it.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn authenticate(&self, headers: &HeaderMap) -> RestResult<Option<Principal>>;
}

/// Provider that admits every request anonymously
///
/// The default for development and tests.
pub struct NoAuth;

#[async_trait]
impl AuthProvider for NoAuth {
    async fn authenticate(&self, _headers: &HeaderMap) -> RestResult<Option<Principal>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_auth_admits_anonymously() {
        let provider = NoAuth;
        let principal = provider.authenticate(&HeaderMap::new()).await.unwrap();
        assert!(principal.is_none());
    }

    #[test]
    fn test_principal_roles() {
        let principal = Principal {
            id: 1,
            roles: vec!["admin".to_string()],
        };
        assert!(principal.has_role("admin"));
        assert!(!principal.has_role("editor"));
    }
}
