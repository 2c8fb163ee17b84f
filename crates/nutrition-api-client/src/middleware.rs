//! Request/response interception for [`crate::ApiClient`].

use crate::{CredentialProvider, UnauthorizedHandler};
use std::sync::Arc;
use tracing::{debug, warn};

/// Attaches `Authorization: Bearer <token>` from a [`CredentialProvider`].
///
/// Requests that already carry an `Authorization` header are sent as-is;
/// the OAuth bootstrap calls set their own credential that way.
#[derive(Clone)]
pub struct BearerAuthMiddleware {
    credentials: Arc<dyn CredentialProvider>,
}

impl BearerAuthMiddleware {
    pub fn new(credentials: Arc<dyn CredentialProvider>) -> Self {
        Self { credentials }
    }
}

#[async_trait::async_trait]
impl reqwest_middleware::Middleware for BearerAuthMiddleware {
    async fn handle(
        &self,
        mut req: reqwest::Request,
        ext: &mut http::Extensions,
        next: reqwest_middleware::Next<'_>,
    ) -> reqwest_middleware::Result<reqwest::Response> {
        if !req.headers().contains_key(http::header::AUTHORIZATION) {
            match self.credentials.bearer_token() {
                Some(token) => match format!("Bearer {}", token).parse() {
                    Ok(value) => {
                        req.headers_mut().insert(http::header::AUTHORIZATION, value);
                        debug!(url = %req.url(), "Attached stored bearer token");
                    }
                    Err(e) => warn!("Failed to parse auth token for header: {e}"),
                },
                None => debug!(url = %req.url(), "No stored token, sending unauthenticated"),
            }
        }

        next.run(req, ext).await
    }
}

/// Reports every HTTP 401 to an [`UnauthorizedHandler`].
#[derive(Clone)]
pub struct UnauthorizedMiddleware {
    handler: Arc<dyn UnauthorizedHandler>,
}

impl UnauthorizedMiddleware {
    pub fn new(handler: Arc<dyn UnauthorizedHandler>) -> Self {
        Self { handler }
    }
}

#[async_trait::async_trait]
impl reqwest_middleware::Middleware for UnauthorizedMiddleware {
    async fn handle(
        &self,
        req: reqwest::Request,
        ext: &mut http::Extensions,
        next: reqwest_middleware::Next<'_>,
    ) -> reqwest_middleware::Result<reqwest::Response> {
        let url = req.url().clone();
        let response = next.run(req, ext).await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            warn!(url = %url, "Unauthorized response, forcing re-authentication");
            self.handler.on_unauthorized();
        }

        Ok(response)
    }
}
