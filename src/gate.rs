//! The Access Gate: decides, for each inbound request, whether the caller
//! may proceed, by extracting the bearer token and delegating validation
//! to the configured [`TokenVerifier`].
//!
//! No token is cached; every request re-verifies.

use std::sync::Arc;

use crate::context::RequestContext;
use crate::consts::BEARER_SCHEME;
use crate::error::{Error, Result};
use crate::verifier::{TokenVerifier, Verdict};

/// The authenticated caller attached to a passed request. The subject is
/// carried for downstream use even though the operation surface does not
/// yet scope tasks by it.
#[derive(Debug, Clone)]
pub struct Caller {
    pub subject: String,
}

pub struct AccessGate {
    verifier: Arc<dyn TokenVerifier>,
}

impl AccessGate {
    pub fn new(verifier: Arc<dyn TokenVerifier>) -> Self {
        Self { verifier }
    }

    /// Check one request's `Authorization` header value.
    ///
    /// Header parsing is a strict two-token split on a single space:
    /// exactly `Bearer <token>`. Extra segments, a missing scheme, or a
    /// different scheme keyword are all rejected rather than leniently
    /// parsed. An empty token after the scheme is still forwarded to the
    /// verifier.
    pub async fn check(
        &self,
        ctx: &RequestContext,
        authorization: Option<&str>,
    ) -> Result<Caller> {
        let header = match authorization {
            Some(h) => h,
            None => {
                tracing::warn!(request_id = ctx.request_id(), "missing authorization header");
                return Err(Error::Unauthenticated(
                    "missing authorization header".to_string(),
                ));
            }
        };

        let parts: Vec<&str> = header.split(' ').collect();
        if parts.len() != 2 || parts[0] != BEARER_SCHEME {
            tracing::warn!(
                request_id = ctx.request_id(),
                "invalid authorization header format"
            );
            return Err(Error::Unauthenticated(
                "invalid authorization header format".to_string(),
            ));
        }
        let token = parts[1];

        match self.verifier.verify(ctx, token).await {
            Err(err) => {
                tracing::error!(
                    request_id = ctx.request_id(),
                    error = %err,
                    "authentication service unavailable"
                );
                Err(Error::Unavailable(err.to_string()))
            }
            Ok(Verdict::Invalid) => {
                tracing::warn!(
                    request_id = ctx.request_id(),
                    token_present = !token.is_empty(),
                    "invalid token"
                );
                Err(Error::Unauthenticated("invalid token".to_string()))
            }
            Ok(Verdict::Valid { subject }) => {
                tracing::debug!(
                    request_id = ctx.request_id(),
                    subject = %subject,
                    "token verified"
                );
                Ok(Caller { subject })
            }
        }
    }
}
