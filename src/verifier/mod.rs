pub mod mock;
pub mod remote;
pub mod static_table;

use anyhow::Result;
use async_trait::async_trait;

use crate::context::RequestContext;

/// What the authority said about a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The token is good and resolves to this subject.
    Valid { subject: String },
    /// The authority recognized and rejected the token.
    Invalid,
}

/// The credential-verification capability. Could be a configured table,
/// a remote authority, or a test script.
///
/// The three-way outcome contract: `Ok(Valid)` / `Ok(Invalid)` are answers
/// from the authority; `Err` means the verification call itself failed to
/// complete (authority unreachable, malformed transport response). Callers
/// must keep those apart: "bad token" and "authority down" are different
/// rejections. No retries happen at this layer.
///
/// Empty tokens are passed through like any other; the verifier does not
/// short-circuit on shape.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, ctx: &RequestContext, token: &str) -> Result<Verdict>;
}
