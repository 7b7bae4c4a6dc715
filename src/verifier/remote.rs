//! Delegated verification against a remote auth authority.
//!
//! One HTTP call per token: `GET {base}/verify` with the token replayed as
//! a bearer header. The authority answers `{valid, subject}` on both its
//! accept (200) and reject (401) paths; anything else (connection failure,
//! unexpected status, unparseable body) is a transport error and surfaces
//! as `Err`, never as `Verdict::Invalid`.

use anyhow::{Context as _, Result, bail};
use async_trait::async_trait;
use serde::Deserialize;

use crate::consts::BEARER_SCHEME;
use crate::context::RequestContext;

use super::{TokenVerifier, Verdict};

/// Verifier that delegates to a remote authority over HTTP.
pub struct RemoteVerifier {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    valid: bool,
    #[serde(default)]
    subject: String,
}

impl RemoteVerifier {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn to_verdict(resp: VerifyResponse) -> Result<Verdict> {
        if !resp.valid {
            return Ok(Verdict::Invalid);
        }
        if resp.subject.is_empty() {
            // A valid verdict must name a subject; an empty one means the
            // authority's response is malformed.
            bail!("authority returned valid=true with empty subject");
        }
        Ok(Verdict::Valid {
            subject: resp.subject,
        })
    }
}

#[async_trait]
impl TokenVerifier for RemoteVerifier {
    async fn verify(&self, ctx: &RequestContext, token: &str) -> Result<Verdict> {
        let url = format!("{}/verify", self.base_url);
        let resp = self
            .client
            .get(&url)
            .header("authorization", format!("{BEARER_SCHEME} {token}"))
            .send()
            .await
            .context("auth authority unreachable")?;

        let status = resp.status();
        // 401 is the authority's reject path and still carries a verdict
        // body. Any other non-2xx status is a failed call.
        if !status.is_success() && status.as_u16() != 401 {
            bail!("auth authority returned unexpected status {status}");
        }

        let body: VerifyResponse = resp
            .json()
            .await
            .context("malformed response from auth authority")?;

        tracing::debug!(
            request_id = ctx.request_id(),
            valid = body.valid,
            "token verification round trip"
        );

        Self::to_verdict(body)
    }
}
