//! Opaque request-scoped context.
//!
//! The gate and the operation surface take a [`RequestContext`] instead of
//! reaching into any global log state; the transport collaborator creates
//! one per inbound request and every log line emitted on its behalf
//! carries the same `request_id`.

use rand::RngExt;

/// Identity of one inbound request, for log correlation only.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: String,
}

impl RequestContext {
    /// Create a context with a fresh random request id.
    pub fn new() -> Self {
        let mut rng = rand::rng();
        let bytes: [u8; 8] = rng.random();
        Self {
            request_id: hex(&bytes),
        }
    }

    /// Create a context with a caller-supplied id (e.g. propagated from an
    /// upstream transport header).
    pub fn with_id(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_ids_differ() {
        let a = RequestContext::new();
        let b = RequestContext::new();
        assert_ne!(a.request_id(), b.request_id());
    }

    #[test]
    fn fresh_id_is_hex() {
        let ctx = RequestContext::new();
        assert_eq!(ctx.request_id().len(), 16);
        assert!(ctx.request_id().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn with_id_preserves_caller_id() {
        let ctx = RequestContext::with_id("req-42");
        assert_eq!(ctx.request_id(), "req-42");
    }
}
