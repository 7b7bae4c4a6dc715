//! Scripted verifier for tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use crate::context::RequestContext;

use super::{TokenVerifier, Verdict};

/// What one scripted call should produce.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    Valid { subject: String },
    Invalid,
    /// Simulates an unreachable authority: `verify` returns `Err`.
    Unreachable,
}

/// A verifier that answers from a fixed script, in order, repeating the
/// last entry once the script runs out. Counts calls so tests can assert
/// that rejected requests never reached verification (or that they did).
pub struct MockVerifier {
    script: Vec<MockOutcome>,
    calls: AtomicUsize,
}

impl MockVerifier {
    pub fn new(script: Vec<MockOutcome>) -> Self {
        assert!(!script.is_empty(), "MockVerifier needs at least one outcome");
        Self {
            script,
            calls: AtomicUsize::new(0),
        }
    }

    /// A verifier that accepts everything as the given subject.
    pub fn always_valid(subject: &str) -> Self {
        Self::new(vec![MockOutcome::Valid {
            subject: subject.to_string(),
        }])
    }

    /// A verifier that rejects everything.
    pub fn always_invalid() -> Self {
        Self::new(vec![MockOutcome::Invalid])
    }

    /// A verifier whose authority is always down.
    pub fn always_unreachable() -> Self {
        Self::new(vec![MockOutcome::Unreachable])
    }

    /// How many times `verify` has been called.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenVerifier for MockVerifier {
    async fn verify(&self, _ctx: &RequestContext, _token: &str) -> Result<Verdict> {
        let i = self.calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self.script.get(i).unwrap_or_else(|| {
            self.script.last().expect("script is non-empty")
        });
        match outcome {
            MockOutcome::Valid { subject } => Ok(Verdict::Valid {
                subject: subject.clone(),
            }),
            MockOutcome::Invalid => Ok(Verdict::Invalid),
            MockOutcome::Unreachable => Err(anyhow!("scripted: authority unreachable")),
        }
    }
}
