//! Configured-table verification: a fixed token→subject map, loaded from
//! configuration at startup. Stands in for a real credential store in
//! demos and tests; nothing here is hardcoded into the access path.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;

use crate::context::RequestContext;

use super::{TokenVerifier, Verdict};

/// One configured principal: the credentials that log in, and the token
/// issued for them.
#[derive(Debug, Clone)]
pub struct StaticCredential {
    pub username: String,
    pub password: String,
    pub token: String,
    pub subject: String,
}

/// Verifier backed by a configured token table.
pub struct StaticVerifier {
    tokens: HashMap<String, String>,
    credentials: Vec<StaticCredential>,
}

impl StaticVerifier {
    /// Build from `token -> subject` pairs.
    pub fn new(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            tokens: pairs.into_iter().collect(),
            credentials: Vec::new(),
        }
    }

    /// Build from full credential records; each contributes its token to
    /// the verification table and its username/password to the login table.
    pub fn with_credentials(credentials: Vec<StaticCredential>) -> Self {
        let tokens = credentials
            .iter()
            .map(|c| (c.token.clone(), c.subject.clone()))
            .collect();
        Self {
            tokens,
            credentials,
        }
    }

    /// Exchange a username/password pair for the configured token.
    /// Returns `None` when no credential matches.
    pub fn login(&self, username: &str, password: &str) -> Option<&str> {
        self.credentials
            .iter()
            .find(|c| c.username == username && c.password == password)
            .map(|c| c.token.as_str())
    }
}

#[async_trait]
impl TokenVerifier for StaticVerifier {
    async fn verify(&self, _ctx: &RequestContext, token: &str) -> Result<Verdict> {
        match self.tokens.get(token) {
            Some(subject) => Ok(Verdict::Valid {
                subject: subject.clone(),
            }),
            None => Ok(Verdict::Invalid),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_verifier() -> StaticVerifier {
        StaticVerifier::with_credentials(vec![StaticCredential {
            username: "student".to_string(),
            password: "student".to_string(),
            token: "demo-token".to_string(),
            subject: "student".to_string(),
        }])
    }

    #[tokio::test]
    async fn known_token_is_valid_with_subject() {
        let verifier = demo_verifier();
        let verdict = verifier
            .verify(&RequestContext::new(), "demo-token")
            .await
            .unwrap();
        assert_eq!(
            verdict,
            Verdict::Valid {
                subject: "student".to_string()
            }
        );
    }

    #[tokio::test]
    async fn unknown_token_is_invalid_not_error() {
        let verifier = demo_verifier();
        let verdict = verifier
            .verify(&RequestContext::new(), "wrong")
            .await
            .unwrap();
        assert_eq!(verdict, Verdict::Invalid);
    }

    #[tokio::test]
    async fn empty_token_is_passed_through() {
        let verifier = demo_verifier();
        let verdict = verifier.verify(&RequestContext::new(), "").await.unwrap();
        assert_eq!(verdict, Verdict::Invalid);
    }

    #[test]
    fn login_issues_configured_token() {
        let verifier = demo_verifier();
        assert_eq!(verifier.login("student", "student"), Some("demo-token"));
    }

    #[test]
    fn login_rejects_bad_password() {
        let verifier = demo_verifier();
        assert_eq!(verifier.login("student", "nope"), None);
    }

    #[test]
    fn token_only_table_has_no_logins() {
        let verifier = StaticVerifier::new([("t".to_string(), "s".to_string())]);
        assert_eq!(verifier.login("anyone", "anything"), None);
    }
}
