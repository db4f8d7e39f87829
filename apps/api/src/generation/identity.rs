//! Identity Resolver: guarantees every classifier-authored profile gets an
//! email no existing candidate, and no earlier profile of the same batch, owns.

use std::collections::HashSet;

use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{debug, info};

use crate::classifier::CandidateProfile;
use crate::errors::AppError;
use crate::store::CandidateStore;

pub const TOKEN_LEN: usize = 5;

/// With a 36^5 token space this is never expected to run out.
pub const MAX_RESOLUTION_ATTEMPTS: u32 = 8;

/// Supplies disambiguation tokens. Injectable so collisions are testable.
/// `Sync` because the resolver is borrowed across store awaits inside handlers.
pub trait TokenSource: Send + Sync {
    fn next_token(&mut self) -> String;
}

/// Lowercase alphanumeric tokens from the thread RNG.
pub struct RandomTokens;

impl TokenSource for RandomTokens {
    fn next_token(&mut self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LEN)
            .map(|b| char::from(b).to_ascii_lowercase())
            .collect()
    }
}

/// One resolver per batch: it remembers every address it handed out.
pub struct IdentityResolver<'a> {
    store: &'a dyn CandidateStore,
    assigned: HashSet<String>,
    tokens: Box<dyn TokenSource + 'a>,
    max_attempts: u32,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(store: &'a dyn CandidateStore) -> Self {
        Self::with_tokens(store, Box::new(RandomTokens))
    }

    pub fn with_tokens(store: &'a dyn CandidateStore, tokens: Box<dyn TokenSource + 'a>) -> Self {
        Self {
            store,
            assigned: HashSet::new(),
            tokens,
            max_attempts: MAX_RESOLUTION_ATTEMPTS,
        }
    }

    async fn is_taken(&self, email: &str) -> Result<bool, AppError> {
        if self.assigned.contains(&email.to_lowercase()) {
            return Ok(true);
        }
        Ok(self.store.find_by_email(email).await?.is_some())
    }

    /// Returns the profile unchanged when its email is free, otherwise with
    /// `local+token@domain` substituted.
    pub async fn resolve(&mut self, profile: CandidateProfile) -> Result<CandidateProfile, AppError> {
        let original = profile.email.clone();
        let (local, domain) = original
            .rsplit_once('@')
            .filter(|(l, d)| !l.is_empty() && !d.is_empty())
            .ok_or_else(|| {
                AppError::Classifier(format!("Profile email '{original}' is not an address"))
            })?;

        let mut email = original.clone();
        for attempt in 0..=self.max_attempts {
            if !self.is_taken(&email).await? {
                if email != original {
                    info!(original = %original, resolved = %email, "Disambiguated colliding email");
                }
                self.assigned.insert(email.to_lowercase());
                return Ok(CandidateProfile { email, ..profile });
            }
            if attempt == self.max_attempts {
                break;
            }
            email = format!("{local}+{}@{domain}", self.tokens.next_token());
            debug!(attempt, candidate = %email, "Email taken, trying disambiguated address");
        }

        Err(AppError::IdentityCollisionExhausted {
            email: original,
            attempts: self.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::scripted::profile;
    use crate::store::memory::MemoryStore;

    struct FixedTokens(Vec<&'static str>);

    impl TokenSource for FixedTokens {
        fn next_token(&mut self) -> String {
            if self.0.len() > 1 {
                self.0.remove(0).to_string()
            } else {
                self.0[0].to_string()
            }
        }
    }

    #[tokio::test]
    async fn test_free_email_is_unchanged() {
        let store = MemoryStore::new();
        let mut resolver = IdentityResolver::new(&store);
        let resolved = resolver
            .resolve(profile("Dana", "Levi", "dana@example.com", &["Go"]))
            .await
            .unwrap();
        assert_eq!(resolved.email, "dana@example.com");
        assert_eq!(resolved.first_name, "Dana");
    }

    #[tokio::test]
    async fn test_store_collision_keeps_local_part_prefix() {
        let store = MemoryStore::new();
        store.seed("Dana", "Levi", "Dana@Example.com", &[]).await;

        let mut resolver = IdentityResolver::new(&store);
        let resolved = resolver
            .resolve(profile("Dana", "Levi", "dana@example.com", &["Go"]))
            .await
            .unwrap();

        assert_ne!(resolved.email.to_lowercase(), "dana@example.com");
        assert!(resolved.email.starts_with("dana+"), "{}", resolved.email);
        assert!(resolved.email.ends_with("@example.com"), "{}", resolved.email);
        let token = &resolved.email["dana+".len()..resolved.email.len() - "@example.com".len()];
        assert_eq!(token.len(), TOKEN_LEN);
        assert!(token.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn test_same_batch_duplicates_resolve_distinctly() {
        let store = MemoryStore::new();
        let mut resolver = IdentityResolver::new(&store);

        let first = resolver
            .resolve(profile("A", "One", "a@x.com", &[]))
            .await
            .unwrap();
        let second = resolver
            .resolve(profile("A", "Two", "A@x.com", &[]))
            .await
            .unwrap();

        assert_eq!(first.email, "a@x.com");
        assert_ne!(first.email.to_lowercase(), second.email.to_lowercase());
        assert!(second.email.starts_with("A+"));
    }

    #[tokio::test]
    async fn test_repeated_token_collision_tries_again() {
        let store = MemoryStore::new();
        store.seed("B", "One", "b@x.com", &[]).await;
        store.seed("B", "Two", "b+aaaaa@x.com", &[]).await;

        let tokens = FixedTokens(vec!["aaaaa", "bbbbb"]);
        let mut resolver = IdentityResolver::with_tokens(&store, Box::new(tokens));
        let resolved = resolver.resolve(profile("B", "Three", "b@x.com", &[])).await.unwrap();
        assert_eq!(resolved.email, "b+bbbbb@x.com");
    }

    #[tokio::test]
    async fn test_constant_token_exhausts() {
        let store = MemoryStore::new();
        store.seed("C", "One", "c@x.com", &[]).await;
        store.seed("C", "Two", "c+zzzzz@x.com", &[]).await;

        let mut resolver = IdentityResolver::with_tokens(&store, Box::new(FixedTokens(vec!["zzzzz"])));
        let result = resolver.resolve(profile("C", "Three", "c@x.com", &[])).await;

        match result {
            Err(AppError::IdentityCollisionExhausted { email, attempts }) => {
                assert_eq!(email, "c@x.com");
                assert_eq!(attempts, MAX_RESOLUTION_ATTEMPTS);
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_email_is_a_classifier_error() {
        let store = MemoryStore::new();
        let mut resolver = IdentityResolver::new(&store);
        let result = resolver.resolve(profile("D", "E", "not-an-email", &[])).await;
        assert!(matches!(result, Err(AppError::Classifier(_))));
    }
}
