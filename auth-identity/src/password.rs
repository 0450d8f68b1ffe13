use crate::error::{IdentityError, Result};
use crate::models::PasswordHash;

/// bcrypt wrapper that keeps the CPU-bound work off the async runtime
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub async fn hash(&self, plaintext: &str) -> Result<PasswordHash> {
        let cost = self.cost;
        let plaintext = plaintext.to_owned();

        let digest = tokio::task::spawn_blocking(move || bcrypt::hash(plaintext, cost))
            .await
            .map_err(|e| IdentityError::Hashing(e.to_string()))?
            .map_err(|e| IdentityError::Hashing(e.to_string()))?;

        Ok(PasswordHash::from_digest(digest))
    }

    pub async fn verify(&self, plaintext: &str, hash: &PasswordHash) -> Result<bool> {
        let plaintext = plaintext.to_owned();
        let digest = hash.as_str().to_owned();

        tokio::task::spawn_blocking(move || bcrypt::verify(plaintext, &digest))
            .await
            .map_err(|e| IdentityError::Hashing(e.to_string()))?
            .map_err(|e| IdentityError::Hashing(e.to_string()))
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}
