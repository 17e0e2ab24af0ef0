use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("password hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// bcrypt with a configured work factor.
///
/// Hashing is CPU bound, so the async variants move it to the blocking pool.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn hash(&self, plain: &str) -> Result<String, PasswordError> {
        Ok(bcrypt::hash(plain, self.cost)?)
    }

    /// Returns false for a wrong password or an unreadable stored hash.
    pub fn verify(&self, plain: &str, hash: &str) -> bool {
        match bcrypt::verify(plain, hash) {
            Ok(matches) => matches,
            Err(e) => {
                warn!(error = %e, "stored password hash could not be verified");
                false
            }
        }
    }

    pub async fn hash_async(&self, plain: String) -> Result<String, PasswordError> {
        let hasher = *self;
        tokio::task::spawn_blocking(move || hasher.hash(&plain)).await?
    }

    pub async fn verify_async(&self, plain: String, hash: String) -> Result<bool, PasswordError> {
        let hasher = *self;
        Ok(tokio::task::spawn_blocking(move || hasher.verify(&plain, &hash)).await?)
    }
}
