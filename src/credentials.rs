//! Update/delete secrets handed out on publish.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use tokio::task;
use tracing::{error, warn};

use crate::error::PublishError;

const SECRET_BYTES: usize = 32;

/// Returns a fresh URL-safe secret and its Argon2 hash.
///
/// Hashing runs on the blocking pool.
pub async fn generate_post_creds() -> Result<(String, String), PublishError> {
    let mut raw = [0u8; SECRET_BYTES];
    rand::thread_rng().fill_bytes(&mut raw);
    let secret = URL_SAFE_NO_PAD.encode(raw);

    let hash_input = secret.clone();
    let secret_hash = task::spawn_blocking(move || hash_secret(&hash_input))
        .await
        .map_err(|e| PublishError::Credentials(e.to_string()))??;
    Ok((secret, secret_hash))
}

fn hash_secret(secret: &str) -> Result<String, PublishError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PublishError::Credentials(e.to_string()))
}

/// `false` for a wrong secret or a hash that cannot be parsed.
pub async fn verify_secret(secret: &str, secret_hash: &str) -> bool {
    let secret = secret.to_string();
    let secret_hash = secret_hash.to_string();
    match task::spawn_blocking(move || check_secret(&secret, &secret_hash)).await {
        Ok(valid) => valid,
        Err(e) => {
            error!("Secret verification task failed: {}", e);
            false
        }
    }
}

fn check_secret(secret: &str, secret_hash: &str) -> bool {
    let parsed = match PasswordHash::new(secret_hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Stored secret hash is malformed: {}", e);
            return false;
        }
    };
    Argon2::default()
        .verify_password(secret.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::test;

    #[test]
    async fn test_generated_secret_verifies() {
        let (secret, secret_hash) = generate_post_creds().await.unwrap();
        assert_eq!(secret.len(), 43);
        assert!(secret_hash.starts_with("$argon2"));
        assert!(verify_secret(&secret, &secret_hash).await);
        assert!(!verify_secret("incorrect", &secret_hash).await);
    }

    #[test]
    async fn test_secrets_are_unique() {
        let (a, hash_a) = generate_post_creds().await.unwrap();
        let (b, hash_b) = generate_post_creds().await.unwrap();
        assert_ne!(a, b);
        assert_ne!(hash_a, hash_b);
    }

    #[test]
    async fn test_malformed_hash() {
        assert!(!verify_secret("secret", "not-a-hash").await);
        assert!(!verify_secret("secret", "").await);
    }

    // 单线程运行时: 哈希期间其他任务仍然可以推进
    #[test]
    async fn test_hashing_leaves_runtime_free() {
        let secret_hash = hash_secret("secret").unwrap();
        let verify = verify_secret("secret", &secret_hash);
        tokio::pin!(verify);

        let mut ticks = 0;
        let valid = loop {
            tokio::select! {
                valid = &mut verify => break valid,
                _ = tokio::time::sleep(Duration::from_millis(1)) => ticks += 1,
            }
        };
        assert!(valid);
        assert!(ticks > 0);
    }
}
