use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use tracing::error;

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Password hashing plus login-time verification that costs the same whether
/// or not the account exists.
pub struct PasswordService {
    dummy_hash: String,
}

impl PasswordService {
    /// Hashes a throwaway secret with the production parameters so that the
    /// unknown-account path runs a full Argon2 verification.
    pub fn new() -> anyhow::Result<Self> {
        let throwaway: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        Ok(Self {
            dummy_hash: hash_password(&throwaway)?,
        })
    }

    pub fn hash(&self, plain: &str) -> anyhow::Result<String> {
        hash_password(plain)
    }

    /// Runs exactly one Argon2 verification. With no stored hash the dummy
    /// hash is checked and the result discarded.
    pub fn verify_or_dummy(&self, plain: &str, stored: Option<&str>) -> bool {
        match stored {
            Some(hash) => verify_password(plain, hash).unwrap_or_else(|e| {
                error!(error = %e, "stored password hash unreadable");
                false
            }),
            None => {
                let _ = verify_password(plain, &self.dummy_hash);
                false
            }
        }
    }
}
