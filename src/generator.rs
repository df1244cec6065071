//! Produces random string values for codes, access tokens and refresh tokens.
//!
//! The generated value carries no recoverable information; validity lives
//! entirely in the persistence collaborator. Guessing must stay infeasible,
//! hence values default to 32 random bytes (256 bits of entropy).
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use ring::rand::{SecureRandom, SystemRandom};

use crate::error::{ErrorKind, OAuthError};

/// Generates token values from random bytes.
pub struct RandomGenerator {
    random: SystemRandom,
    len: usize,
}

impl RandomGenerator {
    /// Generates values with a specific byte length.
    pub fn new(length: usize) -> RandomGenerator {
        RandomGenerator {
            random: SystemRandom::new(),
            len: length,
        }
    }

    /// Produce one fresh value, base64url encoded.
    pub fn generate(&self) -> Result<String, OAuthError> {
        let mut result = vec![0; self.len];
        self.random
            .fill(result.as_mut_slice())
            .map_err(|_| OAuthError::new(ErrorKind::ServerError, "failed to generate random token"))?;
        Ok(URL_SAFE_NO_PAD.encode(&result))
    }
}

impl Default for RandomGenerator {
    fn default() -> Self {
        RandomGenerator::new(32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_are_unique_and_sized() {
        let generator = RandomGenerator::default();
        let one = generator.generate().unwrap();
        let two = generator.generate().unwrap();
        assert_ne!(one, two);
        // 32 bytes in unpadded base64.
        assert_eq!(one.len(), 43);
    }

    #[test]
    #[allow(dead_code, unused)]
    fn assert_send_sync_static() {
        fn uses<T: Send + Sync + 'static>(arg: T) {}
        let _ = uses(RandomGenerator::new(16));
    }
}
