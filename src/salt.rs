use async_trait::async_trait;

use crate::CallbackError;

/// Source of disclosure salts.
///
/// Every call must return a fresh, unpredictable salt.
#[async_trait]
pub trait SaltGenerator: Send + Sync {
    /// Generates a new salt.
    async fn generate(&self) -> Result<String, CallbackError>;
}

/// Default salt size, in bytes.
#[cfg(feature = "rand")]
pub const DEFAULT_SALT_SIZE: usize = 16;

/// Generates a 128 bit salt encoded as url-safe base64 without padding.
#[cfg(feature = "rand")]
pub fn generate_salt(rng: &mut (impl rand::CryptoRng + rand::RngCore)) -> String {
    let mut salt_bytes = [0u8; DEFAULT_SALT_SIZE];
    rng.fill_bytes(&mut salt_bytes);
    crate::utils::base64_encode(salt_bytes)
}

/// Salt generator drawing from the operating system's random number
/// generator.
#[cfg(feature = "rand")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomSalt {
    size: usize,
}

#[cfg(feature = "rand")]
impl RandomSalt {
    /// Creates a generator producing salts of `size` random bytes.
    pub fn with_size(size: usize) -> Self {
        Self { size }
    }

    /// Number of random bytes per salt.
    pub fn size(&self) -> usize {
        self.size
    }
}

#[cfg(feature = "rand")]
impl Default for RandomSalt {
    fn default() -> Self {
        Self::with_size(DEFAULT_SALT_SIZE)
    }
}

#[cfg(feature = "rand")]
#[async_trait]
impl SaltGenerator for RandomSalt {
    async fn generate(&self) -> Result<String, CallbackError> {
        use rand::RngCore;
        let mut salt_bytes = vec![0u8; self.size];
        rand::rngs::OsRng.fill_bytes(&mut salt_bytes);
        Ok(crate::utils::base64_encode(salt_bytes))
    }
}
