use crate::{digest::hash_digest, Error, Hasher, SaltGenerator};

/// Creates `count` decoy digests.
///
/// A decoy is the digest of a fresh salt, so it has the same shape as the
/// digest of a real disclosure.
pub async fn create_decoys(
    count: usize,
    salt_generator: &dyn SaltGenerator,
    hasher: &dyn Hasher,
) -> Result<Vec<String>, Error> {
    let mut decoys = Vec::with_capacity(count);
    for _ in 0..count {
        let salt = salt_generator
            .generate()
            .await
            .map_err(Error::SaltGenerator)?;
        decoys.push(hash_digest(hasher, &salt).await?);
    }

    log::trace!("created {count} decoy digests");
    Ok(decoys)
}
