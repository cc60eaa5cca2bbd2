use anyhow::anyhow;
use serde::{de::DeserializeOwned, Serialize};

/// Trait for digesting an object which stores the digest in itself
pub trait DigestInSelf {
    fn digest(&mut self);
    fn verify_digest(&mut self) -> bool;
}

/// Serialization helpers for objects which store their own digest.
///
/// The digest is refreshed before encoding and verified after decoding, so
/// a record that round-trips through the block store is known intact.
pub trait SerializeAndDigest: Serialize + DeserializeOwned + DigestInSelf {
    /// serialize into a [Vec], refreshing the digest first
    fn serialize(&mut self) -> anyhow::Result<Vec<u8>> {
        self.digest();
        let config = bincode::config::legacy();
        bincode::serde::encode_to_vec(self, config).map_err(|e| e.into())
    }

    /// deserialize from a slice and verify the embedded digest
    /// # Returns
    /// A tuple containing the object and the number of bytes read
    fn deserialize(buf: &[u8]) -> anyhow::Result<(Self, usize)> {
        let config = bincode::config::legacy();
        let (mut object, bytes_read): (Self, usize) =
            bincode::serde::decode_from_slice(buf, config)?;
        if !object.verify_digest() {
            Err(anyhow!("deserialized object digest verification failed"))
        } else {
            Ok((object, bytes_read))
        }
    }
}
