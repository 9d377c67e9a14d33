//! Utility functions for hashing and hex conversion.

use openssl::md::Md;
use openssl::md_ctx::MdCtx;

use crate::error;

/// Computes a SHA-256 hash of the provided data.
///
/// This function computes the SHA-256 hash of the input data in one shot.
/// The result is the 256-bit (32-byte) digest.
///
/// # Parameters
/// - `data`: A byte slice containing the data to be hashed.
///
/// # Returns
/// - `[u8; 32]`: A 32-byte array containing the computed SHA-256 hash.
/// - `Err(error::Error)`: An error if there is a failure during the hashing
///   process.
///
/// # Example
/// ```
/// use hoard::util::sha256;
///
/// let digest = sha256(b"message").unwrap();
/// assert_eq!(digest.len(), 32);
/// ```
pub fn sha256(data: &[u8]) -> Result<[u8; 32], error::Error> {
    let mut ctx = Sha256::new()?;
    ctx.update(data)?;
    ctx.digest()
}

/// An incremental SHA-256 context.
///
/// The hashing primitive used by the store: feed data with [`Sha256::update`]
/// and finish with [`Sha256::digest`].
///
/// # Example
/// ```
/// use hoard::util::{sha256, Sha256};
///
/// let mut ctx = Sha256::new().unwrap();
/// ctx.update(b"mes").unwrap();
/// ctx.update(b"sage").unwrap();
/// assert_eq!(ctx.digest().unwrap(), sha256(b"message").unwrap());
/// ```
pub struct Sha256 {
    ctx: MdCtx,
}

impl Sha256 {
    /// Creates a new hashing context.
    pub fn new() -> Result<Self, error::Error> {
        let mut ctx = MdCtx::new()?;
        ctx.digest_init(Md::sha256())?;
        Ok(Sha256 { ctx })
    }

    /// Feeds more data into the context.
    pub fn update(&mut self, data: &[u8]) -> Result<(), error::Error> {
        self.ctx.digest_update(data)?;
        Ok(())
    }

    /// Consumes the context and returns the 32-byte digest.
    pub fn digest(mut self) -> Result<[u8; 32], error::Error> {
        let mut digest = [0u8; 32];
        self.ctx.digest_final(&mut digest)?;
        Ok(digest)
    }
}

/// Formats a byte slice as a lowercase hex string, in byte order.
pub fn bytes_to_hex_string(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Parses a hex string of exactly `N * 2` characters into `N` bytes.
///
/// # Returns
/// - `Ok([u8; N])`: The decoded bytes.
/// - `Err(error::Error)`: If the string has the wrong length or contains a
///   non-hex character.
pub fn hex_string_to_bytes<const N: usize>(hex_string: &str) -> Result<[u8; N], error::Error> {
    let mut bytes = [0u8; N];
    hex::decode_to_slice(hex_string, &mut bytes)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_one_shot_matches_incremental() {
        let data = b"the quick brown fox jumps over the lazy dog";
        let mut ctx = Sha256::new().unwrap();
        ctx.update(&data[..9]).unwrap();
        ctx.update(&data[9..]).unwrap();
        assert_eq!(ctx.digest().unwrap(), sha256(data).unwrap());
    }

    #[test]
    fn hex_round_trip() {
        let bytes: [u8; 4] = [0xde, 0xad, 0xbe, 0xef];
        let text = bytes_to_hex_string(&bytes);
        assert_eq!(text, "deadbeef");
        assert_eq!(hex_string_to_bytes::<4>(&text).unwrap(), bytes);
        assert!(hex_string_to_bytes::<4>("deadbee").is_err());
    }
}
