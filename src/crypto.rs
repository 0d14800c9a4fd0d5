//! Encryption envelope: Argon2id key derivation plus two authenticated
//! cipher formats.
//!
//! - v2 (write + read): AES-256-GCM. Blob layout `SALT(16) | NONCE(12) |
//!   CIPHERTEXT | TAG(16)`; the tag is appended to the ciphertext by the
//!   AEAD. AAD is empty: the whole container, magic included, sits inside
//!   the ciphertext, so there are no clear-text bytes to bind.
//! - v1 (read only): AES-256-CBC with PKCS#7 padding and HMAC-SHA256 over
//!   `SALT | IV | CIPHERTEXT`. Blob layout `SALT(16) | IV(16) |
//!   CIPHERTEXT | MAC(32)`. New encodes never produce this format.
//!
//! KDF parameters are locked for interoperability: Argon2id, 64 MiB,
//! 3 iterations, 4 lanes, 16-byte random salt per seal.
//!
//! Every failure on the open path collapses into the same [`CodecError::Auth`]
//! so the error reveals nothing about which check failed.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, KeyIvInit};
use aes_gcm::aead::{Aead, Payload};
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use argon2::{Algorithm, Argon2, Params, Version};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::{Zeroize, Zeroizing};

use crate::error::CodecError;
use crate::CipherVersion;

/// Argon2 salt length in bytes.
pub const SALT_LEN: usize = 16;
/// AES-GCM nonce length in bytes.
pub const GCM_NONCE_LEN: usize = 12;
/// AES-GCM authentication tag length in bytes.
pub const GCM_TAG_LEN: usize = 16;
/// Legacy CBC initialisation vector length in bytes.
pub const CBC_IV_LEN: usize = 16;
/// Legacy HMAC-SHA256 tag length in bytes.
pub const MAC_LEN: usize = 32;

/// Fixed v2 blob overhead: salt + nonce + tag.
pub const V2_OVERHEAD: usize = SALT_LEN + GCM_NONCE_LEN + GCM_TAG_LEN; // 44
/// Fixed v1 blob overhead: salt + iv + mac (padding not included).
pub const V1_OVERHEAD: usize = SALT_LEN + CBC_IV_LEN + MAC_LEN; // 64

const KDF_M_COST_KIB: u32 = 64 * 1024;
const KDF_T_COST: u32 = 3;
const KDF_P_COST: u32 = 4;

/// A derived key that is zeroized on drop.
pub type ZeroizingKey = Zeroizing<[u8; 32]>;

type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// Secure random bytes from the OS RNG.
pub fn random_bytes(len: usize) -> Result<Vec<u8>, CodecError> {
    let mut out = vec![0u8; len];
    getrandom::getrandom(&mut out)
        .map_err(|e| CodecError::Io(std::io::Error::other(format!("getrandom: {e:?}"))))?;
    Ok(out)
}

fn argon2id(out_len: usize) -> Argon2<'static> {
    let params = Params::new(KDF_M_COST_KIB, KDF_T_COST, KDF_P_COST, Some(out_len))
        .expect("locked Argon2 parameters are valid");
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}

/// Derive the 32-byte v2 AEAD key from a password and salt.
pub fn derive_key(password: &[u8], salt: &[u8]) -> Result<ZeroizingKey, CodecError> {
    let mut key = ZeroizingKey::new([0u8; 32]);
    argon2id(32)
        .hash_password_into(password, salt, &mut *key)
        .map_err(|_| CodecError::Auth)?;
    Ok(key)
}

/// Derive the 64-byte v1 key block: bytes 0..32 are the AES-256-CBC key,
/// bytes 32..64 the HMAC-SHA256 key.
pub fn derive_key_v1(password: &[u8], salt: &[u8]) -> Result<Zeroizing<[u8; 64]>, CodecError> {
    let mut key = Zeroizing::new([0u8; 64]);
    argon2id(64)
        .hash_password_into(password, salt, &mut *key)
        .map_err(|_| CodecError::Auth)?;
    Ok(key)
}

/// Seal a plaintext container under a password. Always produces a v2 blob.
pub fn seal(plaintext: &[u8], password: &[u8]) -> Result<Vec<u8>, CodecError> {
    let salt = random_bytes(SALT_LEN)?;
    let nonce = random_bytes(GCM_NONCE_LEN)?;
    let key = derive_key(password, &salt)?;

    let cipher = Aes256Gcm::new_from_slice(key.as_ref()).map_err(|_| CodecError::Auth)?;
    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: plaintext,
                aad: b"",
            },
        )
        .map_err(|_| CodecError::Auth)?;

    let mut blob = Vec::with_capacity(SALT_LEN + GCM_NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(&salt);
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Open an envelope of the given version and return the plaintext container.
pub fn open(
    blob: &[u8],
    password: &[u8],
    version: CipherVersion,
) -> Result<Zeroizing<Vec<u8>>, CodecError> {
    match version {
        CipherVersion::AesGcm => open_v2(blob, password),
        CipherVersion::AesCbcLegacy => open_v1(blob, password),
        CipherVersion::Plain => Err(CodecError::Format("plaintext stream has no envelope")),
    }
}

fn open_v2(blob: &[u8], password: &[u8]) -> Result<Zeroizing<Vec<u8>>, CodecError> {
    if blob.len() < V2_OVERHEAD {
        return Err(CodecError::Auth);
    }
    let (salt, rest) = blob.split_at(SALT_LEN);
    let (nonce, ciphertext) = rest.split_at(GCM_NONCE_LEN);

    let key = derive_key(password, salt)?;
    let cipher = Aes256Gcm::new_from_slice(key.as_ref()).map_err(|_| CodecError::Auth)?;
    let mut plaintext = cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad: b"",
            },
        )
        .map_err(|_| CodecError::Auth)?;

    let out = Zeroizing::new(plaintext.clone());
    plaintext.zeroize();
    Ok(out)
}

fn open_v1(blob: &[u8], password: &[u8]) -> Result<Zeroizing<Vec<u8>>, CodecError> {
    // salt + iv + at least one cipher block + mac
    if blob.len() < V1_OVERHEAD + 16 {
        return Err(CodecError::Auth);
    }
    let (salt, rest) = blob.split_at(SALT_LEN);
    let (iv, rest) = rest.split_at(CBC_IV_LEN);
    let (ciphertext, mac) = rest.split_at(rest.len() - MAC_LEN);
    if ciphertext.is_empty() || ciphertext.len() % 16 != 0 {
        return Err(CodecError::Auth);
    }

    let keys = derive_key_v1(password, salt)?;

    // Encrypt-then-MAC: verify over SALT | IV | CIPHERTEXT before touching
    // the cipher.
    let mut hmac =
        <HmacSha256 as Mac>::new_from_slice(&keys[32..64]).map_err(|_| CodecError::Auth)?;
    hmac.update(salt);
    hmac.update(iv);
    hmac.update(ciphertext);
    hmac.verify_slice(mac).map_err(|_| CodecError::Auth)?;

    let dec = Aes256CbcDec::new_from_slices(&keys[..32], iv).map_err(|_| CodecError::Auth)?;
    let plaintext = dec
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CodecError::Auth)?;
    Ok(Zeroizing::new(plaintext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_roundtrip() {
        let pt = b"GBIT container bytes would go here";
        let blob = seal(pt, b"p@ss").unwrap();
        let got = open(&blob, b"p@ss", CipherVersion::AesGcm).unwrap();
        assert_eq!(&got[..], pt);
    }

    #[test]
    fn blob_layout_and_overhead() {
        let pt = b"0123456789";
        let blob = seal(pt, b"pw").unwrap();
        assert_eq!(blob.len(), pt.len() + V2_OVERHEAD);
    }

    #[test]
    fn wrong_password_uniform_error() {
        let blob = seal(b"secret", b"right").unwrap();
        let err = open(&blob, b"wrong", CipherVersion::AesGcm).unwrap_err();
        assert!(matches!(err, CodecError::Auth));
        assert_eq!(err.to_string(), crate::error::AUTH_MESSAGE);
    }

    #[test]
    fn every_byte_flip_is_auth_error() {
        let blob = seal(b"tamper me", b"pw").unwrap();
        // Salt, nonce, ciphertext and tag regions all fail identically.
        for offset in [0, SALT_LEN, SALT_LEN + GCM_NONCE_LEN, blob.len() - 1] {
            let mut bad = blob.clone();
            bad[offset] ^= 0x01;
            let err = open(&bad, b"pw", CipherVersion::AesGcm).unwrap_err();
            assert!(matches!(err, CodecError::Auth), "offset {offset}");
            assert_eq!(err.to_string(), crate::error::AUTH_MESSAGE);
        }
    }

    #[test]
    fn truncated_blob_is_auth_error() {
        let blob = seal(b"short", b"pw").unwrap();
        for len in [0, 1, SALT_LEN, V2_OVERHEAD - 1] {
            let err = open(&blob[..len], b"pw", CipherVersion::AesGcm).unwrap_err();
            assert!(matches!(err, CodecError::Auth), "len {len}");
        }
    }

    #[test]
    fn fresh_salt_and_nonce_per_seal() {
        let a = seal(b"same", b"pw").unwrap();
        let b = seal(b"same", b"pw").unwrap();
        assert_ne!(a, b);
        assert_ne!(&a[..SALT_LEN], &b[..SALT_LEN]);
    }

    #[test]
    fn kdf_is_deterministic() {
        let a = derive_key(b"pw", &[7u8; SALT_LEN]).unwrap();
        let b = derive_key(b"pw", &[7u8; SALT_LEN]).unwrap();
        assert_eq!(a.as_ref(), b.as_ref());
        let c = derive_key(b"pw", &[8u8; SALT_LEN]).unwrap();
        assert_ne!(a.as_ref(), c.as_ref());
    }

    /// Assemble a v1 blob from the same primitives the open path uses.
    /// There is deliberately no seal path for v1 in the crate.
    fn make_v1_blob(plaintext: &[u8], password: &[u8]) -> Vec<u8> {
        use aes::cipher::BlockEncryptMut;
        type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;

        let salt = [0x11u8; SALT_LEN];
        let iv = [0x22u8; CBC_IV_LEN];
        let keys = derive_key_v1(password, &salt).unwrap();

        let ciphertext = Aes256CbcEnc::new_from_slices(&keys[..32], &iv)
            .unwrap()
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        let mut hmac = <HmacSha256 as Mac>::new_from_slice(&keys[32..64]).unwrap();
        hmac.update(&salt);
        hmac.update(&iv);
        hmac.update(&ciphertext);
        let mac = hmac.finalize().into_bytes();

        let mut blob = Vec::new();
        blob.extend_from_slice(&salt);
        blob.extend_from_slice(&iv);
        blob.extend_from_slice(&ciphertext);
        blob.extend_from_slice(&mac);
        blob
    }

    #[test]
    fn legacy_v1_open() {
        let pt = b"legacy container payload";
        let blob = make_v1_blob(pt, b"old password");
        let got = open(&blob, b"old password", CipherVersion::AesCbcLegacy).unwrap();
        assert_eq!(&got[..], pt);
    }

    #[test]
    fn legacy_v1_wrong_password() {
        let blob = make_v1_blob(b"legacy", b"right");
        let err = open(&blob, b"wrong", CipherVersion::AesCbcLegacy).unwrap_err();
        assert!(matches!(err, CodecError::Auth));
    }

    #[test]
    fn legacy_v1_mac_flip_detected() {
        let mut blob = make_v1_blob(b"legacy", b"pw");
        let n = blob.len();
        blob[n - 1] ^= 0x80;
        assert!(matches!(
            open(&blob, b"pw", CipherVersion::AesCbcLegacy),
            Err(CodecError::Auth)
        ));
    }
}
