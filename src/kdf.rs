//! Hashes and key derivation
//!
//! DPP never names a hash directly; every derivation picks it from the width
//! of the key material in play (32 bytes selects SHA-256, 48 SHA-384, 64
//! SHA-512). The constructions themselves are the usual HMAC-based ones:
//! plain digests over concatenated parts, HKDF extract-and-expand, and the
//! `prf+` expansion the PKEX exchange secret runs through.
//!
//! `prf+` is the chained single-octet-counter expansion, `T(i) =
//! HMAC(prk, T(i-1) ‖ parts ‖ i)` with `i` starting at 1. For a single
//! block it collapses to one HMAC over `parts ‖ 0x01`.

use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256, Sha384, Sha512};
use zeroize::Zeroizing;

use crate::ecc::CurveId;
use crate::Error;

/// The hash algorithms a supported key width can select
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HashAlg {
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlg {
    /// Select the hash matching a key width of 32, 48, or 64 bytes
    pub fn for_key_len(key_len: usize) -> Result<HashAlg, Error> {
        match key_len {
            32 => Ok(HashAlg::Sha256),
            48 => Ok(HashAlg::Sha384),
            64 => Ok(HashAlg::Sha512),
            _ => Err(Error::UnsupportedParameter),
        }
    }

    /// The hash paired with a curve's scalar width
    pub fn for_curve(curve: CurveId) -> HashAlg {
        match curve {
            CurveId::P256 => HashAlg::Sha256,
            CurveId::P384 => HashAlg::Sha384,
        }
    }

    pub fn output_len(self) -> usize {
        match self {
            HashAlg::Sha256 => 32,
            HashAlg::Sha384 => 48,
            HashAlg::Sha512 => 64,
        }
    }
}

/// The protocol nonce width matching a key width of 32, 48, or 64 bytes
pub fn nonce_len_for(key_len: usize) -> Result<usize, Error> {
    match key_len {
        32 => Ok(16),
        48 => Ok(24),
        64 => Ok(32),
        _ => Err(Error::UnsupportedParameter),
    }
}

/// Draw a curve-width protocol nonce from the system CSPRNG
pub fn new_nonce(curve: CurveId) -> Vec<u8> {
    let mut nonce = vec![0u8; curve.nonce_bytes()];

    OsRng.fill_bytes(&mut nonce);

    nonce
}

macro_rules! digest_parts {
    ($digest:ty, $parts:expr) => {{
        let mut digest = <$digest>::new();

        for part in $parts {
            digest.update(part);
        }

        digest.finalize().to_vec()
    }};
}

/// `H(parts...)`: one digest over the concatenation of `parts`
pub fn hash(alg: HashAlg, parts: &[&[u8]]) -> Vec<u8> {
    match alg {
        HashAlg::Sha256 => digest_parts!(Sha256, parts),
        HashAlg::Sha384 => digest_parts!(Sha384, parts),
        HashAlg::Sha512 => digest_parts!(Sha512, parts),
    }
}

macro_rules! hmac_parts {
    ($digest:ty, $key:expr, $parts:expr) => {{
        let mut mac =
            <Hmac<$digest>>::new_from_slice($key).expect("HMAC accepts keys of any length");

        for part in $parts {
            mac.update(part);
        }

        mac.finalize().into_bytes().to_vec()
    }};
}

/// HMAC over the concatenation of `parts`
pub fn hmac(alg: HashAlg, key: &[u8], parts: &[&[u8]]) -> Vec<u8> {
    match alg {
        HashAlg::Sha256 => hmac_parts!(Sha256, key, parts),
        HashAlg::Sha384 => hmac_parts!(Sha384, key, parts),
        HashAlg::Sha512 => hmac_parts!(Sha512, key, parts),
    }
}

/// HKDF-Extract over the concatenation of `ikm_parts`
///
/// A `None` salt stands for a hash-length run of zeros, the RFC 5869
/// convention.
pub fn hkdf_extract(alg: HashAlg, salt: Option<&[u8]>, ikm_parts: &[&[u8]]) -> Zeroizing<Vec<u8>> {
    let mut ikm = Zeroizing::new(Vec::new());

    for part in ikm_parts {
        ikm.extend_from_slice(part);
    }

    match alg {
        HashAlg::Sha256 => Zeroizing::new(Hkdf::<Sha256>::extract(salt, &ikm).0.to_vec()),
        HashAlg::Sha384 => Zeroizing::new(Hkdf::<Sha384>::extract(salt, &ikm).0.to_vec()),
        HashAlg::Sha512 => Zeroizing::new(Hkdf::<Sha512>::extract(salt, &ikm).0.to_vec()),
    }
}

macro_rules! expand_prk {
    ($digest:ty, $prk:expr, $infos:expr, $okm:expr) => {
        Hkdf::<$digest>::from_prk($prk)
            .map_err(|_| Error::MalformedInput)?
            .expand_multi_info($infos, $okm)
            .map_err(|_| Error::ResourceExhaustion)?
    };
}

/// HKDF-Expand
pub fn hkdf_expand(
    alg: HashAlg,
    prk: &[u8],
    info: &[u8],
    out_len: usize,
) -> Result<Zeroizing<Vec<u8>>, Error> {
    prf_plus(alg, prk, out_len, &[info])
}

/// HKDF-Expand(HKDF-Extract(salt, ikm), info, out_len)
pub fn hkdf(
    alg: HashAlg,
    salt: Option<&[u8]>,
    info: &[u8],
    ikm: &[u8],
    out_len: usize,
) -> Result<Zeroizing<Vec<u8>>, Error> {
    let prk = hkdf_extract(alg, salt, &[ikm]);

    hkdf_expand(alg, &prk, info, out_len)
}

/// The chained counter expansion, `T(i) = HMAC(prk, T(i-1) ‖ parts ‖ i)`
pub fn prf_plus(
    alg: HashAlg,
    prk: &[u8],
    out_len: usize,
    parts: &[&[u8]],
) -> Result<Zeroizing<Vec<u8>>, Error> {
    let mut okm = Zeroizing::new(vec![0u8; out_len]);

    match alg {
        HashAlg::Sha256 => expand_prk!(Sha256, prk, parts, okm.as_mut_slice()),
        HashAlg::Sha384 => expand_prk!(Sha384, prk, parts, okm.as_mut_slice()),
        HashAlg::Sha512 => expand_prk!(Sha512, prk, parts, okm.as_mut_slice()),
    }

    Ok(okm)
}
