//! SubjectPublicKeyInfo codec for bootstrapping keys
//!
//! DPP carries bootstrapping public keys as the RFC 5480 SubjectPublicKeyInfo
//! structure with a compressed EC point, both inside `DPP:` URIs (base64 of
//! these bytes) and in the Bootstrapping Key attribute. The structure is
//! small and completely fixed:
//!
//! ```text
//! SEQUENCE {
//!     SEQUENCE { OID id-ecPublicKey, OID prime256v1 | secp384r1 },
//!     BIT STRING { 0 unused bits, compressed point }
//! }
//! ```
//!
//! The decoder is strict: definite short-form lengths, exactly two elements
//! at each level, a zero unused-bits octet, and a point that verifies
//! against its curve. Anything else is rejected.

use sha2::{Digest, Sha256};

use crate::ecc::{CurveId, Point};
use crate::Error;

const TAG_SEQUENCE: u8 = 0x30;
const TAG_BIT_STRING: u8 = 0x03;

// id-ecPublicKey (1.2.840.10045.2.1)
const EC_PUBLIC_KEY_OID: &[u8] = &[0x06, 0x07, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01];

// prime256v1 (1.2.840.10045.3.1.7)
const PRIME256V1_OID: &[u8] = &[0x06, 0x08, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x03, 0x01, 0x07];

// secp384r1 (1.3.132.0.34)
const SECP384R1_OID: &[u8] = &[0x06, 0x05, 0x2b, 0x81, 0x04, 0x00, 0x22];

/// Encode a public point as SubjectPublicKeyInfo bytes
///
/// The point is always emitted compressed, with the `0x02`/`0x03` tag
/// matching its y parity. A P-256 key encodes to exactly 59 bytes.
pub fn encode(point: &Point) -> Vec<u8> {
    let curve_oid = match point.curve() {
        CurveId::P256 => PRIME256V1_OID,
        CurveId::P384 => SECP384R1_OID,
    };

    let compressed = point.to_sec1();

    let algorithm_len = EC_PUBLIC_KEY_OID.len() + curve_oid.len();
    let bit_string_len = 1 + compressed.len();
    let outer_len = 2 + algorithm_len + 2 + bit_string_len;

    let mut out = Vec::with_capacity(2 + outer_len);

    out.push(TAG_SEQUENCE);
    out.push(outer_len as u8);

    out.push(TAG_SEQUENCE);
    out.push(algorithm_len as u8);
    out.extend_from_slice(EC_PUBLIC_KEY_OID);
    out.extend_from_slice(curve_oid);

    out.push(TAG_BIT_STRING);
    out.push(bit_string_len as u8);
    out.push(0x00);
    out.extend_from_slice(&compressed);

    out
}

/// Decode SubjectPublicKeyInfo bytes into the public point they carry
pub fn decode(data: &[u8]) -> Result<Point, Error> {
    let (outer, trailing) = take_element(data, TAG_SEQUENCE)?;

    if !trailing.is_empty() {
        return Err(Error::MalformedInput);
    }

    let (algorithm, rest) = take_element(outer, TAG_SEQUENCE)?;

    let curve = if is_algorithm(algorithm, PRIME256V1_OID) {
        CurveId::P256
    } else if is_algorithm(algorithm, SECP384R1_OID) {
        CurveId::P384
    } else {
        return Err(Error::MalformedInput);
    };

    let (bit_string, rest) = take_element(rest, TAG_BIT_STRING)?;

    if !rest.is_empty() {
        return Err(Error::MalformedInput);
    }

    let (&unused_bits, point_bytes) = bit_string.split_first().ok_or(Error::MalformedInput)?;

    if unused_bits != 0 {
        return Err(Error::MalformedInput);
    }

    Point::from_sec1(curve, point_bytes)
}

/// SHA-256 over the SubjectPublicKeyInfo bytes
///
/// The value of the Initiator/Responder Bootstrapping Key Hash attributes.
pub fn key_hash(spki: &[u8]) -> [u8; 32] {
    let mut digest = Sha256::new();

    digest.update(spki);

    digest.finalize().into()
}

/// SHA-256 over `"chirp" ‖ SubjectPublicKeyInfo`
///
/// The bootstrapping key hash a Presence Announcement carries.
pub fn chirp_hash(spki: &[u8]) -> [u8; 32] {
    let mut digest = Sha256::new();

    digest.update(b"chirp");
    digest.update(spki);

    digest.finalize().into()
}

/// Split one definite short-form DER element off the front of `data`
fn take_element(data: &[u8], tag: u8) -> Result<(&[u8], &[u8]), Error> {
    if data.len() < 2 || data[0] != tag {
        return Err(Error::MalformedInput);
    }

    let len = data[1] as usize;

    // Long-form lengths never occur in a structure this small
    if len >= 0x80 || data.len() < 2 + len {
        return Err(Error::MalformedInput);
    }

    Ok((&data[2..2 + len], &data[2 + len..]))
}

fn is_algorithm(content: &[u8], curve_oid: &[u8]) -> bool {
    content.len() == EC_PUBLIC_KEY_OID.len() + curve_oid.len()
        && content[..EC_PUBLIC_KEY_OID.len()] == *EC_PUBLIC_KEY_OID
        && content[EC_PUBLIC_KEY_OID.len()..] == *curve_oid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecc::Scalar;

    /// The `K:` payload of the bootstrapping URI in the interop examples, a
    /// P-256 key with an odd-y (0x03) compressed point
    const KNOWN_P256_SPKI: &str =
        "MDkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDIgADURzxmttZoIRIPWGoQMV00XHWCAQIhXruVWOz0NjlkIA=";

    fn known_spki_bytes() -> Vec<u8> {
        use base64::engine::general_purpose::STANDARD;
        use base64::Engine;

        STANDARD.decode(KNOWN_P256_SPKI).unwrap()
    }

    #[test]
    fn decodes_known_key_bit_exactly() {
        let der = known_spki_bytes();

        assert_eq!(der.len(), 59);
        assert_eq!(&der[..6], &[0x30, 0x39, 0x30, 0x13, 0x06, 0x07]);

        let point = decode(&der).unwrap();
        assert_eq!(point.curve(), CurveId::P256);
        assert!(point.y_is_odd());

        assert_eq!(encode(&point), der);
    }

    #[test]
    fn round_trips_generated_keys() {
        for curve in [CurveId::P256, CurveId::P384] {
            let point = Point::generator(curve).mul(&Scalar::random(curve)).unwrap();

            let der = encode(&point);
            assert_eq!(decode(&der).unwrap(), point);
        }
    }

    #[test]
    fn p256_encoding_is_59_bytes() {
        let point = Point::generator(CurveId::P256)
            .mul(&Scalar::random(CurveId::P256))
            .unwrap();

        assert_eq!(encode(&point).len(), 59);
    }

    #[test]
    fn rejects_structural_damage() {
        let der = known_spki_bytes();

        // Outer tag not a SEQUENCE
        let mut bad = der.clone();
        bad[0] = 0x31;
        assert_eq!(decode(&bad).err(), Some(Error::MalformedInput));

        // Wrong curve OID byte
        let mut bad = der.clone();
        bad[20] ^= 0x01;
        assert_eq!(decode(&bad).err(), Some(Error::MalformedInput));

        // Nonzero unused-bits octet in the BIT STRING
        let mut bad = der.clone();
        bad[25] = 0x07;
        assert_eq!(decode(&bad).err(), Some(Error::MalformedInput));

        // Truncation and trailing garbage
        assert!(decode(&der[..der.len() - 1]).is_err());
        let mut long = der.clone();
        long.push(0x00);
        assert!(decode(&long).is_err());

        assert!(decode(&[]).is_err());
    }

    #[test]
    fn rejects_bad_point_encoding() {
        let mut der = known_spki_bytes();

        // Valid structure, invalid SEC1 tag on the point itself
        der[26] = 0x06;

        assert_eq!(decode(&der).err(), Some(Error::CryptoVerifyFailure));
    }
}
