//! The PKEX key schedule
//!
//! PKEX bootstraps trust from a short shared code instead of a scanned key.
//! Each role blinds its ephemeral key with a secret multiple of a fixed,
//! role-specific curve point: the initiator sends `M = X + Qi`, the
//! responder `N = Y + Qr`, where `Qi`/`Qr` are derived from the code, an
//! optional code identifier, and the sender's MAC address. The exchange
//! secret `z` then keys the wrapped data of the commit/reveal phase, and
//! `u`/`v` prove possession of the real bootstrapping keys.
//!
//! Whether MAC addresses enter the derivations depends on the protocol
//! version in use; the caller states the choice explicitly by passing or
//! omitting them, identically on both sides of a session.
//!
//! Only P-256 carries published role elements; PKEX over P-384 is rejected.

use zeroize::Zeroizing;

use crate::ecc::{Point, PointEncoding, Scalar, CurveId};
use crate::kdf::{self, HashAlg};
use crate::{Error, MacAddress};

// Role-specific elements for NIST P-256, x then y
const PKEX_INITIATOR_P256: [u8; 64] = [
    0x56, 0x26, 0x12, 0xcf, 0x36, 0x48, 0xfe, 0x0b, 0x07, 0x04, 0xbb, 0x12, 0x22, 0x50, 0xb2,
    0x54, 0xb1, 0x94, 0x64, 0x7e, 0x54, 0xce, 0x08, 0x07, 0x2e, 0xec, 0xca, 0x74, 0x5b, 0x61,
    0x2d, 0x25, 0x3e, 0x44, 0xc7, 0xc9, 0x8c, 0x1c, 0xa1, 0x0b, 0x20, 0x09, 0x93, 0xb2, 0xfd,
    0xe5, 0x69, 0xdc, 0x75, 0xbc, 0xad, 0x33, 0xc1, 0xe7, 0xc6, 0x45, 0x4d, 0x10, 0x1e, 0x6a,
    0x3d, 0x84, 0x3c, 0xa4,
];

const PKEX_RESPONDER_P256: [u8; 64] = [
    0x1e, 0xa4, 0x8a, 0xb1, 0xa4, 0xe8, 0x42, 0x39, 0xad, 0x73, 0x07, 0xf2, 0x34, 0xdf, 0x57,
    0x4f, 0xc0, 0x9d, 0x54, 0xbe, 0x36, 0x1b, 0x31, 0x0f, 0x59, 0x91, 0x52, 0x33, 0xac, 0x19,
    0x9d, 0x76, 0x26, 0x04, 0x09, 0x45, 0xf8, 0x49, 0x2c, 0x7f, 0x79, 0xdd, 0x36, 0x1f, 0x1a,
    0x2c, 0x17, 0xf4, 0x5a, 0xd4, 0x04, 0x6b, 0x7a, 0xa4, 0xba, 0x36, 0x8b, 0x7f, 0x43, 0x26,
    0xae, 0xab, 0x0e, 0x5d,
];

fn initiator_element(curve: CurveId) -> Result<Point, Error> {
    match curve {
        CurveId::P256 => Point::from_data(curve, PointEncoding::Full, &PKEX_INITIATOR_P256),
        CurveId::P384 => Err(Error::UnsupportedParameter),
    }
}

fn responder_element(curve: CurveId) -> Result<Point, Error> {
    match curve {
        CurveId::P256 => Point::from_data(curve, PointEncoding::Full, &PKEX_RESPONDER_P256),
        CurveId::P384 => Err(Error::UnsupportedParameter),
    }
}

/// The initiator's blinding element,
/// `Qi = H(mac_i ‖ [identifier ‖] code) · Pi`
pub fn derive_qi(
    curve: CurveId,
    code: &str,
    identifier: Option<&str>,
    mac_i: Option<&MacAddress>,
) -> Result<Point, Error> {
    role_point(curve, initiator_element(curve)?, code, identifier, mac_i)
}

/// The responder's blinding element,
/// `Qr = H(mac_r ‖ [identifier ‖] code) · Pr`
pub fn derive_qr(
    curve: CurveId,
    code: &str,
    identifier: Option<&str>,
    mac_r: Option<&MacAddress>,
) -> Result<Point, Error> {
    role_point(curve, responder_element(curve)?, code, identifier, mac_r)
}

fn role_point(
    curve: CurveId,
    element: Point,
    code: &str,
    identifier: Option<&str>,
    mac: Option<&MacAddress>,
) -> Result<Point, Error> {
    let mut parts: Vec<&[u8]> = Vec::with_capacity(3);

    if let Some(mac) = mac {
        parts.push(mac);
    }

    if let Some(identifier) = identifier {
        parts.push(identifier.as_bytes());
    }

    parts.push(code.as_bytes());

    let digest = Zeroizing::new(kdf::hash(HashAlg::for_curve(curve), &parts));
    let multiplier = Scalar::from_hash(curve, &digest)?;

    element.mul(&multiplier)
}

/// The exchange secret,
/// `z = prf+(HKDF-Extract(<>, K.x), mac_i ‖ mac_r ‖ M.x ‖ N.x ‖ code)`
///
/// `kx` is the x coordinate of the ECDH result `K`, `mx`/`nx` those of the
/// exchanged blinded elements. The code identifier never enters `z`; it
/// already shaped `M` and `N` through `Qi` and `Qr`.
pub fn derive_z(
    mac_i: Option<&MacAddress>,
    mac_r: Option<&MacAddress>,
    mx: &[u8],
    nx: &[u8],
    kx: &[u8],
    code: &str,
) -> Result<Zeroizing<Vec<u8>>, Error> {
    let key_len = kx.len();
    let alg = HashAlg::for_key_len(key_len)?;

    if mx.len() != key_len || nx.len() != key_len {
        return Err(Error::MalformedInput);
    }

    let prk = kdf::hkdf_extract(alg, None, &[kx]);

    let mut parts: Vec<&[u8]> = Vec::with_capacity(5);

    if let Some(mac) = mac_i {
        parts.push(mac);
    }

    if let Some(mac) = mac_r {
        parts.push(mac);
    }

    parts.push(mx);
    parts.push(nx);
    parts.push(code.as_bytes());

    kdf::prf_plus(alg, &prk, key_len, &parts)
}

/// The initiator's commit-reveal proof,
/// `u = HMAC(J.x, mac_i ‖ A.x ‖ Y'.x ‖ X.x)`
///
/// `j` is the proof point `J = a · Y'`, `a`/`A` the initiator's
/// bootstrapping key pair, `y` the peer's revealed protocol key, and `x`
/// one's own.
pub fn derive_u(
    j: &Point,
    mac_i: Option<&MacAddress>,
    initiator_boot_public: &Point,
    peer_proto_public: &Point,
    own_proto_public: &Point,
) -> Result<Zeroizing<Vec<u8>>, Error> {
    commit_proof(
        j,
        mac_i,
        initiator_boot_public,
        peer_proto_public,
        own_proto_public,
    )
}

/// The responder's commit-reveal proof,
/// `v = HMAC(L.x, mac_r ‖ B.x ‖ X'.x ‖ Y.x)`
pub fn derive_v(
    l: &Point,
    mac_r: Option<&MacAddress>,
    responder_boot_public: &Point,
    peer_proto_public: &Point,
    own_proto_public: &Point,
) -> Result<Zeroizing<Vec<u8>>, Error> {
    commit_proof(
        l,
        mac_r,
        responder_boot_public,
        peer_proto_public,
        own_proto_public,
    )
}

fn commit_proof(
    proof_point: &Point,
    mac: Option<&MacAddress>,
    boot_public: &Point,
    peer_proto_public: &Point,
    own_proto_public: &Point,
) -> Result<Zeroizing<Vec<u8>>, Error> {
    let curve = proof_point.curve();

    if boot_public.curve() != curve
        || peer_proto_public.curve() != curve
        || own_proto_public.curve() != curve
    {
        return Err(Error::CryptoVerifyFailure);
    }

    let key = Zeroizing::new(proof_point.x());

    let boot_x = boot_public.x();
    let peer_x = peer_proto_public.x();
    let own_x = own_proto_public.x();

    let mut parts: Vec<&[u8]> = Vec::with_capacity(4);

    if let Some(mac) = mac {
        parts.push(mac);
    }

    parts.push(&boot_x);
    parts.push(&peer_x);
    parts.push(&own_x);

    Ok(Zeroizing::new(kdf::hmac(
        HashAlg::for_curve(curve),
        &key,
        &parts,
    )))
}
