//! The DPP Authentication key schedule
//!
//! Authentication runs over two ephemeral protocol keys (`pI`/`PI`,
//! `pR`/`PR`) and up to two bootstrapping keys (`bI`/`BI`, `bR`/`BR`).
//! Three Diffie-Hellman results drive the schedule: `M` between the
//! initiator's protocol key and the responder's bootstrapping key, `N`
//! between the two protocol keys, and, only when both bootstrapping keys
//! are known, the mutual-authentication secret `L`.
//!
//! `k1` and `k2` seal the wrapped portions of the request and response,
//! `ke` is the session key the configuration exchange runs under, and the
//! `I-auth`/`R-auth` digests are the confirmation values each side places
//! in its final message. The hash everywhere is the one paired with the
//! curve.

use zeroize::Zeroizing;

use crate::ecc::{self, Point, Scalar};
use crate::kdf::{self, HashAlg};
use crate::Error;

const K1_INFO: &[u8] = b"first intermediate key";
const K2_INFO: &[u8] = b"second intermediate key";
const KE_INFO: &[u8] = b"DPP Key";

/// Derive `k1` from one's own private key and the peer public key forming
/// `M`
///
/// The initiator passes `(pI, BR)`, the responder `(bR, PI)`; both arrive
/// at the same key.
pub fn derive_k1(private: &Scalar, peer_public: &Point) -> Result<Zeroizing<Vec<u8>>, Error> {
    intermediate_key(private, peer_public, K1_INFO)
}

/// Derive `k2` from one's own private key and the peer public key forming
/// `N`
///
/// The initiator passes `(pI, PR)`, the responder `(pR, PI)`.
pub fn derive_k2(private: &Scalar, peer_public: &Point) -> Result<Zeroizing<Vec<u8>>, Error> {
    intermediate_key(private, peer_public, K2_INFO)
}

fn intermediate_key(
    private: &Scalar,
    peer_public: &Point,
    info: &[u8],
) -> Result<Zeroizing<Vec<u8>>, Error> {
    let curve = private.curve();
    let shared_x = ecc::ecdh(private, peer_public)?;

    kdf::hkdf(
        HashAlg::for_curve(curve),
        None,
        info,
        &shared_x,
        curve.scalar_bytes(),
    )
}

/// The initiator's view of the mutual-authentication secret,
/// `L = bI · (BR + PR)`
pub fn derive_li(
    responder_boot_public: &Point,
    responder_proto_public: &Point,
    initiator_boot_private: &Scalar,
) -> Result<Point, Error> {
    responder_boot_public
        .add(responder_proto_public)?
        .mul(initiator_boot_private)
}

/// The responder's view of the mutual-authentication secret,
/// `L = ((bR + pR) mod n) · BI`
///
/// The private-key sum reduces modulo the group order before the
/// multiplication; both views then share an x coordinate.
pub fn derive_lr(
    responder_boot_private: &Scalar,
    responder_proto_private: &Scalar,
    initiator_boot_public: &Point,
) -> Result<Point, Error> {
    let sum = responder_boot_private.add(responder_proto_private)?;

    initiator_boot_public.mul(&sum)
}

/// Derive the session key `ke`
///
/// `mx` and `nx` are the x coordinates of `M` and `N`; `lx` is the x
/// coordinate of `L` and is present exactly when the session uses mutual
/// authentication. The nonces salt the extraction step.
pub fn derive_ke(
    i_nonce: &[u8],
    r_nonce: &[u8],
    mx: &[u8],
    nx: &[u8],
    lx: Option<&[u8]>,
) -> Result<Zeroizing<Vec<u8>>, Error> {
    let key_len = mx.len();
    let alg = HashAlg::for_key_len(key_len)?;
    let nonce_len = kdf::nonce_len_for(key_len)?;

    if nx.len() != key_len || lx.is_some_and(|lx| lx.len() != key_len) {
        return Err(Error::MalformedInput);
    }

    if i_nonce.len() != nonce_len || r_nonce.len() != nonce_len {
        return Err(Error::MalformedInput);
    }

    let mut salt = Zeroizing::new(Vec::with_capacity(2 * nonce_len));
    salt.extend_from_slice(i_nonce);
    salt.extend_from_slice(r_nonce);

    let mut ikm_parts: Vec<&[u8]> = vec![mx, nx];

    if let Some(lx) = lx {
        ikm_parts.push(lx);
    }

    let bk = kdf::hkdf_extract(alg, Some(&salt), &ikm_parts);

    kdf::hkdf_expand(alg, &bk, KE_INFO, key_len)
}

/// The responder's confirmation digest
///
/// `R-auth = H(I-nonce ‖ R-nonce ‖ PI.x ‖ PR.x ‖ [BI.x ‖] BR.x ‖ 0)`,
/// with `BI.x` present exactly when the initiator's bootstrapping key is
/// known.
pub fn derive_r_auth(
    i_nonce: &[u8],
    r_nonce: &[u8],
    initiator_proto_public: &Point,
    responder_proto_public: &Point,
    initiator_boot_public: Option<&Point>,
    responder_boot_public: &Point,
) -> Result<Zeroizing<Vec<u8>>, Error> {
    auth_digest(
        i_nonce,
        r_nonce,
        initiator_proto_public,
        responder_proto_public,
        initiator_boot_public,
        responder_boot_public,
        false,
    )
}

/// The initiator's confirmation digest
///
/// `I-auth = H(R-nonce ‖ I-nonce ‖ PR.x ‖ PI.x ‖ BR.x ‖ [BI.x ‖] 1)`.
pub fn derive_i_auth(
    r_nonce: &[u8],
    i_nonce: &[u8],
    responder_proto_public: &Point,
    initiator_proto_public: &Point,
    responder_boot_public: &Point,
    initiator_boot_public: Option<&Point>,
) -> Result<Zeroizing<Vec<u8>>, Error> {
    auth_digest(
        r_nonce,
        i_nonce,
        responder_proto_public,
        initiator_proto_public,
        initiator_boot_public,
        responder_boot_public,
        true,
    )
}

fn auth_digest(
    first_nonce: &[u8],
    second_nonce: &[u8],
    first_proto: &Point,
    second_proto: &Point,
    initiator_boot: Option<&Point>,
    responder_boot: &Point,
    initiator_view: bool,
) -> Result<Zeroizing<Vec<u8>>, Error> {
    let curve = first_proto.curve();

    if second_proto.curve() != curve
        || responder_boot.curve() != curve
        || initiator_boot.is_some_and(|b| b.curve() != curve)
    {
        return Err(Error::CryptoVerifyFailure);
    }

    let nonce_len = curve.nonce_bytes();

    if first_nonce.len() != nonce_len || second_nonce.len() != nonce_len {
        return Err(Error::MalformedInput);
    }

    let first_x = first_proto.x();
    let second_x = second_proto.x();
    let initiator_x = initiator_boot.map(|b| b.x());
    let responder_x = responder_boot.x();

    // The trailing octet separates the two digests; 0 closes the
    // responder's transcript, 1 the initiator's
    let mut parts: Vec<&[u8]> = vec![first_nonce, second_nonce, &first_x, &second_x];

    if initiator_view {
        parts.push(&responder_x);

        if let Some(x) = &initiator_x {
            parts.push(x);
        }

        parts.push(&[1]);
    } else {
        if let Some(x) = &initiator_x {
            parts.push(x);
        }

        parts.push(&responder_x);
        parts.push(&[0]);
    }

    Ok(Zeroizing::new(kdf::hash(
        HashAlg::for_curve(curve),
        &parts,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecc::CurveId;

    struct Session {
        b_i: Scalar,
        b_r: Scalar,
        p_i: Scalar,
        p_r: Scalar,
        cap_b_i: Point,
        cap_b_r: Point,
        cap_p_i: Point,
        cap_p_r: Point,
        i_nonce: Vec<u8>,
        r_nonce: Vec<u8>,
    }

    fn fixed_scalar(curve: CurveId, fill: u8) -> Scalar {
        let mut bytes = vec![0u8; curve.scalar_bytes()];
        *bytes.last_mut().unwrap() = fill;

        Scalar::from_bytes(curve, &bytes).unwrap()
    }

    fn session(curve: CurveId) -> Session {
        let b_i = fixed_scalar(curve, 0x13);
        let b_r = fixed_scalar(curve, 0x29);
        let p_i = fixed_scalar(curve, 0x47);
        let p_r = fixed_scalar(curve, 0x6d);

        let generator = Point::generator(curve);

        Session {
            cap_b_i: generator.mul(&b_i).unwrap(),
            cap_b_r: generator.mul(&b_r).unwrap(),
            cap_p_i: generator.mul(&p_i).unwrap(),
            cap_p_r: generator.mul(&p_r).unwrap(),
            i_nonce: vec![0xa1; curve.nonce_bytes()],
            r_nonce: vec![0xb2; curve.nonce_bytes()],
            b_i,
            b_r,
            p_i,
            p_r,
        }
    }

    #[test]
    fn both_sides_agree_on_k1_and_k2() {
        for curve in [CurveId::P256, CurveId::P384] {
            let s = session(curve);

            let initiator_k1 = derive_k1(&s.p_i, &s.cap_b_r).unwrap();
            let responder_k1 = derive_k1(&s.b_r, &s.cap_p_i).unwrap();
            assert_eq!(&initiator_k1[..], &responder_k1[..]);
            assert_eq!(initiator_k1.len(), curve.scalar_bytes());

            let initiator_k2 = derive_k2(&s.p_i, &s.cap_p_r).unwrap();
            let responder_k2 = derive_k2(&s.p_r, &s.cap_p_i).unwrap();
            assert_eq!(&initiator_k2[..], &responder_k2[..]);

            assert_ne!(&initiator_k1[..], &initiator_k2[..]);
        }
    }

    #[test]
    fn mutual_secret_agrees_across_views() {
        for curve in [CurveId::P256, CurveId::P384] {
            let s = session(curve);

            let initiator_l = derive_li(&s.cap_b_r, &s.cap_p_r, &s.b_i).unwrap();
            let responder_l = derive_lr(&s.b_r, &s.p_r, &s.cap_b_i).unwrap();

            assert_eq!(initiator_l.x(), responder_l.x());
        }
    }

    #[test]
    fn ke_depends_on_mutual_secret() {
        let s = session(CurveId::P256);

        let mx = ecc::ecdh(&s.p_i, &s.cap_b_r).unwrap();
        let nx = ecc::ecdh(&s.p_i, &s.cap_p_r).unwrap();
        let lx = derive_li(&s.cap_b_r, &s.cap_p_r, &s.b_i).unwrap().x();

        let mutual = derive_ke(&s.i_nonce, &s.r_nonce, &mx, &nx, Some(&lx)).unwrap();
        let responder_only = derive_ke(&s.i_nonce, &s.r_nonce, &mx, &nx, None).unwrap();

        assert_eq!(mutual.len(), 32);
        assert_ne!(&mutual[..], &responder_only[..]);

        // Deterministic over the same transcript
        let again = derive_ke(&s.i_nonce, &s.r_nonce, &mx, &nx, Some(&lx)).unwrap();
        assert_eq!(&mutual[..], &again[..]);
    }

    #[test]
    fn ke_validates_lengths() {
        let s = session(CurveId::P256);

        let mx = ecc::ecdh(&s.p_i, &s.cap_b_r).unwrap();
        let nx = ecc::ecdh(&s.p_i, &s.cap_p_r).unwrap();

        assert!(derive_ke(&s.i_nonce[..15], &s.r_nonce, &mx, &nx, None).is_err());
        assert!(derive_ke(&s.i_nonce, &s.r_nonce, &mx, &nx[..31], None).is_err());
        assert!(derive_ke(&s.i_nonce, &s.r_nonce, &mx[..20], &nx[..20], None).is_err());
    }

    #[test]
    fn confirmation_digests_are_domain_separated() {
        for curve in [CurveId::P256, CurveId::P384] {
            let s = session(curve);

            let r_auth = derive_r_auth(
                &s.i_nonce,
                &s.r_nonce,
                &s.cap_p_i,
                &s.cap_p_r,
                Some(&s.cap_b_i),
                &s.cap_b_r,
            )
            .unwrap();

            let i_auth = derive_i_auth(
                &s.r_nonce,
                &s.i_nonce,
                &s.cap_p_r,
                &s.cap_p_i,
                &s.cap_b_r,
                Some(&s.cap_b_i),
            )
            .unwrap();

            assert_eq!(r_auth.len(), curve.scalar_bytes());
            assert_ne!(&r_auth[..], &i_auth[..]);
        }
    }

    #[test]
    fn responder_only_digests_differ_from_mutual() {
        let s = session(CurveId::P256);

        let mutual = derive_r_auth(
            &s.i_nonce,
            &s.r_nonce,
            &s.cap_p_i,
            &s.cap_p_r,
            Some(&s.cap_b_i),
            &s.cap_b_r,
        )
        .unwrap();

        let responder_only = derive_r_auth(
            &s.i_nonce,
            &s.r_nonce,
            &s.cap_p_i,
            &s.cap_p_r,
            None,
            &s.cap_b_r,
        )
        .unwrap();

        assert_ne!(&mutual[..], &responder_only[..]);
    }

    #[test]
    fn digests_reject_mixed_curves_and_bad_nonces() {
        let s256 = session(CurveId::P256);
        let s384 = session(CurveId::P384);

        assert!(derive_r_auth(
            &s256.i_nonce,
            &s256.r_nonce,
            &s256.cap_p_i,
            &s384.cap_p_r,
            None,
            &s256.cap_b_r,
        )
        .is_err());

        assert!(derive_r_auth(
            &s256.i_nonce[..8],
            &s256.r_nonce,
            &s256.cap_p_i,
            &s256.cap_p_r,
            None,
            &s256.cap_b_r,
        )
        .is_err());
    }
}
