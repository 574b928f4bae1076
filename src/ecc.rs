//! Elliptic curve backend
//!
//! DPP runs over the NIST prime curves P-256 and P-384. This module is the
//! thin adapter the rest of the crate goes through: curve-tagged scalars and
//! points carrying the checks the protocol requires (scalars in `[1, n-1]`,
//! points on the curve and never the identity), the point formats DPP frames
//! and bootstrapping keys use, and plain ECDH.
//!
//! Scalars and points remember which curve they belong to; mixing values
//! from different curves in one operation fails rather than producing
//! garbage.

use p256::elliptic_curve::group::Group;
use p256::elliptic_curve::ops::Reduce;
use p256::elliptic_curve::point::AffineCoordinates;
use p256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use p256::elliptic_curve::{Field, PrimeField};
use rand_core::OsRng;
use zeroize::{Zeroize, Zeroizing};

use crate::Error;

/// The curves DPP can bootstrap over
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CurveId {
    P256,
    P384,
}

impl CurveId {
    /// Width in bytes of a scalar or a single affine coordinate
    pub fn scalar_bytes(self) -> usize {
        match self {
            CurveId::P256 => 32,
            CurveId::P384 => 48,
        }
    }

    /// Width in bytes of the protocol nonces used with this curve
    pub fn nonce_bytes(self) -> usize {
        match self {
            CurveId::P256 => 16,
            CurveId::P384 => 24,
        }
    }

    /// The IANA IKE group number, the value of the Finite Cyclic Group
    /// attribute
    pub fn ike_group(self) -> u16 {
        match self {
            CurveId::P256 => 19,
            CurveId::P384 => 20,
        }
    }

    /// Inverse of [`CurveId::ike_group`]
    pub fn from_ike_group(group: u16) -> Result<CurveId, Error> {
        match group {
            19 => Ok(CurveId::P256),
            20 => Ok(CurveId::P384),
            _ => Err(Error::UnsupportedParameter),
        }
    }
}

#[derive(Clone)]
enum ScalarRepr {
    P256(p256::Scalar),
    P384(p384::Scalar),
}

/// A scalar in `[1, n-1]` where `n` is the order of its curve's group
///
/// Used for private keys and for the reduced hashes PKEX turns into point
/// multipliers. The inner value is wiped when the scalar is dropped.
#[derive(Clone)]
pub struct Scalar {
    curve: CurveId,
    repr: ScalarRepr,
}

impl Scalar {
    /// Build a scalar from `scalar_bytes(curve)` big-endian bytes
    ///
    /// Zero and values at or above the group order are rejected.
    pub fn from_bytes(curve: CurveId, bytes: &[u8]) -> Result<Scalar, Error> {
        if bytes.len() != curve.scalar_bytes() {
            return Err(Error::MalformedInput);
        }

        let repr = match curve {
            CurveId::P256 => {
                let s = Option::<p256::Scalar>::from(p256::Scalar::from_repr(
                    p256::FieldBytes::clone_from_slice(bytes),
                ))
                .ok_or(Error::CryptoVerifyFailure)?;

                if s.is_zero().into() {
                    return Err(Error::CryptoVerifyFailure);
                }

                ScalarRepr::P256(s)
            }
            CurveId::P384 => {
                let s = Option::<p384::Scalar>::from(p384::Scalar::from_repr(
                    p384::FieldBytes::clone_from_slice(bytes),
                ))
                .ok_or(Error::CryptoVerifyFailure)?;

                if s.is_zero().into() {
                    return Err(Error::CryptoVerifyFailure);
                }

                ScalarRepr::P384(s)
            }
        };

        Ok(Scalar { curve, repr })
    }

    /// Draw a uniform nonzero scalar from the system CSPRNG
    pub fn random(curve: CurveId) -> Scalar {
        let repr = match curve {
            CurveId::P256 => loop {
                let s = p256::Scalar::random(&mut OsRng);
                if !bool::from(s.is_zero()) {
                    break ScalarRepr::P256(s);
                }
            },
            CurveId::P384 => loop {
                let s = p384::Scalar::random(&mut OsRng);
                if !bool::from(s.is_zero()) {
                    break ScalarRepr::P384(s);
                }
            },
        };

        Scalar { curve, repr }
    }

    /// Interpret a hash output as a scalar, reducing it modulo the group
    /// order
    ///
    /// The digest must be exactly `scalar_bytes(curve)` wide, which holds
    /// for the curve-matched hashes DPP uses.
    pub(crate) fn from_hash(curve: CurveId, digest: &[u8]) -> Result<Scalar, Error> {
        if digest.len() != curve.scalar_bytes() {
            return Err(Error::CryptoVerifyFailure);
        }

        let repr = match curve {
            CurveId::P256 => {
                let s = p256::Scalar::reduce_bytes(p256::FieldBytes::from_slice(digest));

                if s.is_zero().into() {
                    return Err(Error::CryptoVerifyFailure);
                }

                ScalarRepr::P256(s)
            }
            CurveId::P384 => {
                let s = p384::Scalar::reduce_bytes(p384::FieldBytes::from_slice(digest));

                if s.is_zero().into() {
                    return Err(Error::CryptoVerifyFailure);
                }

                ScalarRepr::P384(s)
            }
        };

        Ok(Scalar { curve, repr })
    }

    /// Sum modulo the group order
    ///
    /// This is the reduction the responder-side mutual-authentication secret
    /// depends on; the sum wraps around `n`, it is never the plain integer
    /// sum.
    pub fn add(&self, other: &Scalar) -> Result<Scalar, Error> {
        if self.curve != other.curve {
            return Err(Error::CryptoVerifyFailure);
        }

        let repr = match (&self.repr, &other.repr) {
            (ScalarRepr::P256(a), ScalarRepr::P256(b)) => {
                let s = a + b;

                if s.is_zero().into() {
                    return Err(Error::CryptoVerifyFailure);
                }

                ScalarRepr::P256(s)
            }
            (ScalarRepr::P384(a), ScalarRepr::P384(b)) => {
                let s = a + b;

                if s.is_zero().into() {
                    return Err(Error::CryptoVerifyFailure);
                }

                ScalarRepr::P384(s)
            }
            _ => return Err(Error::CryptoVerifyFailure),
        };

        Ok(Scalar {
            curve: self.curve,
            repr,
        })
    }

    /// Fixed-width big-endian bytes, `scalar_bytes(curve)` long
    pub fn to_bytes(&self) -> Zeroizing<Vec<u8>> {
        match &self.repr {
            ScalarRepr::P256(s) => {
                let mut repr = s.to_repr();
                let out = Zeroizing::new(repr.to_vec());
                repr.as_mut_slice().zeroize();
                out
            }
            ScalarRepr::P384(s) => {
                let mut repr = s.to_repr();
                let out = Zeroizing::new(repr.to_vec());
                repr.as_mut_slice().zeroize();
                out
            }
        }
    }

    pub fn curve(&self) -> CurveId {
        self.curve
    }
}

impl Drop for Scalar {
    fn drop(&mut self) {
        match &mut self.repr {
            ScalarRepr::P256(s) => s.zeroize(),
            ScalarRepr::P384(s) => s.zeroize(),
        }
    }
}

/// Serialized shapes of an affine point
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointEncoding {
    /// Both coordinates back to back, `x ‖ y`
    Full,
    /// The x coordinate alone; y is recovered deterministically as the even
    /// solution
    Compliant,
    /// The x coordinate alone, y is the even solution
    CompressedBit0,
    /// The x coordinate alone, y is the odd solution
    CompressedBit1,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PointRepr {
    P256(p256::AffinePoint),
    P384(p384::AffinePoint),
}

/// A point on one of the supported curves
///
/// Always a member of the prime-order group and never the point at
/// infinity; every decoding path verifies the curve equation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Point {
    curve: CurveId,
    repr: PointRepr,
}

impl Point {
    /// Decode a point from one of the wire shapes of [`PointEncoding`]
    pub fn from_data(curve: CurveId, encoding: PointEncoding, data: &[u8]) -> Result<Point, Error> {
        let width = curve.scalar_bytes();

        let (tag, body) = match encoding {
            PointEncoding::Full => (0x04, data),
            PointEncoding::Compliant | PointEncoding::CompressedBit0 => (0x02, data),
            PointEncoding::CompressedBit1 => (0x03, data),
        };

        let expected = match encoding {
            PointEncoding::Full => 2 * width,
            _ => width,
        };

        if body.len() != expected {
            return Err(Error::MalformedInput);
        }

        let mut sec1 = Vec::with_capacity(1 + body.len());
        sec1.push(tag);
        sec1.extend_from_slice(body);

        Self::from_sec1(curve, &sec1)
    }

    /// Decode a SEC1 point (`0x02`/`0x03` compressed or `0x04` uncompressed
    /// prefix)
    pub fn from_sec1(curve: CurveId, data: &[u8]) -> Result<Point, Error> {
        let repr = match curve {
            CurveId::P256 => {
                let encoded =
                    p256::EncodedPoint::from_bytes(data).map_err(|_| Error::CryptoVerifyFailure)?;

                if encoded.is_identity() {
                    return Err(Error::CryptoVerifyFailure);
                }

                let point =
                    Option::<p256::AffinePoint>::from(p256::AffinePoint::from_encoded_point(&encoded))
                        .ok_or(Error::CryptoVerifyFailure)?;

                PointRepr::P256(point)
            }
            CurveId::P384 => {
                let encoded =
                    p384::EncodedPoint::from_bytes(data).map_err(|_| Error::CryptoVerifyFailure)?;

                if encoded.is_identity() {
                    return Err(Error::CryptoVerifyFailure);
                }

                let point =
                    Option::<p384::AffinePoint>::from(p384::AffinePoint::from_encoded_point(&encoded))
                        .ok_or(Error::CryptoVerifyFailure)?;

                PointRepr::P384(point)
            }
        };

        Ok(Point { curve, repr })
    }

    /// The group generator
    pub fn generator(curve: CurveId) -> Point {
        let repr = match curve {
            CurveId::P256 => PointRepr::P256(p256::AffinePoint::GENERATOR),
            CurveId::P384 => PointRepr::P384(p384::AffinePoint::GENERATOR),
        };

        Point { curve, repr }
    }

    /// SEC1 compressed encoding, `0x02`/`0x03` tag followed by x
    pub fn to_sec1(&self) -> Vec<u8> {
        match &self.repr {
            PointRepr::P256(p) => p.to_encoded_point(true).as_bytes().to_vec(),
            PointRepr::P384(p) => p.to_encoded_point(true).as_bytes().to_vec(),
        }
    }

    /// Both coordinates back to back, `x ‖ y`
    pub fn to_full_bytes(&self) -> Vec<u8> {
        match &self.repr {
            PointRepr::P256(p) => p.to_encoded_point(false).as_bytes()[1..].to_vec(),
            PointRepr::P384(p) => p.to_encoded_point(false).as_bytes()[1..].to_vec(),
        }
    }

    /// The affine x coordinate, fixed width big-endian
    pub fn x(&self) -> Vec<u8> {
        match &self.repr {
            PointRepr::P256(p) => p.x().to_vec(),
            PointRepr::P384(p) => p.x().to_vec(),
        }
    }

    pub fn y_is_odd(&self) -> bool {
        match &self.repr {
            PointRepr::P256(p) => p.y_is_odd().into(),
            PointRepr::P384(p) => p.y_is_odd().into(),
        }
    }

    pub fn curve(&self) -> CurveId {
        self.curve
    }

    /// Point addition; an identity result is rejected
    pub fn add(&self, other: &Point) -> Result<Point, Error> {
        if self.curve != other.curve {
            return Err(Error::CryptoVerifyFailure);
        }

        let repr = match (&self.repr, &other.repr) {
            (PointRepr::P256(a), PointRepr::P256(b)) => {
                let sum = p256::ProjectivePoint::from(*a) + p256::ProjectivePoint::from(*b);

                if sum.is_identity().into() {
                    return Err(Error::CryptoVerifyFailure);
                }

                PointRepr::P256(sum.to_affine())
            }
            (PointRepr::P384(a), PointRepr::P384(b)) => {
                let sum = p384::ProjectivePoint::from(*a) + p384::ProjectivePoint::from(*b);

                if sum.is_identity().into() {
                    return Err(Error::CryptoVerifyFailure);
                }

                PointRepr::P384(sum.to_affine())
            }
            _ => return Err(Error::CryptoVerifyFailure),
        };

        Ok(Point {
            curve: self.curve,
            repr,
        })
    }

    /// The point with the same x and the opposite y
    pub fn negate(&self) -> Point {
        let repr = match &self.repr {
            PointRepr::P256(p) => PointRepr::P256(-*p),
            PointRepr::P384(p) => PointRepr::P384(-*p),
        };

        Point {
            curve: self.curve,
            repr,
        }
    }

    /// Scalar multiplication; an identity result is rejected
    pub fn mul(&self, scalar: &Scalar) -> Result<Point, Error> {
        if self.curve != scalar.curve {
            return Err(Error::CryptoVerifyFailure);
        }

        let repr = match (&self.repr, &scalar.repr) {
            (PointRepr::P256(p), ScalarRepr::P256(s)) => {
                let product = p256::ProjectivePoint::from(*p) * s;

                if product.is_identity().into() {
                    return Err(Error::CryptoVerifyFailure);
                }

                PointRepr::P256(product.to_affine())
            }
            (PointRepr::P384(p), ScalarRepr::P384(s)) => {
                let product = p384::ProjectivePoint::from(*p) * s;

                if product.is_identity().into() {
                    return Err(Error::CryptoVerifyFailure);
                }

                PointRepr::P384(product.to_affine())
            }
            _ => return Err(Error::CryptoVerifyFailure),
        };

        Ok(Point {
            curve: self.curve,
            repr,
        })
    }
}

/// Diffie-Hellman: the x coordinate of `private · peer`, fixed width
///
/// The result owns its bytes and wipes them on drop. A degenerate result
/// (the identity) or a curve mismatch fails.
pub fn ecdh(private: &Scalar, peer: &Point) -> Result<Zeroizing<Vec<u8>>, Error> {
    let shared = peer.mul(private)?;

    Ok(Zeroizing::new(shared.x()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_hex(hex: &str) -> Vec<u8> {
        let hex: String = hex.chars().filter(|c| !c.is_whitespace()).collect();

        hex.as_bytes()
            .chunks(2)
            .map(|pair| u8::from_str_radix(core::str::from_utf8(pair).unwrap(), 16).unwrap())
            .collect()
    }

    /// The order of the P-256 group
    const P256_ORDER: &str = "ffffffff 00000000 ffffffff ffffffff bce6faad a7179e84 f3b9cac2 fc632551";

    #[test]
    fn scalar_rejects_zero_and_order() {
        assert!(Scalar::from_bytes(CurveId::P256, &[0u8; 32]).is_err());

        let order = parse_hex(P256_ORDER);
        assert!(Scalar::from_bytes(CurveId::P256, &order).is_err());

        let mut order_minus_one = parse_hex(P256_ORDER);
        *order_minus_one.last_mut().unwrap() -= 1;
        assert!(Scalar::from_bytes(CurveId::P256, &order_minus_one).is_ok());
    }

    #[test]
    fn scalar_rejects_bad_width() {
        assert!(Scalar::from_bytes(CurveId::P256, &[1u8; 31]).is_err());
        assert!(Scalar::from_bytes(CurveId::P384, &[1u8; 32]).is_err());
        assert!(Scalar::from_bytes(CurveId::P384, &[1u8; 48]).is_ok());
    }

    #[test]
    fn scalar_round_trips() {
        let mut bytes = [0u8; 32];
        bytes[31] = 0x2a;

        let scalar = Scalar::from_bytes(CurveId::P256, &bytes).unwrap();
        assert_eq!(&scalar.to_bytes()[..], &bytes[..]);
    }

    #[test]
    fn scalar_add_reduces_modulo_order() {
        let mut one = [0u8; 32];
        one[31] = 1;

        let mut order_minus_one = parse_hex(P256_ORDER);
        *order_minus_one.last_mut().unwrap() -= 1;

        let a = Scalar::from_bytes(CurveId::P256, &order_minus_one).unwrap();
        let b = Scalar::from_bytes(CurveId::P256, &one).unwrap();

        // (n - 1) + 1 == 0 mod n, which is out of range
        assert!(a.add(&b).is_err());

        let c = Scalar::from_bytes(CurveId::P256, &one).unwrap();
        let two = b.add(&c).unwrap();
        let mut expected = [0u8; 32];
        expected[31] = 2;
        assert_eq!(&two.to_bytes()[..], &expected[..]);
    }

    #[test]
    fn cross_curve_operations_fail() {
        let a = Scalar::random(CurveId::P256);
        let b = Scalar::random(CurveId::P384);
        assert!(a.add(&b).is_err());

        let g256 = Point::generator(CurveId::P256);
        let g384 = Point::generator(CurveId::P384);
        assert!(g256.add(&g384).is_err());
        assert!(g256.mul(&b).is_err());
        assert!(ecdh(&b, &g256).is_err());
    }

    #[test]
    fn point_sec1_round_trip() {
        for curve in [CurveId::P256, CurveId::P384] {
            let point = Point::generator(curve).mul(&Scalar::random(curve)).unwrap();

            let sec1 = point.to_sec1();
            assert_eq!(sec1.len(), 1 + curve.scalar_bytes());
            assert!(sec1[0] == 0x02 || sec1[0] == 0x03);

            assert_eq!(Point::from_sec1(curve, &sec1).unwrap(), point);
        }
    }

    #[test]
    fn point_full_and_compressed_round_trip() {
        let point = Point::generator(CurveId::P256)
            .mul(&Scalar::random(CurveId::P256))
            .unwrap();

        let full = point.to_full_bytes();
        assert_eq!(full.len(), 64);
        assert_eq!(
            Point::from_data(CurveId::P256, PointEncoding::Full, &full).unwrap(),
            point
        );

        let encoding = if point.y_is_odd() {
            PointEncoding::CompressedBit1
        } else {
            PointEncoding::CompressedBit0
        };
        assert_eq!(
            Point::from_data(CurveId::P256, encoding, &point.x()).unwrap(),
            point
        );
    }

    #[test]
    fn compliant_decoding_takes_even_y() {
        let point = Point::generator(CurveId::P256)
            .mul(&Scalar::random(CurveId::P256))
            .unwrap();

        let compliant = Point::from_data(CurveId::P256, PointEncoding::Compliant, &point.x()).unwrap();

        assert_eq!(compliant.x(), point.x());
        assert!(!compliant.y_is_odd());
    }

    #[test]
    fn point_rejects_off_curve_and_identity() {
        let point = Point::generator(CurveId::P256)
            .mul(&Scalar::random(CurveId::P256))
            .unwrap();

        let mut full = point.to_full_bytes();
        full[40] ^= 0x01;
        assert_eq!(
            Point::from_data(CurveId::P256, PointEncoding::Full, &full),
            Err(Error::CryptoVerifyFailure)
        );

        assert!(Point::from_sec1(CurveId::P256, &[0x00]).is_err());
        assert!(Point::from_sec1(CurveId::P256, &[]).is_err());
    }

    #[test]
    fn negation_flips_y() {
        let point = Point::generator(CurveId::P256)
            .mul(&Scalar::random(CurveId::P256))
            .unwrap();

        let negated = point.negate();

        assert_eq!(negated.x(), point.x());
        assert_ne!(negated.y_is_odd(), point.y_is_odd());
        assert_eq!(negated.negate(), point);

        // A point plus its negation is the identity, which no operation
        // may produce
        assert!(point.add(&negated).is_err());
    }

    #[test]
    fn ecdh_is_symmetric() {
        for curve in [CurveId::P256, CurveId::P384] {
            let a = Scalar::random(curve);
            let b = Scalar::random(curve);

            let pub_a = Point::generator(curve).mul(&a).unwrap();
            let pub_b = Point::generator(curve).mul(&b).unwrap();

            let shared_a = ecdh(&a, &pub_b).unwrap();
            let shared_b = ecdh(&b, &pub_a).unwrap();

            assert_eq!(&shared_a[..], &shared_b[..]);
            assert_eq!(shared_a.len(), curve.scalar_bytes());
        }
    }

    #[test]
    fn ike_groups() {
        assert_eq!(CurveId::P256.ike_group(), 19);
        assert_eq!(CurveId::from_ike_group(20), Ok(CurveId::P384));
        assert!(CurveId::from_ike_group(21).is_err());
    }
}
