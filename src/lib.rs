//! A Wi-Fi Easy Connect (Device Provisioning Protocol) core library
//!
//! This library implements the cryptographic and codec core of the Device
//! Provisioning Protocol, the mechanism behind "scan this QR code to onboard
//! a device" Wi-Fi provisioning. It covers the `DPP:` bootstrapping URI, the
//! SubjectPublicKeyInfo encoding of bootstrapping keys, the attribute TLV
//! format with its AES-SIV wrapped payloads, the DPP Authentication key
//! schedule, the PKEX password-authenticated exchange, and the JSON
//! configuration object delivered to an enrollee.
//!
//! What it deliberately does not do is talk to hardware. Frame transmission,
//! channel scheduling, and the over-the-air state machines belong to a host;
//! this crate only produces and consumes the bytes those layers carry.
//!
//! Everything here is synchronous and free of global state. Values holding
//! secret material (private scalars, derived keys, unwrapped plaintexts) are
//! zeroized when dropped.
//!
//! ```
//! use easy_connect::uri::UriInfo;
//!
//! // A bootstrapping URI must carry a `K:` token and end with `;;`
//! assert!(UriInfo::parse("DPP:V:2;;").is_err());
//! ```

use core::fmt;

pub mod attr;
pub mod auth;
pub mod channels;
pub mod config;
pub mod ecc;
pub mod kdf;
pub mod pkex;
pub mod spki;
pub mod uri;

/// A station MAC address in the order it appears on the wire
pub type MacAddress = [u8; 6];

/// DPP protocol version carried in the URI `V:` token and the Protocol
/// Version attribute
pub const PROTOCOL_VERSION_1: u8 = 1;
pub const PROTOCOL_VERSION_2: u8 = 2;

/// The ways any operation in this crate can fail
///
/// Every public operation returns one of these; nothing is logged and no
/// partial output survives a failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// Input bytes or text do not follow the expected grammar or structure
    MalformedInput,
    /// A curve, version, operating class, length, or algorithm outside the
    /// supported set
    UnsupportedParameter,
    /// A cryptographic check failed: an authentication tag mismatch, a point
    /// not on its curve, a scalar out of range, or a degenerate ECDH result
    CryptoVerifyFailure,
    /// The system could not satisfy an allocation or derivation request
    ResourceExhaustion,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::MalformedInput => write!(f, "Malformed input"),
            Error::UnsupportedParameter => write!(f, "Unsupported parameter"),
            Error::CryptoVerifyFailure => write!(f, "Cryptographic verification failure"),
            Error::ResourceExhaustion => write!(f, "Resource exhaustion"),
        }
    }
}

impl std::error::Error for Error {}
