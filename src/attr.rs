//! DPP attributes
//!
//! Every DPP frame body after the fixed header is a run of attributes:
//! little-endian 16-bit type, little-endian 16-bit length, then the value.
//! Unknown attribute types must still iterate cleanly, so the iterator
//! yields raw type values; [`AttributeType::from_val`] maps the known ones.
//!
//! Confidential attributes travel inside a Wrapped Data attribute: the inner
//! attributes are serialized back to back and sealed with AES-SIV (RFC 5297)
//! under the key-schedule key of the moment, with the unwrapped portion of
//! the frame as associated data. The wrapped value is the ciphertext
//! followed by the 16-byte synthetic IV.

use aes::Aes192;
use aes_siv::aead::KeyInit;
use aes_siv::siv::{Aes128Siv, Aes256Siv, Siv};
use cmac::Cmac;
use generic_array::GenericArray;
use zeroize::Zeroizing;

use crate::Error;

type Aes192Siv = Siv<Aes192, Cmac<Aes192>>;

/// Width of the synthetic IV AES-SIV appends
pub const SIV_LEN: usize = 16;

/// Attribute identifiers from Easy Connect specification v2.0, Table 16
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttributeType {
    Status,
    InitiatorBootKeyHash,
    ResponderBootKeyHash,
    InitiatorProtocolKey,
    WrappedData,
    InitiatorNonce,
    InitiatorCapabilities,
    ResponderNonce,
    ResponderCapabilities,
    ResponderProtocolKey,
    InitiatorAuthTag,
    ResponderAuthTag,
    ConfigurationObject,
    Connector,
    ConfigurationRequestObject,
    BootstrappingKey,
    FiniteCyclicGroup,
    EncryptedKey,
    EnrolleeNonce,
    CodeIdentifier,
    TransactionId,
    BootstrappingInfo,
    Channel,
    ProtocolVersion,
    EnvelopedData,
    SendConnStatus,
    ConnStatus,
    ReconfigurationFlags,
    CSignKeyHash,
    CsrAttributesRequest,
    ANonce,
    EPrimeId,
    ConfiguratorNonce,
}

impl AttributeType {
    pub fn val(self) -> u16 {
        match self {
            AttributeType::Status => 0x1000,
            AttributeType::InitiatorBootKeyHash => 0x1001,
            AttributeType::ResponderBootKeyHash => 0x1002,
            AttributeType::InitiatorProtocolKey => 0x1003,
            AttributeType::WrappedData => 0x1004,
            AttributeType::InitiatorNonce => 0x1005,
            AttributeType::InitiatorCapabilities => 0x1006,
            AttributeType::ResponderNonce => 0x1007,
            AttributeType::ResponderCapabilities => 0x1008,
            AttributeType::ResponderProtocolKey => 0x1009,
            AttributeType::InitiatorAuthTag => 0x100a,
            AttributeType::ResponderAuthTag => 0x100b,
            AttributeType::ConfigurationObject => 0x100c,
            AttributeType::Connector => 0x100d,
            AttributeType::ConfigurationRequestObject => 0x100e,
            AttributeType::BootstrappingKey => 0x100f,
            AttributeType::FiniteCyclicGroup => 0x1012,
            AttributeType::EncryptedKey => 0x1013,
            AttributeType::EnrolleeNonce => 0x1014,
            AttributeType::CodeIdentifier => 0x1015,
            AttributeType::TransactionId => 0x1016,
            AttributeType::BootstrappingInfo => 0x1017,
            AttributeType::Channel => 0x1018,
            AttributeType::ProtocolVersion => 0x1019,
            AttributeType::EnvelopedData => 0x101a,
            AttributeType::SendConnStatus => 0x101b,
            AttributeType::ConnStatus => 0x101c,
            AttributeType::ReconfigurationFlags => 0x101d,
            AttributeType::CSignKeyHash => 0x101e,
            AttributeType::CsrAttributesRequest => 0x101f,
            AttributeType::ANonce => 0x1020,
            AttributeType::EPrimeId => 0x1021,
            AttributeType::ConfiguratorNonce => 0x1022,
        }
    }

    pub fn from_val(val: u16) -> Option<AttributeType> {
        match val {
            0x1000 => Some(AttributeType::Status),
            0x1001 => Some(AttributeType::InitiatorBootKeyHash),
            0x1002 => Some(AttributeType::ResponderBootKeyHash),
            0x1003 => Some(AttributeType::InitiatorProtocolKey),
            0x1004 => Some(AttributeType::WrappedData),
            0x1005 => Some(AttributeType::InitiatorNonce),
            0x1006 => Some(AttributeType::InitiatorCapabilities),
            0x1007 => Some(AttributeType::ResponderNonce),
            0x1008 => Some(AttributeType::ResponderCapabilities),
            0x1009 => Some(AttributeType::ResponderProtocolKey),
            0x100a => Some(AttributeType::InitiatorAuthTag),
            0x100b => Some(AttributeType::ResponderAuthTag),
            0x100c => Some(AttributeType::ConfigurationObject),
            0x100d => Some(AttributeType::Connector),
            0x100e => Some(AttributeType::ConfigurationRequestObject),
            0x100f => Some(AttributeType::BootstrappingKey),
            0x1012 => Some(AttributeType::FiniteCyclicGroup),
            0x1013 => Some(AttributeType::EncryptedKey),
            0x1014 => Some(AttributeType::EnrolleeNonce),
            0x1015 => Some(AttributeType::CodeIdentifier),
            0x1016 => Some(AttributeType::TransactionId),
            0x1017 => Some(AttributeType::BootstrappingInfo),
            0x1018 => Some(AttributeType::Channel),
            0x1019 => Some(AttributeType::ProtocolVersion),
            0x101a => Some(AttributeType::EnvelopedData),
            0x101b => Some(AttributeType::SendConnStatus),
            0x101c => Some(AttributeType::ConnStatus),
            0x101d => Some(AttributeType::ReconfigurationFlags),
            0x101e => Some(AttributeType::CSignKeyHash),
            0x101f => Some(AttributeType::CsrAttributesRequest),
            0x1020 => Some(AttributeType::ANonce),
            0x1021 => Some(AttributeType::EPrimeId),
            0x1022 => Some(AttributeType::ConfiguratorNonce),
            _ => None,
        }
    }
}

/// Values of the Status attribute, Easy Connect specification v2.0 Table 18
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Ok,
    NotCompatible,
    AuthFailure,
    BadCode,
    BadGroup,
    ConfigureFailure,
    ResponsePending,
    InvalidConnector,
    NoMatch,
    ConfigRejected,
    NoAp,
    ConfigurePending,
    CsrNeeded,
    CsrBad,
    NewKeyNeeded,
}

impl Status {
    pub fn val(self) -> u8 {
        match self {
            Status::Ok => 0,
            Status::NotCompatible => 1,
            Status::AuthFailure => 2,
            Status::BadCode => 3,
            Status::BadGroup => 4,
            Status::ConfigureFailure => 5,
            Status::ResponsePending => 6,
            Status::InvalidConnector => 7,
            Status::NoMatch => 8,
            Status::ConfigRejected => 9,
            Status::NoAp => 10,
            Status::ConfigurePending => 11,
            Status::CsrNeeded => 12,
            Status::CsrBad => 13,
            Status::NewKeyNeeded => 14,
        }
    }

    pub fn from_val(val: u8) -> Option<Status> {
        match val {
            0 => Some(Status::Ok),
            1 => Some(Status::NotCompatible),
            2 => Some(Status::AuthFailure),
            3 => Some(Status::BadCode),
            4 => Some(Status::BadGroup),
            5 => Some(Status::ConfigureFailure),
            6 => Some(Status::ResponsePending),
            7 => Some(Status::InvalidConnector),
            8 => Some(Status::NoMatch),
            9 => Some(Status::ConfigRejected),
            10 => Some(Status::NoAp),
            11 => Some(Status::ConfigurePending),
            12 => Some(Status::CsrNeeded),
            13 => Some(Status::CsrBad),
            14 => Some(Status::NewKeyNeeded),
            _ => None,
        }
    }
}

/// DPP public action frame types, Easy Connect specification v2.0 Table 31
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameType {
    AuthenticationRequest,
    AuthenticationResponse,
    AuthenticationConfirm,
    PeerDiscoveryRequest,
    PeerDiscoveryResponse,
    PkexVersion1ExchangeRequest,
    PkexExchangeResponse,
    PkexCommitRevealRequest,
    PkexCommitRevealResponse,
    ConfigurationResult,
    ConnectionStatusResult,
    PresenceAnnouncement,
    PkexExchangeRequest,
}

impl FrameType {
    pub fn val(self) -> u8 {
        match self {
            FrameType::AuthenticationRequest => 0,
            FrameType::AuthenticationResponse => 1,
            FrameType::AuthenticationConfirm => 2,
            FrameType::PeerDiscoveryRequest => 5,
            FrameType::PeerDiscoveryResponse => 6,
            FrameType::PkexVersion1ExchangeRequest => 7,
            FrameType::PkexExchangeResponse => 8,
            FrameType::PkexCommitRevealRequest => 9,
            FrameType::PkexCommitRevealResponse => 10,
            FrameType::ConfigurationResult => 11,
            FrameType::ConnectionStatusResult => 12,
            FrameType::PresenceAnnouncement => 13,
            FrameType::PkexExchangeRequest => 18,
        }
    }
}

/// The Wi-Fi Alliance OUI carried by every DPP action frame
pub const WFA_OUI: [u8; 3] = [0x50, 0x6f, 0x9a];

/// The fixed header of a DPP public action frame
///
/// Category (public action), vendor-specific action, the WFA OUI, the DPP
/// OUI type, the crypto suite, and the frame type. Attributes follow
/// immediately after.
pub fn frame_header(frame_type: FrameType) -> [u8; 8] {
    [
        0x04,
        0x09,
        WFA_OUI[0],
        WFA_OUI[1],
        WFA_OUI[2],
        0x1a,
        0x01,
        frame_type.val(),
    ]
}

/// Append one attribute to a buffer
pub fn append(buf: &mut Vec<u8>, attr_type: AttributeType, value: &[u8]) -> Result<(), Error> {
    if value.len() > usize::from(u16::MAX) {
        return Err(Error::MalformedInput);
    }

    buf.extend_from_slice(&attr_type.val().to_le_bytes());
    buf.extend_from_slice(&(value.len() as u16).to_le_bytes());
    buf.extend_from_slice(value);

    Ok(())
}

/// Iterate the attributes packed in `data`
pub fn iterate(data: &[u8]) -> AttrIterator {
    AttrIterator { data, failed: false }
}

/// Yields `(raw type, value)` pairs until the buffer is exhausted
///
/// A declared length running past the end of the buffer yields one `Err`
/// and ends the iteration.
pub struct AttrIterator<'a> {
    data: &'a [u8],
    failed: bool,
}

impl<'a> Iterator for AttrIterator<'a> {
    type Item = Result<(u16, &'a [u8]), Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.data.is_empty() {
            return None;
        }

        if self.data.len() < 4 {
            self.failed = true;

            return Some(Err(Error::MalformedInput));
        }

        let attr_type = u16::from_le_bytes([self.data[0], self.data[1]]);
        let len = usize::from(u16::from_le_bytes([self.data[2], self.data[3]]));

        if self.data.len() - 4 < len {
            self.failed = true;

            return Some(Err(Error::MalformedInput));
        }

        let value = &self.data[4..4 + len];

        self.data = &self.data[4 + len..];

        Some(Ok((attr_type, value)))
    }
}

/// Serialize `attrs` and seal them into a Wrapped Data attribute
///
/// `ad0`/`ad1` are the associated data pieces, typically the frame header
/// and the attributes preceding the wrapped one; either may be omitted and
/// the remaining pieces keep their order. The key width picks the AES-SIV
/// flavor (32, 48, or 64 bytes). The returned bytes are the complete outer
/// TLV.
pub fn wrap(
    key: &[u8],
    ad0: Option<&[u8]>,
    ad1: Option<&[u8]>,
    attrs: &[(AttributeType, &[u8])],
) -> Result<Vec<u8>, Error> {
    let mut buffer = Vec::new();

    for (attr_type, value) in attrs {
        append(&mut buffer, *attr_type, value)?;
    }

    let headers = ad_vector(ad0, ad1);

    let tag = match key.len() {
        32 => Aes128Siv::new_from_slice(key)
            .map_err(|_| Error::UnsupportedParameter)?
            .encrypt_in_place_detached(&headers, &mut buffer)
            .map_err(|_| Error::CryptoVerifyFailure)?,
        48 => Aes192Siv::new_from_slice(key)
            .map_err(|_| Error::UnsupportedParameter)?
            .encrypt_in_place_detached(&headers, &mut buffer)
            .map_err(|_| Error::CryptoVerifyFailure)?,
        64 => Aes256Siv::new_from_slice(key)
            .map_err(|_| Error::UnsupportedParameter)?
            .encrypt_in_place_detached(&headers, &mut buffer)
            .map_err(|_| Error::CryptoVerifyFailure)?,
        _ => return Err(Error::UnsupportedParameter),
    };

    let value_len = buffer.len() + SIV_LEN;

    if value_len > usize::from(u16::MAX) {
        return Err(Error::MalformedInput);
    }

    let mut out = Vec::with_capacity(4 + value_len);

    out.extend_from_slice(&AttributeType::WrappedData.val().to_le_bytes());
    out.extend_from_slice(&(value_len as u16).to_le_bytes());
    out.extend_from_slice(&buffer);
    out.extend_from_slice(&tag);

    Ok(out)
}

/// Open the value of a Wrapped Data attribute
///
/// `wrapped` is the attribute value, ciphertext followed by the synthetic
/// IV. The associated data must match what the sealer supplied byte for
/// byte. On a tag mismatch nothing is returned; on success the plaintext
/// attributes are returned in a buffer that wipes itself when dropped.
pub fn unwrap(
    key: &[u8],
    ad0: Option<&[u8]>,
    ad1: Option<&[u8]>,
    wrapped: &[u8],
) -> Result<Zeroizing<Vec<u8>>, Error> {
    if wrapped.len() < SIV_LEN {
        return Err(Error::MalformedInput);
    }

    let (ciphertext, tag_bytes) = wrapped.split_at(wrapped.len() - SIV_LEN);
    let tag = GenericArray::from_slice(tag_bytes);

    let headers = ad_vector(ad0, ad1);

    let mut buffer = Zeroizing::new(ciphertext.to_vec());

    match key.len() {
        32 => Aes128Siv::new_from_slice(key)
            .map_err(|_| Error::UnsupportedParameter)?
            .decrypt_in_place_detached(&headers, buffer.as_mut_slice(), tag)
            .map_err(|_| Error::CryptoVerifyFailure)?,
        48 => Aes192Siv::new_from_slice(key)
            .map_err(|_| Error::UnsupportedParameter)?
            .decrypt_in_place_detached(&headers, buffer.as_mut_slice(), tag)
            .map_err(|_| Error::CryptoVerifyFailure)?,
        64 => Aes256Siv::new_from_slice(key)
            .map_err(|_| Error::UnsupportedParameter)?
            .decrypt_in_place_detached(&headers, buffer.as_mut_slice(), tag)
            .map_err(|_| Error::CryptoVerifyFailure)?,
        _ => return Err(Error::UnsupportedParameter),
    }

    Ok(buffer)
}

fn ad_vector<'a>(ad0: Option<&'a [u8]>, ad1: Option<&'a [u8]>) -> Vec<&'a [u8]> {
    let mut headers = Vec::with_capacity(2);

    if let Some(ad) = ad0 {
        headers.push(ad);
    }

    if let Some(ad) = ad1 {
        headers.push(ad);
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_type_values_round_trip() {
        for val in 0x1000..=0x1022u16 {
            if let Some(attr_type) = AttributeType::from_val(val) {
                assert_eq!(attr_type.val(), val);
            }
        }

        assert_eq!(AttributeType::WrappedData.val(), 0x1004);
        assert_eq!(AttributeType::from_val(0x1010), None);
        assert_eq!(AttributeType::from_val(0x1023), None);
    }

    #[test]
    fn append_and_iterate_round_trip() {
        let mut buf = Vec::new();

        append(&mut buf, AttributeType::InitiatorNonce, &[0xaa; 16]).unwrap();
        append(&mut buf, AttributeType::Status, &[0x00]).unwrap();
        append(&mut buf, AttributeType::Connector, b"").unwrap();

        let attrs: Vec<_> = iterate(&buf).collect::<Result<_, _>>().unwrap();

        assert_eq!(attrs.len(), 3);
        assert_eq!(attrs[0], (0x1005, &[0xaa; 16][..]));
        assert_eq!(attrs[1], (0x1000, &[0x00][..]));
        assert_eq!(attrs[2], (0x100d, &[][..]));
    }

    #[test]
    fn iterate_unknown_types() {
        // 0x1010 is reserved but must still iterate
        let buf = [0x10, 0x10, 0x02, 0x00, 0x01, 0x02];

        let attrs: Vec<_> = iterate(&buf).collect::<Result<_, _>>().unwrap();

        assert_eq!(attrs, [(0x1010, &[0x01, 0x02][..])]);
        assert_eq!(AttributeType::from_val(0x1010), None);
    }

    #[test]
    fn iterate_fails_on_truncation() {
        // Declared length of 5, only 2 bytes of value present
        let buf = [0x00, 0x10, 0x05, 0x00, 0x01, 0x02];

        let mut iter = iterate(&buf);
        assert_eq!(iter.next(), Some(Err(Error::MalformedInput)));
        assert_eq!(iter.next(), None);

        // A bare header fragment
        let mut iter = iterate(&[0x00, 0x10, 0x01]);
        assert_eq!(iter.next(), Some(Err(Error::MalformedInput)));
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn wrap_layout() {
        let key = [0x11; 32];

        let wrapped = wrap(&key, Some(b"header"), None, &[(AttributeType::Status, &[0x00])]).unwrap();

        let attrs: Vec<_> = iterate(&wrapped).collect::<Result<_, _>>().unwrap();
        assert_eq!(attrs.len(), 1);

        let (attr_type, value) = attrs[0];
        assert_eq!(attr_type, AttributeType::WrappedData.val());

        // One status attribute is 5 TLV bytes, plus the trailing SIV
        assert_eq!(value.len(), 5 + SIV_LEN);
    }

    #[test]
    fn wrap_unwrap_round_trip() {
        for key_len in [32usize, 48, 64] {
            let key = vec![0x22; key_len];

            let nonce = [0x5c; 16];
            let wrapped = wrap(
                &key,
                Some(b"frame header"),
                Some(b"preceding attributes"),
                &[
                    (AttributeType::InitiatorNonce, &nonce[..]),
                    (AttributeType::InitiatorCapabilities, &[0x02][..]),
                ],
            )
            .unwrap();

            let attrs: Vec<_> = iterate(&wrapped).collect::<Result<_, _>>().unwrap();
            let plain = unwrap(
                &key,
                Some(b"frame header"),
                Some(b"preceding attributes"),
                attrs[0].1,
            )
            .unwrap();

            let inner: Vec<_> = iterate(&plain).collect::<Result<_, _>>().unwrap();
            assert_eq!(inner.len(), 2);
            assert_eq!(inner[0], (0x1005, &nonce[..]));
            assert_eq!(inner[1], (0x1006, &[0x02][..]));
        }
    }

    #[test]
    fn associated_data_arity() {
        let key = [0x33; 32];
        let attrs = [(AttributeType::Status, &[0x00][..])];

        let both = wrap(&key, Some(b"a"), Some(b"b"), &attrs).unwrap();
        let first = wrap(&key, Some(b"a"), None, &attrs).unwrap();
        let second = wrap(&key, None, Some(b"a"), &attrs).unwrap();
        let none = wrap(&key, None, None, &attrs).unwrap();

        // A lone piece of associated data is a one-element vector no matter
        // which slot it was passed in
        assert_eq!(first, second);

        assert!(unwrap(&key, Some(b"a"), Some(b"b"), &both[4..]).is_ok());
        assert!(unwrap(&key, Some(b"a"), None, &both[4..]).is_err());
        assert!(unwrap(&key, None, None, &none[4..]).is_ok());
        assert!(unwrap(&key, Some(b"x"), None, &first[4..]).is_err());
    }

    #[test]
    fn tampering_is_detected() {
        let key = [0x44; 32];

        let wrapped = wrap(&key, Some(b"ad"), None, &[(AttributeType::Status, &[0x00])]).unwrap();
        let value = &wrapped[4..];

        for bit in 0..value.len() * 8 {
            let mut tampered = value.to_vec();
            tampered[bit / 8] ^= 1 << (bit % 8);

            assert_eq!(
                unwrap(&key, Some(b"ad"), None, &tampered).err(),
                Some(Error::CryptoVerifyFailure)
            );
        }

        // Truncation below the SIV width
        assert_eq!(
            unwrap(&key, Some(b"ad"), None, &value[..SIV_LEN - 1]).err(),
            Some(Error::MalformedInput)
        );
    }

    #[test]
    fn odd_key_widths_fail() {
        assert_eq!(
            wrap(&[0u8; 24], None, None, &[]).err(),
            Some(Error::UnsupportedParameter)
        );
        assert_eq!(
            unwrap(&[0u8; 24], None, None, &[0u8; 16]).err(),
            Some(Error::UnsupportedParameter)
        );
    }

    #[test]
    fn frame_header_layout() {
        let header = frame_header(FrameType::PresenceAnnouncement);

        assert_eq!(header, [0x04, 0x09, 0x50, 0x6f, 0x9a, 0x1a, 0x01, 13]);
        assert_eq!(frame_header(FrameType::PkexExchangeRequest)[7], 18);
    }

    #[test]
    fn status_values_round_trip() {
        for val in 0..=14u8 {
            assert_eq!(Status::from_val(val).map(Status::val), Some(val));
        }

        assert_eq!(Status::from_val(15), None);
    }
}
