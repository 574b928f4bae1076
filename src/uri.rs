//! The `DPP:` bootstrapping URI
//!
//! Bootstrapping information travels out of band, most commonly as a QR
//! code, in a compact URI:
//!
//! ```text
//! DPP:C:81/1,115/36;I:SN=4774LH2b4044;M:5254005828e5;V:2;K:MDkw...gIA=;;
//! ```
//!
//! Between the `DPP:` prefix and the `;;` terminator sits a run of
//! single-letter tokens, each ending with `;`. Only the `K:` token (the
//! base64 SubjectPublicKeyInfo of the bootstrapping key) is mandatory;
//! channel hints (`C:`), the device MAC (`M:`), a protocol version (`V:`),
//! free-form information (`I:`), and a host (`H:`) may accompany it in any
//! order.
//!
//! Parsing is all or nothing: any unknown token, duplicated token, bad
//! channel pair, or malformed key fails the whole URI.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::ecc::Point;
use crate::{channels, spki, Error, MacAddress};

/// The contents of a bootstrapping URI
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UriInfo {
    /// The peer's bootstrapping public key
    pub boot_public: Point,
    /// Device MAC address from the `M:` token
    pub mac: Option<MacAddress>,
    /// Protocol version from the `V:` token, 1 or 2
    pub version: Option<u8>,
    /// Listen frequencies in MHz from the `C:` token, in order of
    /// appearance
    pub freqs: Option<Vec<u32>>,
    /// Free-form information from the `I:` token
    pub information: Option<String>,
    /// Host name or address from the `H:` token
    pub host: Option<String>,
}

impl UriInfo {
    pub fn new(boot_public: Point) -> UriInfo {
        UriInfo {
            boot_public,
            mac: None,
            version: None,
            freqs: None,
            information: None,
            host: None,
        }
    }

    /// Parse a bootstrapping URI
    ///
    /// Every deviation from the grammar maps to [`Error::MalformedInput`];
    /// no partial result is ever returned.
    pub fn parse(uri: &str) -> Result<UriInfo, Error> {
        let body = uri
            .strip_prefix("DPP:")
            .and_then(|rest| rest.strip_suffix(";;"))
            .ok_or(Error::MalformedInput)?;

        let mut boot_public = None;
        let mut mac = None;
        let mut version = None;
        let mut freqs = None;
        let mut information = None;
        let mut host = None;

        for token in body.split(';') {
            let (letter, value) = token.split_once(':').ok_or(Error::MalformedInput)?;

            if value.is_empty() {
                return Err(Error::MalformedInput);
            }

            match letter {
                "K" => {
                    let der = STANDARD.decode(value).map_err(|_| Error::MalformedInput)?;
                    let point = spki::decode(&der).map_err(|_| Error::MalformedInput)?;

                    replace_empty(&mut boot_public, point)?;
                }
                "M" => replace_empty(&mut mac, parse_mac(value)?)?,
                "V" => {
                    let v = match value {
                        "1" => 1,
                        "2" => 2,
                        _ => return Err(Error::MalformedInput),
                    };

                    replace_empty(&mut version, v)?;
                }
                "C" => replace_empty(&mut freqs, parse_channel_list(value)?)?,
                "I" => replace_empty(&mut information, value.to_string())?,
                "H" => replace_empty(&mut host, value.to_string())?,
                _ => return Err(Error::MalformedInput),
            }
        }

        Ok(UriInfo {
            boot_public: boot_public.ok_or(Error::MalformedInput)?,
            mac,
            version,
            freqs,
            information,
            host,
        })
    }

    /// Emit this bootstrapping information as a URI
    ///
    /// The key token comes first, then MAC, channels, information, host,
    /// and version, each only if present.
    pub fn to_uri(&self) -> Result<String, Error> {
        let mut uri = String::from("DPP:");

        uri.push_str("K:");
        uri.push_str(&STANDARD.encode(spki::encode(&self.boot_public)));
        uri.push(';');

        if let Some(mac) = &self.mac {
            uri.push_str("M:");

            for octet in mac {
                uri.push_str(&format!("{:02x}", octet));
            }

            uri.push(';');
        }

        if let Some(freqs) = &self.freqs {
            if freqs.is_empty() {
                return Err(Error::MalformedInput);
            }

            uri.push_str("C:");

            for (i, freq) in freqs.iter().enumerate() {
                let (class, channel) = channels::class_of(*freq)?;

                if i > 0 {
                    uri.push(',');
                }

                uri.push_str(&format!("{}/{}", class, channel));
            }

            uri.push(';');
        }

        if let Some(information) = &self.information {
            if information.is_empty() || information.contains(';') {
                return Err(Error::MalformedInput);
            }

            uri.push_str("I:");
            uri.push_str(information);
            uri.push(';');
        }

        if let Some(host) = &self.host {
            if host.is_empty() || host.contains(';') {
                return Err(Error::MalformedInput);
            }

            uri.push_str("H:");
            uri.push_str(host);
            uri.push(';');
        }

        if let Some(version) = self.version {
            if version != 1 && version != 2 {
                return Err(Error::MalformedInput);
            }

            uri.push_str(&format!("V:{};", version));
        }

        uri.push(';');

        Ok(uri)
    }
}

fn replace_empty<T>(slot: &mut Option<T>, value: T) -> Result<(), Error> {
    if slot.is_some() {
        return Err(Error::MalformedInput);
    }

    *slot = Some(value);

    Ok(())
}

fn parse_mac(value: &str) -> Result<MacAddress, Error> {
    if value.len() != 12 || !value.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::MalformedInput);
    }

    let mut mac = [0u8; 6];

    for (i, octet) in mac.iter_mut().enumerate() {
        *octet = u8::from_str_radix(&value[2 * i..2 * i + 2], 16)
            .map_err(|_| Error::MalformedInput)?;
    }

    // Group-addressed or all-zero addresses cannot name a station
    if mac == [0u8; 6] || mac[0] & 0x01 != 0 {
        return Err(Error::MalformedInput);
    }

    Ok(mac)
}

fn parse_channel_list(value: &str) -> Result<Vec<u32>, Error> {
    let mut freqs = Vec::new();

    for entry in value.split(',') {
        let (class, channel) = entry.split_once('/').ok_or(Error::MalformedInput)?;

        let freq = channels::freq_of(parse_number(class)?, parse_number(channel)?)
            .map_err(|_| Error::MalformedInput)?;

        if freqs.contains(&freq) {
            return Err(Error::MalformedInput);
        }

        freqs.push(freq);
    }

    Ok(freqs)
}

/// Decimal digits only: no sign, no whitespace, no radix prefixes
fn parse_number(text: &str) -> Result<u8, Error> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::MalformedInput);
    }

    text.parse().map_err(|_| Error::MalformedInput)
}
