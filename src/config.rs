//! The configuration object
//!
//! After authentication the configurator hands the enrollee a small JSON
//! document describing the network to join: the SSID, the AKM suites in
//! use, and either a passphrase or a raw 256-bit PSK in hex. A vendor
//! extension object may carry a couple of station preferences alongside.
//!
//! ```json
//! {
//!     "wi-fi_tech": "infra",
//!     "discovery": { "ssid": "mywifi" },
//!     "cred": { "akm": "psk+sae", "pass": "secret123" }
//! }
//! ```
//!
//! Parsing is strict about the parts that matter: the technology must be
//! `infra`, the SSID must fit in 1 to 32 bytes, exactly one of `pass`/`psk`
//! must be present, and at least one AKM token must be recognised. Unknown
//! AKM tokens and unknown JSON keys are skipped so configurators newer than
//! this code still interoperate.

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::Error;

/// The key of the vendor extension object this crate reads and writes
pub const VENDOR_NAMESPACE: &str = "rs.easy-connect";

/// AKM suites a credential can name
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AkmSuite {
    Psk,
    FtPsk,
    Sae,
    FtSae,
}

impl AkmSuite {
    fn bit(self) -> u8 {
        match self {
            AkmSuite::Psk => 0x01,
            AkmSuite::FtPsk => 0x02,
            AkmSuite::Sae => 0x04,
            AkmSuite::FtSae => 0x08,
        }
    }

    fn token(self) -> &'static str {
        match self {
            AkmSuite::Psk => "psk",
            AkmSuite::FtPsk => "ft-psk",
            AkmSuite::Sae => "sae",
            AkmSuite::FtSae => "ft-sae",
        }
    }

    fn from_token(token: &str) -> Option<AkmSuite> {
        match token {
            "psk" => Some(AkmSuite::Psk),
            "ft-psk" => Some(AkmSuite::FtPsk),
            "sae" => Some(AkmSuite::Sae),
            "ft-sae" => Some(AkmSuite::FtSae),
            _ => None,
        }
    }

    /// Emission order inside an `akm` value
    const ALL: [AkmSuite; 4] = [AkmSuite::Psk, AkmSuite::FtPsk, AkmSuite::Sae, AkmSuite::FtSae];
}

/// A set of AKM suites
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AkmSuites {
    bits: u8,
}

impl AkmSuites {
    pub fn new() -> AkmSuites {
        AkmSuites::default()
    }

    pub fn insert(&mut self, suite: AkmSuite) {
        self.bits |= suite.bit();
    }

    pub fn contains(self, suite: AkmSuite) -> bool {
        self.bits & suite.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.bits == 0
    }

    /// Parse an `akm` value, `+`-separated tokens
    ///
    /// Unrecognised tokens are skipped; a value yielding no recognised
    /// suite at all is rejected.
    fn from_akm_value(value: &str) -> Result<AkmSuites, Error> {
        let mut suites = AkmSuites::new();

        for token in value.split('+') {
            if let Some(suite) = AkmSuite::from_token(token) {
                suites.insert(suite);
            }
        }

        if suites.is_empty() {
            return Err(Error::MalformedInput);
        }

        Ok(suites)
    }

    fn to_akm_value(self) -> String {
        let tokens: Vec<&str> = AkmSuite::ALL
            .iter()
            .filter(|suite| self.contains(**suite))
            .map(|suite| suite.token())
            .collect();

        tokens.join("+")
    }
}

/// The secret a credential carries, a passphrase or a raw PSK
///
/// Exactly one of the two exists per credential; the inner secret is wiped
/// on drop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Credential {
    Passphrase(String),
    Psk([u8; 32]),
}

impl Drop for Credential {
    fn drop(&mut self) {
        match self {
            Credential::Passphrase(pass) => pass.zeroize(),
            Credential::Psk(psk) => psk.zeroize(),
        }
    }
}

/// A parsed configuration object
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Configuration {
    /// The network name, 1 to 32 bytes of UTF-8
    pub ssid: String,
    pub akm_suites: AkmSuites,
    pub credential: Credential,
    /// Station preferences from the vendor extension object
    pub send_hostname: Option<bool>,
    pub hidden: Option<bool>,
}

#[derive(Serialize, Deserialize)]
struct ConfigObject {
    #[serde(rename = "wi-fi_tech")]
    wifi_tech: String,
    discovery: DiscoveryObject,
    cred: CredObject,
    #[serde(rename = "rs.easy-connect", skip_serializing_if = "Option::is_none")]
    extension: Option<ExtensionObject>,
}

#[derive(Serialize, Deserialize)]
struct DiscoveryObject {
    ssid: String,
}

#[derive(Serialize, Deserialize)]
struct CredObject {
    akm: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pass: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    psk: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct ExtensionObject {
    #[serde(skip_serializing_if = "Option::is_none")]
    send_hostname: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hidden: Option<bool>,
}

impl Configuration {
    /// Parse a configuration object from its JSON text
    pub fn from_json(json: &str) -> Result<Configuration, Error> {
        let object: ConfigObject =
            serde_json::from_str(json).map_err(|_| Error::MalformedInput)?;

        if object.wifi_tech != "infra" {
            return Err(Error::MalformedInput);
        }

        let ssid = object.discovery.ssid;

        if ssid.is_empty() || ssid.len() > 32 {
            return Err(Error::MalformedInput);
        }

        let akm_suites = AkmSuites::from_akm_value(&object.cred.akm)?;

        let credential = match (object.cred.pass, object.cred.psk) {
            (Some(pass), None) => Credential::Passphrase(pass),
            (None, Some(psk)) => Credential::Psk(parse_psk(&psk)?),
            _ => return Err(Error::MalformedInput),
        };

        let (send_hostname, hidden) = match object.extension {
            Some(extension) => (extension.send_hostname, extension.hidden),
            None => (None, None),
        };

        Ok(Configuration {
            ssid,
            akm_suites,
            credential,
            send_hostname,
            hidden,
        })
    }

    /// Emit this configuration as JSON text
    ///
    /// The output parses back to an equal [`Configuration`]; key order and
    /// whitespace carry no meaning.
    pub fn to_json(&self) -> Result<String, Error> {
        if self.ssid.is_empty() || self.ssid.len() > 32 {
            return Err(Error::MalformedInput);
        }

        if self.akm_suites.is_empty() {
            return Err(Error::MalformedInput);
        }

        let (pass, psk) = match &self.credential {
            Credential::Passphrase(pass) => (Some(pass.clone()), None),
            Credential::Psk(psk) => {
                let mut hex = String::with_capacity(64);

                for octet in psk {
                    hex.push_str(&format!("{:02x}", octet));
                }

                (None, Some(hex))
            }
        };

        let extension = if self.send_hostname.is_some() || self.hidden.is_some() {
            Some(ExtensionObject {
                send_hostname: self.send_hostname,
                hidden: self.hidden,
            })
        } else {
            None
        };

        let object = ConfigObject {
            wifi_tech: "infra".to_string(),
            discovery: DiscoveryObject {
                ssid: self.ssid.clone(),
            },
            cred: CredObject {
                akm: self.akm_suites.to_akm_value(),
                pass,
                psk,
            },
            extension,
        };

        serde_json::to_string(&object).map_err(|_| Error::ResourceExhaustion)
    }
}

fn parse_psk(hex: &str) -> Result<[u8; 32], Error> {
    if hex.len() != 64 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::MalformedInput);
    }

    let mut psk = [0u8; 32];

    for (i, octet) in psk.iter_mut().enumerate() {
        *octet = u8::from_str_radix(&hex[2 * i..2 * i + 2], 16)
            .map_err(|_| Error::MalformedInput)?;
    }

    Ok(psk)
}
