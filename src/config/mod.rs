//! Parsing of `[Interface]`/`[Peer]` tunnel configuration files.
//!
//! The format is the section-based text format accepted by common WireGuard
//! tooling: case-sensitive section headers, case-insensitive keys, one
//! `key = value` pair per line, `#` comments and blank lines ignored.
//! Parsing has no side effects; translation to the engine's control protocol
//! lives in [`crate::uapi`].

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use ipnet::IpNet;
use thiserror::Error;

/// Raw key length required by the tunnel engine.
pub const KEY_LEN: usize = 32;

/// Errors that can occur while parsing a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Error reading the configuration file
    #[error("failed to read config file: {0}")]
    Io(#[from] io::Error),

    /// A field that must be a CIDR did not parse as one
    #[error("invalid CIDR in {field}: {value}")]
    InvalidCidr { field: &'static str, value: String },

    /// A key field did not decode to the required raw length
    #[error("invalid {field} value: {reason}")]
    InvalidKeyEncoding { field: &'static str, reason: String },

    /// ListenPort was not a valid port number
    #[error("invalid ListenPort value: {0}")]
    InvalidPort(String),
}

/// Opaque 32-byte key material.
///
/// Configuration files carry keys base64-encoded; the control protocol wants
/// lowercase hex. Decoding happens once, here, so a key that reaches the
/// translator is already known to be well-formed.
#[derive(Clone, PartialEq, Eq)]
pub struct Key([u8; KEY_LEN]);

impl Key {
    /// Decode a base64-encoded key, requiring exactly [`KEY_LEN`] raw bytes.
    pub fn from_base64(encoded: &str) -> Result<Self, String> {
        let raw = BASE64
            .decode(encoded.trim())
            .map_err(|e| format!("bad base64: {}", e))?;
        let bytes: [u8; KEY_LEN] = raw
            .try_into()
            .map_err(|v: Vec<u8>| format!("expected {} raw bytes, got {}", KEY_LEN, v.len()))?;
        Ok(Key(bytes))
    }

    /// Lowercase hexadecimal encoding, as the control protocol requires.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

// Key material must not end up in logs or error output.
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key(..)")
    }
}

/// One parsed `[Peer]` section.
#[derive(Debug, Clone, Default)]
pub struct PeerSection {
    /// Peer public key
    pub public_key: Option<Key>,

    /// Allowed-IP ranges, in file order
    pub allowed_ips: Vec<IpNet>,

    /// Endpoint as written in the file (`host:port`); resolution is the
    /// translator's concern, not the parser's
    pub endpoint: Option<String>,
}

/// Parsed configuration: the `[Interface]` section plus its peers.
///
/// Constructed fresh on every parse and never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct WgConfig {
    /// Local address and prefix length from `Address`
    pub address: Option<IpNet>,

    /// Private key from `PrivateKey`
    pub private_key: Option<Key>,

    /// UDP listen port from `ListenPort`
    pub listen_port: Option<u16>,

    /// `[Peer]` sections in file order
    pub peers: Vec<PeerSection>,
}

/// Which section the line cursor is currently inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    /// Before any recognized header, or inside an unrecognized section
    None,
    Interface,
    Peer,
}

impl WgConfig {
    /// Load and parse a configuration file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parse configuration text.
    ///
    /// Section membership is determined by the most recently seen header;
    /// lines before any header are ignored. Unrecognized keys are ignored for
    /// forward compatibility. A missing `Address` is not an error here --
    /// callers that need one (Start does) check for it themselves.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut config = WgConfig::default();
        let mut section = Section::None;

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if line.starts_with('[') {
                // Headers are case-sensitive; anything else opens an
                // unrecognized section whose lines are skipped.
                section = match line {
                    "[Interface]" => Section::Interface,
                    "[Peer]" => {
                        config.peers.push(PeerSection::default());
                        Section::Peer
                    }
                    _ => Section::None,
                };
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();

            match section {
                Section::None => {}
                Section::Interface => config.interface_entry(&key, value)?,
                Section::Peer => {
                    // A [Peer] header always pushed an entry first.
                    let peer = config
                        .peers
                        .last_mut()
                        .expect("peer section without a peer entry");
                    peer_entry(peer, &key, value)?;
                }
            }
        }

        Ok(config)
    }

    fn interface_entry(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "address" => {
                let net = value.parse::<IpNet>().map_err(|_| ConfigError::InvalidCidr {
                    field: "Address",
                    value: value.to_string(),
                })?;
                self.address = Some(net);
            }
            "privatekey" => {
                let key = Key::from_base64(value).map_err(|reason| {
                    ConfigError::InvalidKeyEncoding {
                        field: "PrivateKey",
                        reason,
                    }
                })?;
                self.private_key = Some(key);
            }
            "listenport" => {
                let port = value
                    .parse::<u16>()
                    .map_err(|_| ConfigError::InvalidPort(value.to_string()))?;
                self.listen_port = Some(port);
            }
            _ => {}
        }
        Ok(())
    }
}

fn peer_entry(peer: &mut PeerSection, key: &str, value: &str) -> Result<(), ConfigError> {
    match key {
        "publickey" => {
            let key =
                Key::from_base64(value).map_err(|reason| ConfigError::InvalidKeyEncoding {
                    field: "PublicKey",
                    reason,
                })?;
            peer.public_key = Some(key);
        }
        "allowedips" => {
            for entry in value.split(',') {
                let entry = entry.trim();
                let net = entry.parse::<IpNet>().map_err(|_| ConfigError::InvalidCidr {
                    field: "AllowedIPs",
                    value: entry.to_string(),
                })?;
                peer.allowed_ips.push(net);
            }
        }
        "endpoint" => {
            peer.endpoint = Some(value.to_string());
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_KEY: &str = "QUJDREVGR0hJSktMTU5PUFFSU1RVVldYWVowMTIzNDU=";

    #[test]
    fn key_round_trips_to_hex() {
        let key = Key::from_base64(SAMPLE_KEY).unwrap();
        assert_eq!(key.as_bytes(), b"ABCDEFGHIJKLMNOPQRSTUVWXYZ012345");
        assert_eq!(key.to_hex(), hex::encode(b"ABCDEFGHIJKLMNOPQRSTUVWXYZ012345"));
    }

    #[test]
    fn key_rejects_wrong_length() {
        let short = BASE64.encode([0u8; 16]);
        let err = Key::from_base64(&short).unwrap_err();
        assert!(err.contains("expected 32"));
    }

    #[test]
    fn debug_does_not_leak_key_material() {
        let key = Key::from_base64(SAMPLE_KEY).unwrap();
        assert_eq!(format!("{:?}", key), "Key(..)");
    }

    #[test]
    fn lines_before_any_section_are_ignored() {
        let config = WgConfig::parse("Address = 10.0.0.1/24\n[Interface]\nListenPort = 51820\n")
            .unwrap();
        assert!(config.address.is_none());
        assert_eq!(config.listen_port, Some(51820));
    }

    #[test]
    fn unknown_sections_and_keys_are_ignored() {
        let text = "[Interface]\nAddress = 10.0.0.1/24\nFwMark = 1234\n[Wormhole]\nAddress = junk\n";
        let config = WgConfig::parse(text).unwrap();
        assert_eq!(config.address.unwrap().to_string(), "10.0.0.1/24");
    }

    #[test]
    fn section_headers_are_case_sensitive() {
        let config = WgConfig::parse("[interface]\nAddress = 10.0.0.1/24\n").unwrap();
        assert!(config.address.is_none());
    }

    #[test]
    fn invalid_cidr_identifies_the_field() {
        let err = WgConfig::parse("[Interface]\nAddress = 10.0.0.1\n").unwrap_err();
        match err {
            ConfigError::InvalidCidr { field, value } => {
                assert_eq!(field, "Address");
                assert_eq!(value, "10.0.0.1");
            }
            other => panic!("expected InvalidCidr, got {:?}", other),
        }
    }

    #[test]
    fn invalid_peer_key_identifies_the_field() {
        let err = WgConfig::parse("[Peer]\nPublicKey = not!base64\n").unwrap_err();
        match err {
            ConfigError::InvalidKeyEncoding { field, .. } => assert_eq!(field, "PublicKey"),
            other => panic!("expected InvalidKeyEncoding, got {:?}", other),
        }
    }
}
