use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 48-bit radio MAC address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RadioMac(pub [u8; 6]);

impl RadioMac {
    pub const ZERO: RadioMac = RadioMac([0; 6]);

    pub fn from_u64(v: u64) -> Self {
        let b = v.to_be_bytes();
        RadioMac([b[2], b[3], b[4], b[5], b[6], b[7]])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; 6]
    }

    /// Build a deterministic test MAC from a short label, e.g. `"AA:AA"` as
    /// used in the scheduler scenarios. Not a real MAC parser: it hashes the
    /// label into six bytes so tests get stable, distinct addresses without
    /// needing full colon-hex strings everywhere.
    pub fn test_mac(label: &str) -> Self {
        let mut bytes = [0u8; 6];
        for (i, b) in label.bytes().enumerate() {
            bytes[i % 6] ^= b;
            bytes[(i + 1) % 6] = bytes[(i + 1) % 6].wrapping_add(b);
        }
        RadioMac(bytes)
    }
}

impl fmt::Debug for RadioMac {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for RadioMac {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}", a, b, c, d, e, g)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MacParseError {
    #[error("expected 6 colon-separated hex octets, got {0:?}")]
    BadFormat(String),
}

impl FromStr for RadioMac {
    type Err = MacParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 6 {
            return Err(MacParseError::BadFormat(s.to_string()));
        }
        let mut out = [0u8; 6];
        for (i, p) in parts.iter().enumerate() {
            out[i] = u8::from_str_radix(p, 16).map_err(|_| MacParseError::BadFormat(s.to_string()))?;
        }
        Ok(RadioMac(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_colon_hex() {
        let mac: RadioMac = "aa:bb:cc:dd:ee:ff".parse().unwrap();
        assert_eq!(mac.0, [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
        assert_eq!(mac.to_string(), "aa:bb:cc:dd:ee:ff");
    }

    #[test]
    fn rejects_bad_format() {
        assert!("aa:bb".parse::<RadioMac>().is_err());
    }

    #[test]
    fn test_mac_is_deterministic_and_distinct() {
        let a = RadioMac::test_mac("AA:AA");
        let b = RadioMac::test_mac("AA:AA");
        let c = RadioMac::test_mac("BB:BB");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
