//! Ethernet MAC address.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 48-bit Ethernet MAC address.
///
/// In match rules the same type carries the per-octet mask, so
/// [`MacAddress::BROADCAST`] doubles as the "compare every bit" mask and
/// [`MacAddress::ZERO`] as "don't care".
///
/// # Examples
///
/// ```
/// use msd_types::MacAddress;
///
/// let mac: MacAddress = "00:50:43:00:01:02".parse().unwrap();
/// assert_eq!(mac.octets()[5], 0x02);
/// assert_eq!(mac.to_string(), "00:50:43:00:01:02");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    /// ff:ff:ff:ff:ff:ff
    pub const BROADCAST: MacAddress = MacAddress([0xff; 6]);

    /// 00:00:00:00:00:00
    pub const ZERO: MacAddress = MacAddress([0; 6]);

    pub const fn new(bytes: [u8; 6]) -> Self {
        MacAddress(bytes)
    }

    /// Returns the six octets in transmission order.
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Returns true if the group bit of the first octet is set.
    pub const fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl FromStr for MacAddress {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let separator = if s.contains('-') { '-' } else { ':' };
        let mut bytes = [0u8; 6];
        let mut count = 0;

        for part in s.split(separator) {
            if count == bytes.len() || part.len() != 2 {
                return Err(ParseError::InvalidMacAddress(s.to_string()));
            }
            bytes[count] = u8::from_str_radix(part, 16)
                .map_err(|_| ParseError::InvalidMacAddress(s.to_string()))?;
            count += 1;
        }

        if count != bytes.len() {
            return Err(ParseError::InvalidMacAddress(s.to_string()));
        }
        Ok(MacAddress(bytes))
    }
}

impl TryFrom<String> for MacAddress {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> String {
        mac.to_string()
    }
}

impl From<[u8; 6]> for MacAddress {
    fn from(bytes: [u8; 6]) -> Self {
        MacAddress(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_both_separators() {
        let colon: MacAddress = "01:80:c2:00:00:0e".parse().unwrap();
        let hyphen: MacAddress = "01-80-C2-00-00-0E".parse().unwrap();
        assert_eq!(colon, hyphen);
        assert_eq!(colon.octets(), [0x01, 0x80, 0xc2, 0x00, 0x00, 0x0e]);
        assert!(colon.is_multicast());
    }

    #[test]
    fn test_broadcast_is_full_mask() {
        assert!(MacAddress::BROADCAST.is_broadcast());
        assert_eq!(MacAddress::BROADCAST.octets(), [0xff; 6]);
        assert_eq!(MacAddress::default(), MacAddress::ZERO);
    }

    #[test]
    fn test_rejects_malformed() {
        assert!("".parse::<MacAddress>().is_err());
        assert!("00:11:22:33:44".parse::<MacAddress>().is_err());
        assert!("00:11:22:33:44:55:66".parse::<MacAddress>().is_err());
        assert!("0:11:22:33:44:55".parse::<MacAddress>().is_err());
        assert!("zz:11:22:33:44:55".parse::<MacAddress>().is_err());
    }

    #[test]
    fn test_serde_as_string() {
        #[derive(Serialize, Deserialize)]
        struct Holder {
            da: MacAddress,
        }

        let holder: Holder = toml::from_str(r#"da = "ff:ff:ff:ff:ff:ff""#).unwrap();
        assert!(holder.da.is_broadcast());
        let text = toml::to_string(&holder).unwrap();
        assert!(text.contains("ff:ff:ff:ff:ff:ff"));
    }
}
