// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: MAC address parsing and formatting.
// Author: Lukas Bower

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Six-byte hardware address in transmission order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MacAddr(pub [u8; 6]);

/// Text that is not a colon separated MAC address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("not a valid MAC address: {0}")]
pub struct MacError(pub String);

impl MacAddr {
    /// Address bytes.
    #[must_use]
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl FromStr for MacAddr {
    type Err = MacError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = || MacError(text.to_owned());
        let mut octets = [0u8; 6];
        let mut parts = text.trim().split(':');
        for octet in &mut octets {
            let part = parts.next().ok_or_else(invalid)?;
            if part.is_empty() || part.len() > 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(invalid());
            }
            *octet = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self(octets))
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl Serialize for MacAddr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacAddr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_formats() {
        let mac: MacAddr = "04:CE:14:0a:b:ff".parse().expect("mac");
        assert_eq!(mac.octets(), [0x04, 0xce, 0x14, 0x0a, 0x0b, 0xff]);
        assert_eq!(mac.to_string(), "04:ce:14:0a:0b:ff");
    }

    #[test]
    fn rejects_malformed() {
        for text in ["", "04:ce:14:0a:0b", "04:ce:14:0a:0b:ff:00", "04:ce:14:0a:0b:fff", "zz:ce:14:0a:0b:ff"] {
            assert!(text.parse::<MacAddr>().is_err(), "{text}");
        }
    }
}
