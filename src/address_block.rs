use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Highest offset that may be handed to a peer, .255 is broadcast.
pub const MAX_OFFSET: u8 = 254;

/// First three octets of an IPv4 /24.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressBlock([u8; 3]);

#[derive(Debug, thiserror::Error)]
#[error("invalid address block {0:?}, expected A.B.C or A.B.C.D[/mask]")]
pub struct ParseError(String);

impl AddressBlock {
    pub const fn new(a: u8, b: u8, c: u8) -> Self {
        Self([a, b, c])
    }

    pub fn address(&self, offset: u8) -> Ipv4Addr {
        let [a, b, c] = self.0;
        Ipv4Addr::new(a, b, c, offset)
    }

    /// Fourth octet of `value` if it lies inside this block.
    /// A trailing `/<mask>` is ignored.
    pub fn offset_of(&self, value: &str) -> Option<u8> {
        let prefix = format!("{}.", self);
        let rest = value.trim().strip_prefix(prefix.as_str())?;
        let octet = rest.split('/').next().unwrap_or_default();
        octet.parse::<u8>().ok()
    }
}

impl fmt::Display for AddressBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = self.0;
        write!(f, "{}.{}.{}", a, b, c)
    }
}

impl FromStr for AddressBlock {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseError(s.to_string());
        let host = s.trim().split('/').next().unwrap_or_default();
        let parts: Vec<&str> = host.split('.').collect();
        if parts.len() != 3 && parts.len() != 4 {
            return Err(err());
        }

        let mut octets = [0u8; 3];
        for (octet, part) in octets.iter_mut().zip(parts.iter()) {
            *octet = part.parse::<u8>().map_err(|_| err())?;
        }
        if let Some(last) = parts.get(3) {
            last.parse::<u8>().map_err(|_| err())?;
        }
        Ok(AddressBlock(octets))
    }
}

impl Serialize for AddressBlock {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AddressBlock {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Hands out contiguous offsets starting at `next`, stepping over the server's own
/// offset and stopping after [`MAX_OFFSET`].
#[derive(Debug, Clone)]
pub struct Offsets {
    next: u16,
    skip: Option<u8>,
}

impl Offsets {
    pub fn new(start: u16, skip: Option<u8>) -> Self {
        Self { next: start, skip }
    }
}

impl Iterator for Offsets {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        loop {
            if self.next == 0 || self.next > u16::from(MAX_OFFSET) {
                return None;
            }
            let candidate = self.next as u8;
            self.next += 1;
            if Some(candidate) != self.skip {
                return Some(candidate);
            }
        }
    }
}
