// ── USB bus address ──

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kernel identifier of a USB interface's topology position.
///
/// Shape: `<bus>-<port[.port...]>:<config>.<interface>`, for example
/// `3-2:1.0` or `1-1.4.2:1.0`. This is the string the USB drivers accept
/// on their `bind`/`unbind` control files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BusAddress(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{0}' is not a USB interface bus address (expected e.g. 3-2:1.0)")]
pub struct InvalidBusAddress(pub String);

impl BusAddress {
    /// Validate and wrap a bus-address string.
    pub fn parse(s: &str) -> Result<Self, InvalidBusAddress> {
        if is_bus_address(s) {
            Ok(Self(s.to_owned()))
        } else {
            Err(InvalidBusAddress(s.to_owned()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_bus_address(s: &str) -> bool {
    let Some((device, interface)) = s.split_once(':') else {
        return false;
    };
    let Some((bus, ports)) = device.split_once('-') else {
        return false;
    };
    let Some((config, iface)) = interface.split_once('.') else {
        return false;
    };

    is_digits(bus)
        && ports.split('.').all(is_digits)
        && is_digits(config)
        && is_digits(iface)
}

impl fmt::Display for BusAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BusAddress {
    type Err = InvalidBusAddress;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for BusAddress {
    type Error = InvalidBusAddress;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if is_bus_address(&s) {
            Ok(Self(s))
        } else {
            Err(InvalidBusAddress(s))
        }
    }
}

impl From<BusAddress> for String {
    fn from(addr: BusAddress) -> Self {
        addr.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn accepts_root_hub_port() {
        let addr = BusAddress::parse("3-2:1.0").unwrap();
        assert_eq!(addr.as_str(), "3-2:1.0");
    }

    #[test]
    fn accepts_nested_hub_ports() {
        assert!(BusAddress::parse("1-1.4.2:1.0").is_ok());
        assert!(BusAddress::parse("10-3.1:2.11").is_ok());
    }

    #[test]
    fn rejects_usb_device_without_interface() {
        assert!(BusAddress::parse("3-2").is_err());
    }

    #[test]
    fn rejects_root_hub_and_garbage() {
        assert!(BusAddress::parse("usb3").is_err());
        assert!(BusAddress::parse("3-:1.0").is_err());
        assert!(BusAddress::parse("3-2:1").is_err());
        assert!(BusAddress::parse("3-2..1:1.0").is_err());
        assert!(BusAddress::parse("").is_err());
        assert!(BusAddress::parse("a-2:1.0").is_err());
    }

    #[test]
    fn deserialize_validates() {
        let ok: BusAddress = serde_json::from_str("\"3-2:1.0\"").unwrap();
        assert_eq!(ok.to_string(), "3-2:1.0");
        assert!(serde_json::from_str::<BusAddress>("\"video0\"").is_err());
    }
}
