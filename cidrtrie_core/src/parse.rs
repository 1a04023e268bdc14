//! Text → `(address, mask)` conversion.
//!
//! Accepts `address` or `address/prefix_len`; a bare address is a host
//! route. Host bits below the prefix are kept as written, the engine only
//! looks at bits the mask covers.

use crate::errors::Error;
use crate::helpers::{mask128, v4_key, v4_mask};
use crate::types::{Family, Key};
use ipnet::{IpNet, Ipv4Net};
use std::net::{IpAddr, Ipv4Addr};

pub fn parse_cidr4(text: &str) -> Result<(u32, u32), Error> {
    if text.contains('/') {
        let net: Ipv4Net = text.parse().map_err(|_| Error::BadAddress)?;
        Ok((u32::from(net.addr()), u32::from(net.netmask())))
    } else {
        let addr: Ipv4Addr = text.parse().map_err(|_| Error::BadAddress)?;
        Ok((u32::from(addr), u32::MAX))
    }
}

/// Parse into 128-bit space. IPv4 text is embedded as `::ffff:a.b.c.d`
/// with its prefix length moved down by 96.
pub fn parse_cidr6(text: &str) -> Result<(u128, u128), Error> {
    if text.contains('/') {
        let net: IpNet = text.parse().map_err(|_| Error::BadAddress)?;
        Ok(net_to_v6(net))
    } else {
        let addr: IpAddr = text.parse().map_err(|_| Error::BadAddress)?;
        Ok(match addr {
            IpAddr::V4(a) => (v4_key(u32::from(a)), mask128(128)),
            IpAddr::V6(a) => (u128::from(a), mask128(128)),
        })
    }
}

/// Parse `text` for a tree of the given family.
pub fn parse_cidr(text: &str, family: Family) -> Result<Key, Error> {
    match family {
        Family::V4 => parse_cidr4(text).map(|(addr, mask)| Key::V4 { addr, mask }),
        Family::V6 => parse_cidr6(text).map(|(addr, mask)| Key::V6 { addr, mask }),
    }
}

pub fn net_key(net: IpNet, family: Family) -> Result<Key, Error> {
    match (family, net) {
        (Family::V4, IpNet::V4(n)) => Ok(Key::V4 {
            addr: u32::from(n.addr()),
            mask: u32::from(n.netmask()),
        }),
        (Family::V4, IpNet::V6(_)) => Err(Error::BadAddress),
        (Family::V6, net) => {
            let (addr, mask) = net_to_v6(net);
            Ok(Key::V6 { addr, mask })
        }
    }
}

pub fn addr_key(addr: IpAddr, family: Family) -> Result<Key, Error> {
    net_key(IpNet::from(addr), family)
}

fn net_to_v6(net: IpNet) -> (u128, u128) {
    match net {
        IpNet::V4(n) => (v4_key(u32::from(n.addr())), v4_mask(u32::from(n.netmask()))),
        IpNet::V6(n) => (u128::from(n.addr()), u128::from(n.netmask())),
    }
}
