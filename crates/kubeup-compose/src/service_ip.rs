//! The well-known kubernetes service IP: the N-th address of the service
//! cluster CIDR, where N is fixed at 1 for the apiserver's own ClusterIP
//! (spec §4.10), the same offset the original's `createKubeAPIServerService`
//! hard-codes.

use std::net::IpAddr;
use std::str::FromStr;

use ipnet::IpNet;

use crate::error::ComposeError;

pub const WELL_KNOWN_SERVICE_OFFSET: u128 = 1;

/// Returns the `offset`-th address inside `cidr`, counting from the network
/// address (offset 0). Works over both IPv4 (32-bit) and IPv6 (128-bit)
/// address spaces via a common `u128` accumulator.
pub fn nth_address(cidr: &str, offset: u128) -> Result<IpAddr, ComposeError> {
    let net: IpNet = cidr.parse().map_err(|e: ipnet::AddrParseError| ComposeError::InvalidCidr(cidr.to_string(), e.to_string()))?;

    match net {
        IpNet::V4(net) => {
            let base = u32::from(net.network());
            let candidate = base.checked_add(offset as u32).ok_or_else(|| ComposeError::ServiceIpOutOfRange {
                cidr: cidr.to_string(),
                offset,
            })?;
            if !net.contains(&std::net::Ipv4Addr::from(candidate)) {
                return Err(ComposeError::ServiceIpOutOfRange { cidr: cidr.to_string(), offset });
            }
            Ok(IpAddr::V4(std::net::Ipv4Addr::from(candidate)))
        }
        IpNet::V6(net) => {
            let base = u128::from(net.network());
            let candidate = base.checked_add(offset).ok_or_else(|| ComposeError::ServiceIpOutOfRange {
                cidr: cidr.to_string(),
                offset,
            })?;
            let addr = std::net::Ipv6Addr::from(candidate);
            if !net.contains(&addr) {
                return Err(ComposeError::ServiceIpOutOfRange { cidr: cidr.to_string(), offset });
            }
            Ok(IpAddr::V6(addr))
        }
    }
}

/// The kubernetes apiserver's own well-known ClusterIP.
pub fn well_known_service_ip(service_cluster_ip_range: &str) -> Result<IpAddr, ComposeError> {
    nth_address(service_cluster_ip_range, WELL_KNOWN_SERVICE_OFFSET)
}

#[allow(dead_code)]
fn parse_ip(s: &str) -> Result<IpAddr, ComposeError> {
    IpAddr::from_str(s).map_err(|_| ComposeError::InvalidConfig(format!("invalid IP address: {s}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_address_of_a_slash_16_is_the_well_known_service_ip() {
        let ip = well_known_service_ip("10.0.0.0/16").unwrap();
        assert_eq!(ip.to_string(), "10.0.0.1");
    }

    #[test]
    fn nth_address_works_for_arbitrary_offsets() {
        assert_eq!(nth_address("10.0.0.0/24", 10).unwrap().to_string(), "10.0.0.10");
    }

    #[test]
    fn offset_outside_the_cidr_is_rejected() {
        assert!(nth_address("10.0.0.0/30", 10).is_err());
    }

    #[test]
    fn ipv6_offsets_use_128_bit_arithmetic() {
        let ip = nth_address("fd00::/112", 1).unwrap();
        assert_eq!(ip.to_string(), "fd00::1");
    }

    #[test]
    fn malformed_cidr_is_rejected() {
        assert!(nth_address("not-a-cidr", 1).is_err());
    }
}
