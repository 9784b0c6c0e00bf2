use std::fmt;
use std::net::IpAddr;

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};

use super::RouteDistinguisher;

/// 10-octet Ethernet Segment Identifier.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Esi(pub [u8; 10]);

impl Esi {
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 10]
    }
}

impl fmt::Display for Esi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return write!(f, "single-homed");
        }
        write!(f, "{}", hex::encode(self.0))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ipv4Nlri {
    pub prefix: Ipv4Net,
}

/// Labeled VPN-IPv4 NLRI: RD + MPLS label stack + prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vpnv4Nlri {
    pub rd: RouteDistinguisher,
    pub labels: Vec<u32>,
    pub prefix: Ipv4Net,
}

impl fmt::Display for Vpnv4Nlri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VPNv4 [{}]{} labels {:?}", self.rd, self.prefix, self.labels)
    }
}

/// EVPN MAC/IP advertisement (route type 2). Received but never
/// redistributed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvpnMacIpNlri {
    pub rd: RouteDistinguisher,
    pub esi: Esi,
    pub ethernet_tag: u32,
    pub mac: [u8; 6],
    pub ip: Option<IpAddr>,
    pub labels: Vec<u32>,
}

/// EVPN inclusive multicast Ethernet tag route (route type 3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvpnMulticastNlri {
    pub rd: RouteDistinguisher,
    pub ethernet_tag: u32,
    pub addr: IpAddr,
}

/// EVPN IP-prefix route (route type 5). The label field carries the VNI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvpnIpPrefixNlri {
    pub rd: RouteDistinguisher,
    pub esi: Esi,
    pub ethernet_tag: u32,
    pub prefix: IpAddr,
    pub prefix_len: u8,
    pub gateway: IpAddr,
    pub label: u32,
}

impl fmt::Display for EvpnIpPrefixNlri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[5]:[{}]:[{}]:[{}/{}] gw {} label {}",
            self.rd, self.ethernet_tag, self.prefix, self.prefix_len, self.gateway, self.label
        )
    }
}

/// NLRI kinds the speaker can hand over. The engine only interprets VPNv4
/// and EVPN type-5; the rest exist so decoding can classify and skip them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "nlri", rename_all = "kebab-case")]
pub enum Nlri {
    Ipv4(Ipv4Nlri),
    Vpnv4(Vpnv4Nlri),
    EvpnMacIp(EvpnMacIpNlri),
    EvpnMulticast(EvpnMulticastNlri),
    EvpnIpPrefix(EvpnIpPrefixNlri),
}

impl fmt::Display for Nlri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Nlri::Ipv4(v) => write!(f, "{}", v.prefix),
            Nlri::Vpnv4(v) => write!(f, "{}", v),
            Nlri::EvpnMacIp(v) => write!(f, "[2]:[{}] {}", v.rd, hex::encode(v.mac)),
            Nlri::EvpnMulticast(v) => write!(f, "[3]:[{}] {}", v.rd, v.addr),
            Nlri::EvpnIpPrefix(v) => write!(f, "{}", v),
        }
    }
}
