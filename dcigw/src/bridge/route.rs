use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

use thiserror::Error;

use crate::packet::{Nlri, PathAttr, RdError};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RouteError {
    #[error("not a VPN route")]
    NotVpnRoute,
    #[error("not an EVPN type-5 route")]
    NotEvpnType5Route,
    #[error("invalid route distinguisher: {0}")]
    InvalidRd(#[from] RdError),
    #[error("path has no usable next-hop")]
    NoNextHop,
}

/// Identity of a received VPNv4 route: RD, prefix and the first MPLS label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VpnRouteKey {
    pub rd: String,
    pub prefix: Ipv4Addr,
    pub prefix_len: u8,
    pub label: u32,
}

impl VpnRouteKey {
    pub fn from_nlri(nlri: &Nlri) -> Result<Self, RouteError> {
        let Nlri::Vpnv4(vpn) = nlri else {
            return Err(RouteError::NotVpnRoute);
        };
        Ok(Self {
            rd: vpn.rd.canonical()?,
            prefix: vpn.prefix.addr(),
            prefix_len: vpn.prefix.prefix_len(),
            label: vpn.labels.first().copied().unwrap_or(0),
        })
    }
}

impl fmt::Display for VpnRouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}]{}/{} label {}",
            self.rd, self.prefix, self.prefix_len, self.label
        )
    }
}

/// Identity of a received EVPN type-5 route.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EvpnRouteKey {
    pub rd: String,
    pub prefix: IpAddr,
    pub prefix_len: u8,
    pub gateway: IpAddr,
    pub label: u32,
    pub ethernet_tag: u32,
    pub esi: String,
}

impl EvpnRouteKey {
    pub fn from_nlri(nlri: &Nlri) -> Result<Self, RouteError> {
        let Nlri::EvpnIpPrefix(evpn) = nlri else {
            return Err(RouteError::NotEvpnType5Route);
        };
        Ok(Self {
            rd: evpn.rd.canonical()?,
            prefix: evpn.prefix,
            prefix_len: evpn.prefix_len,
            gateway: evpn.gateway,
            label: evpn.label,
            ethernet_tag: evpn.ethernet_tag,
            esi: evpn.esi.to_string(),
        })
    }
}

impl fmt::Display for EvpnRouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[5]:[{}]{}/{} gw {} label {}",
            self.rd, self.prefix, self.prefix_len, self.gateway, self.label
        )
    }
}

/// Route targets carried in the path's EXTENDED_COMMUNITIES attribute, in
/// order, duplicates preserved.
pub fn extract_route_targets(pattrs: &[PathAttr]) -> Vec<String> {
    pattrs
        .iter()
        .flat_map(|attr| match attr {
            PathAttr::ExtCommunities { communities } => communities.route_targets(),
            _ => Vec::new(),
        })
        .collect()
}

/// The single next-hop announced in MP_REACH_NLRI. Absent attribute or a
/// next-hop count other than one is an error.
pub fn single_next_hop(pattrs: &[PathAttr]) -> Result<IpAddr, RouteError> {
    let reach = pattrs
        .iter()
        .find_map(|attr| match attr {
            PathAttr::MpReach(reach) => Some(reach),
            _ => None,
        })
        .ok_or(RouteError::NoNextHop)?;
    match reach.next_hops.as_slice() {
        [nhop] => Ok(*nhop),
        _ => Err(RouteError::NoNextHop),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{
        Esi, EvpnIpPrefixNlri, EvpnMacIpNlri, ExtCommunity, ExtCommunityValue, Family, Ipv4Nlri,
        MpReach, Vpnv4Nlri,
    };

    fn vpn_nlri() -> Nlri {
        Nlri::Vpnv4(Vpnv4Nlri {
            rd: "65000:100".parse().unwrap(),
            labels: vec![1000, 2000],
            prefix: "10.0.0.0/24".parse().unwrap(),
        })
    }

    fn type5_nlri() -> Nlri {
        Nlri::EvpnIpPrefix(EvpnIpPrefixNlri {
            rd: "65000:100".parse().unwrap(),
            esi: Esi::default(),
            ethernet_tag: 0,
            prefix: "10.0.0.0".parse().unwrap(),
            prefix_len: 24,
            gateway: "192.168.1.1".parse().unwrap(),
            label: 1000,
        })
    }

    #[test]
    fn vpn_key_decode() {
        let key = VpnRouteKey::from_nlri(&vpn_nlri()).unwrap();
        assert_eq!(key.rd, "65000:100");
        assert_eq!(key.prefix.to_string(), "10.0.0.0");
        assert_eq!(key.prefix_len, 24);
        // First label wins.
        assert_eq!(key.label, 1000);
    }

    #[test]
    fn vpn_key_wrong_kind() {
        let nlri = Nlri::Ipv4(Ipv4Nlri {
            prefix: "10.0.0.0/24".parse().unwrap(),
        });
        assert_eq!(VpnRouteKey::from_nlri(&nlri), Err(RouteError::NotVpnRoute));
        assert_eq!(
            VpnRouteKey::from_nlri(&type5_nlri()),
            Err(RouteError::NotVpnRoute)
        );
    }

    #[test]
    fn vpn_key_invalid_rd() {
        let mut nlri = vpn_nlri();
        if let Nlri::Vpnv4(v) = &mut nlri {
            v.rd.typ = 77;
        }
        assert!(matches!(
            VpnRouteKey::from_nlri(&nlri),
            Err(RouteError::InvalidRd(_))
        ));
    }

    #[test]
    fn evpn_key_decode() {
        let key = EvpnRouteKey::from_nlri(&type5_nlri()).unwrap();
        assert_eq!(key.rd, "65000:100");
        assert_eq!(key.gateway.to_string(), "192.168.1.1");
        assert_eq!(key.label, 1000);
        assert_eq!(key.esi, "single-homed");
    }

    #[test]
    fn evpn_key_type2_rejected() {
        let nlri = Nlri::EvpnMacIp(EvpnMacIpNlri {
            rd: "65000:100".parse().unwrap(),
            esi: Esi::default(),
            ethernet_tag: 0,
            mac: [0, 1, 2, 3, 4, 5],
            ip: None,
            labels: vec![1000],
        });
        assert_eq!(
            EvpnRouteKey::from_nlri(&nlri),
            Err(RouteError::NotEvpnType5Route)
        );
    }

    #[test]
    fn route_target_extraction() {
        let mut soo = ExtCommunityValue::route_target("65000:9").unwrap();
        soo.low_type = 0x03;
        let attrs = vec![
            PathAttr::LocalPref { local_pref: 100 },
            PathAttr::ExtCommunities {
                communities: ExtCommunity(vec![
                    ExtCommunityValue::route_target("65000:2").unwrap(),
                    soo,
                    ExtCommunityValue::route_target("65000:1").unwrap(),
                    ExtCommunityValue::route_target("65000:2").unwrap(),
                ]),
            },
        ];
        assert_eq!(
            extract_route_targets(&attrs),
            vec!["65000:2", "65000:1", "65000:2"]
        );
        assert!(extract_route_targets(&[]).is_empty());
    }

    #[test]
    fn next_hop_extraction() {
        let attrs = vec![PathAttr::MpReach(MpReach {
            family: Family::vpnv4(),
            next_hops: vec!["192.168.1.1".parse().unwrap()],
        })];
        assert_eq!(
            single_next_hop(&attrs).unwrap(),
            "192.168.1.1".parse::<IpAddr>().unwrap()
        );

        assert_eq!(single_next_hop(&[]), Err(RouteError::NoNextHop));

        let two = vec![PathAttr::MpReach(MpReach {
            family: Family::vpnv4(),
            next_hops: vec![
                "192.168.1.1".parse().unwrap(),
                "192.168.1.2".parse().unwrap(),
            ],
        })];
        assert_eq!(single_next_hop(&two), Err(RouteError::NoNextHop));
    }
}
