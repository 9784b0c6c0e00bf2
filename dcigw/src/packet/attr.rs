use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

use serde::{Deserialize, Serialize};
use strum_macros::Display;

use super::{ExtCommunity, Family};

#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum AttrType {
    Origin = 1,
    AsPath = 2,
    NextHop = 3,
    Med = 4,
    LocalPref = 5,
    AtomicAggregate = 6,
    Aggregator = 7,
    Community = 8,
    OriginatorId = 9,
    ClusterList = 10,
    MpReachNlri = 14,
    MpUnreachNlri = 15,
    ExtendedCom = 16,
    As4Path = 17,
    As4Aggregator = 18,
    PmsiTunnel = 22,
    TunnelEncap = 23,
    Aigp = 26,
    LargeCom = 32,
    Unknown(u8),
}

impl From<AttrType> for u8 {
    fn from(attr_type: AttrType) -> Self {
        use AttrType::*;
        match attr_type {
            Origin => 1,
            AsPath => 2,
            NextHop => 3,
            Med => 4,
            LocalPref => 5,
            AtomicAggregate => 6,
            Aggregator => 7,
            Community => 8,
            OriginatorId => 9,
            ClusterList => 10,
            MpReachNlri => 14,
            MpUnreachNlri => 15,
            ExtendedCom => 16,
            As4Path => 17,
            As4Aggregator => 18,
            PmsiTunnel => 22,
            TunnelEncap => 23,
            Aigp => 26,
            LargeCom => 32,
            Unknown(v) => v,
        }
    }
}

#[repr(u8)]
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Serialize, Deserialize, Display)]
pub enum Origin {
    #[default]
    #[strum(serialize = "IGP")]
    Igp = 0,
    #[strum(serialize = "EGP")]
    Egp = 1,
    #[strum(serialize = "incomplete")]
    Incomplete = 2,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AsSegment {
    pub seg_type: u8,
    pub asns: Vec<u32>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AsPath {
    pub segs: Vec<AsSegment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregator {
    pub asn: u32,
    pub addr: Ipv4Addr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LargeCommunity {
    pub global: u32,
    pub local1: u32,
    pub local2: u32,
}

impl fmt::Display for LargeCommunity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.global, self.local1, self.local2)
    }
}

/// MP_REACH_NLRI as delivered by the speaker: family plus the next-hop
/// list. The NLRI itself travels separately on the path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MpReach {
    pub family: Family,
    pub next_hops: Vec<IpAddr>,
}

/// A path attribute as delivered by the speaker. Attributes the engine does
/// not interpret are carried verbatim and either copied to synthetic routes
/// (whitelist) or dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "attr", rename_all = "kebab-case")]
pub enum PathAttr {
    Origin { origin: Origin },
    AsPath(AsPath),
    As4Path(AsPath),
    NextHop { next_hop: Ipv4Addr },
    Med { med: u32 },
    LocalPref { local_pref: u32 },
    AtomicAggregate,
    Aggregator(Aggregator),
    As4Aggregator(Aggregator),
    Communities { communities: Vec<u32> },
    OriginatorId { originator_id: Ipv4Addr },
    ClusterList { cluster_list: Vec<Ipv4Addr> },
    ExtCommunities { communities: ExtCommunity },
    PmsiTunnel { raw: Vec<u8> },
    TunnelEncap { raw: Vec<u8> },
    Aigp { aigp: u64 },
    LargeCommunities { communities: Vec<LargeCommunity> },
    MpReach(MpReach),
    MpUnreach { family: Family },
    Unknown { type_code: u8, raw: Vec<u8> },
}

impl PathAttr {
    pub fn attr_type(&self) -> AttrType {
        match self {
            PathAttr::Origin { .. } => AttrType::Origin,
            PathAttr::AsPath(_) => AttrType::AsPath,
            PathAttr::As4Path(_) => AttrType::As4Path,
            PathAttr::NextHop { .. } => AttrType::NextHop,
            PathAttr::Med { .. } => AttrType::Med,
            PathAttr::LocalPref { .. } => AttrType::LocalPref,
            PathAttr::AtomicAggregate => AttrType::AtomicAggregate,
            PathAttr::Aggregator(_) => AttrType::Aggregator,
            PathAttr::As4Aggregator(_) => AttrType::As4Aggregator,
            PathAttr::Communities { .. } => AttrType::Community,
            PathAttr::OriginatorId { .. } => AttrType::OriginatorId,
            PathAttr::ClusterList { .. } => AttrType::ClusterList,
            PathAttr::ExtCommunities { .. } => AttrType::ExtendedCom,
            PathAttr::PmsiTunnel { .. } => AttrType::PmsiTunnel,
            PathAttr::TunnelEncap { .. } => AttrType::TunnelEncap,
            PathAttr::Aigp { .. } => AttrType::Aigp,
            PathAttr::LargeCommunities { .. } => AttrType::LargeCom,
            PathAttr::MpReach(_) => AttrType::MpReachNlri,
            PathAttr::MpUnreach { .. } => AttrType::MpUnreachNlri,
            PathAttr::Unknown { type_code, .. } => AttrType::Unknown(*type_code),
        }
    }

    pub fn type_code(&self) -> u8 {
        self.attr_type().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_codes() {
        assert_eq!(
            PathAttr::LocalPref { local_pref: 100 }.type_code(),
            u8::from(AttrType::LocalPref)
        );
        assert_eq!(
            PathAttr::Unknown {
                type_code: 99,
                raw: vec![]
            }
            .type_code(),
            99
        );
    }

    #[test]
    fn serde_roundtrip() {
        let attrs = vec![
            PathAttr::Origin {
                origin: Origin::Igp,
            },
            PathAttr::LocalPref { local_pref: 200 },
            PathAttr::MpReach(MpReach {
                family: Family::vpnv4(),
                next_hops: vec!["192.168.1.1".parse().unwrap()],
            }),
        ];
        let json = serde_json::to_string(&attrs).unwrap();
        let back: Vec<PathAttr> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, attrs);
    }
}
