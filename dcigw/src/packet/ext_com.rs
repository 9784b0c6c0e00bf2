use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid route-target {0:?}")]
pub struct RtError(pub String);

#[repr(u8)]
#[derive(Debug, PartialEq, Clone, Copy, TryFromPrimitive, IntoPrimitive)]
pub enum ExtCommunityType {
    TransTwoOctetAs = 0x00,
    TransIpv4Addr = 0x01,
    TransFourOctetAs = 0x02,
    TransOpaque = 0x03,
}

#[derive(Debug, PartialEq, TryFromPrimitive, IntoPrimitive, EnumString, Display)]
#[repr(u8)]
pub enum ExtCommunitySubType {
    #[strum(serialize = "rt")]
    RouteTarget = 0x02,
    #[strum(serialize = "soo")]
    RouteOrigin = 0x03,
    #[strum(serialize = "encap")]
    Encap = 0x0c,
}

impl ExtCommunitySubType {
    pub fn display(val: u8) -> String {
        if let Ok(sub_type) = Self::try_from(val) {
            format!("{sub_type}")
        } else {
            "unknown".to_string()
        }
    }
}

#[derive(Debug, PartialEq, TryFromPrimitive, IntoPrimitive, EnumString, Display)]
#[repr(u16)]
pub enum TunnelType {
    #[strum(serialize = "L2TPv3")]
    L2tpv3 = 1,
    #[strum(serialize = "GRE")]
    Gre = 2,
    #[strum(serialize = "VXLAN")]
    Vxlan = 8,
    #[strum(serialize = "NVGRE")]
    Nvgre = 9,
}

#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExtCommunity(pub Vec<ExtCommunityValue>);

#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExtCommunityValue {
    pub high_type: u8,
    pub low_type: u8,
    pub val: [u8; 6],
}

impl ExtCommunityValue {
    /// Route-Target community from its canonical `left:right` form. The
    /// width variant follows the admin part, as for route distinguishers.
    pub fn route_target(s: &str) -> Result<Self, RtError> {
        let err = || RtError(s.to_string());
        let (admin, local) = s.rsplit_once(':').ok_or_else(err)?;
        if admin.is_empty() || local.is_empty() {
            return Err(err());
        }
        let mut com = ExtCommunityValue {
            low_type: ExtCommunitySubType::RouteTarget.into(),
            ..Default::default()
        };
        if let Ok(addr) = admin.parse::<Ipv4Addr>() {
            let local = local.parse::<u16>().map_err(|_| err())?;
            com.high_type = ExtCommunityType::TransIpv4Addr.into();
            com.val[..4].copy_from_slice(&addr.octets());
            com.val[4..].copy_from_slice(&local.to_be_bytes());
            return Ok(com);
        }
        let admin: u64 = admin.parse().map_err(|_| err())?;
        if admin <= u16::MAX as u64 {
            let local = local.parse::<u32>().map_err(|_| err())?;
            com.high_type = ExtCommunityType::TransTwoOctetAs.into();
            com.val[..2].copy_from_slice(&(admin as u16).to_be_bytes());
            com.val[2..].copy_from_slice(&local.to_be_bytes());
            Ok(com)
        } else if admin <= u32::MAX as u64 {
            let local = local.parse::<u16>().map_err(|_| err())?;
            com.high_type = ExtCommunityType::TransFourOctetAs.into();
            com.val[..4].copy_from_slice(&(admin as u32).to_be_bytes());
            com.val[4..].copy_from_slice(&local.to_be_bytes());
            Ok(com)
        } else {
            Err(err())
        }
    }

    /// Encapsulation community (type 0x03, sub-type 0x0c) carrying the
    /// tunnel type in the trailing two octets.
    pub fn encap(tunnel: TunnelType) -> Self {
        let mut com = ExtCommunityValue {
            high_type: ExtCommunityType::TransOpaque.into(),
            low_type: ExtCommunitySubType::Encap.into(),
            ..Default::default()
        };
        com.val[4..].copy_from_slice(&u16::from(tunnel).to_be_bytes());
        com
    }

    /// Canonical `left:right` form when this community is a Route Target in
    /// one of the three RT-capable widths, None otherwise. The transitive
    /// flag bits do not participate in the width match.
    pub fn route_target_string(&self) -> Option<String> {
        if self.low_type != u8::from(ExtCommunitySubType::RouteTarget) {
            return None;
        }
        let v = &self.val;
        match ExtCommunityType::try_from(self.high_type & 0x3f).ok()? {
            ExtCommunityType::TransTwoOctetAs => {
                let asn = u16::from_be_bytes([v[0], v[1]]);
                let local = u32::from_be_bytes([v[2], v[3], v[4], v[5]]);
                Some(format!("{asn}:{local}"))
            }
            ExtCommunityType::TransIpv4Addr => {
                let addr = Ipv4Addr::new(v[0], v[1], v[2], v[3]);
                let local = u16::from_be_bytes([v[4], v[5]]);
                Some(format!("{addr}:{local}"))
            }
            ExtCommunityType::TransFourOctetAs => {
                let asn = u32::from_be_bytes([v[0], v[1], v[2], v[3]]);
                let local = u16::from_be_bytes([v[4], v[5]]);
                Some(format!("{asn}:{local}"))
            }
            ExtCommunityType::TransOpaque => None,
        }
    }
}

impl FromStr for ExtCommunityValue {
    type Err = RtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::route_target(s)
    }
}

impl fmt::Display for ExtCommunityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(rt) = self.route_target_string() {
            return write!(f, "{}:{rt}", ExtCommunitySubType::display(self.low_type));
        }
        let v = &self.val;
        if self.high_type == u8::from(ExtCommunityType::TransOpaque) {
            let val = u16::from_be_bytes([v[4], v[5]]);
            if let Ok(tunnel) = TunnelType::try_from(val) {
                return write!(
                    f,
                    "{}:{tunnel}",
                    ExtCommunitySubType::display(self.low_type)
                );
            }
        }
        let admin = Ipv4Addr::new(v[0], v[1], v[2], v[3]);
        let val = u16::from_be_bytes([v[4], v[5]]);
        write!(
            f,
            "{}:{admin}:{val}",
            ExtCommunitySubType::display(self.low_type)
        )
    }
}

impl fmt::Debug for ExtCommunityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl ExtCommunity {
    /// Ordered Route-Target list, duplicates preserved.
    pub fn route_targets(&self) -> Vec<String> {
        self.0
            .iter()
            .filter_map(|com| com.route_target_string())
            .collect()
    }
}

impl fmt::Display for ExtCommunity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self
            .0
            .iter()
            .map(|x| x.to_string())
            .collect::<Vec<String>>()
            .join(" ");
        write!(f, "{v}")
    }
}

impl fmt::Debug for ExtCommunity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExtCommunity: {}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_target_widths() {
        let rt = ExtCommunityValue::route_target("65000:100").unwrap();
        assert_eq!(rt.high_type, 0x00);
        assert_eq!(rt.low_type, 0x02);
        assert_eq!(rt.route_target_string().unwrap(), "65000:100");

        let rt = ExtCommunityValue::route_target("10.1.1.1:20").unwrap();
        assert_eq!(rt.high_type, 0x01);
        assert_eq!(rt.route_target_string().unwrap(), "10.1.1.1:20");

        let rt = ExtCommunityValue::route_target("4200000000:1").unwrap();
        assert_eq!(rt.high_type, 0x02);
        assert_eq!(rt.route_target_string().unwrap(), "4200000000:1");
    }

    #[test]
    fn route_target_invalid() {
        for s in ["", "1", "1:", ":1", "a:b", "4200000000:70000"] {
            assert!(ExtCommunityValue::route_target(s).is_err(), "{s:?}");
        }
    }

    #[test]
    fn non_rt_subtype_excluded() {
        let mut soo = ExtCommunityValue::route_target("65000:1").unwrap();
        soo.low_type = ExtCommunitySubType::RouteOrigin.into();
        assert_eq!(soo.route_target_string(), None);

        let ecom = ExtCommunity(vec![
            ExtCommunityValue::route_target("65000:1").unwrap(),
            soo,
            ExtCommunityValue::route_target("65000:1").unwrap(),
        ]);
        // Order and duplicates preserved.
        assert_eq!(ecom.route_targets(), vec!["65000:1", "65000:1"]);
    }

    #[test]
    fn encap_vxlan() {
        let encap = ExtCommunityValue::encap(TunnelType::Vxlan);
        assert_eq!(encap.high_type, 0x03);
        assert_eq!(encap.low_type, 0x0c);
        assert_eq!(encap.val, [0, 0, 0, 0, 0, 8]);
        assert_eq!(encap.route_target_string(), None);
        assert_eq!(encap.to_string(), "encap:VXLAN");
    }

    #[test]
    fn display() {
        let ecom = ExtCommunity(vec![ExtCommunityValue::route_target("65000:100").unwrap()]);
        assert_eq!(ecom.to_string(), "rt:65000:100");
    }
}
