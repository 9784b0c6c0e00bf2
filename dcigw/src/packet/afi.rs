use std::fmt;

use serde::{Deserialize, Serialize};
use strum_macros::Display;

#[repr(u16)]
#[derive(Debug, Default, PartialEq, Eq, Ord, PartialOrd, Clone, Copy, Hash, Serialize, Deserialize, Display)]
pub enum Afi {
    #[default]
    #[strum(serialize = "IPv4")]
    Ip = 1,
    #[strum(serialize = "IPv6")]
    Ip6 = 2,
    #[strum(serialize = "L2VPN")]
    L2vpn = 25,
    #[strum(to_string = "Unknown({0})")]
    Unknown(u16),
}

#[repr(u8)]
#[derive(Debug, Default, PartialEq, Eq, Ord, PartialOrd, Clone, Copy, Hash, Serialize, Deserialize, Display)]
pub enum Safi {
    #[default]
    Unicast = 1,
    #[strum(serialize = "EVPN")]
    Evpn = 70,
    #[strum(serialize = "MPLS VPN")]
    MplsVpn = 128,
    #[strum(to_string = "Unknown({0})")]
    Unknown(u8),
}

impl From<Afi> for u16 {
    fn from(afi: Afi) -> u16 {
        use Afi::*;
        match afi {
            Ip => 1,
            Ip6 => 2,
            L2vpn => 25,
            Unknown(v) => v,
        }
    }
}

impl From<u16> for Afi {
    fn from(val: u16) -> Self {
        use Afi::*;
        match val {
            1 => Ip,
            2 => Ip6,
            25 => L2vpn,
            v => Unknown(v),
        }
    }
}

impl From<Safi> for u8 {
    fn from(safi: Safi) -> u8 {
        use Safi::*;
        match safi {
            Unicast => 1,
            Evpn => 70,
            MplsVpn => 128,
            Unknown(v) => v,
        }
    }
}

impl From<u8> for Safi {
    fn from(val: u8) -> Self {
        use Safi::*;
        match val {
            1 => Unicast,
            70 => Evpn,
            128 => MplsVpn,
            v => Unknown(v),
        }
    }
}

/// AFI/SAFI pair identifying a route family.
#[derive(Debug, Default, PartialEq, Eq, Ord, PartialOrd, Clone, Copy, Hash, Serialize, Deserialize)]
pub struct Family {
    pub afi: Afi,
    pub safi: Safi,
}

impl Family {
    pub fn new(afi: Afi, safi: Safi) -> Self {
        Self { afi, safi }
    }

    /// AFI=IPv4, SAFI=MPLS-VPN.
    pub fn vpnv4() -> Self {
        Self::new(Afi::Ip, Safi::MplsVpn)
    }

    /// AFI=L2VPN, SAFI=EVPN.
    pub fn evpn() -> Self {
        Self::new(Afi::L2vpn, Safi::Evpn)
    }

    pub fn is_vpnv4(&self) -> bool {
        *self == Self::vpnv4()
    }

    pub fn is_evpn(&self) -> bool {
        *self == Self::evpn()
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.afi, self.safi)
    }
}
