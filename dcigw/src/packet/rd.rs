use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RdError {
    #[error("invalid route distinguisher type {0}")]
    InvalidType(u16),
    #[error("invalid route distinguisher {0:?}")]
    InvalidString(String),
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, TryFromPrimitive, IntoPrimitive)]
#[repr(u16)]
pub enum RdType {
    TwoOctetAs = 0,
    Ipv4 = 1,
    FourOctetAs = 2,
}

/// Route distinguisher in wire form: a two-octet type followed by a
/// six-octet value whose layout depends on the type.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteDistinguisher {
    pub typ: u16,
    pub val: [u8; 6],
}

impl RouteDistinguisher {
    /// Canonical `admin:assigned` form. Admin renders as a decimal ASN or a
    /// dotted quad, matching the wire type.
    pub fn canonical(&self) -> Result<String, RdError> {
        let typ = RdType::try_from(self.typ).map_err(|_| RdError::InvalidType(self.typ))?;
        let v = &self.val;
        Ok(match typ {
            RdType::TwoOctetAs => {
                let admin = u16::from_be_bytes([v[0], v[1]]);
                let assigned = u32::from_be_bytes([v[2], v[3], v[4], v[5]]);
                format!("{admin}:{assigned}")
            }
            RdType::Ipv4 => {
                let admin = Ipv4Addr::new(v[0], v[1], v[2], v[3]);
                let assigned = u16::from_be_bytes([v[4], v[5]]);
                format!("{admin}:{assigned}")
            }
            RdType::FourOctetAs => {
                let admin = u32::from_be_bytes([v[0], v[1], v[2], v[3]]);
                let assigned = u16::from_be_bytes([v[4], v[5]]);
                format!("{admin}:{assigned}")
            }
        })
    }

    pub fn two_octet_as(admin: u16, assigned: u32) -> Self {
        let mut val = [0u8; 6];
        val[..2].copy_from_slice(&admin.to_be_bytes());
        val[2..].copy_from_slice(&assigned.to_be_bytes());
        Self {
            typ: RdType::TwoOctetAs.into(),
            val,
        }
    }

    pub fn ipv4(admin: Ipv4Addr, assigned: u16) -> Self {
        let mut val = [0u8; 6];
        val[..4].copy_from_slice(&admin.octets());
        val[4..].copy_from_slice(&assigned.to_be_bytes());
        Self {
            typ: RdType::Ipv4.into(),
            val,
        }
    }

    pub fn four_octet_as(admin: u32, assigned: u16) -> Self {
        let mut val = [0u8; 6];
        val[..4].copy_from_slice(&admin.to_be_bytes());
        val[4..].copy_from_slice(&assigned.to_be_bytes());
        Self {
            typ: RdType::FourOctetAs.into(),
            val,
        }
    }
}

impl FromStr for RouteDistinguisher {
    type Err = RdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || RdError::InvalidString(s.to_string());
        let (admin, assigned) = s.rsplit_once(':').ok_or_else(err)?;
        if admin.is_empty() || assigned.is_empty() {
            return Err(err());
        }
        if let Ok(addr) = admin.parse::<Ipv4Addr>() {
            let assigned = assigned.parse::<u16>().map_err(|_| err())?;
            return Ok(Self::ipv4(addr, assigned));
        }
        let admin: u64 = admin.parse().map_err(|_| err())?;
        if admin <= u16::MAX as u64 {
            let assigned = assigned.parse::<u32>().map_err(|_| err())?;
            Ok(Self::two_octet_as(admin as u16, assigned))
        } else if admin <= u32::MAX as u64 {
            let assigned = assigned.parse::<u16>().map_err(|_| err())?;
            Ok(Self::four_octet_as(admin as u32, assigned))
        } else {
            Err(err())
        }
    }
}

impl fmt::Display for RouteDistinguisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.canonical() {
            Ok(s) => write!(f, "{s}"),
            Err(_) => write!(f, "rd(type {})", self.typ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_octet() {
        let rd: RouteDistinguisher = "65000:100".parse().unwrap();
        assert_eq!(rd.typ, u16::from(RdType::TwoOctetAs));
        assert_eq!(rd.canonical().unwrap(), "65000:100");
    }

    #[test]
    fn ipv4_admin() {
        let rd: RouteDistinguisher = "192.0.2.1:7".parse().unwrap();
        assert_eq!(rd.typ, u16::from(RdType::Ipv4));
        assert_eq!(rd.canonical().unwrap(), "192.0.2.1:7");
    }

    #[test]
    fn four_octet() {
        let rd: RouteDistinguisher = "4200000000:12".parse().unwrap();
        assert_eq!(rd.typ, u16::from(RdType::FourOctetAs));
        assert_eq!(rd.canonical().unwrap(), "4200000000:12");
    }

    #[test]
    fn invalid_strings() {
        for s in ["", "65000", ":1", "65000:", "x:1", "65000:y", "99999999999:1"] {
            assert!(s.parse::<RouteDistinguisher>().is_err(), "{s:?}");
        }
    }

    #[test]
    fn invalid_wire_type() {
        let rd = RouteDistinguisher {
            typ: 9,
            val: [0; 6],
        };
        assert_eq!(rd.canonical(), Err(RdError::InvalidType(9)));
        assert_eq!(rd.to_string(), "rd(type 9)");
    }

    #[test]
    fn assigned_width_follows_type() {
        // Two-octet admin carries a 32-bit assigned number.
        let rd: RouteDistinguisher = "1:4294967295".parse().unwrap();
        assert_eq!(rd.canonical().unwrap(), "1:4294967295");
        // Four-octet admin only leaves room for 16 bits.
        assert!("4200000000:70000".parse::<RouteDistinguisher>().is_err());
    }
}
