pub mod evpn;
pub use evpn::EvpnInjector;

pub mod vpn;
pub use vpn::VpnInjector;

use std::net::IpAddr;

use thiserror::Error;

use crate::api::ApiError;
use crate::packet::{ExtCommunity, ExtCommunityValue, PathAttr};

#[derive(Error, Debug)]
pub enum InjectError {
    #[error("invalid route-distinguisher {rd:?}")]
    InvalidRd { rd: String },
    #[error("invalid route-target {rt:?}")]
    InvalidRouteTarget { rt: String },
    #[error("prefix {0} is not IPv4")]
    UnsupportedPrefix(IpAddr),
    #[error("add path: {0}")]
    AddPath(#[source] ApiError),
    #[error("delete path: {0}")]
    DeletePath(#[source] ApiError),
    #[error("delete task: {0}")]
    Join(String),
}

/// Build the EXTENDED_COMMUNITIES attribute for a synthetic route: every
/// route-target rendered as a Route-Target community, plus any extra
/// communities the caller appends (e.g. the VXLAN encap).
pub(crate) fn route_target_attr(
    route_targets: &[String],
    extra: Vec<ExtCommunityValue>,
) -> Result<PathAttr, InjectError> {
    let mut communities = Vec::with_capacity(route_targets.len() + extra.len());
    for rt in route_targets {
        let com = ExtCommunityValue::route_target(rt)
            .map_err(|_| InjectError::InvalidRouteTarget { rt: rt.clone() })?;
        communities.push(com);
    }
    communities.extend(extra);
    Ok(PathAttr::ExtCommunities {
        communities: ExtCommunity(communities),
    })
}
