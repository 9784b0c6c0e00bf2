use crate::config::VrfBinding;
use crate::dto::{Evpn5Route, VpnRoute};
use crate::packet::PathAttr;

use super::filter::filter_attrs;
use super::route::{EvpnRouteKey, RouteError, VpnRouteKey, single_next_hop};

/// Compose the synthetic EVPN type-5 route for a received VPN route. The
/// gateway is the single next-hop announced in MP_REACH_NLRI.
pub fn evpn_route(
    key: &VpnRouteKey,
    binding: &VrfBinding,
    pattrs: &[PathAttr],
) -> Result<Evpn5Route, RouteError> {
    let gateway = single_next_hop(pattrs)?;
    Ok(Evpn5Route {
        rd: binding.rd.clone(),
        route_targets: binding.export_rts.clone(),
        prefix: key.prefix.into(),
        prefix_len: key.prefix_len,
        gateway,
        vni: binding.vni,
        path_attrs: filter_attrs(pattrs),
    })
}

/// Compose the synthetic VPN route for a received EVPN type-5 route. The
/// route targets are assigned by the controller afterwards.
pub fn vpn_route(key: &EvpnRouteKey, pattrs: &[PathAttr]) -> VpnRoute {
    VpnRoute {
        rd: key.rd.clone(),
        route_targets: Vec::new(),
        prefix: key.prefix,
        prefix_len: key.prefix_len,
        path_attrs: filter_attrs(pattrs),
    }
}
