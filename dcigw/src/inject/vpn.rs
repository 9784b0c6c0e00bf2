use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use ipnet::Ipv4Net;

use crate::api::{AddPathRequest, BgpApi, DeletePathRequest, Path, PathHandle};
use crate::dto::VpnRoute;
use crate::packet::{Family, Nlri, PathAttr, RouteDistinguisher, Vpnv4Nlri};

use super::{InjectError, route_target_attr};

/// Injects synthetic VPNv4 routes into the speaker. Label selection is the
/// speaker's business; the NLRI carries a single null label.
#[derive(Clone)]
pub struct VpnInjector {
    api: Arc<dyn BgpApi>,
}

impl VpnInjector {
    pub fn new(api: Arc<dyn BgpApi>) -> Self {
        Self { api }
    }

    pub async fn add_route(&self, route: VpnRoute) -> Result<PathHandle, InjectError> {
        let rd: RouteDistinguisher = route
            .rd
            .parse()
            .map_err(|_| InjectError::InvalidRd { rd: route.rd.clone() })?;
        let IpAddr::V4(addr) = route.prefix else {
            return Err(InjectError::UnsupportedPrefix(route.prefix));
        };
        let prefix = Ipv4Net::new(addr, route.prefix_len)
            .map_err(|_| InjectError::UnsupportedPrefix(route.prefix))?;
        let nlri = Nlri::Vpnv4(Vpnv4Nlri {
            rd,
            labels: vec![0],
            prefix,
        });
        let mut pattrs = route.path_attrs;
        pattrs.push(route_target_attr(&route.route_targets, Vec::new())?);
        pattrs.push(PathAttr::NextHop {
            next_hop: Ipv4Addr::UNSPECIFIED,
        });
        let req = AddPathRequest {
            path: Path {
                family: Family::vpnv4(),
                nlri,
                pattrs,
                is_withdraw: false,
                neighbor_ip: String::new(),
            },
        };
        self.api.add_path(req).await.map_err(InjectError::AddPath)
    }

    pub async fn del_route(&self, handle: PathHandle) -> Result<(), InjectError> {
        let req = DeletePathRequest {
            family: Family::vpnv4(),
            handle,
        };
        self.api
            .delete_path(req)
            .await
            .map_err(InjectError::DeletePath)
    }
}
