use std::net::Ipv4Addr;
use std::sync::Arc;

use crate::api::{AddPathRequest, BgpApi, DeletePathRequest, Path, PathHandle};
use crate::dto::Evpn5Route;
use crate::packet::{
    Esi, EvpnIpPrefixNlri, ExtCommunityValue, Family, Nlri, PathAttr, RouteDistinguisher,
    TunnelType,
};

use super::{InjectError, route_target_attr};

/// Injects synthetic EVPN type-5 routes into the speaker.
#[derive(Clone)]
pub struct EvpnInjector {
    api: Arc<dyn BgpApi>,
}

impl EvpnInjector {
    pub fn new(api: Arc<dyn BgpApi>) -> Self {
        Self { api }
    }

    pub async fn add_route(&self, route: Evpn5Route) -> Result<PathHandle, InjectError> {
        let rd: RouteDistinguisher = route
            .rd
            .parse()
            .map_err(|_| InjectError::InvalidRd { rd: route.rd.clone() })?;
        let nlri = Nlri::EvpnIpPrefix(EvpnIpPrefixNlri {
            rd,
            esi: Esi::default(),
            ethernet_tag: 0,
            prefix: route.prefix,
            prefix_len: route.prefix_len,
            gateway: route.gateway,
            label: route.vni,
        });
        let encap = ExtCommunityValue::encap(TunnelType::Vxlan);
        let mut pattrs = route.path_attrs;
        pattrs.push(route_target_attr(&route.route_targets, vec![encap])?);
        // The speaker rewrites the next-hop on the way out.
        pattrs.push(PathAttr::NextHop {
            next_hop: Ipv4Addr::UNSPECIFIED,
        });
        let req = AddPathRequest {
            path: Path {
                family: Family::evpn(),
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
            family: Family::evpn(),
            handle,
        };
        self.api
            .delete_path(req)
            .await
            .map_err(InjectError::DeletePath)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::testing::MockBgp;
    use std::net::IpAddr;

    fn route() -> Evpn5Route {
        Evpn5Route {
            rd: "65000:100".into(),
            route_targets: vec!["65000:100".into(), "65000:200".into()],
            prefix: "10.0.0.0".parse().unwrap(),
            prefix_len: 24,
            gateway: "192.168.1.1".parse().unwrap(),
            vni: 1000,
            path_attrs: vec![PathAttr::LocalPref { local_pref: 100 }],
        }
    }

    #[tokio::test]
    async fn add_route_encodes_type5() {
        let mock = Arc::new(MockBgp::new());
        let injector = EvpnInjector::new(mock.clone());

        let handle = injector.add_route(route()).await.unwrap();

        let added = mock.added.lock().unwrap();
        assert_eq!(added.len(), 1);
        let path = &added[0].path;
        assert_eq!(path.family, Family::evpn());
        let Nlri::EvpnIpPrefix(nlri) = &path.nlri else {
            panic!("expected type-5 nlri, got {:?}", path.nlri);
        };
        assert_eq!(nlri.rd.canonical().unwrap(), "65000:100");
        assert!(nlri.esi.is_zero());
        assert_eq!(nlri.ethernet_tag, 0);
        assert_eq!(nlri.prefix, "10.0.0.0".parse::<IpAddr>().unwrap());
        assert_eq!(nlri.prefix_len, 24);
        assert_eq!(nlri.gateway, "192.168.1.1".parse::<IpAddr>().unwrap());
        assert_eq!(nlri.label, 1000);

        // Source attributes kept, ext-communities and zero next-hop added.
        assert!(path
            .pattrs
            .contains(&PathAttr::LocalPref { local_pref: 100 }));
        assert!(path.pattrs.contains(&PathAttr::NextHop {
            next_hop: Ipv4Addr::UNSPECIFIED
        }));
        let ecom = path
            .pattrs
            .iter()
            .find_map(|attr| match attr {
                PathAttr::ExtCommunities { communities } => Some(communities),
                _ => None,
            })
            .expect("ext-communities attribute");
        assert_eq!(ecom.route_targets(), vec!["65000:100", "65000:200"]);
        assert_eq!(*ecom.0.last().unwrap(), ExtCommunityValue::encap(TunnelType::Vxlan));
        drop(added);

        injector.del_route(handle.clone()).await.unwrap();
        let deleted = mock.deleted.lock().unwrap();
        assert_eq!(deleted.len(), 1);
        assert_eq!(deleted[0].handle, handle);
        assert_eq!(deleted[0].family, Family::evpn());
    }

    #[tokio::test]
    async fn bad_route_target_fails_before_injection() {
        let mock = Arc::new(MockBgp::new());
        let injector = EvpnInjector::new(mock.clone());

        let mut bad = route();
        bad.route_targets = vec!["not-an-rt".into()];
        let err = injector.add_route(bad).await.unwrap_err();
        assert!(matches!(err, InjectError::InvalidRouteTarget { .. }));
        assert!(mock.added.lock().unwrap().is_empty());
    }
}
