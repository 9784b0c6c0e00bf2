use std::collections::HashSet;

use dashmap::DashMap;
use tokio::task::JoinSet;
use tracing::error;

use crate::api::Path;
use crate::config::{VrfBinding, VrfDiff};
use crate::inject::{EvpnInjector, InjectError};

use super::route::{RouteError, VpnRouteKey};
use super::routegen;
use super::store::RouteMap;
use super::{BridgeError, ReloadError};

/// Redistributes VPNv4 routes into EVPN type-5. Holds the RD → binding
/// index and the correspondence from each VPN route to the synthetic EVPN
/// path it produced.
pub struct VpnController {
    bindings: DashMap<String, VrfBinding>,
    store: RouteMap<VpnRouteKey>,
    injector: EvpnInjector,
}

impl VpnController {
    pub fn new(injector: EvpnInjector, bindings: Vec<VrfBinding>) -> Self {
        let index = DashMap::new();
        for binding in bindings {
            index.insert(binding.rd.clone(), binding);
        }
        Self {
            bindings: index,
            store: RouteMap::new(),
            injector,
        }
    }

    pub async fn handle_update(&self, path: &Path) -> Result<(), BridgeError> {
        let key = match VpnRouteKey::from_nlri(&path.nlri) {
            Ok(key) => key,
            Err(RouteError::NotVpnRoute) => return Ok(()),
            Err(err) => return Err(err.into()),
        };
        // A route in a VRF this engine does not manage.
        let Some(binding) = self.bindings.get(&key.rd).map(|b| b.value().clone()) else {
            return Ok(());
        };
        let route = routegen::evpn_route(&key, &binding, &path.pattrs)?;
        let handle = self.injector.add_route(route).await?;
        if let Some(prior) = self.store.insert(key.clone(), handle) {
            // Implicit withdraw of the superseded path. The new handle is
            // authoritative either way.
            if let Err(err) = self.injector.del_route(prior).await {
                error!("implicit withdraw of {key}: {err}");
            }
        }
        Ok(())
    }

    pub async fn handle_withdraw(&self, path: &Path) -> Result<(), BridgeError> {
        let key = match VpnRouteKey::from_nlri(&path.nlri) {
            Ok(key) => key,
            Err(RouteError::NotVpnRoute) => return Ok(()),
            Err(err) => return Err(err.into()),
        };
        let Some(handle) = self.store.take(&key) else {
            return Ok(());
        };
        self.injector.del_route(handle).await?;
        Ok(())
    }

    /// Apply a VRF config diff: drop deleted bindings from the index, add
    /// created ones, and tear down every synthetic route whose source RD is
    /// no longer managed. Deletions run concurrently; failures aggregate.
    pub async fn reload(&self, diff: &VrfDiff) -> Result<(), ReloadError> {
        let mut deleted_rds: HashSet<String> = HashSet::new();
        for binding in &diff.deleted {
            self.bindings.remove(&binding.rd);
            deleted_rds.insert(binding.rd.clone());
        }
        for binding in &diff.created {
            self.bindings.insert(binding.rd.clone(), binding.clone());
        }

        let stale = self.store.take_matching(|key| deleted_rds.contains(&key.rd));
        let mut tasks = JoinSet::new();
        for (_, handle) in stale {
            let injector = self.injector.clone();
            tasks.spawn(async move { injector.del_route(handle).await });
        }
        let mut errors = Vec::new();
        while let Some(result) = tasks.join_next().await {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(err)) => errors.push(err),
                Err(err) => errors.push(InjectError::Join(err.to_string())),
            }
        }
        ReloadError::check(errors)
    }

    #[cfg(test)]
    pub(crate) fn store_len(&self) -> usize {
        self.store.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::testing::{MockBgp, binding, vpn_path};
    use crate::packet::{Nlri, PathAttr};
    use std::sync::Arc;

    fn controller(mock: &Arc<MockBgp>, bindings: Vec<VrfBinding>) -> VpnController {
        VpnController::new(EvpnInjector::new(mock.clone()), bindings)
    }

    #[tokio::test]
    async fn update_synthesizes_type5() {
        let mock = Arc::new(MockBgp::new());
        let ctrl = controller(&mock, vec![binding("red", "65000:100", 1000)]);

        let path = vpn_path("65000:100", "10.0.0.0/24", 1000, "192.168.1.1");
        ctrl.handle_update(&path).await.unwrap();

        let added = mock.added.lock().unwrap();
        assert_eq!(added.len(), 1);
        let Nlri::EvpnIpPrefix(nlri) = &added[0].path.nlri else {
            panic!("expected type-5 nlri");
        };
        assert_eq!(nlri.prefix.to_string(), "10.0.0.0");
        assert_eq!(nlri.prefix_len, 24);
        assert_eq!(nlri.gateway.to_string(), "192.168.1.1");
        assert_eq!(nlri.label, 1000);
        assert!(added[0]
            .path
            .pattrs
            .contains(&PathAttr::LocalPref { local_pref: 100 }));
        drop(added);
        assert_eq!(ctrl.store_len(), 1);
    }

    #[tokio::test]
    async fn unmanaged_rd_ignored() {
        let mock = Arc::new(MockBgp::new());
        let ctrl = controller(&mock, vec![binding("red", "65000:100", 1000)]);

        let path = vpn_path("65000:999", "10.0.0.0/24", 1000, "192.168.1.1");
        ctrl.handle_update(&path).await.unwrap();
        assert!(mock.added.lock().unwrap().is_empty());
        assert_eq!(ctrl.store_len(), 0);
    }

    #[tokio::test]
    async fn reannounce_is_implicit_withdraw() {
        let mock = Arc::new(MockBgp::new());
        let ctrl = controller(&mock, vec![binding("red", "65000:100", 1000)]);

        let path = vpn_path("65000:100", "10.0.0.0/24", 1000, "192.168.1.1");
        ctrl.handle_update(&path).await.unwrap();
        let first = mock.last_handle();
        ctrl.handle_update(&path).await.unwrap();
        let second = mock.last_handle();

        assert_eq!(mock.added.lock().unwrap().len(), 2);
        let deleted = mock.deleted.lock().unwrap();
        assert_eq!(deleted.len(), 1);
        assert_eq!(deleted[0].handle, first);
        drop(deleted);
        assert_ne!(first, second);
        assert_eq!(ctrl.store_len(), 1);
    }

    #[tokio::test]
    async fn implicit_withdraw_failure_keeps_new_handle() {
        let mock = Arc::new(MockBgp::new());
        let ctrl = controller(&mock, vec![binding("red", "65000:100", 1000)]);

        let path = vpn_path("65000:100", "10.0.0.0/24", 1000, "192.168.1.1");
        ctrl.handle_update(&path).await.unwrap();
        mock.fail_delete(true);
        ctrl.handle_update(&path).await.unwrap();

        assert_eq!(mock.added.lock().unwrap().len(), 2);
        assert_eq!(ctrl.store_len(), 1);

        // The stored handle is the second one: withdrawing now deletes it.
        mock.fail_delete(false);
        let second = mock.last_handle();
        ctrl.handle_withdraw(&path).await.unwrap();
        assert_eq!(mock.deleted.lock().unwrap().last().unwrap().handle, second);
    }

    #[tokio::test]
    async fn withdraw_is_idempotent() {
        let mock = Arc::new(MockBgp::new());
        let ctrl = controller(&mock, vec![binding("red", "65000:100", 1000)]);

        let path = vpn_path("65000:100", "10.0.0.0/24", 1000, "192.168.1.1");
        ctrl.handle_withdraw(&path).await.unwrap();
        assert!(mock.deleted.lock().unwrap().is_empty());

        ctrl.handle_update(&path).await.unwrap();
        ctrl.handle_withdraw(&path).await.unwrap();
        ctrl.handle_withdraw(&path).await.unwrap();
        assert_eq!(mock.deleted.lock().unwrap().len(), 1);
        assert_eq!(ctrl.store_len(), 0);
    }

    #[tokio::test]
    async fn add_failure_propagates_and_stores_nothing() {
        let mock = Arc::new(MockBgp::new());
        let ctrl = controller(&mock, vec![binding("red", "65000:100", 1000)]);
        mock.fail_add(true);

        let path = vpn_path("65000:100", "10.0.0.0/24", 1000, "192.168.1.1");
        assert!(ctrl.handle_update(&path).await.is_err());
        assert_eq!(ctrl.store_len(), 0);
    }

    #[tokio::test]
    async fn missing_next_hop_is_an_error() {
        let mock = Arc::new(MockBgp::new());
        let ctrl = controller(&mock, vec![binding("red", "65000:100", 1000)]);

        let mut path = vpn_path("65000:100", "10.0.0.0/24", 1000, "192.168.1.1");
        path.pattrs.retain(|attr| !matches!(attr, PathAttr::MpReach(_)));
        assert!(ctrl.handle_update(&path).await.is_err());
        assert!(mock.added.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn reload_tears_down_deleted_rds() {
        let mock = Arc::new(MockBgp::new());
        let red = binding("red", "65000:100", 1000);
        let blue = binding("blue", "65000:200", 2000);
        let ctrl = controller(&mock, vec![red, blue]);

        ctrl.handle_update(&vpn_path("65000:100", "10.0.0.0/24", 1000, "192.168.1.1"))
            .await
            .unwrap();
        ctrl.handle_update(&vpn_path("65000:100", "10.0.1.0/24", 1000, "192.168.1.1"))
            .await
            .unwrap();
        ctrl.handle_update(&vpn_path("65000:200", "10.0.2.0/24", 2000, "192.168.1.2"))
            .await
            .unwrap();
        assert_eq!(ctrl.store_len(), 3);

        let diff = VrfDiff {
            created: vec![],
            deleted: vec![binding("red", "65000:100", 1000)],
        };
        ctrl.reload(&diff).await.unwrap();

        assert_eq!(mock.deleted.lock().unwrap().len(), 2);
        assert_eq!(ctrl.store_len(), 1);

        // Events on the deleted RD are now ignored.
        ctrl.handle_update(&vpn_path("65000:100", "10.0.3.0/24", 1000, "192.168.1.1"))
            .await
            .unwrap();
        assert_eq!(mock.added.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn reload_aggregates_delete_failures() {
        let mock = Arc::new(MockBgp::new());
        let ctrl = controller(&mock, vec![binding("red", "65000:100", 1000)]);

        ctrl.handle_update(&vpn_path("65000:100", "10.0.0.0/24", 1000, "192.168.1.1"))
            .await
            .unwrap();
        mock.fail_delete(true);

        let diff = VrfDiff {
            created: vec![],
            deleted: vec![binding("red", "65000:100", 1000)],
        };
        let err = ctrl.reload(&diff).await.unwrap_err();
        assert_eq!(err.len(), 1);
        // The store entry is gone regardless; the next config update is
        // expected to converge state.
        assert_eq!(ctrl.store_len(), 0);
    }
}
