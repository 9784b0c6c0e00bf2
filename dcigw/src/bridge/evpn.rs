use std::collections::HashSet;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::error;

use crate::api::Path;
use crate::config::{VrfBinding, VrfDiff};
use crate::inject::{InjectError, VpnInjector};

use super::route::{EvpnRouteKey, RouteError, extract_route_targets};
use super::routegen;
use super::store::RtIndexMap;
use super::{BridgeError, ReloadError};

/// Produces a fresh enumeration of the speaker's EVPN RIB. Injected by the
/// dispatcher; only exercised during reload replay.
pub type RibLister = Box<dyn Fn() -> mpsc::Receiver<Path> + Send + Sync>;

/// Redistributes EVPN type-5 routes into VPNv4, dispatching on the import
/// route-targets of the configured bindings.
pub struct EvpnController {
    /// Union of import RTs across bindings. Only the event loop touches it.
    active_rts: HashSet<String>,
    store: RtIndexMap,
    injector: VpnInjector,
    lister: RibLister,
}

impl EvpnController {
    pub fn new(injector: VpnInjector, bindings: &[VrfBinding], lister: RibLister) -> Self {
        let active_rts = bindings
            .iter()
            .flat_map(|binding| binding.import_rts.iter().cloned())
            .collect();
        Self {
            active_rts,
            store: RtIndexMap::new(),
            injector,
            lister,
        }
    }

    pub async fn handle_update(&self, path: &Path) -> Result<(), BridgeError> {
        let key = match EvpnRouteKey::from_nlri(&path.nlri) {
            Ok(key) => key,
            // Type-2 (and anything else that is not an IP-prefix route) is
            // deliberately unsupported.
            Err(RouteError::NotEvpnType5Route) => return Ok(()),
            Err(err) => return Err(err.into()),
        };
        let rts = extract_route_targets(&path.pattrs);
        if !rts.iter().any(|rt| self.active_rts.contains(rt)) {
            return Ok(());
        }
        let mut route = routegen::vpn_route(&key, &path.pattrs);
        route.route_targets = rts.clone();
        let handle = self.injector.add_route(route).await?;
        if let Some(prior) = self.store.store(key.clone(), &rts, handle) {
            if let Err(err) = self.injector.del_route(prior).await {
                error!("implicit withdraw of {key}: {err}");
            }
        }
        Ok(())
    }

    pub async fn handle_withdraw(&self, path: &Path) -> Result<(), BridgeError> {
        let key = match EvpnRouteKey::from_nlri(&path.nlri) {
            Ok(key) => key,
            Err(RouteError::NotEvpnType5Route) => return Ok(()),
            Err(err) => return Err(err.into()),
        };
        let Some(handle) = self.store.delete(&key) else {
            return Ok(());
        };
        self.injector.del_route(handle).await?;
        Ok(())
    }

    /// Apply a VRF config diff. Synthetic routes whose last justifying RT
    /// disappeared are torn down; the EVPN RIB is then replayed so paths
    /// that only now became interesting get redistributed.
    pub async fn reload(&mut self, diff: &VrfDiff) -> Result<(), ReloadError> {
        let deleted_rts: HashSet<String> = diff
            .deleted
            .iter()
            .flat_map(|binding| binding.import_rts.iter().cloned())
            .collect();
        let created_rts: HashSet<String> = diff
            .created
            .iter()
            .flat_map(|binding| binding.import_rts.iter().cloned())
            .collect();
        for rt in &deleted_rts {
            self.active_rts.remove(rt);
        }
        self.active_rts.extend(created_rts.iter().cloned());

        let deleted_rts: Vec<String> = deleted_rts.into_iter().collect();
        let stale = self.store.pop_by_rt(&deleted_rts);
        let mut tasks = JoinSet::new();
        for handle in stale {
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

        // Replay: paths whose RTs were already active are still in the
        // store and are skipped; only newly interesting paths inject.
        let mut rib = (self.lister)();
        while let Some(path) = rib.recv().await {
            if path.is_local() {
                continue;
            }
            let Ok(key) = EvpnRouteKey::from_nlri(&path.nlri) else {
                continue;
            };
            if self.store.get(&key).is_some() {
                continue;
            }
            let rts = extract_route_targets(&path.pattrs);
            if !rts.iter().any(|rt| created_rts.contains(rt)) {
                continue;
            }
            let mut route = routegen::vpn_route(&key, &path.pattrs);
            route.route_targets = rts.clone();
            match self.injector.add_route(route).await {
                // Stored under the full target set of the path, not just
                // the intersection.
                Ok(handle) => {
                    self.store.store(key, &rts, handle);
                }
                Err(err) => errors.push(err),
            }
        }
        ReloadError::check(errors)
    }

    #[cfg(test)]
    pub(crate) fn active_rts(&self) -> &HashSet<String> {
        &self.active_rts
    }

    #[cfg(test)]
    pub(crate) fn store_len(&self) -> usize {
        self.store.len()
    }
}
