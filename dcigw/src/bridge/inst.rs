use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{Level, debug, error, info};

use crate::api::{ApiError, BgpApi, ListPathRequest, WatchEvent, WatchEventFilter};
use crate::config::{VrfBinding, VrfDiff};
use crate::inject::{EvpnInjector, VpnInjector};
use crate::packet::Family;

use super::evpn::{EvpnController, RibLister};
use super::vpn::VpnController;

/// Control messages from the config watcher.
#[derive(Debug)]
pub enum Message {
    Reload(VrfDiff),
    Stop,
}

/// Event channel capacity. The speaker-side publisher blocks when the
/// buffer fills, applying backpressure upstream.
pub const EVENT_CHANNEL_SIZE: usize = 100_000;

/// Owns both controllers and multiplexes best-path events with control
/// messages. Everything engine-state-mutating runs on this single task.
pub struct Bridge {
    api: Arc<dyn BgpApi>,
    vpn: VpnController,
    evpn: EvpnController,
    event_tx: mpsc::Sender<WatchEvent>,
    event_rx: mpsc::Receiver<WatchEvent>,
    pub tx: mpsc::Sender<Message>,
    rx: mpsc::Receiver<Message>,
}

impl Bridge {
    pub fn new(api: Arc<dyn BgpApi>, bindings: Vec<VrfBinding>) -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
        let (tx, rx) = mpsc::channel(1);
        let vpn = VpnController::new(EvpnInjector::new(api.clone()), bindings.clone());
        let evpn = EvpnController::new(
            VpnInjector::new(api.clone()),
            &bindings,
            rib_lister(api.clone()),
        );
        Self {
            api,
            vpn,
            evpn,
            event_tx,
            event_rx,
            tx,
            rx,
        }
    }

    /// Subscribe to best-path events; `init` replays the RIB so state is
    /// rebuilt after a restart.
    pub async fn subscribe(&self) -> Result<(), ApiError> {
        let filter = WatchEventFilter {
            best_path: true,
            init: true,
        };
        self.api.watch_event(filter, self.event_tx.clone()).await
    }

    pub async fn event_loop(&mut self) {
        loop {
            tokio::select! {
                Some(msg) = self.rx.recv() => match msg {
                    Message::Reload(diff) => self.reload(diff).await,
                    Message::Stop => {
                        info!("bridge stopped");
                        break;
                    }
                },
                event = self.event_rx.recv() => match event {
                    Some(event) => self.process_event(event).await,
                    None => break,
                },
            }
        }
    }

    async fn reload(&mut self, diff: VrfDiff) {
        info!(
            "vrf reload: {} created, {} deleted",
            diff.created.len(),
            diff.deleted.len()
        );
        if let Err(err) = self.evpn.reload(&diff).await {
            error!("evpn reload: {err}");
        }
        if let Err(err) = self.vpn.reload(&diff).await {
            error!("vpn reload: {err}");
        }
    }

    pub(crate) async fn process_event(&mut self, event: WatchEvent) {
        for path in event.paths {
            // Locally originated paths include everything this engine
            // injected; redistributing them again would loop.
            if path.is_local() {
                continue;
            }
            if tracing::enabled!(Level::DEBUG) {
                debug!("path from {}: {}", path.neighbor_ip, path.nlri);
            }
            let result = if path.family.is_vpnv4() {
                if path.is_withdraw {
                    self.vpn.handle_withdraw(&path).await
                } else {
                    self.vpn.handle_update(&path).await
                }
            } else if path.family.is_evpn() {
                if path.is_withdraw {
                    self.evpn.handle_withdraw(&path).await
                } else {
                    self.evpn.handle_update(&path).await
                }
            } else {
                Ok(())
            };
            if let Err(err) = result {
                error!("handle {}: {err}", path.nlri);
            }
        }
    }
}

fn rib_lister(api: Arc<dyn BgpApi>) -> RibLister {
    Box::new(move || {
        let (tx, rx) = mpsc::channel(1);
        let api = api.clone();
        tokio::spawn(async move {
            match api
                .list_path(ListPathRequest {
                    family: Family::evpn(),
                })
                .await
            {
                Ok(mut paths) => {
                    while let Some(path) = paths.recv().await {
                        if tx.send(path).await.is_err() {
                            break;
                        }
                    }
                }
                Err(err) => error!("list evpn rib: {err}"),
            }
        });
        rx
    })
}

pub fn serve(mut bridge: Bridge) -> mpsc::Sender<Message> {
    let tx = bridge.tx.clone();
    tokio::spawn(async move {
        bridge.event_loop().await;
    });
    tx
}
