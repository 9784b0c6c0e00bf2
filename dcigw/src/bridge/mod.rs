pub mod inst;
pub use inst::{Bridge, Message, serve};

pub mod route;
pub use route::{EvpnRouteKey, RouteError, VpnRouteKey};

pub mod filter;
pub mod routegen;
pub mod store;

pub mod vpn;
pub use vpn::VpnController;

pub mod evpn;
pub use evpn::{EvpnController, RibLister};

use itertools::Itertools;
use thiserror::Error;

use crate::inject::InjectError;

/// Per-event failure from a controller. Decode errors the controllers
/// swallow never surface here.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error(transparent)]
    Route(#[from] RouteError),
    #[error(transparent)]
    Inject(#[from] InjectError),
}

/// Aggregate of injector failures from one reload. Reloads never roll
/// back; the next config update is expected to converge state.
#[derive(Error, Debug)]
#[error("reload: {} injector operation(s) failed: {}", .0.len(), .0.iter().map(|e| e.to_string()).join("; "))]
pub struct ReloadError(Vec<InjectError>);

impl ReloadError {
    pub fn check(errors: Vec<InjectError>) -> Result<(), ReloadError> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ReloadError(errors))
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
