use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::packet::{ExtCommunityValue, RouteDistinguisher};

/// Per-VRF stanza as it appears in the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VrfConfig {
    pub name: String,
    pub rd: String,
    pub vni: u32,
    #[serde(default, rename = "import-rts")]
    pub import_rts: Vec<String>,
    #[serde(default, rename = "export-rts")]
    pub export_rts: Vec<String>,
    #[serde(default, rename = "both-rts")]
    pub both_rts: Vec<String>,
}

/// Validated association between an L3VPN context and an EVPN context. The
/// VNI is the stable identifier across config reloads.
#[derive(Debug, Clone, PartialEq)]
pub struct VrfBinding {
    pub name: String,
    pub rd: String,
    pub vni: u32,
    pub import_rts: Vec<String>,
    pub export_rts: Vec<String>,
}

impl VrfBinding {
    /// Validate a config stanza. Import/export RT lists fall back to
    /// `both-rts` when empty; after the fallback both must be non-empty.
    pub fn from_config(cfg: &VrfConfig) -> Result<Self, ConfigError> {
        if cfg.vni == 0 {
            return Err(ConfigError::ZeroVni {
                vrf: cfg.name.clone(),
            });
        }
        cfg.rd
            .parse::<RouteDistinguisher>()
            .map_err(|_| ConfigError::InvalidRd {
                vrf: cfg.name.clone(),
                rd: cfg.rd.clone(),
            })?;
        let fallback = |rts: &Vec<String>| -> Vec<String> {
            if rts.is_empty() {
                cfg.both_rts.clone()
            } else {
                rts.clone()
            }
        };
        let import_rts = fallback(&cfg.import_rts);
        let export_rts = fallback(&cfg.export_rts);
        if import_rts.is_empty() || export_rts.is_empty() {
            return Err(ConfigError::NoRouteTargets {
                vrf: cfg.name.clone(),
            });
        }
        for rt in import_rts.iter().chain(export_rts.iter()) {
            ExtCommunityValue::route_target(rt).map_err(|_| ConfigError::InvalidRouteTarget {
                vrf: cfg.name.clone(),
                rt: rt.clone(),
            })?;
        }
        Ok(Self {
            name: cfg.name.clone(),
            rd: cfg.rd.clone(),
            vni: cfg.vni,
            import_rts,
            export_rts,
        })
    }
}

/// Result of diffing two binding sets. A modified binding shows up in both
/// lists: delete of the old shape, create of the new one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VrfDiff {
    pub created: Vec<VrfBinding>,
    pub deleted: Vec<VrfBinding>,
}

impl VrfDiff {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.deleted.is_empty()
    }
}

/// Diff two binding sets, keyed by VNI.
pub fn vrf_diff(old: &[VrfBinding], new: &[VrfBinding]) -> VrfDiff {
    let new_by_vni: HashMap<u32, &VrfBinding> = new.iter().map(|b| (b.vni, b)).collect();
    let old_by_vni: HashMap<u32, &VrfBinding> = old.iter().map(|b| (b.vni, b)).collect();

    let mut diff = VrfDiff::default();
    for binding in old {
        match new_by_vni.get(&binding.vni) {
            None => diff.deleted.push(binding.clone()),
            Some(updated) if *updated != binding => {
                diff.deleted.push(binding.clone());
                diff.created.push((*updated).clone());
            }
            Some(_) => {}
        }
    }
    for binding in new {
        if !old_by_vni.contains_key(&binding.vni) {
            diff.created.push(binding.clone());
        }
    }
    diff
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(name: &str, rd: &str, vni: u32) -> VrfConfig {
        VrfConfig {
            name: name.into(),
            rd: rd.into(),
            vni,
            import_rts: vec!["65000:1".into()],
            export_rts: vec!["65000:2".into()],
            both_rts: vec![],
        }
    }

    fn binding(name: &str, rd: &str, vni: u32) -> VrfBinding {
        VrfBinding::from_config(&cfg(name, rd, vni)).unwrap()
    }

    #[test]
    fn both_rts_fallback() {
        let mut c = cfg("red", "65000:100", 100);
        c.import_rts.clear();
        c.both_rts = vec!["65000:7".into()];
        let b = VrfBinding::from_config(&c).unwrap();
        assert_eq!(b.import_rts, vec!["65000:7"]);
        assert_eq!(b.export_rts, vec!["65000:2"]);
    }

    #[test]
    fn validation() {
        let mut c = cfg("red", "65000:100", 0);
        assert!(matches!(
            VrfBinding::from_config(&c),
            Err(ConfigError::ZeroVni { .. })
        ));

        c.vni = 100;
        c.rd = "bogus".into();
        assert!(matches!(
            VrfBinding::from_config(&c),
            Err(ConfigError::InvalidRd { .. })
        ));

        c.rd = "65000:100".into();
        c.import_rts.clear();
        assert!(matches!(
            VrfBinding::from_config(&c),
            Err(ConfigError::NoRouteTargets { .. })
        ));

        c.import_rts = vec!["not-an-rt".into()];
        assert!(matches!(
            VrfBinding::from_config(&c),
            Err(ConfigError::InvalidRouteTarget { .. })
        ));
    }

    #[test]
    fn diff_create_delete_modify() {
        let old = vec![binding("a", "65000:1", 1), binding("b", "65000:2", 2)];
        let mut changed = binding("b", "65000:2", 2);
        changed.import_rts.push("65000:9".into());
        let new = vec![changed.clone(), binding("c", "65000:3", 3)];

        let diff = vrf_diff(&old, &new);
        // "a" deleted, "b" modified (delete + create), "c" created.
        assert_eq!(diff.deleted.len(), 2);
        assert!(diff.deleted.iter().any(|b| b.name == "a"));
        assert!(diff.deleted.iter().any(|b| b.name == "b"));
        assert_eq!(diff.created.len(), 2);
        assert!(diff.created.contains(&changed));
        assert!(diff.created.iter().any(|b| b.name == "c"));
    }

    #[test]
    fn diff_unchanged_is_empty() {
        let old = vec![binding("a", "65000:1", 1)];
        assert!(vrf_diff(&old, &old.clone()).is_empty());
    }
}
