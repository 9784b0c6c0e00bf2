use crate::packet::PathAttr;

/// Whether an attribute is copied verbatim onto synthetic routes. NEXT_HOP,
/// MP_REACH/UNREACH and EXTENDED_COMMUNITIES are synthesized fresh by the
/// injectors; unknown attributes are dropped.
fn is_redistributable(attr: &PathAttr) -> bool {
    matches!(
        attr,
        PathAttr::Origin { .. }
            | PathAttr::AsPath(_)
            | PathAttr::As4Path(_)
            | PathAttr::Med { .. }
            | PathAttr::LocalPref { .. }
            | PathAttr::AtomicAggregate
            | PathAttr::Aggregator(_)
            | PathAttr::As4Aggregator(_)
            | PathAttr::Communities { .. }
            | PathAttr::OriginatorId { .. }
            | PathAttr::ClusterList { .. }
            | PathAttr::PmsiTunnel { .. }
            | PathAttr::TunnelEncap { .. }
            | PathAttr::Aigp { .. }
            | PathAttr::LargeCommunities { .. }
    )
}

/// Copy the whitelisted subset of path attributes from a source path.
pub fn filter_attrs(pattrs: &[PathAttr]) -> Vec<PathAttr> {
    pattrs
        .iter()
        .filter(|attr| is_redistributable(attr))
        .cloned()
        .collect()
}
