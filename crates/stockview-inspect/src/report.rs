//! Offline run of the viewer pipeline over saved ERP responses

use std::collections::HashMap;

use anyhow::{bail, Result};
use serde_json::Value;
use stockview_core::session::SessionContext;
use stockview_core::{DataFetchError, Layout, LocationId, OccupancyState, OccupancyTier, ViewerConfig};
use stockview_scene::{CameraPose, FetchRequest, InteractionController, Phase};

/// Occupancy responses keyed by location code
pub type OccupancySnapshot = HashMap<String, Result<OccupancyState, DataFetchError>>;

/// Decode `{code: [has_quantity, fill_percent]}`. Entries that fail to decode
/// are kept as errors so they classify the same way a failed fetch would.
pub fn decode_occupancy_snapshot(value: &Value) -> Result<OccupancySnapshot> {
    let Value::Object(entries) = value else {
        bail!("occupancy snapshot must be an object keyed by location code");
    };
    Ok(entries
        .iter()
        .map(|(code, state)| (code.clone(), OccupancyState::decode(state)))
        .collect())
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinLine {
    pub code: String,
    pub owner: Option<LocationId>,
    pub tier: OccupancyTier,
    pub opacity: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub bins: Vec<BinLine>,
    pub rejected: Vec<(String, String)>,
    pub pose: Option<CameraPose>,
    pub occupancy_requests: usize,
}

impl Report {
    pub fn count(&self, tier: OccupancyTier) -> usize {
        self.bins.iter().filter(|bin| bin.tier == tier).count()
    }
}

/// Drive an [`InteractionController`] through mount and loading, answering
/// its fetches from the snapshots instead of the network
pub fn run_pipeline(
    config: ViewerConfig,
    location: Option<LocationId>,
    layout: Layout,
    occupancy: &OccupancySnapshot,
) -> Report {
    let rejected = layout
        .rejected
        .iter()
        .map(|(code, err)| (code.clone(), err.to_string()))
        .collect();

    let mut controller = InteractionController::new(config);
    let session = SessionContext {
        company_id: None,
        location_id: location,
    };
    controller.mount(session);

    let requests = controller.layout_loaded(Ok(layout));
    let mut occupancy_requests = 0;
    for request in requests {
        if let FetchRequest::Occupancy { code } = request {
            occupancy_requests += 1;
            let result = occupancy
                .get(&code)
                .cloned()
                .unwrap_or_else(|| Err(DataFetchError::Malformed(format!("no snapshot for {}", code))));
            controller.occupancy_loaded(&code, result);
        }
    }
    debug_assert_eq!(controller.phase(), Phase::Ready);

    let scene = controller.scene();
    let bins = scene
        .pickable()
        .iter()
        .filter_map(|(id, _)| scene.meta(*id))
        .map(|meta| BinLine {
            code: meta.code.clone(),
            owner: meta.owner.clone(),
            tier: meta.appearance.tier,
            opacity: meta.appearance.opacity,
        })
        .collect();

    Report {
        bins,
        rejected,
        pose: controller.framed_pose().map(|(_, pose)| pose),
        occupancy_requests,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stockview_core::decode_layout;

    fn layout() -> Layout {
        decode_layout(&json!({
            "A1": [0, 0, 0, 1, 1, 1, 8],
            "A2": [2, 0, 0, 1, 1, 1, 8],
            "B1": [0, 0, 4, 1, 1, 1, 9],
            "BAD": [0, 0, 0, 0, 0, 0, 8]
        }))
        .unwrap()
    }

    #[test]
    fn test_snapshot_drives_tiers() {
        let occupancy = decode_occupancy_snapshot(&json!({
            "A1": [1, 120.0],
            "A2": "garbage"
        }))
        .unwrap();

        let report = run_pipeline(ViewerConfig::default(), Some(LocationId::new("8")), layout(), &occupancy);

        assert_eq!(report.bins.len(), 3);
        assert_eq!(report.occupancy_requests, 2);
        assert_eq!(report.count(OccupancyTier::Overload), 1);
        assert_eq!(report.count(OccupancyTier::Unknown), 1);
        assert_eq!(report.count(OccupancyTier::Inactive), 1);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].0, "BAD");
        assert!(report.pose.is_some());
    }

    #[test]
    fn test_empty_layout_reports_placeholder() {
        let report = run_pipeline(ViewerConfig::default(), None, Layout::default(), &OccupancySnapshot::new());

        assert_eq!(report.bins.len(), 1);
        assert_eq!(report.bins[0].owner, None);
        assert_eq!(report.occupancy_requests, 0);
        assert!(report.pose.is_some());
    }

    #[test]
    fn test_snapshot_must_be_object() {
        assert!(decode_occupancy_snapshot(&json!([1, 2])).is_err());
    }
}
