use crate::classes::ClassTable;
use crate::detection::Detection;
use tracing::{debug, warn};

pub mod advisory;
pub mod analyzer;
pub mod dedup;
pub mod distance;
pub mod zone;

use advisory::{AdvisoryStreams, ClassSightings, ZoneDistances};
use analyzer::Directive;
use zone::ZoneGrid;

/// Everything derived from one frame's detections.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameAnalysis {
    pub zone_distances: ZoneDistances,
    pub directive: Directive,
    pub streams: AdvisoryStreams,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameGeometry {
    pub width: u32,
    pub height: u32,
    pub focal_length_px: f32,
}

/// Place each detection on the zone grid, estimate its distance and build the
/// advisory streams.
///
/// Detections whose label is unknown, whose zone cannot be determined or
/// whose distance cannot be estimated do not contribute.
pub fn analyze_frame(
    detections: &[Detection],
    classes: &ClassTable,
    geometry: FrameGeometry,
    step_length_m: f32,
) -> FrameAnalysis {
    let grid = ZoneGrid::new(geometry.width, geometry.height);
    let mut zone_distances = ZoneDistances::default();
    let mut sightings = ClassSightings::default();
    let mut skipped = 0usize;

    for detection in detections {
        let Some(class) = classes.get(detection.label) else {
            warn!(
                label = detection.label,
                classes = classes.len(),
                "Detection label outside class table"
            );
            skipped += 1;
            continue;
        };
        let Some(zone) = grid.zone_for(&detection.rect) else {
            skipped += 1;
            continue;
        };
        let distance_m = distance::estimate_distance(
            geometry.focal_length_px,
            class.height_m,
            detection.rect.height,
        );
        if !distance::is_valid_distance(distance_m) {
            skipped += 1;
            continue;
        }

        zone_distances.record(zone, distance_m);
        sightings.record(
            &class.name,
            zone,
            distance::steps_for_distance(distance_m, step_length_m),
        );
    }

    let directive = analyzer::analyze(&zone_distances);
    debug!(
        detections = detections.len(),
        skipped,
        zones = zone_distances.iter().count(),
        directive = %directive,
        "Frame analysed"
    );

    let streams = AdvisoryStreams {
        all_detections: sightings.detection_sentences(),
        center_detections: sightings.center_sentences(),
        min_nav_directions: vec![directive.to_string()],
        max_nav_directions: sightings.navigation_sentences(),
    };
    FrameAnalysis {
        zone_distances,
        directive,
        streams,
    }
}
