//! Per-frame aggregation of detections into spoken advisories.

use crate::navigation::zone::GridZone;
use serde::Serialize;
use std::collections::BTreeMap;

/// Nearest distance seen in each zone during one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneDistances {
    nearest: BTreeMap<GridZone, f32>,
}

impl ZoneDistances {
    /// Record `distance_m` for `zone`, keeping the smaller value.
    pub fn record(&mut self, zone: GridZone, distance_m: f32) {
        self.nearest
            .entry(zone)
            .and_modify(|current| *current = current.min(distance_m))
            .or_insert(distance_m);
    }

    pub fn get(&self, zone: GridZone) -> Option<f32> {
        self.nearest.get(&zone).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.nearest.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (GridZone, f32)> + '_ {
        self.nearest.iter().map(|(zone, distance)| (*zone, *distance))
    }
}

impl FromIterator<(GridZone, f32)> for ZoneDistances {
    fn from_iter<I: IntoIterator<Item = (GridZone, f32)>>(iter: I) -> Self {
        let mut distances = Self::default();
        for (zone, distance) in iter {
            distances.record(zone, distance);
        }
        distances
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sighting {
    pub zone: GridZone,
    pub steps: u32,
}

/// Sightings grouped by class name, iterated in ascending name order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassSightings {
    by_class: BTreeMap<String, Vec<Sighting>>,
}

impl ClassSightings {
    pub fn record(&mut self, class_name: &str, zone: GridZone, steps: u32) {
        self.by_class
            .entry(class_name.to_string())
            .or_default()
            .push(Sighting { zone, steps });
    }

    pub fn is_empty(&self) -> bool {
        self.by_class.is_empty()
    }

    /// `"<count> <class> detected at <zones>. <step phrases>"` per class.
    pub fn detection_sentences(&self) -> Vec<String> {
        self.class_sentences(step_phrase)
    }

    /// Same grouping as [`Self::detection_sentences`] with navigation wording.
    pub fn navigation_sentences(&self) -> Vec<String> {
        self.class_sentences(navigation_step_phrase)
    }

    /// One sentence per sighting in a center column.
    pub fn center_sentences(&self) -> Vec<String> {
        self.by_class
            .iter()
            .flat_map(|(class, sightings)| {
                sightings
                    .iter()
                    .filter(|s| s.zone.is_center())
                    .map(move |s| format!("Detected {class} at {}. {}", s.zone, step_phrase(s.steps)))
            })
            .collect()
    }

    fn class_sentences(&self, phrase: fn(u32) -> String) -> Vec<String> {
        self.by_class
            .iter()
            .map(|(class, sightings)| {
                let zones = sightings
                    .iter()
                    .map(|s| s.zone.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                let phrases = sightings
                    .iter()
                    .map(|s| phrase(s.steps))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{} {class} detected at {zones}. {phrases}", sightings.len())
            })
            .collect()
    }
}

pub fn step_phrase(steps: u32) -> String {
    if steps < 1 {
        "Stretch out your hand!".to_string()
    } else {
        format!("Take {steps} steps.")
    }
}

pub fn navigation_step_phrase(steps: u32) -> String {
    if steps < 1 {
        "Less than a step away".to_string()
    } else {
        format!("In {steps} steps.")
    }
}

/// The four advisory streams produced for one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AdvisoryStreams {
    pub all_detections: Vec<String>,
    pub center_detections: Vec<String>,
    pub min_nav_directions: Vec<String>,
    pub max_nav_directions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::zone::{Column, Row};

    const NEAR_CENTER: GridZone = GridZone::new(Row::Near, Column::Center);
    const FAR_LEFT: GridZone = GridZone::new(Row::Far, Column::Left);
    const MID_RIGHT: GridZone = GridZone::new(Row::Mid, Column::Right);

    #[test]
    fn zone_distances_keep_minimum() {
        let mut distances = ZoneDistances::default();
        distances.record(NEAR_CENTER, 3.0);
        distances.record(NEAR_CENTER, 1.5);
        distances.record(NEAR_CENTER, 2.0);

        assert_eq!(distances.get(NEAR_CENTER), Some(1.5));
        assert_eq!(distances.get(FAR_LEFT), None);
    }

    #[test]
    fn class_sentence_lists_zones_then_phrases() {
        let mut sightings = ClassSightings::default();
        sightings.record("person", NEAR_CENTER, 0);
        sightings.record("person", FAR_LEFT, 4);

        assert_eq!(
            sightings.detection_sentences(),
            vec!["2 person detected at Near-Center, Far-Left. Stretch out your hand!, Take 4 steps."]
        );
        assert_eq!(
            sightings.navigation_sentences(),
            vec!["2 person detected at Near-Center, Far-Left. Less than a step away, In 4 steps."]
        );
    }

    #[test]
    fn classes_are_emitted_in_name_order() {
        let mut sightings = ClassSightings::default();
        sightings.record("person", MID_RIGHT, 2);
        sightings.record("chair", FAR_LEFT, 5);

        let sentences = sightings.detection_sentences();

        assert_eq!(sentences.len(), 2);
        assert!(sentences[0].starts_with("1 chair"));
        assert!(sentences[1].starts_with("1 person"));
    }

    #[test]
    fn center_sentences_only_cover_center_column() {
        let mut sightings = ClassSightings::default();
        sightings.record("person", NEAR_CENTER, 2);
        sightings.record("person", FAR_LEFT, 6);
        sightings.record("dog", MID_RIGHT, 1);

        assert_eq!(
            sightings.center_sentences(),
            vec!["Detected person at Near-Center. Take 2 steps."]
        );
    }

    #[test]
    fn empty_sightings_produce_no_sentences() {
        let sightings = ClassSightings::default();

        assert!(sightings.detection_sentences().is_empty());
        assert!(sightings.center_sentences().is_empty());
    }
}
