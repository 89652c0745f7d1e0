//! Walking direction from the nearest obstacle in each zone.
//!
//! The decision is an ordered list of rules; the first one that applies
//! wins. Zones without an obstacle count as infinitely far away.

use crate::navigation::advisory::ZoneDistances;
use crate::navigation::zone::{Column, GridZone, Row};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Directive {
    ContinueAhead,
    MoveLeft,
    MoveRight,
    SlowDown,
    CannotFindPath,
}

impl Directive {
    pub fn as_str(&self) -> &'static str {
        match self {
            Directive::ContinueAhead => "Continue ahead",
            Directive::MoveLeft => "Move left",
            Directive::MoveRight => "Move right",
            Directive::SlowDown => "Slow down, no safe path found",
            Directive::CannotFindPath => "Cannot find path, be careful",
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Distances the rules look at, absent zones as `f32::INFINITY`.
#[derive(Debug, Clone, Copy)]
struct Surroundings {
    center: Option<f32>,
    near_left: f32,
    mid_left: f32,
    near_right: f32,
    mid_right: f32,
}

impl Surroundings {
    fn from_distances(distances: &ZoneDistances) -> Self {
        let at = |row, column| distances.get(GridZone::new(row, column));
        let or_far = |value: Option<f32>| value.unwrap_or(f32::INFINITY);
        Self {
            center: at(Row::Near, Column::Center).or_else(|| at(Row::Mid, Column::Center)),
            near_left: or_far(at(Row::Near, Column::Left)),
            mid_left: or_far(at(Row::Mid, Column::Left)),
            near_right: or_far(at(Row::Near, Column::Right)),
            mid_right: or_far(at(Row::Mid, Column::Right)),
        }
    }

    fn left_clear(&self, center: f32) -> bool {
        self.near_left > center && self.mid_left > center
    }

    fn right_clear(&self, center: f32) -> bool {
        self.near_right > center && self.mid_right > center
    }

    fn left_blocked(&self, center: f32) -> bool {
        self.near_left <= center || self.mid_left <= center
    }

    fn right_blocked(&self, center: f32) -> bool {
        self.near_right <= center || self.mid_right <= center
    }
}

struct Rule {
    applies: fn(&Surroundings) -> bool,
    directive: Directive,
}

const RULES: [Rule; 6] = [
    Rule {
        applies: |s| s.center.is_none(),
        directive: Directive::ContinueAhead,
    },
    Rule {
        applies: |s| s.center.is_some_and(|c| s.left_clear(c)),
        directive: Directive::MoveLeft,
    },
    Rule {
        applies: |s| s.center.is_some_and(|c| s.right_clear(c)),
        directive: Directive::MoveRight,
    },
    Rule {
        applies: |s| s.center.is_some_and(|c| s.left_blocked(c) && s.right_blocked(c)),
        directive: Directive::SlowDown,
    },
    Rule {
        applies: |s| s.center.is_some_and(|c| s.left_blocked(c)),
        directive: Directive::MoveRight,
    },
    Rule {
        applies: |_| true,
        directive: Directive::CannotFindPath,
    },
];

/// Exactly one directive for the frame.
pub fn analyze(distances: &ZoneDistances) -> Directive {
    let surroundings = Surroundings::from_distances(distances);
    RULES
        .iter()
        .find(|rule| (rule.applies)(&surroundings))
        .map_or(Directive::CannotFindPath, |rule| rule.directive)
}
