//! Structural checks over the placed rods plus a proposed addition.
//!
//! The equilibrium check is a policy approximation: each rod is a thin proxy
//! cylinder, the combined weight acts at the running volume-weighted centroid,
//! and the structure counts as standing while that point, projected on the
//! ground, stays inside the support footprint. It is not a statics solve.

use crate::assembly::Assembly;
use crate::element::{Element, proxy_mass};
use crate::error::{Error, Result};
use crate::geometry::{Line, point_in_polygon, polygon_centroid};
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Whether any pair of (placed, candidate) rods is closer than
/// `2 * rod_radius + tolerance`.
///
/// Non-finite distances count as collisions.
pub fn collides<'a>(
    placed: impl IntoIterator<Item = &'a Element>,
    candidates: &[Element],
    rod_radius: f32,
    tolerance: f32,
) -> bool {
    let clearance = rod_radius * 2.0 + tolerance;
    let candidate_lines: Vec<Line> = candidates.iter().map(Element::line).collect();
    placed.into_iter().any(|element| {
        let line = element.line();
        candidate_lines.iter().any(|other| {
            let distance = line.distance_to(other);
            !distance.is_finite() || distance < clearance
        })
    })
}

/// Horizontal region the structure's weight must fall into.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SupportRegion {
    /// Footprint polygon in the ground (XY) plane.
    pub footprint: Vec<Vec2>,
    /// Volume of the support itself, acting at the footprint centroid.
    pub ballast: f32,
}

impl SupportRegion {
    pub fn new(footprint: Vec<Vec2>) -> Result<Self> {
        if footprint.len() < 3 {
            return Err(Error::DegenerateFootprint(footprint.len()));
        }
        Ok(Self {
            footprint,
            ballast: 0.0,
        })
    }

    /// Axis-aligned ground rectangle bounding `points`.
    pub fn bounding_box(points: &[Vec3]) -> Result<Self> {
        if points.is_empty() {
            return Err(Error::EmptyPointSet("support"));
        }
        let (min, max) = points.iter().fold(
            (Vec2::splat(f32::INFINITY), Vec2::splat(f32::NEG_INFINITY)),
            |(min, max), p| (min.min(p.truncate()), max.max(p.truncate())),
        );
        Self::new(vec![
            min,
            Vec2::new(max.x, min.y),
            max,
            Vec2::new(min.x, max.y),
        ])
    }

    pub fn with_ballast(mut self, volume: f32) -> Self {
        self.ballast = volume.max(0.0);
        self
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point_in_polygon(point, &self.footprint)
    }
}

/// Outcome of a single incremental step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    Stable,
    /// Unstable on its own; the robot holds the structure.
    TemporarilySupported,
    Unstable,
}

/// Result of [`Assembly::static_equilibrium_check`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EquilibriumReport {
    /// Status of the final step (the candidate).
    pub in_equilibrium: bool,
    /// Step index (placed rods first, candidate last) at which temporary
    /// support was granted.
    pub temporary_support_at: Option<usize>,
    /// Status per step, in processing order.
    pub steps: Vec<StepStatus>,
    /// Last finite resultant: a vertical line from the ground point up to
    /// the accumulated volume. `None` when no step was ever in equilibrium.
    pub resultant: Option<Line>,
}

impl Assembly {
    /// Checks `candidates` against every placed rod for clearance violations.
    pub fn collision_check(&self, candidates: &[Element], tolerance: f32) -> bool {
        let collision = collides(
            self.elements().map(|(_, element)| element),
            candidates,
            self.config.rod_radius,
            tolerance,
        );
        if collision {
            debug!(candidates = candidates.len(), tolerance, "collision detected");
        }
        collision
    }

    /// Incremental moment balance over the placed rods with `candidate` last.
    ///
    /// With `allow_temp_support`, the first step whose resultant leaves the
    /// footprint is accepted as robot-held and the permission is then spent for
    /// the rest of the evaluation. A step whose resultant is not finite (or
    /// whose accumulated volume is not positive) is unstable and never spends
    /// the permission.
    pub fn static_equilibrium_check(
        &self,
        support: &SupportRegion,
        candidate: &Element,
        allow_temp_support: bool,
    ) -> EquilibriumReport {
        let radius = self.config.rod_radius;
        let height = self.config.rod_length;
        let frames = self
            .elements()
            .map(|(_, element)| element.frame)
            .chain(std::iter::once(candidate.frame));

        let mut moment = Vec2::ZERO;
        let mut volume = 0.0;
        if support.ballast > 0.0 {
            moment += polygon_centroid(&support.footprint) * support.ballast;
            volume += support.ballast;
        }

        let mut allow = allow_temp_support;
        let mut ever_stable = false;
        let mut last = None;
        let mut report = EquilibriumReport {
            in_equilibrium: false,
            temporary_support_at: None,
            steps: Vec::new(),
            resultant: None,
        };

        for (i, frame) in frames.enumerate() {
            let mass = proxy_mass(&frame, radius, height);
            moment += mass.centroid.truncate() * mass.volume;
            volume += mass.volume;

            let point = moment / volume;
            let degenerate = volume <= 0.0 || !volume.is_finite() || !point.is_finite();
            let status = if degenerate {
                StepStatus::Unstable
            } else if support.contains(point) {
                StepStatus::Stable
            } else if allow {
                allow = false;
                report.temporary_support_at = Some(i);
                StepStatus::TemporarilySupported
            } else {
                StepStatus::Unstable
            };

            report.in_equilibrium = status != StepStatus::Unstable;
            ever_stable |= report.in_equilibrium;
            if !degenerate {
                last = Some(Line::new(point.extend(0.0), point.extend(volume)));
            }
            report.steps.push(status);
        }
        if ever_stable {
            report.resultant = last;
        }

        if !report.in_equilibrium {
            warn!(
                steps = report.steps.len(),
                "candidate leaves the structure out of equilibrium"
            );
        }
        report
    }
}
