//! Candidate robot base poses and their reachability scores.

use crate::error::Result;
use crate::geometry::Frame;
use crate::reachability::{ReachabilityDetail, ReachabilityIndex, ReachabilityMap, SampleTree};
use glam::Vec3;
use kiddo::SquaredEuclidean;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::debug;

/// A query closer than this to an existing entry updates it in place.
pub const DEDUP_DISTANCE: f32 = 0.01;

/// Index of an entry in a [`BaseMap`].
pub type BasePoseKey = usize;

/// A candidate base pose.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BasePose {
    pub frame: Frame,
    pub valid_position: bool,
    /// Mean reachability index of the last scoring, -1 if never scored.
    pub mean_reachability_index: f32,
    pub detail: Option<ReachabilityDetail>,
}

impl BasePose {
    pub fn new(frame: Frame) -> Self {
        Self {
            frame,
            valid_position: true,
            mean_reachability_index: -1.0,
            detail: None,
        }
    }
}

/// Scored candidate base poses, deduplicated by proximity.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BaseMap {
    poses: Vec<BasePose>,
    /// Position index, built on first lookup and dropped whenever a pose
    /// position may change.
    #[serde(skip)]
    index: OnceLock<Option<SampleTree>>,
}

impl BaseMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    pub fn get(&self, key: BasePoseKey) -> Option<&BasePose> {
        self.poses.get(key)
    }

    pub fn get_mut(&mut self, key: BasePoseKey) -> Option<&mut BasePose> {
        self.invalidate();
        self.poses.get_mut(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (BasePoseKey, &BasePose)> {
        self.poses.iter().enumerate()
    }

    pub fn clear(&mut self) {
        self.poses.clear();
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.index.take();
    }

    fn index(&self) -> Option<&SampleTree> {
        self.index
            .get_or_init(|| {
                let coords: Vec<[f32; 3]> = self
                    .poses
                    .iter()
                    .map(|pose| pose.frame.point.to_array())
                    .collect();
                (!coords.is_empty()).then(|| SampleTree::new_from_slice(&coords))
            })
            .as_ref()
    }

    /// Appends an unscored pose.
    pub fn add_pose(&mut self, frame: Frame) -> BasePoseKey {
        self.poses.push(BasePose::new(frame));
        self.invalidate();
        self.poses.len() - 1
    }

    /// Replaces the map with one pose per point, each facing `attractor`
    /// along its X axis (horizontal component only).
    pub fn set_poses(&mut self, points: &[Vec3], attractor: Vec3) {
        self.poses.clear();
        for &point in points {
            let toward = (attractor - point).with_z(0.0);
            let xaxis = toward.try_normalize().unwrap_or(Vec3::X);
            let frame = Frame::new(point, xaxis, Vec3::Z.cross(xaxis));
            self.poses.push(BasePose::new(frame));
        }
        self.invalidate();
    }

    /// Nearest entry to `point` and its distance.
    pub fn nearest(&self, point: Vec3) -> Option<(BasePoseKey, f32)> {
        let nearest = self.index()?.nearest_one::<SquaredEuclidean>(&point.to_array());
        Some((nearest.item as BasePoseKey, nearest.distance.sqrt()))
    }

    /// Highest scoring entry.
    pub fn best(&self) -> Option<(BasePoseKey, &BasePose)> {
        self.iter()
            .filter(|(_, pose)| pose.valid_position && pose.detail.is_some())
            .max_by(|(_, a), (_, b)| {
                a.mean_reachability_index
                    .total_cmp(&b.mean_reachability_index)
            })
    }

    /// Scores `pose` against `map` and records the result.
    ///
    /// An entry within [`DEDUP_DISTANCE`] of `pose` is overwritten in place;
    /// otherwise a new entry is appended. The map is untouched on error.
    pub fn score_base_pose(
        &mut self,
        pose: &Frame,
        map: &ReachabilityMap,
        goals: &[Vec3],
        collisions: Option<&[Vec3]>,
    ) -> Result<(BasePoseKey, ReachabilityDetail)> {
        let index = ReachabilityIndex::build(map, pose)?;
        let detail = index.score(goals, collisions)?;

        let key = match self.nearest(pose.point) {
            Some((key, distance)) if distance < DEDUP_DISTANCE => {
                debug!(key, distance, "updating existing base pose");
                key
            }
            _ => self.add_pose(*pose),
        };

        let entry = &mut self.poses[key];
        entry.mean_reachability_index = detail.mean_reachability_index;
        entry.detail = Some(detail.clone());
        Ok((key, detail))
    }
}
