//! Workspace reachability datasets and nearest-sample scoring.
//!
//! A dataset is a set of sample spheres in the robot base frame, each with a
//! reachability index (`ri`). To score a candidate base pose the samples are
//! moved rigidly onto that pose and indexed in a k-d tree; target points then
//! inherit the `ri` of their nearest sample when the sampling around them is
//! dense enough.

use crate::error::{Error, Result};
use crate::geometry::Frame;
use glam::{Quat, Vec3};
use kiddo::{ImmutableKdTree, SquaredEuclidean};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::f32::consts::SQRT_2;
use tracing::debug;

/// Reach radius as a multiple of the dataset resolution.
pub const REACH_RADIUS_FACTOR: f32 = SQRT_2;

/// k-d tree over sample positions, built once from a slice. Items are indices
/// into that slice. Grid datasets put many samples on one coordinate plane,
/// which the bulk-built tree handles without bucket overflow.
pub(crate) type SampleTree = ImmutableKdTree<f32, 3>;

/// A sampled point of the robot workspace.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WsSphere {
    #[serde(default)]
    pub header: Value,
    pub point: Vec3,
    /// Reachability index at this point.
    pub ri: f32,
    /// End-effector poses reachable at this point.
    pub poses: Vec<Frame>,
}

/// A full workspace reachability dataset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReachabilityMap {
    #[serde(default)]
    pub header: Value,
    pub spheres: Vec<WsSphere>,
    /// Sampling resolution. Must be positive to build an index.
    pub resolution: f32,
}

impl ReachabilityMap {
    pub fn new(header: Value, spheres: Vec<WsSphere>, resolution: f32) -> Self {
        Self {
            header,
            spheres,
            resolution,
        }
    }

    /// Fails unless the resolution is finite and positive.
    pub fn validate(&self) -> Result<()> {
        if self.resolution.is_finite() && self.resolution > 0.0 {
            Ok(())
        } else {
            Err(Error::InvalidResolution(self.resolution))
        }
    }

    /// Decodes a workspace message as published by the reachability feed.
    pub fn from_message(message: &str) -> Result<Self> {
        let message: WorkspaceMessage = serde_json::from_str(message)?;
        Ok(message.into())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Sample points paired with their reachability index.
    pub fn samples(&self) -> impl Iterator<Item = (Vec3, f32)> + '_ {
        self.spheres.iter().map(|s| (s.point, s.ri))
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
struct PointMessage {
    x: f32,
    y: f32,
    z: f32,
}

impl From<PointMessage> for Vec3 {
    fn from(p: PointMessage) -> Self {
        Vec3::new(p.x, p.y, p.z)
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
struct QuaternionMessage {
    w: f32,
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Clone, Copy, Debug, Deserialize)]
struct PoseMessage {
    position: PointMessage,
    orientation: QuaternionMessage,
}

#[derive(Clone, Debug, Deserialize)]
struct SphereMessage {
    #[serde(default)]
    header: Value,
    point: PointMessage,
    ri: f32,
    #[serde(default)]
    poses: Vec<PoseMessage>,
}

#[derive(Clone, Debug, Deserialize)]
struct WorkspaceMessage {
    #[serde(default)]
    header: Value,
    resolution: f32,
    #[serde(alias = "WsSpheres")]
    spheres: Vec<SphereMessage>,
}

impl From<WorkspaceMessage> for ReachabilityMap {
    fn from(message: WorkspaceMessage) -> Self {
        let spheres = message
            .spheres
            .into_iter()
            .map(|sphere| WsSphere {
                header: sphere.header,
                point: sphere.point.into(),
                ri: sphere.ri,
                poses: sphere
                    .poses
                    .into_iter()
                    .map(|pose| {
                        let q = pose.orientation;
                        Frame::from_quaternion(
                            Quat::from_xyzw(q.x, q.y, q.z, q.w),
                            pose.position.into(),
                        )
                    })
                    .collect(),
            })
            .collect();
        Self::new(message.header, spheres, message.resolution)
    }
}

/// Reachability of a single target point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointScore {
    pub reachable: bool,
    /// Inherited `ri`, or 0 when unreachable.
    pub ri: f32,
}

impl PointScore {
    const UNREACHABLE: Self = Self {
        reachable: false,
        ri: 0.0,
    };
}

/// Raw per-point detail behind a base pose score.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReachabilityDetail {
    pub goal_points: Vec<Vec3>,
    pub collision_points: Option<Vec<Vec3>>,
    /// Dataset samples moved onto the base pose.
    pub reachability_points: Vec<Vec3>,
    pub goal_reachability_index: Vec<f32>,
    pub collision_reachability_index: Vec<f32>,
    /// Reachability flag per goal point.
    pub reachable: Vec<bool>,
    pub mean_reachability_index: f32,
}

/// Spatial index over a dataset placed at a candidate base pose.
///
/// The index owns copies of the transformed points and their indices, so it
/// stays valid if the source dataset is replaced afterwards.
pub struct ReachabilityIndex {
    /// `None` below two samples, where nothing is reachable.
    tree: Option<SampleTree>,
    points: Vec<Vec3>,
    ri: Vec<f32>,
    radius_sq: f32,
}

impl ReachabilityIndex {
    /// Moves every sample of `map` by `base_pose`'s local-to-world transform
    /// and indexes the result.
    pub fn build(map: &ReachabilityMap, base_pose: &Frame) -> Result<Self> {
        map.validate()?;
        let transform = base_pose.to_affine();
        let points: Vec<Vec3> = map
            .samples()
            .map(|(point, _)| transform.transform_point3(point))
            .collect();
        let ri = map.samples().map(|(_, index)| index).collect();
        let coords: Vec<[f32; 3]> = points.iter().map(|p| p.to_array()).collect();
        let tree = (coords.len() >= 2).then(|| SampleTree::new_from_slice(&coords));
        let radius = map.resolution * REACH_RADIUS_FACTOR;
        Ok(Self {
            tree,
            points,
            ri,
            radius_sq: radius * radius,
        })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Transformed sample positions, in dataset order.
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// A point is reachable when its two nearest samples both lie strictly
    /// within the reach radius; it then takes the nearest sample's `ri`.
    pub fn evaluate(&self, point: Vec3) -> PointScore {
        let Some(tree) = &self.tree else {
            return PointScore::UNREACHABLE;
        };
        let neighbours = tree.nearest_n::<SquaredEuclidean>(&point.to_array(), std::num::NonZero::new(2).unwrap());
        if neighbours.len() < 2 || !neighbours.iter().all(|n| n.distance < self.radius_sq) {
            return PointScore::UNREACHABLE;
        }
        match neighbours
            .iter()
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
        {
            Some(nearest) => PointScore {
                reachable: true,
                ri: self.ri[nearest.item as usize],
            },
            None => PointScore::UNREACHABLE,
        }
    }

    /// Scores goal points, optionally penalised by collision points.
    ///
    /// The mean mixes both sets at equal per-point weight, with collision
    /// indices negated.
    pub fn score(&self, goals: &[Vec3], collisions: Option<&[Vec3]>) -> Result<ReachabilityDetail> {
        if goals.is_empty() {
            return Err(Error::EmptyPointSet("goal"));
        }

        let mut detail = ReachabilityDetail {
            goal_points: goals.to_vec(),
            collision_points: collisions.map(<[Vec3]>::to_vec),
            reachability_points: self.points.clone(),
            ..Default::default()
        };

        for &goal in goals {
            let score = self.evaluate(goal);
            detail.goal_reachability_index.push(score.ri);
            detail.reachable.push(score.reachable);
        }
        for &point in collisions.unwrap_or_default() {
            detail
                .collision_reachability_index
                .push(self.evaluate(point).ri);
        }

        let goal_sum: f32 = detail.goal_reachability_index.iter().sum();
        let collision_sum: f32 = detail.collision_reachability_index.iter().sum();
        let count = detail.goal_reachability_index.len() + detail.collision_reachability_index.len();
        detail.mean_reachability_index = (goal_sum - collision_sum) / count as f32;

        debug!(
            goals = goals.len(),
            collisions = detail.collision_reachability_index.len(),
            mean = detail.mean_reachability_index,
            "scored base pose"
        );
        Ok(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MESSAGE: &str = r#"{
        "header": {"seq": 3, "frame_id": "base_link"},
        "resolution": 0.05,
        "WsSpheres": [
            {
                "header": {},
                "point": {"x": 0.1, "y": 0.2, "z": 0.3},
                "ri": 42.0,
                "poses": [
                    {"position": {"x": 0.1, "y": 0.2, "z": 0.3},
                     "orientation": {"w": 1.0, "x": 0.0, "y": 0.0, "z": 0.0}}
                ]
            }
        ]
    }"#;

    #[test]
    fn decodes_workspace_message() {
        let map = ReachabilityMap::from_message(MESSAGE).unwrap();
        assert!((map.resolution - 0.05).abs() < 1e-7);
        assert_eq!(map.spheres.len(), 1);
        assert!((map.spheres[0].point - Vec3::new(0.1, 0.2, 0.3)).length() < 1e-6);
        assert_eq!(map.spheres[0].ri, 42.0);
        assert_eq!(map.spheres[0].poses[0].xaxis, Vec3::X);
        assert_eq!(map.header["frame_id"], "base_link");
    }

    #[test]
    fn accepts_plain_spheres_field() {
        let msg = r#"{"resolution": 1.0, "spheres": []}"#;
        let map = ReachabilityMap::from_message(msg).unwrap();
        assert!(map.spheres.is_empty());
        assert!(map.header.is_null());
    }

    #[test]
    fn rejects_incomplete_message() {
        assert!(ReachabilityMap::from_message(r#"{"resolution": 1.0}"#).is_err());
        assert!(ReachabilityMap::from_message("{\"resolution\": 1.0, \"spheres\": [").is_err());
    }

    #[test]
    fn validate_rejects_non_positive_resolution() {
        let map = ReachabilityMap::new(Value::Null, Vec::new(), 0.0);
        assert!(matches!(map.validate(), Err(Error::InvalidResolution(_))));
        let map = ReachabilityMap::new(Value::Null, Vec::new(), f32::NAN);
        assert!(map.validate().is_err());
    }

    #[test]
    fn dataset_json_roundtrip() {
        let map = ReachabilityMap::from_message(MESSAGE).unwrap();
        let back = ReachabilityMap::from_json(&map.to_json().unwrap()).unwrap();
        assert_eq!(back, map);
    }
}
