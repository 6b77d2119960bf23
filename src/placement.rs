//! Adding units and modules to an [`Assembly`].
//!
//! A module is two rods closing a reciprocal unit around an open connector:
//! the robot places the first (unit 0) and holds it while the human places the
//! second (unit 1), which rests on both the robot's rod and the attachment rod.

use crate::assembly::{Actor, Assembly, EdgeTo, NodeKey};
use crate::connector::{FlipCode, transition};
use crate::element::{ConnectorId, Element};
use crate::error::{Error, Result};
use crate::geometry::{Frame, rotation_about, translation};
use glam::Affine3A;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Parameters for placing a single unit.
#[derive(Clone, Debug)]
pub struct UnitPlacement {
    /// Element to attach to.
    pub current_key: NodeKey,
    pub flip: FlipCode,
    /// Rotation about the attachment rod's long axis, in degrees.
    pub angle: f32,
    /// Translation along the attachment rod's long axis.
    pub shift_value: f32,
    pub placed_by: Actor,
    /// 0 for the first unit of a module, 1 for the second.
    pub unit_index: usize,
    pub on_ground: bool,
    pub frame_id: Option<String>,
    pub frame_est: Option<Frame>,
}

impl UnitPlacement {
    pub fn new(current_key: NodeKey, flip: FlipCode, placed_by: Actor, unit_index: usize) -> Self {
        Self {
            current_key,
            flip,
            angle: 0.0,
            shift_value: 0.0,
            placed_by,
            unit_index,
            on_ground: false,
            frame_id: None,
            frame_est: None,
        }
    }

    pub fn with_angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }

    pub fn with_shift(mut self, shift_value: f32) -> Self {
        self.shift_value = shift_value;
        self
    }

    pub fn on_ground(mut self, on_ground: bool) -> Self {
        self.on_ground = on_ground;
        self
    }

    pub fn with_frame_id(mut self, frame_id: impl Into<String>) -> Self {
        self.frame_id = Some(frame_id.into());
        self
    }

    pub fn with_frame_est(mut self, frame_est: Frame) -> Self {
        self.frame_est = Some(frame_est);
        self
    }
}

/// Keys produced by [`Assembly::close_rf_unit`], partitioned by actor.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleKeys {
    pub keys_robot: Vec<NodeKey>,
    pub keys_human: Vec<NodeKey>,
}

/// Everything a placement needs, validated before the graph is touched.
struct StagedUnit {
    element: Element,
    open: ConnectorId,
    previous: Option<NodeKey>,
}

impl Assembly {
    /// Pose of a new unit relative to `current`, attached at connector `open`.
    fn unit_transform(
        &self,
        current: &Element,
        open: ConnectorId,
        request: &UnitPlacement,
    ) -> Affine3A {
        let connector = current.connector_frame(open);
        let axis = current.frame.xaxis;

        let (a, b) = request.flip.signs(open);
        let sign = match request.placed_by {
            Actor::Robot => a,
            Actor::Human => b,
        };

        let r1 = rotation_about(
            connector.zaxis(),
            request.placed_by.primary_rotation_degrees().to_radians(),
            connector.point,
        );
        let t1 = translation(-axis * sign * self.config.flip_offset());

        let r2 = rotation_about(
            axis,
            request.angle.to_radians(),
            current.frame.point + axis,
        );
        let t3 = translation(axis * request.shift_value);

        r2 * t3 * r1 * t1
    }

    fn stage_unit(&self, request: &UnitPlacement) -> Result<StagedUnit> {
        let current = self.element(request.current_key)?;
        let open = current
            .open_connector()
            .ok_or(Error::NoOpenConnector(request.current_key))?;

        let previous = match request.unit_index {
            0 => None,
            1 => {
                let previous = self.last_key().ok_or(Error::MissingModuleMate)?;
                if previous == request.current_key {
                    return Err(Error::MissingModuleMate);
                }
                Some(previous)
            }
            other => return Err(Error::InvalidUnitIndex(other)),
        };

        let transform = self.unit_transform(current, open, request);
        let element = current.successor().transformed(&transform);
        Ok(StagedUnit {
            element,
            open,
            previous,
        })
    }

    /// Places one unit against the open connector of `request.current_key`.
    ///
    /// Every precondition is checked before the graph is modified, so an error
    /// leaves the assembly unchanged. Returns the new element's key.
    pub fn add_rf_unit_element(&mut self, request: &UnitPlacement) -> Result<NodeKey> {
        let staged = self.stage_unit(request)?;

        let mut attributes = self.config.default_node_attributes.clone();
        attributes.placed_by = Some(request.placed_by);
        attributes.on_ground = request.on_ground;
        attributes.frame_id = request.frame_id.clone();
        attributes.frame_est = request.frame_est;
        attributes.is_built = true;
        let key = self.add_element_with_attributes(staged.element, attributes);

        match staged.previous {
            None => {
                self.add_tagged_connection(request.current_key, key, EdgeTo::Neighbour)?;
            }
            Some(previous) => {
                self.add_tagged_connection(previous, key, EdgeTo::Parent)?;
                self.add_tagged_connection(request.current_key, key, EdgeTo::Parent)?;

                let closes = transition(staged.open, request.flip);
                self.close_connector(previous, closes.previous)?;
                self.close_connector(key, closes.new)?;
                self.close_connector(request.current_key, staged.open)?;
            }
        }

        debug!(
            key,
            current = request.current_key,
            flip = %request.flip,
            actor = ?request.placed_by,
            unit = request.unit_index,
            "placed unit"
        );
        Ok(key)
    }

    /// Closes a module on `current_key`: a robot unit followed by a human unit
    /// sharing `flip`, `angle` and `shift_value`.
    pub fn close_rf_unit(
        &mut self,
        current_key: NodeKey,
        flip: FlipCode,
        angle: f32,
        shift_value: f32,
    ) -> Result<ModuleKeys> {
        self.close_rf_unit_tracked(current_key, flip, angle, shift_value, None, None)
    }

    /// Like [`close_rf_unit`](Self::close_rf_unit), tagging the human unit with
    /// a tracked marker id and estimated pose.
    pub fn close_rf_unit_tracked(
        &mut self,
        current_key: NodeKey,
        flip: FlipCode,
        angle: f32,
        shift_value: f32,
        frame_id: Option<String>,
        frame_est: Option<Frame>,
    ) -> Result<ModuleKeys> {
        let robot = UnitPlacement::new(current_key, flip, Actor::Robot, 0)
            .with_angle(angle)
            .with_shift(shift_value);
        let robot_key = self.add_rf_unit_element(&robot)?;

        let human = UnitPlacement {
            placed_by: Actor::Human,
            unit_index: 1,
            frame_id,
            frame_est,
            ..robot
        };
        let human_key = self.add_rf_unit_element(&human)?;

        Ok(ModuleKeys {
            keys_robot: vec![robot_key],
            keys_human: vec![human_key],
        })
    }
}
