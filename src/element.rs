use crate::geometry::{Frame, Line};
use bevy_heavy::ComputeMassProperties3d;
use bevy_math::primitives::Cylinder;
use glam::{Affine3A, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// A generic material identifier referencing an external palette.
pub type MaterialId = u8;

/// One of the two attachment points of a rod.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectorId {
    /// Connector at the negative end of the rod's local X axis.
    First,
    /// Connector at the positive end of the rod's local X axis.
    Second,
}

impl ConnectorId {
    pub fn other(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }
}

/// Which connectors a query should yield.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectorFilter {
    #[default]
    All,
    Open,
    Closed,
}

impl ConnectorFilter {
    fn accepts(self, open: bool) -> bool {
        match self {
            Self::All => true,
            Self::Open => open,
            Self::Closed => !open,
        }
    }
}

/// A single rod of the structure.
///
/// The rod's centerline runs along its local X axis, centred on `frame.point`.
/// Connector frames share the rod's orientation and sit `connector_offset`
/// away from the centre along -X (first) and +X (second).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// World pose of the rod's centre.
    pub frame: Frame,

    /// Free-form type tag, used as the step type when exporting build plans.
    pub element_type: String,

    /// Rod length along local X.
    pub length: f32,

    /// Rod radius.
    pub radius: f32,

    /// Distance of each connector from the rod centre.
    pub connector_offset: f32,

    /// Material ID for visual rendering (links to external palette).
    pub material_id: MaterialId,

    connector_1_state: bool,
    connector_2_state: bool,
}

impl Element {
    /// Creates a rod with both connectors open.
    pub fn new(frame: Frame, length: f32, radius: f32, connector_offset: f32) -> Self {
        Self {
            frame,
            element_type: "rod".to_string(),
            length,
            radius,
            connector_offset,
            material_id: 0,
            connector_1_state: true,
            connector_2_state: true,
        }
    }

    pub fn with_type(mut self, element_type: impl Into<String>) -> Self {
        self.element_type = element_type.into();
        self
    }

    pub fn with_material(mut self, material_id: MaterialId) -> Self {
        self.material_id = material_id;
        self
    }

    /// A fresh element with this element's pose, geometry and metadata and
    /// both connectors open.
    ///
    /// Connector states are not inherited: a closed connector on `self` is
    /// open again on the successor.
    pub fn successor(&self) -> Self {
        Self {
            connector_1_state: true,
            connector_2_state: true,
            ..self.clone()
        }
    }

    pub fn connector_1_state(&self) -> bool {
        self.connector_1_state
    }

    pub fn connector_2_state(&self) -> bool {
        self.connector_2_state
    }

    pub fn is_open(&self, connector: ConnectorId) -> bool {
        match connector {
            ConnectorId::First => self.connector_1_state,
            ConnectorId::Second => self.connector_2_state,
        }
    }

    pub fn has_open_connector(&self) -> bool {
        self.connector_1_state || self.connector_2_state
    }

    /// The connector placement attaches to: the first if open, else the second.
    pub fn open_connector(&self) -> Option<ConnectorId> {
        if self.connector_1_state {
            Some(ConnectorId::First)
        } else if self.connector_2_state {
            Some(ConnectorId::Second)
        } else {
            None
        }
    }

    /// Closes a connector. Connectors are never reopened.
    pub(crate) fn close(&mut self, connector: ConnectorId) {
        match connector {
            ConnectorId::First => self.connector_1_state = false,
            ConnectorId::Second => self.connector_2_state = false,
        }
    }

    pub fn connector_frame(&self, connector: ConnectorId) -> Frame {
        let sign = match connector {
            ConnectorId::First => -1.0,
            ConnectorId::Second => 1.0,
        };
        self.frame
            .translated(self.frame.xaxis * (sign * self.connector_offset))
    }

    pub fn connector_frame_1(&self) -> Frame {
        self.connector_frame(ConnectorId::First)
    }

    pub fn connector_frame_2(&self) -> Frame {
        self.connector_frame(ConnectorId::Second)
    }

    /// Connector frames matching `filter`, first connector first.
    pub fn connectors(&self, filter: ConnectorFilter) -> Vec<(ConnectorId, Frame)> {
        [ConnectorId::First, ConnectorId::Second]
            .into_iter()
            .filter(|&id| filter.accepts(self.is_open(id)))
            .map(|id| (id, self.connector_frame(id)))
            .collect()
    }

    /// Centerline of the rod.
    pub fn line(&self) -> Line {
        let half = self.frame.xaxis * (self.length / 2.0);
        Line::new(self.frame.point - half, self.frame.point + half)
    }

    pub fn transform(&mut self, transform: &Affine3A) {
        self.frame.transform(transform);
    }

    pub fn transformed(&self, transform: &Affine3A) -> Self {
        let mut element = self.clone();
        element.transform(transform);
        element
    }

    /// Pose record `[x, y, z, qw, qx, qy, qz]` of the rod centre.
    pub fn pose_quaternion(&self) -> [f32; 7] {
        self.frame.pose_quaternion()
    }
}

/// Volume and world centre of mass of a proxy solid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProxyMass {
    pub volume: f32,
    pub centroid: Vec3,
}

/// Thin cylinder standing in for a rod in the statics approximation.
///
/// The cylinder is centred on the element frame and runs along its Z axis.
/// `bevy_math` cylinders are Y-aligned, so the local centre of mass is rotated
/// into the frame before being placed.
pub fn proxy_mass(frame: &Frame, radius: f32, height: f32) -> ProxyMass {
    let cylinder = Cylinder::new(radius, height);
    let volume = cylinder.mass(1.0);
    let y_to_z = Quat::from_rotation_arc(Vec3::Y, Vec3::Z);
    let local = y_to_z * cylinder.center_of_mass();
    ProxyMass {
        volume,
        centroid: frame.to_affine().transform_point3(local),
    }
}
