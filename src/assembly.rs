//! The assembly graph: rods as nodes, structural relations as edges.
//!
//! Nodes live in a dense arena indexed by [`NodeKey`]; the key is the build
//! order and is never reused until [`Assembly::clear`] starts a new session.
//! Edges are kept in insertion order with a per-node adjacency list of edge
//! indices, so placement code never holds references between elements.

use crate::element::{ConnectorFilter, ConnectorId, Element};
use crate::error::{Error, Result};
use crate::geometry::{ClosestPoint, Frame, rotation_about};
use glam::{Affine3A, Vec3};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Identifier of an element in the assembly (its build order).
pub type NodeKey = usize;

/// Who places a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Actor {
    Robot,
    Human,
}

impl Actor {
    /// Rotation about the attachment connector's Z axis, in degrees.
    ///
    /// The three rods of a unit are 120° apart; the robot's rod takes the
    /// first slot and the human's the second.
    pub fn primary_rotation_degrees(self) -> f32 {
        match self {
            Self::Robot => 120.0,
            Self::Human => 240.0,
        }
    }
}

/// Per-node attribute record.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeAttributes {
    pub is_planned: bool,
    pub is_built: bool,
    pub is_support: bool,
    pub is_held_by_robot: bool,
    pub has_open_connector: bool,
    /// RGB in `0.0..=1.0`.
    pub color: Option<[f32; 3]>,
    /// Pose estimated by tracking, if any.
    pub frame_est: Option<Frame>,
    /// Course (layer) index.
    pub course: Option<usize>,
    pub placed_by: Option<Actor>,
    pub on_ground: bool,
    /// Identifier of the tracked marker associated with this element.
    pub frame_id: Option<String>,
    /// User-defined attributes.
    pub custom: BTreeMap<String, Value>,
}

/// Structural relation carried by an edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeTo {
    /// First unit of a module attached to an existing rod.
    Neighbour,
    /// Second unit of a module resting on its module-mate and the attachment rod.
    Parent,
}

/// Types of mechanical connection between two rods.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum JointType {
    /// Rigid connection (lashed, glued or welded).
    Fixed,
    /// Rods may rotate about each other at the contact.
    Hinge,
    /// Point contact held only by friction.
    Contact,
}

/// A joint between two rods.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct JointDescriptor {
    pub joint_type: JointType,
    /// Contact point in world space.
    pub anchor: Vec3,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeAttributes {
    pub edge_to: Option<EdgeTo>,
    pub joint: Option<JointDescriptor>,
    pub custom: BTreeMap<String, Value>,
}

/// A directed edge `u -> v`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub u: NodeKey,
    pub v: NodeKey,
    pub attributes: EdgeAttributes,
}

/// An element plus its attribute record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub element: Element,
    pub attributes: NodeAttributes,
}

/// Session configuration: name, rod geometry and default attribute records.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyConfig {
    pub name: String,
    /// Rod length. Also the height of the statics proxy cylinder.
    pub rod_length: f32,
    /// Rod radius. Collision clearance is twice this plus the tolerance.
    pub rod_radius: f32,
    /// Radius of the circle on which a unit's connectors meet.
    pub rf_unit_radius: f32,
    /// Extra offset applied when a flip code shifts a unit along its rod.
    pub rf_unit_offset: f32,
    /// Closest connector distance from the robot base still in reach.
    pub reach_min: f32,
    /// Farthest connector distance from the robot base still in reach.
    pub reach_max: f32,
    pub default_node_attributes: NodeAttributes,
    pub default_edge_attributes: EdgeAttributes,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            name: "Assembly".to_string(),
            rod_length: 0.8,
            rod_radius: 0.01,
            rf_unit_radius: 0.138,
            rf_unit_offset: 0.02,
            reach_min: 0.75,
            reach_max: 1.3,
            default_node_attributes: NodeAttributes::default(),
            default_edge_attributes: EdgeAttributes::default(),
        }
    }
}

impl AssemblyConfig {
    /// Distance of each connector from the rod centre.
    pub fn connector_offset(&self) -> f32 {
        (self.rod_length - self.rf_unit_radius) / 2.0
    }

    /// Translation magnitude applied by a non-zero flip sign.
    pub fn flip_offset(&self) -> f32 {
        (self.rod_length - self.rf_unit_radius + self.rf_unit_offset) / 2.0
    }

    /// A rod with this session's dimensions at `frame`.
    pub fn rod(&self, frame: Frame) -> Element {
        Element::new(
            frame,
            self.rod_length,
            self.rod_radius,
            self.connector_offset(),
        )
    }
}

/// Serialized form of an [`Assembly`].
#[derive(Clone, Debug, Serialize, Deserialize)]
struct AssemblyData {
    config: AssemblyConfig,
    nodes: Vec<NodeRecord>,
    edges: Vec<Connection>,
}

/// A network of rods and the relations between them.
#[derive(Clone, Debug, Default)]
pub struct Assembly {
    pub(crate) config: AssemblyConfig,
    pub(crate) nodes: Vec<NodeRecord>,
    edges: Vec<Connection>,
    adjacency: Vec<Vec<usize>>,
}

impl Assembly {
    pub fn new(config: AssemblyConfig) -> Self {
        Self {
            config,
            nodes: Vec::new(),
            edges: Vec::new(),
            adjacency: Vec::new(),
        }
    }

    /// Creates an assembly pre-populated with `elements`.
    pub fn with_elements(config: AssemblyConfig, elements: impl IntoIterator<Item = Element>) -> Self {
        let mut assembly = Self::new(config);
        for element in elements {
            assembly.add_element(element);
        }
        assembly
    }

    pub fn config(&self) -> &AssemblyConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.config.name = name.into();
    }

    pub fn set_default_node_attributes(&mut self, attributes: NodeAttributes) {
        self.config.default_node_attributes = attributes;
    }

    pub fn set_default_edge_attributes(&mut self, attributes: EdgeAttributes) {
        self.config.default_edge_attributes = attributes;
    }

    pub fn number_of_elements(&self) -> usize {
        self.nodes.len()
    }

    pub fn number_of_connections(&self) -> usize {
        self.edges.len()
    }

    /// Key of the most recently added element.
    pub fn last_key(&self) -> Option<NodeKey> {
        self.nodes.len().checked_sub(1)
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        key < self.nodes.len()
    }

    /// Removes all elements and connections and starts a new key session.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.adjacency.clear();
    }

    /// Adds an element with the session's default attributes.
    pub fn add_element(&mut self, element: Element) -> NodeKey {
        let attributes = self.config.default_node_attributes.clone();
        self.add_element_with_attributes(element, attributes)
    }

    /// Adds an element with an explicit attribute record.
    ///
    /// `has_open_connector` is always derived from the element.
    pub fn add_element_with_attributes(
        &mut self,
        element: Element,
        mut attributes: NodeAttributes,
    ) -> NodeKey {
        let key = self.nodes.len();
        attributes.has_open_connector = element.has_open_connector();
        self.nodes.push(NodeRecord {
            element,
            attributes,
        });
        self.adjacency.push(Vec::new());
        key
    }

    fn record(&self, key: NodeKey) -> Result<&NodeRecord> {
        self.nodes.get(key).ok_or(Error::UnknownKey(key))
    }

    pub fn element(&self, key: NodeKey) -> Result<&Element> {
        self.record(key).map(|r| &r.element)
    }

    pub fn element_with_attributes(&self, key: NodeKey) -> Result<(&Element, &NodeAttributes)> {
        self.record(key).map(|r| (&r.element, &r.attributes))
    }

    pub fn attributes(&self, key: NodeKey) -> Result<&NodeAttributes> {
        self.record(key).map(|r| &r.attributes)
    }

    pub fn attributes_mut(&mut self, key: NodeKey) -> Result<&mut NodeAttributes> {
        self.nodes
            .get_mut(key)
            .map(|r| &mut r.attributes)
            .ok_or(Error::UnknownKey(key))
    }

    /// Iterates elements in build order.
    pub fn elements(&self) -> impl Iterator<Item = (NodeKey, &Element)> {
        self.nodes.iter().enumerate().map(|(k, r)| (k, &r.element))
    }

    pub fn elements_with_attributes(
        &self,
    ) -> impl Iterator<Item = (NodeKey, &Element, &NodeAttributes)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(k, r)| (k, &r.element, &r.attributes))
    }

    /// Iterates connections in insertion order.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.edges.iter()
    }

    /// Keys connected to `key` by an edge in either direction.
    pub fn neighbors(&self, key: NodeKey) -> Result<Vec<NodeKey>> {
        let edges = self.adjacency.get(key).ok_or(Error::UnknownKey(key))?;
        Ok(edges
            .iter()
            .map(|&i| {
                let edge = &self.edges[i];
                if edge.u == key { edge.v } else { edge.u }
            })
            .collect())
    }

    /// Adds an edge `u -> v`. Both keys must exist.
    pub fn add_connection(
        &mut self,
        u: NodeKey,
        v: NodeKey,
        attributes: EdgeAttributes,
    ) -> Result<(NodeKey, NodeKey)> {
        self.record(u)?;
        self.record(v)?;
        let index = self.edges.len();
        self.edges.push(Connection { u, v, attributes });
        self.adjacency[u].push(index);
        if u != v {
            self.adjacency[v].push(index);
        }
        Ok((u, v))
    }

    /// Adds an edge tagged with `edge_to` on top of the default edge attributes.
    pub fn add_tagged_connection(
        &mut self,
        u: NodeKey,
        v: NodeKey,
        edge_to: EdgeTo,
    ) -> Result<(NodeKey, NodeKey)> {
        let mut attributes = self.config.default_edge_attributes.clone();
        attributes.edge_to = Some(edge_to);
        self.add_connection(u, v, attributes)
    }

    /// Adds an edge carrying a joint descriptor.
    pub fn add_joint(
        &mut self,
        u: NodeKey,
        v: NodeKey,
        joint: JointDescriptor,
    ) -> Result<(NodeKey, NodeKey)> {
        let mut attributes = self.config.default_edge_attributes.clone();
        attributes.joint = Some(joint);
        self.add_connection(u, v, attributes)
    }

    /// Closes a connector and keeps the node's `has_open_connector` flag in sync.
    pub(crate) fn close_connector(&mut self, key: NodeKey, connector: ConnectorId) -> Result<()> {
        let record = self.nodes.get_mut(key).ok_or(Error::UnknownKey(key))?;
        record.element.close(connector);
        record.attributes.has_open_connector = record.element.has_open_connector();
        Ok(())
    }

    /// Applies `transform` to every element.
    pub fn transform(&mut self, transform: &Affine3A) {
        for record in &mut self.nodes {
            record.element.transform(transform);
        }
    }

    pub fn transformed(&self, transform: &Affine3A) -> Self {
        let mut assembly = self.clone();
        assembly.transform(transform);
        assembly
    }

    /// Connector frames of every element matching `filter`.
    pub fn connectors(&self, filter: ConnectorFilter) -> Vec<(NodeKey, Vec<(ConnectorId, Frame)>)> {
        self.elements()
            .map(|(key, element)| (key, element.connectors(filter)))
            .collect()
    }

    /// Key of the element owning an open connector within `within_dist` of
    /// `point`. The last matching element in build order wins.
    pub fn parent_key(&self, point: Vec3, within_dist: f32) -> Option<NodeKey> {
        let mut parent = None;
        for (key, element) in self.elements() {
            for (_, frame) in element.connectors(ConnectorFilter::Open) {
                if frame.point.distance(point) < within_dist {
                    parent = Some(key);
                }
            }
        }
        parent
    }

    /// Closes connectors the robot at `base_frame` cannot reach.
    ///
    /// Only the first open connector of each element is examined. Returns the
    /// number of connectors closed.
    pub fn range_filter(&mut self, base_frame: &Frame, min: f32, max: f32) -> usize {
        let mut to_close = Vec::new();
        for (key, element) in self.elements() {
            if let Some(connector) = element.open_connector() {
                let distance = element
                    .connector_frame(connector)
                    .point
                    .distance(base_frame.point);
                if !(min..=max).contains(&distance) {
                    to_close.push((key, connector));
                }
            }
        }
        let closed = to_close.len();
        for (key, connector) in to_close {
            let record = &mut self.nodes[key];
            record.element.close(connector);
            record.attributes.has_open_connector = record.element.has_open_connector();
        }
        if closed > 0 {
            debug!(closed, min, max, "range filter closed connectors");
        }
        closed
    }

    /// [`range_filter`](Self::range_filter) with the configured reach band.
    pub fn range_filter_default(&mut self, base_frame: &Frame) -> usize {
        let (min, max) = (self.config.reach_min, self.config.reach_max);
        self.range_filter(base_frame, min, max)
    }

    /// Open connector frame of `key` rotated by `angle` degrees about the
    /// element's long axis.
    fn rotated_open_connector(&self, key: NodeKey, angle: f32) -> Result<Frame> {
        let element = self.element(key)?;
        let connector = element.open_connector().ok_or(Error::NoOpenConnector(key))?;
        let rotation = rotation_about(
            element.frame.xaxis,
            angle.to_radians(),
            element.frame.point,
        );
        Ok(element.connector_frame(connector).transformed(&rotation))
    }

    /// Distance and vector from the (rotated) open connector of `key` to the
    /// closest point of `target`.
    pub fn distance_to_target(
        &self,
        key: NodeKey,
        angle: f32,
        target: &impl ClosestPoint,
    ) -> Result<(f32, Vec3)> {
        let frame = self.rotated_open_connector(key, angle)?;
        let vector = target.closest_point(frame.point) - frame.point;
        Ok((vector.length(), vector))
    }

    /// Alignment score between the (rotated) open connector's Z axis and the
    /// direction to `target`: the reciprocal of `|z × v|`, so larger means the
    /// connector points more directly at the target.
    pub fn orientation_to_target(
        &self,
        key: NodeKey,
        angle: f32,
        target: &impl ClosestPoint,
    ) -> Result<(f32, Vec3)> {
        let frame = self.rotated_open_connector(key, angle)?;
        let vector = target.closest_point(frame.point) - frame.point;
        let cross = frame.zaxis().cross(vector);
        Ok((cross.length().recip(), vector))
    }

    /// Serializes the whole assembly (configuration, nodes, edges).
    pub fn to_json(&self) -> Result<String> {
        let data = AssemblyData {
            config: self.config.clone(),
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        };
        Ok(serde_json::to_string(&data)?)
    }

    /// Restores an assembly, rejecting edges that reference missing keys.
    pub fn from_json(json: &str) -> Result<Self> {
        let data: AssemblyData = serde_json::from_str(json)?;
        let mut assembly = Self::new(data.config);
        for record in data.nodes {
            assembly.add_element_with_attributes(record.element, record.attributes);
        }
        for edge in data.edges {
            assembly.add_connection(edge.u, edge.v, edge.attributes)?;
        }
        Ok(assembly)
    }
}
