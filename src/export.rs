//! Build-plan export.
//!
//! Two formats are produced:
//!
//! ```text
//! line protocol   type, x, y, z, qw, qx, qy, qz, annotation   (one step per line)
//! structured      {id, name, description, building_steps: [...]}  (JSON)
//! ```
//!
//! Global markers come first in the line protocol with the type `GM`.
//! Numeric step identifiers are the assembly's node keys.

use crate::assembly::{Assembly, NodeKey};
use crate::error::Result;
use crate::geometry::Frame;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Write;

/// One line of the build-plan protocol.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BuildStep {
    pub step_type: String,
    /// `[x, y, z, qw, qx, qy, qz]`
    pub pose: [f32; 7],
    pub annotation: String,
}

impl BuildStep {
    pub fn to_line(&self) -> String {
        let pose: Vec<String> = self.pose.iter().map(f32::to_string).collect();
        format!("{},{},{}", self.step_type, pose.join(","), self.annotation)
    }
}

/// Position and `(w, x, y, z)` orientation of a structured step.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoseRecord {
    pub position: [f32; 3],
    pub orientation: [f32; 4],
}

impl From<&Frame> for PoseRecord {
    fn from(frame: &Frame) -> Self {
        let [x, y, z, qw, qx, qy, qz] = frame.pose_quaternion();
        Self {
            position: [x, y, z],
            orientation: [qw, qx, qy, qz],
        }
    }
}

/// Identifier of a structured step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepId {
    Key(NodeKey),
    Name(String),
}

/// A physical object to place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectStep {
    pub object_type: String,
    pub id: StepId,
    pub is_tag: bool,
    pub is_already_built: bool,
    pub color_rgb: [f32; 3],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pose: Option<PoseRecord>,
    /// Pool size for placeholder objects instantiated at runtime.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instances: Option<u32>,
}

/// A detected fiducial tag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TagStep {
    pub id: StepId,
    pub is_tag: bool,
    pub pose: PoseRecord,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BuildingStepRecord {
    Object(ObjectStep),
    Tag(TagStep),
}

/// Structured build plan document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BuildingPlan {
    pub id: String,
    pub name: String,
    pub description: String,
    pub building_steps: Vec<BuildingStepRecord>,
}

impl BuildingPlan {
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Options for [`Assembly::export_incon`].
#[derive(Clone, Debug)]
pub struct InconExport {
    pub plan_id: String,
    /// Emit a leading step for the starting material.
    pub starting_geometry: bool,
    pub starting_object: String,
    pub element_object: String,
    pub is_built: bool,
    /// Placeholder pool appended after the elements; `None` to skip.
    pub placeholder: Option<(String, u32)>,
    /// Detected tag poses, exported in order.
    pub tags: Vec<Frame>,
}

impl Default for InconExport {
    fn default() -> Self {
        Self {
            plan_id: "iaac_plan".to_string(),
            starting_geometry: true,
            starting_object: "starting_material.obj".to_string(),
            element_object: "cylinder_for_iaac_workshop.obj".to_string(),
            is_built: true,
            placeholder: Some(("cylinder_for_iaac_workshop_1m.obj".to_string(), 200)),
            tags: Vec::new(),
        }
    }
}

const DEFAULT_COLOR: [f32; 3] = [1.0, 1.0, 1.0];
const PLACEHOLDER_COLOR: [f32; 3] = [1.0, 0.0, 0.0];

impl Assembly {
    /// Line-protocol build plan: `markers` first (type `GM`), then every
    /// element in build order.
    pub fn export_building_plan(&self, markers: &[Frame]) -> Vec<BuildStep> {
        let markers = markers.iter().enumerate().map(|(i, frame)| BuildStep {
            step_type: "GM".to_string(),
            pose: frame.pose_quaternion(),
            annotation: format!("Global marker {i}"),
        });
        let elements = self.elements().map(|(key, element)| BuildStep {
            step_type: element.element_type.clone(),
            pose: element.pose_quaternion(),
            annotation: format!("This is the element with the key index {key}"),
        });
        markers.chain(elements).collect()
    }

    /// Writes [`export_building_plan`](Self::export_building_plan) one step per line.
    pub fn write_building_plan(&self, markers: &[Frame], writer: &mut dyn Write) -> Result<()> {
        for step in self.export_building_plan(markers) {
            writeln!(writer, "{}", step.to_line())?;
        }
        Ok(())
    }

    /// Structured build plan.
    pub fn export_incon(&self, options: &InconExport) -> BuildingPlan {
        let mut steps = Vec::new();

        if options.starting_geometry {
            steps.push(BuildingStepRecord::Object(ObjectStep {
                object_type: options.starting_object.clone(),
                id: StepId::Name("starting element".to_string()),
                is_tag: false,
                is_already_built: true,
                color_rgb: DEFAULT_COLOR,
                pose: None,
                instances: None,
            }));
        }

        for (key, element, attributes) in self.elements_with_attributes() {
            steps.push(BuildingStepRecord::Object(ObjectStep {
                object_type: options.element_object.clone(),
                id: StepId::Key(key),
                is_tag: false,
                is_already_built: options.is_built,
                color_rgb: attributes.color.unwrap_or(DEFAULT_COLOR),
                pose: Some(PoseRecord::from(&element.frame)),
                instances: None,
            }));
        }

        if let Some((object_type, instances)) = &options.placeholder {
            steps.push(BuildingStepRecord::Object(ObjectStep {
                object_type: object_type.clone(),
                id: StepId::Name("dynamic_cylinder".to_string()),
                is_tag: false,
                is_already_built: false,
                color_rgb: PLACEHOLDER_COLOR,
                pose: None,
                instances: Some(*instances),
            }));
        }

        for (key, tag) in options.tags.iter().enumerate() {
            steps.push(BuildingStepRecord::Tag(TagStep {
                id: StepId::Key(key),
                is_tag: true,
                pose: PoseRecord::from(tag),
            }));
        }

        BuildingPlan {
            id: options.plan_id.clone(),
            name: options.plan_id.clone(),
            description: options.plan_id.clone(),
            building_steps: steps,
        }
    }

    /// Assembly JSON for mixed-reality viewers: every node gets `is_built`
    /// and an `idx_v` custom attribute copied from its course.
    pub fn to_xr_json(&self, is_built: bool) -> Result<String> {
        let mut assembly = self.clone();
        for record in &mut assembly.nodes {
            let idx_v = record
                .attributes
                .course
                .map_or(Value::Null, Value::from);
            record.attributes.custom.insert("idx_v".to_string(), idx_v);
            record.attributes.is_built = is_built;
        }
        assembly.to_json()
    }
}
