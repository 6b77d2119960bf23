//! Cursor state and operations for sequence-driven assembly.

use crate::assembly::NodeKey;
use crate::connector::FlipCode;
use serde::{Deserialize, Serialize};

/// The state of the build cursor.
///
/// Tracks the element the next module attaches to and the placement
/// parameters that module will use.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BuildCursor {
    /// The element the next module closes on.
    pub current_key: NodeKey,

    /// Flip code for the next module.
    pub flip: FlipCode,

    /// Rotation about the attachment rod, in degrees.
    pub angle: f32,

    /// Translation along the attachment rod.
    pub shift_value: f32,
}

impl BuildCursor {
    /// A cursor standing on `key` with neutral placement parameters.
    pub fn at(key: NodeKey) -> Self {
        Self {
            current_key: key,
            flip: FlipCode::AA,
            angle: 0.0,
            shift_value: 0.0,
        }
    }

    /// Adds `degrees` to the placement angle, wrapped to `[0, 360)`.
    pub fn rotate(&mut self, degrees: f32) {
        self.angle = (self.angle + degrees).rem_euclid(360.0);
    }

    pub fn shift(&mut self, distance: f32) {
        self.shift_value += distance;
    }
}

/// Operations that can be performed by the build cursor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BuildOp {
    /// Close a module on the current element and move onto its human unit.
    /// Params: `(angle, shift)`; missing params use the cursor's values.
    CloseModule,
    /// Set the flip code for subsequent modules.
    SetFlip(FlipCode),
    /// Change the placement angle by `param0 * sign` degrees.
    Rotate(f32),
    /// Change the shift by `param0 * sign`.
    Shift(f32),
    /// Save the cursor onto the stack (`[`).
    Push,
    /// Restore the most recently pushed cursor (`]`).
    Pop,
    /// No-op; symbol has no registered meaning.
    Ignore,
}
