//! Interpreter that replays a symbol sequence as module placements.
//!
//! The entry point is [`SequenceInterpreter`]. Configure it with an
//! [`InterpreterConfig`], register symbol-to-operation mappings via
//! [`SequenceInterpreter::set_op`] or
//! [`SequenceInterpreter::populate_standard_symbols`], then call
//! [`SequenceInterpreter::build`] with an [`Assembly`], a start key and a
//! [`symbios::SymbiosState`].

use crate::assembly::{Assembly, NodeKey};
use crate::connector::FlipCode;
use crate::cursor::{BuildCursor, BuildOp};
use crate::error::Result;
use crate::placement::ModuleKeys;
use symbios::{SymbiosState, SymbolTable};
use tracing::debug;

/// Configuration for sequence interpretation.
#[derive(Clone, Debug)]
pub struct InterpreterConfig {
    /// Rotation step in degrees when `Rotate` has no parameter.
    pub default_angle: f32,
    /// Shift step when `Shift` has no parameter.
    pub default_shift: f32,
    /// Maximum stack depth for push/pop operations.
    pub max_stack_depth: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            default_angle: 30.0,
            default_shift: 0.05,
            max_stack_depth: 1024,
        }
    }
}

/// Interprets a symbol sequence against an assembly.
pub struct SequenceInterpreter {
    op_map: Vec<BuildOp>,
    config: InterpreterConfig,
}

impl SequenceInterpreter {
    /// Creates a new interpreter with the given configuration and an empty symbol map.
    pub fn new(config: InterpreterConfig) -> Self {
        Self {
            op_map: Vec::new(),
            config,
        }
    }

    /// Replaces the entire symbol-to-operation map in one step (builder pattern).
    ///
    /// `map` is indexed by symbol ID as returned by [`symbios::SymbolTable`].
    /// Any ID that falls outside the slice is treated as [`BuildOp::Ignore`].
    pub fn with_map(mut self, map: Vec<BuildOp>) -> Self {
        self.op_map = map;
        self
    }

    /// Assigns a single [`BuildOp`] to a symbol ID, growing the map as needed.
    pub fn set_op(&mut self, sym_id: u16, op: BuildOp) {
        let idx = sym_id as usize;
        if idx >= self.op_map.len() {
            self.op_map.resize(idx + 1, BuildOp::Ignore);
        }
        self.op_map[idx] = op;
    }

    /// Registers the conventional symbols present in `interner`:
    ///
    /// `M` close module, `AA`/`AB`/`BA`/`BB` flip, `+`/`-` rotate,
    /// `>`/`<` shift, `[`/`]` push/pop.
    pub fn populate_standard_symbols(&mut self, interner: &SymbolTable) {
        let mappings = [
            ("M", BuildOp::CloseModule),
            ("AA", BuildOp::SetFlip(FlipCode::AA)),
            ("AB", BuildOp::SetFlip(FlipCode::AB)),
            ("BA", BuildOp::SetFlip(FlipCode::BA)),
            ("BB", BuildOp::SetFlip(FlipCode::BB)),
            ("+", BuildOp::Rotate(1.0)),
            ("-", BuildOp::Rotate(-1.0)),
            (">", BuildOp::Shift(1.0)),
            ("<", BuildOp::Shift(-1.0)),
            ("[", BuildOp::Push),
            ("]", BuildOp::Pop),
        ];

        for (sym, op) in mappings {
            if let Some(id) = interner.resolve_id(sym) {
                self.set_op(id, op);
            }
        }
    }

    /// Replays `state` against `assembly`, starting on element `start`.
    ///
    /// Each `CloseModule` places a robot/human pair on the cursor's element
    /// and moves the cursor onto the human unit. The first placement error
    /// aborts the replay; modules placed before it stay in the assembly.
    pub fn build(
        &self,
        assembly: &mut Assembly,
        start: NodeKey,
        state: &SymbiosState,
    ) -> Result<Vec<ModuleKeys>> {
        let mut cursor = BuildCursor::at(start);
        let mut stack = Vec::new();
        let mut modules = Vec::new();

        for i in 0..state.len() {
            let view = match state.get_view(i) {
                Some(v) => v,
                None => break,
            };

            let op = self
                .op_map
                .get(view.sym as usize)
                .unwrap_or(&BuildOp::Ignore);

            let p = |idx: usize, def: f32| -> f32 {
                view.params.get(idx).map(|&x| x as f32).unwrap_or(def)
            };

            match op {
                BuildOp::CloseModule => {
                    let angle = p(0, cursor.angle);
                    let shift = p(1, cursor.shift_value);
                    let keys = assembly.close_rf_unit(cursor.current_key, cursor.flip, angle, shift)?;
                    debug!(step = i, on = cursor.current_key, ?keys, "module closed");
                    if let Some(&human) = keys.keys_human.first() {
                        cursor.current_key = human;
                    }
                    modules.push(keys);
                }
                BuildOp::SetFlip(flip) => cursor.flip = *flip,
                BuildOp::Rotate(s) => cursor.rotate(p(0, self.config.default_angle) * s),
                BuildOp::Shift(s) => cursor.shift(p(0, self.config.default_shift) * s),
                BuildOp::Push => {
                    if stack.len() < self.config.max_stack_depth {
                        stack.push(cursor.clone());
                    }
                }
                BuildOp::Pop => {
                    if let Some(saved) = stack.pop() {
                        cursor = saved;
                    }
                }
                BuildOp::Ignore => {}
            }
        }

        Ok(modules)
    }
}
