//! Flip codes and the connector transition table.
//!
//! Both the translation sign applied during placement and the connectors
//! closed when a module is completed are pure table lookups keyed by the
//! connector that was open on the attachment element and the flip code.

use crate::element::ConnectorId;
use crate::element::ConnectorId::{First as C1, Second as C2};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Mirrored variant of a unit's placement relative to its neighbour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlipCode {
    AA,
    AB,
    BA,
    BB,
}

impl FlipCode {
    pub const ALL: [FlipCode; 4] = [FlipCode::AA, FlipCode::AB, FlipCode::BA, FlipCode::BB];

    fn index(self) -> usize {
        match self {
            Self::AA => 0,
            Self::AB => 1,
            Self::BA => 2,
            Self::BB => 3,
        }
    }

    /// Translation signs `(a, b)` for the robot and human unit respectively.
    ///
    /// `c` is -1 when the first connector was open and +1 otherwise.
    pub fn signs(self, open: ConnectorId) -> (f32, f32) {
        let c = match open {
            ConnectorId::First => -1.0,
            ConnectorId::Second => 1.0,
        };
        let (a, b) = FLIP_SIGNS[self.index()];
        (a * c, b * c)
    }
}

impl fmt::Display for FlipCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AA => "AA",
            Self::AB => "AB",
            Self::BA => "BA",
            Self::BB => "BB",
        };
        f.write_str(s)
    }
}

impl FromStr for FlipCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "AA" => Ok(Self::AA),
            "AB" => Ok(Self::AB),
            "BA" => Ok(Self::BA),
            "BB" => Ok(Self::BB),
            other => Err(Error::InvalidFlip(other.to_string())),
        }
    }
}

/// Unsigned `(a, b)` per flip code, indexed like [`FlipCode::ALL`].
const FLIP_SIGNS: [(f32, f32); 4] = [(0.0, 0.0), (0.0, 1.0), (1.0, 0.0), (1.0, 1.0)];

/// Connectors closed when the second unit of a module is placed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    /// Connector to close on the module-mate placed just before.
    pub previous: ConnectorId,
    /// Connector to close on the newly placed unit.
    pub new: ConnectorId,
}

/// Rows: open connector on the attachment element (first, second).
/// Columns: flip code (AA, AB, BA, BB).
const TRANSITIONS: [[(ConnectorId, ConnectorId); 4]; 2] = [
    [(C1, C1), (C1, C2), (C2, C1), (C2, C2)],
    [(C2, C2), (C2, C1), (C1, C2), (C1, C1)],
];

/// Looks up which connectors a completed module closes.
pub fn transition(open: ConnectorId, flip: FlipCode) -> Transition {
    let row = match open {
        ConnectorId::First => 0,
        ConnectorId::Second => 1,
    };
    let (previous, new) = TRANSITIONS[row][flip.index()];
    Transition { previous, new }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_unknown_codes() {
        assert_eq!("AB".parse::<FlipCode>().unwrap(), FlipCode::AB);
        assert!(matches!("AC".parse::<FlipCode>(), Err(Error::InvalidFlip(s)) if s == "AC"));
        assert!("aa".parse::<FlipCode>().is_err());
        assert!("".parse::<FlipCode>().is_err());
    }

    #[test]
    fn display_roundtrips() {
        for flip in FlipCode::ALL {
            assert_eq!(flip.to_string().parse::<FlipCode>().unwrap(), flip);
        }
    }

    #[test]
    fn sign_table_first_connector_open() {
        assert_eq!(FlipCode::AA.signs(C1), (0.0, 0.0));
        assert_eq!(FlipCode::AB.signs(C1), (0.0, -1.0));
        assert_eq!(FlipCode::BA.signs(C1), (-1.0, 0.0));
        assert_eq!(FlipCode::BB.signs(C1), (-1.0, -1.0));
    }

    #[test]
    fn sign_table_second_connector_open() {
        assert_eq!(FlipCode::AA.signs(C2), (0.0, 0.0));
        assert_eq!(FlipCode::AB.signs(C2), (0.0, 1.0));
        assert_eq!(FlipCode::BA.signs(C2), (1.0, 0.0));
        assert_eq!(FlipCode::BB.signs(C2), (1.0, 1.0));
    }

    #[test]
    fn transition_table_first_connector_open() {
        let t = |f| transition(C1, f);
        assert_eq!(t(FlipCode::AA), Transition { previous: C1, new: C1 });
        assert_eq!(t(FlipCode::AB), Transition { previous: C1, new: C2 });
        assert_eq!(t(FlipCode::BA), Transition { previous: C2, new: C1 });
        assert_eq!(t(FlipCode::BB), Transition { previous: C2, new: C2 });
    }

    #[test]
    fn transition_table_second_connector_open() {
        let t = |f| transition(C2, f);
        assert_eq!(t(FlipCode::AA), Transition { previous: C2, new: C2 });
        assert_eq!(t(FlipCode::AB), Transition { previous: C2, new: C1 });
        assert_eq!(t(FlipCode::BA), Transition { previous: C1, new: C2 });
        assert_eq!(t(FlipCode::BB), Transition { previous: C1, new: C1 });
    }

    #[test]
    fn rows_mirror_each_other() {
        for flip in FlipCode::ALL {
            let a = transition(C1, flip);
            let b = transition(C2, flip);
            assert_eq!(a.previous.other(), b.previous);
            assert_eq!(a.new.other(), b.new);
        }
    }
}
