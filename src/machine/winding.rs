use serde::{Deserialize, Serialize};

use crate::error::WindingError;

/// How the conductors of one slot are arranged and fed from the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindingLayout {
    /// One conductor per slot; both halves of the drawn slot share a phase.
    #[serde(alias = "OneLayer")]
    SingleLayer,
    /// Two coil sides next to each other; the drawn half and its mirror are
    /// fed from different row bands.
    #[serde(alias = "DualLayer_SideBySide")]
    DualLayerSideBySide,
    /// Two conductors stacked radially, each fed from its own row band.
    #[serde(alias = "DualLayer_TopBottom")]
    DualLayerTopBottom,
}

impl WindingLayout {
    /// Rows the connection matrix must have.
    #[must_use]
    pub fn rows_needed(self) -> usize {
        match self {
            Self::SingleLayer => 3,
            Self::DualLayerSideBySide | Self::DualLayerTopBottom => 6,
        }
    }

    /// Conductor regions the drawn slot must provide.
    #[must_use]
    pub fn conductors_needed(self) -> usize {
        match self {
            Self::SingleLayer | Self::DualLayerSideBySide => 1,
            Self::DualLayerTopBottom => 2,
        }
    }
}

/// One of the six phase/polarity groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    APlus,
    AMinus,
    BPlus,
    BMinus,
    CPlus,
    CMinus,
}

impl Phase {
    pub const ALL: [Self; 6] = [
        Self::APlus,
        Self::AMinus,
        Self::BPlus,
        Self::BMinus,
        Self::CPlus,
        Self::CMinus,
    ];

    /// Physical group name of this phase.
    #[must_use]
    pub fn group_name(self) -> &'static str {
        match self {
            Self::APlus => "A_PLUS",
            Self::AMinus => "A_MINUS",
            Self::BPlus => "B_PLUS",
            Self::BMinus => "B_MINUS",
            Self::CPlus => "C_PLUS",
            Self::CMinus => "C_MINUS",
        }
    }

    fn from_row(row: usize, value: i32) -> Self {
        match (row, value > 0) {
            (0, true) => Self::APlus,
            (0, false) => Self::AMinus,
            (1, true) => Self::BPlus,
            (1, false) => Self::BMinus,
            (_, true) => Self::CPlus,
            (_, false) => Self::CMinus,
        }
    }
}

/// Signed phase × slot matrix. Rows are phases A, B, C (and A, B, C of the
/// second layer for dual-layer windings); the sign gives the current direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<i32>>", into = "Vec<Vec<i32>>")]
pub struct ConnectionMatrix {
    rows: Vec<Vec<i32>>,
}

impl ConnectionMatrix {
    /// Creates a matrix from rows of equal length.
    ///
    /// # Errors
    ///
    /// Returns [`WindingError::RaggedMatrix`] if rows differ in length.
    pub fn new(rows: Vec<Vec<i32>>) -> Result<Self, WindingError> {
        let expected = rows.first().map_or(0, Vec::len);
        if let Some((row, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != expected) {
            return Err(WindingError::RaggedMatrix {
                row,
                len: r.len(),
                expected,
            });
        }
        Ok(Self { rows })
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn columns(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// The three rows starting at `first_row`.
    ///
    /// # Errors
    ///
    /// Returns [`WindingError::MissingBand`] if the matrix is too short.
    pub fn band(&self, first_row: usize) -> Result<PhaseBand<'_>, WindingError> {
        if self.rows.len() < first_row + 3 {
            return Err(WindingError::MissingBand {
                rows: self.rows.len(),
                needed: first_row + 3,
            });
        }
        Ok(PhaseBand {
            rows: &self.rows[first_row..first_row + 3],
            first_row,
        })
    }
}

impl TryFrom<Vec<Vec<i32>>> for ConnectionMatrix {
    type Error = WindingError;

    fn try_from(rows: Vec<Vec<i32>>) -> Result<Self, Self::Error> {
        Self::new(rows)
    }
}

impl From<ConnectionMatrix> for Vec<Vec<i32>> {
    fn from(m: ConnectionMatrix) -> Self {
        m.rows
    }
}

/// Three consecutive rows (A, B, C) of a connection matrix.
#[derive(Debug, Clone, Copy)]
pub struct PhaseBand<'a> {
    rows: &'a [Vec<i32>],
    first_row: usize,
}

impl PhaseBand<'_> {
    #[must_use]
    pub fn columns(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// Matrix rows covered, inclusive.
    #[must_use]
    pub fn row_range(&self) -> (usize, usize) {
        (self.first_row, self.first_row + 2)
    }

    /// The single phase active in `column`.
    ///
    /// # Errors
    ///
    /// Returns an error unless exactly one of the three entries is non-zero.
    pub fn phase_of(&self, column: usize) -> Result<Phase, WindingError> {
        if column >= self.columns() {
            return Err(WindingError::TooFewColumns {
                copies: column + 1,
                columns: self.columns(),
            });
        }
        let active: Vec<(usize, i32)> = self
            .rows
            .iter()
            .enumerate()
            .map(|(row, values)| (row, values[column]))
            .filter(|&(_, v)| v != 0)
            .collect();
        match active[..] {
            [(row, value)] => Ok(Phase::from_row(row, value)),
            [] => Err(WindingError::NoActivePhase {
                column,
                rows: self.row_range(),
            }),
            _ => Err(WindingError::MultipleActivePhases {
                column,
                rows: self.row_range(),
                active: active.len(),
            }),
        }
    }
}

/// Winding layout and connection matrix of the stator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Winding {
    pub layout: WindingLayout,
    pub connection_matrix: ConnectionMatrix,
}

impl Winding {
    /// Checks that the matrix has the row bands the layout reads.
    ///
    /// # Errors
    ///
    /// Returns [`WindingError::MissingBand`] if rows are missing.
    pub fn validate(&self) -> Result<(), WindingError> {
        let needed = self.layout.rows_needed();
        if self.connection_matrix.rows() < needed {
            return Err(WindingError::MissingBand {
                rows: self.connection_matrix.rows(),
                needed,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn matrix() -> ConnectionMatrix {
        ConnectionMatrix::new(vec![
            vec![1, 0, 0, -1],
            vec![0, 0, -1, 0],
            vec![0, 1, 0, 0],
        ])
        .unwrap()
    }

    #[test]
    fn phase_follows_row_and_sign() {
        let m = matrix();
        let band = m.band(0).unwrap();
        assert_eq!(band.phase_of(0).unwrap(), Phase::APlus);
        assert_eq!(band.phase_of(1).unwrap(), Phase::CPlus);
        assert_eq!(band.phase_of(2).unwrap(), Phase::BMinus);
        assert_eq!(band.phase_of(3).unwrap(), Phase::AMinus);
    }

    #[test]
    fn zero_column_is_rejected() {
        let m = ConnectionMatrix::new(vec![vec![1, 0], vec![0, 0], vec![0, 0]]).unwrap();
        let err = m.band(0).unwrap().phase_of(1).unwrap_err();
        assert!(matches!(err, WindingError::NoActivePhase { column: 1, .. }));
    }

    #[test]
    fn two_active_entries_are_rejected() {
        let m = ConnectionMatrix::new(vec![vec![1], vec![-1], vec![0]]).unwrap();
        let err = m.band(0).unwrap().phase_of(0).unwrap_err();
        assert!(matches!(
            err,
            WindingError::MultipleActivePhases { active: 2, .. }
        ));
    }

    #[test]
    fn second_band_needs_six_rows() {
        assert!(matches!(
            matrix().band(3).unwrap_err(),
            WindingError::MissingBand { rows: 3, needed: 6 }
        ));
    }

    #[test]
    fn ragged_rows_fail_to_parse() {
        let err = serde_json::from_str::<ConnectionMatrix>("[[1, 0], [0], [0, 1]]").unwrap_err();
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn layout_aliases() {
        let layout: WindingLayout = serde_json::from_str("\"DualLayer_TopBottom\"").unwrap();
        assert_eq!(layout, WindingLayout::DualLayerTopBottom);
        assert_eq!(layout.conductors_needed(), 2);
        let winding = Winding {
            layout,
            connection_matrix: matrix(),
        };
        assert!(winding.validate().is_err());
    }
}
