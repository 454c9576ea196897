//! Archetype x emplacement effectiveness lookup
//!
//! The table is configured as a flat list of rows and checked for
//! completeness when the agent is built, so a missing pairing fails at
//! startup instead of silently reading as zero mid-match.

use serde::{Deserialize, Serialize};

use crate::behavior::archetype::Archetype;
use crate::core::error::{AgentError, Result};
use crate::core::types::EmplacementKind;

/// One configured pairing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectivenessEntry {
    pub archetype: Archetype,
    pub emplacement: EmplacementKind,
    /// Damage multiplier (1.0 = neutral)
    pub multiplier: f32,
}

const KINDS: usize = EmplacementKind::ALL.len();
const ARCHETYPES: usize = Archetype::ALL.len();

/// Validated, dense effectiveness matrix
#[derive(Debug, Clone, PartialEq)]
pub struct EffectivenessMatrix {
    cells: [[f32; KINDS]; ARCHETYPES],
}

impl EffectivenessMatrix {
    /// Build from rows; every archetype needs a finite entry for every kind
    pub fn from_entries(entries: &[EffectivenessEntry]) -> Result<Self> {
        let mut cells = [[f32::NAN; KINDS]; ARCHETYPES];
        for entry in entries {
            if entry.multiplier.is_finite() && entry.multiplier >= 0.0 {
                cells[entry.archetype.index()][kind_index(entry.emplacement)] = entry.multiplier;
            }
        }

        for archetype in Archetype::ALL {
            for kind in EmplacementKind::ALL {
                if cells[archetype.index()][kind_index(kind)].is_nan() {
                    return Err(AgentError::IncompleteMatrix {
                        archetype: archetype.to_string(),
                        emplacement: kind,
                    });
                }
            }
        }

        Ok(Self { cells })
    }

    pub fn multiplier(&self, archetype: Archetype, kind: EmplacementKind) -> f32 {
        self.cells[archetype.index()][kind_index(kind)]
    }

    /// Emplacement kind with the highest multiplier against an archetype
    ///
    /// Ties resolve to the earlier kind in declaration order.
    pub fn select_counter(&self, archetype: Archetype) -> EmplacementKind {
        let row = &self.cells[archetype.index()];
        let mut best = EmplacementKind::ALL[0];
        for kind in EmplacementKind::ALL.iter().skip(1) {
            if row[kind_index(*kind)] > row[kind_index(best)] {
                best = *kind;
            }
        }
        best
    }

    /// Multiplier scaled into [0, 1] against the best counter for the archetype
    pub fn relative(&self, archetype: Archetype, kind: EmplacementKind) -> f32 {
        let best = self.multiplier(archetype, self.select_counter(archetype));
        if best > 0.0 {
            (self.multiplier(archetype, kind) / best).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

fn kind_index(kind: EmplacementKind) -> usize {
    kind as usize
}

/// Shipped effectiveness rows
pub fn default_effectiveness_rows() -> Vec<EffectivenessEntry> {
    use Archetype::*;
    use EmplacementKind::*;

    let table: [(Archetype, [f32; KINDS]); ARCHETYPES] = [
        //            Gatling Cannon Frost Laser Missile
        (Direct, [1.0, 1.2, 0.8, 1.0, 0.9]),
        (Strafing, [1.1, 0.6, 1.0, 1.2, 1.4]),
        (Orbiting, [1.0, 0.7, 1.1, 1.3, 1.2]),
        (Swarming, [1.0, 1.5, 1.1, 0.8, 0.7]),
        (Hunting, [1.2, 0.9, 1.4, 1.0, 1.1]),
    ];
    let kinds = [Gatling, Cannon, Frost, Laser, Missile];

    table
        .iter()
        .flat_map(|(archetype, row)| {
            kinds.iter().zip(row.iter()).map(move |(kind, m)| EffectivenessEntry {
                archetype: *archetype,
                emplacement: *kind,
                multiplier: *m,
            })
        })
        .collect()
}
