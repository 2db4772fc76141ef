use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{Result, TopologyError, WindingError};
use crate::kernel::Handle;
use crate::machine::{Phase, PhaseBand, Winding, WindingLayout};

use super::replicate::SectorInstances;

/// Conductor handles grouped by phase and polarity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhaseGroups {
    groups: BTreeMap<Phase, Vec<Handle>>,
}

impl PhaseGroups {
    /// Handles of one phase; empty if the phase never occurs.
    #[must_use]
    pub fn get(&self, phase: Phase) -> &[Handle] {
        self.groups.get(&phase).map_or(&[], Vec::as_slice)
    }

    /// Non-empty groups in phase order.
    pub fn iter(&self) -> impl Iterator<Item = (Phase, &[Handle])> + '_ {
        self.groups
            .iter()
            .filter(|(_, h)| !h.is_empty())
            .map(|(&p, h)| (p, h.as_slice()))
    }

    /// Total number of tagged handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&mut self, phase: Phase, handles: &[Handle]) {
        self.groups.entry(phase).or_default().extend_from_slice(handles);
    }

    /// Appends every group of `other`.
    pub fn extend(&mut self, other: Self) {
        for (phase, handles) in other.groups {
            self.push(phase, &handles);
        }
    }
}

/// Tags conductor copies with the phase active in the matching matrix column.
///
/// `feed[i]` holds the handles of copy `i`; copy `i` reads column `i` of the band.
pub struct AssignPhases<'a> {
    feed: Vec<Vec<Handle>>,
    band: PhaseBand<'a>,
}

impl<'a> AssignPhases<'a> {
    #[must_use]
    pub fn new(feed: Vec<Vec<Handle>>, band: PhaseBand<'a>) -> Self {
        Self { feed, band }
    }

    /// Builds the groups.
    ///
    /// # Errors
    ///
    /// Returns [`WindingError::TooFewColumns`] if the band is narrower than the
    /// number of copies, or the error of the first column without exactly one
    /// active phase.
    pub fn execute(&self) -> Result<PhaseGroups, WindingError> {
        if self.feed.len() > self.band.columns() {
            return Err(WindingError::TooFewColumns {
                copies: self.feed.len(),
                columns: self.band.columns(),
            });
        }
        let mut groups = PhaseGroups::default();
        for (column, handles) in self.feed.iter().enumerate() {
            let phase = self.band.phase_of(column)?;
            groups.push(phase, handles);
        }
        Ok(groups)
    }
}

/// Tags the replicated conductors of a stator according to its winding.
///
/// `conductors[k]` holds the instances of conductor region `k`.
///
/// # Errors
///
/// Returns [`TopologyError::MissingPrimitive`] if the layout needs a conductor
/// that was not drawn, or any [`WindingError`].
pub fn tag_winding(winding: &Winding, conductors: &[SectorInstances]) -> Result<PhaseGroups> {
    winding.validate()?;
    let layout = winding.layout;
    let needed = layout.conductors_needed();
    let drawn = conductors.iter().take_while(|c| !c.is_empty()).count();
    if drawn < needed {
        return Err(TopologyError::MissingPrimitive(format!(
            "{layout:?} winding needs {needed} conductor regions, {drawn} drawn"
        ))
        .into());
    }
    let matrix = &winding.connection_matrix;

    let groups = match layout {
        WindingLayout::SingleLayer => {
            AssignPhases::new(conductors[0].merged_copies(), matrix.band(0)?).execute()?
        }
        WindingLayout::DualLayerSideBySide => {
            let mut groups =
                AssignPhases::new(conductors[0].primary_copies(), matrix.band(3)?).execute()?;
            groups.extend(
                AssignPhases::new(conductors[0].mirrored_copies(), matrix.band(0)?).execute()?,
            );
            groups
        }
        WindingLayout::DualLayerTopBottom => {
            let mut groups =
                AssignPhases::new(conductors[0].merged_copies(), matrix.band(0)?).execute()?;
            groups.extend(
                AssignPhases::new(conductors[1].merged_copies(), matrix.band(3)?).execute()?,
            );
            groups
        }
    };
    debug!(
        layout = ?layout,
        phases = groups.iter().count(),
        conductors = groups.len(),
        "phases tagged"
    );
    Ok(groups)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::error::EmsectorError;
    use crate::kernel::GeoModel;
    use crate::machine::ConnectionMatrix;
    use crate::operations::planner::PeriodicityPlan;
    use crate::operations::replicate::{RealizeRegion, Replicate};
    use crate::testing::{annular_sector, single_layer_matrix};

    /// Conductor regions of a 12-slot, 2-pole-pair stator.
    fn conductors(layers: usize) -> (GeoModel, Vec<SectorInstances>) {
        let plan = PeriodicityPlan::new(12, 2).unwrap();
        let mut model = GeoModel::default();
        let mut out = Vec::new();
        for (r, base) in [(1.0, 100), (1.5, 200)].into_iter().take(layers) {
            let region = annular_sector(base, r, r + 0.4, -0.2, -0.05);
            let seed = RealizeRegion::new(&region, 0.1).execute(&mut model).unwrap();
            out.push(
                Replicate::new(vec![Handle::surface(seed.surface)], true, plan.stator)
                    .execute(&mut model)
                    .unwrap(),
            );
        }
        (model, out)
    }

    fn winding(layout: WindingLayout, rows: Vec<Vec<i32>>) -> Winding {
        Winding {
            layout,
            connection_matrix: ConnectionMatrix::new(rows).unwrap(),
        }
    }

    fn assert_partition(groups: &PhaseGroups, instances: &[SectorInstances]) {
        let all: BTreeSet<Handle> = instances.iter().flat_map(SectorInstances::handles).collect();
        let mut seen = BTreeSet::new();
        for (_, handles) in groups.iter() {
            for h in handles {
                assert!(seen.insert(*h), "{h:?} tagged twice");
            }
        }
        assert_eq!(seen, all);
    }

    #[test]
    fn single_layer_tags_both_halves() {
        let (_, instances) = conductors(1);
        let groups = tag_winding(
            &winding(WindingLayout::SingleLayer, single_layer_matrix()),
            &instances,
        )
        .unwrap();
        // Columns 0..3 read A+, C-, B+.
        let phases: Vec<Phase> = groups.iter().map(|(p, _)| p).collect();
        assert_eq!(phases, [Phase::APlus, Phase::BPlus, Phase::CMinus]);
        assert_eq!(groups.get(Phase::APlus), instances[0].merged_copies()[0]);
        assert!(groups.get(Phase::AMinus).is_empty());
        assert_partition(&groups, &instances);
    }

    #[test]
    fn side_by_side_feeds_mirror_from_first_band() {
        let (_, instances) = conductors(1);
        let mut rows = single_layer_matrix();
        // Second band: the primaries carry the opposite polarity.
        rows.extend(single_layer_matrix().iter().map(|r| r.iter().map(|v| -v).collect()));
        let groups = tag_winding(&winding(WindingLayout::DualLayerSideBySide, rows), &instances)
            .unwrap();
        let first = instances[0].copy(0).unwrap();
        assert_eq!(groups.get(Phase::AMinus), first.primary);
        assert_eq!(groups.get(Phase::APlus), first.mirrored.unwrap());
        assert_partition(&groups, &instances);
    }

    #[test]
    fn top_bottom_uses_one_band_per_conductor() {
        let (_, instances) = conductors(2);
        let mut rows = single_layer_matrix();
        rows.extend(vec![vec![0; 12], vec![-1; 12], vec![0; 12]]);
        let groups =
            tag_winding(&winding(WindingLayout::DualLayerTopBottom, rows), &instances).unwrap();
        assert_eq!(groups.get(Phase::BMinus).len(), 6);
        assert_eq!(groups.len(), 12);
        assert_partition(&groups, &instances);
    }

    #[test]
    fn zero_column_is_invalid() {
        let (_, instances) = conductors(1);
        let mut rows = single_layer_matrix();
        for row in &mut rows {
            row[1] = 0;
        }
        let err = tag_winding(&winding(WindingLayout::SingleLayer, rows), &instances).unwrap_err();
        assert!(matches!(
            err,
            EmsectorError::Winding(WindingError::NoActivePhase { column: 1, .. })
        ));
    }

    #[test]
    fn narrow_matrix_is_invalid() {
        let (_, instances) = conductors(1);
        let rows = single_layer_matrix().into_iter().map(|r| r[..2].to_vec()).collect();
        let err = tag_winding(&winding(WindingLayout::SingleLayer, rows), &instances).unwrap_err();
        assert!(matches!(
            err,
            EmsectorError::Winding(WindingError::TooFewColumns {
                copies: 3,
                columns: 2
            })
        ));
    }

    #[test]
    fn missing_second_conductor() {
        let (_, instances) = conductors(1);
        let mut rows = single_layer_matrix();
        rows.extend(single_layer_matrix());
        let err = tag_winding(&winding(WindingLayout::DualLayerTopBottom, rows), &instances)
            .unwrap_err();
        assert!(matches!(
            err,
            EmsectorError::Topology(TopologyError::MissingPrimitive(_))
        ));
    }
}
