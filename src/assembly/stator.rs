use tracing::debug;

use crate::error::{Result, TopologyError};
use crate::kernel::{Handle, Kernel, Tag};
use crate::machine::{MachineModel, StatorBoundary, StatorRegion};
use crate::operations::{
    tag_winding, OuterBoundary, PeriodicBoundary, PeriodicPair, PeriodicityPlan,
    PhysicalGroupRegistry, PhaseGroups, RealizeRegion, Realized, Replicate, SectorInstances,
    SlidingBoundary,
};
use crate::primitives::RegionGeometry;

use super::{region_size, Part};

/// Realization order of the drawn regions; the coil area comes after the
/// conductors it surrounds.
const REGIONS: [StatorRegion; 8] = [
    StatorRegion::SlotOpening,
    StatorRegion::SlotWedge,
    StatorRegion::Backiron,
    StatorRegion::Tooth,
    StatorRegion::CoilArea,
    StatorRegion::ToothTip,
    StatorRegion::StatorAirgap,
    StatorRegion::SlidingAirgap,
];

fn group_name(region: StatorRegion) -> &'static str {
    match region {
        StatorRegion::SlotOpening => "SLOT_OPENINGS",
        StatorRegion::SlotWedge => "SLOT_WEDGES",
        StatorRegion::CoilArea => "COIL_AREAS",
        StatorRegion::Backiron => "BACKIRONS",
        StatorRegion::Tooth => "TEETH",
        StatorRegion::ToothTip => "TOOTHTIPS",
        StatorRegion::StatorAirgap => "STATOR_AIRGAPS",
        StatorRegion::SlidingAirgap => "SLIDING_AIRGAPS",
    }
}

fn display_name(region: StatorRegion) -> &'static str {
    match region {
        StatorRegion::SlotOpening => "slot opening",
        StatorRegion::SlotWedge => "slot wedge",
        StatorRegion::CoilArea => "coil area",
        StatorRegion::Backiron => "back-iron",
        StatorRegion::Tooth => "tooth",
        StatorRegion::ToothTip => "tooth tip",
        StatorRegion::StatorAirgap => "stator air gap",
        StatorRegion::SlidingAirgap => "sliding air gap",
    }
}

/// Target element sizes of the stator regions.
#[derive(Debug, Clone, Copy, PartialEq)]
struct StatorSizes {
    opening: f64,
    wedge: f64,
    conductors: f64,
    coil_area: f64,
    backiron: f64,
    tooth: f64,
    tooth_tip: f64,
    stator_airgap: f64,
    sliding_airgap: f64,
}

impl StatorSizes {
    fn new<M: MachineModel + ?Sized>(machine: &M) -> Result<Self> {
        let region = move |r| machine.stator_region(r);
        let opening = region(StatorRegion::SlotOpening)
            .and_then(|r| r.mesh_size(2.0))
            .ok_or_else(|| TopologyError::MissingPrimitive("slot opening has no points".into()))?;
        let wedge = region_size(region(StatorRegion::SlotWedge), 2.0, opening);
        let conductors = region_size(machine.conductors().first(), 4.0, wedge);
        let coil_area = region_size(region(StatorRegion::CoilArea), 2.0, wedge);
        let backiron = region_size(region(StatorRegion::Backiron), 5.0, coil_area);
        let tooth = region_size(region(StatorRegion::Tooth), 5.0, backiron);
        Ok(Self {
            opening,
            wedge,
            conductors,
            coil_area,
            backiron,
            tooth,
            tooth_tip: region_size(region(StatorRegion::ToothTip), 10.0, opening),
            stator_airgap: region_size(region(StatorRegion::StatorAirgap), 40.0, opening / 2.0),
            sliding_airgap: region_size(region(StatorRegion::SlidingAirgap), 40.0, opening / 2.0),
        })
    }

    fn of(&self, region: StatorRegion) -> f64 {
        match region {
            StatorRegion::SlotOpening => self.opening,
            StatorRegion::SlotWedge => self.wedge,
            StatorRegion::CoilArea => self.coil_area,
            StatorRegion::Backiron => self.backiron,
            StatorRegion::Tooth => self.tooth,
            StatorRegion::ToothTip => self.tooth_tip,
            StatorRegion::StatorAirgap => self.stator_airgap,
            StatorRegion::SlidingAirgap => self.sliding_airgap,
        }
    }
}

/// The stator, drawn over half a slot pitch.
pub struct StatorPart<'m, M: MachineModel + ?Sized> {
    machine: &'m M,
    plan: PeriodicityPlan,
    seeds: Vec<(StatorRegion, Realized)>,
    conductor_seeds: Vec<Realized>,
    regions: Vec<(StatorRegion, SectorInstances)>,
    conductors: Vec<SectorInstances>,
    outer: SectorInstances,
    periodic: Option<PeriodicBoundary>,
    airgap_arc: SectorInstances,
    sliding: SectorInstances,
    phases: PhaseGroups,
}

impl<'m, M: MachineModel + ?Sized> StatorPart<'m, M> {
    #[must_use]
    pub fn new(machine: &'m M, plan: PeriodicityPlan) -> Self {
        Self {
            machine,
            plan,
            seeds: Vec::new(),
            conductor_seeds: Vec::new(),
            regions: Vec::new(),
            conductors: Vec::new(),
            outer: SectorInstances::absent(),
            periodic: None,
            airgap_arc: SectorInstances::absent(),
            sliding: SectorInstances::absent(),
            phases: PhaseGroups::default(),
        }
    }

    /// Replicated instances of a region; empty if the stator lacks it.
    #[must_use]
    pub fn region(&self, region: StatorRegion) -> Option<&SectorInstances> {
        self.regions.iter().find(|(r, _)| *r == region).map(|(_, i)| i)
    }

    #[must_use]
    pub fn conductors(&self) -> &[SectorInstances] {
        &self.conductors
    }

    #[must_use]
    pub fn phases(&self) -> &PhaseGroups {
        &self.phases
    }

    fn realize<K: Kernel>(
        kernel: &mut K,
        name: &str,
        region: &RegionGeometry,
        size: f64,
        holes: Vec<Tag>,
    ) -> Result<Realized> {
        region.validate(name)?;
        let realized = RealizeRegion::new(region, size)
            .with_holes(holes)
            .execute(kernel)?;
        debug!(region = name, surface = realized.surface, size, "region realized");
        Ok(realized)
    }
}

impl<M: MachineModel + ?Sized> Part for StatorPart<'_, M> {
    fn name(&self) -> &'static str {
        "stator"
    }

    fn load<K: Kernel>(&mut self, kernel: &mut K) -> Result<()> {
        let machine = self.machine;
        let winding = machine.winding();
        winding.validate()?;
        let needed = winding.layout.conductors_needed();
        let drawn = machine.conductors().len();
        if drawn < needed {
            return Err(TopologyError::MissingPrimitive(format!(
                "{:?} winding needs {needed} conductor regions, {drawn} drawn",
                winding.layout
            ))
            .into());
        }
        // Each conductor is cut out of the coil area; an untagged one would mesh as a void.
        if drawn > needed {
            return Err(TopologyError::InvalidTopology(format!(
                "{:?} winding tags {needed} conductor regions, {drawn} drawn",
                winding.layout
            ))
            .into());
        }
        let sizes = StatorSizes::new(machine)?;

        for region in REGIONS {
            if region == StatorRegion::CoilArea {
                for (k, conductor) in machine.conductors().iter().enumerate() {
                    let name = format!("conductor {k}");
                    let seed = Self::realize(kernel, &name, conductor, sizes.conductors, Vec::new())?;
                    self.conductor_seeds.push(seed);
                }
            }
            let Some(geometry) = machine.stator_region(region) else {
                if region == StatorRegion::SlotWedge {
                    continue;
                }
                return Err(TopologyError::MissingPrimitive(format!(
                    "stator has no {}",
                    display_name(region)
                ))
                .into());
            };
            let holes = if region == StatorRegion::CoilArea {
                self.conductor_seeds.iter().map(|c| c.boundary).collect()
            } else {
                Vec::new()
            };
            let seed = Self::realize(kernel, display_name(region), geometry, sizes.of(region), holes)?;
            self.seeds.push((region, seed));
        }
        Ok(())
    }

    fn replicate<K: Kernel>(&mut self, kernel: &mut K) -> Result<()> {
        let replication = self.plan.stator;
        for (region, seed) in &self.seeds {
            let instances = Replicate::new(vec![Handle::surface(seed.surface)], true, replication)
                .execute(kernel)?;
            self.regions.push((*region, instances));
        }
        for seed in &self.conductor_seeds {
            self.conductors.push(
                Replicate::new(vec![Handle::surface(seed.surface)], true, replication)
                    .execute(kernel)?,
            );
        }
        debug!(
            copies = replication.copies,
            pitch = replication.pitch.to_degrees(),
            "stator sectors replicated"
        );
        Ok(())
    }

    fn build_boundaries<K: Kernel>(&mut self, kernel: &mut K) -> Result<()> {
        let machine = self.machine;
        let replication = self.plan.stator;
        self.outer = OuterBoundary::new(
            "outer stator boundary",
            machine.stator_boundary(StatorBoundary::Outer),
            replication,
        )
        .execute(kernel)?;
        self.periodic = Some(
            PeriodicPair::new(
                "stator master boundary",
                machine.stator_boundary(StatorBoundary::Master),
                &self.plan,
            )
            .execute(kernel)?,
        );
        self.airgap_arc = OuterBoundary::new(
            "stator air-gap arc",
            machine.stator_boundary(StatorBoundary::AirgapArc),
            replication,
        )
        .execute(kernel)?;
        self.sliding = SlidingBoundary::new(
            "stator sliding boundary",
            machine.stator_boundary(StatorBoundary::Sliding),
            replication,
        )
        .execute(kernel)?;
        Ok(())
    }

    fn tag_phases(&mut self) -> Result<()> {
        self.phases = tag_winding(self.machine.winding(), &self.conductors)?;
        Ok(())
    }

    fn register(&self, registry: &mut PhysicalGroupRegistry) -> Result<()> {
        for (region, instances) in &self.regions {
            registry.register(group_name(*region), &instances.handles())?;
        }
        for (phase, handles) in self.phases.iter() {
            registry.register(phase.group_name(), handles)?;
        }
        registry.register("OUTER_STATOR_BOUNDARY", &self.outer.handles())?;
        if let Some(pair) = &self.periodic {
            registry.register("STATOR_MASTER_BOUNDARY", &pair.master)?;
            registry.register("STATOR_SLAVE_BOUNDARY", &pair.slave)?;
        }
        registry.register("STATOR_AIRGAP_ARC_BOUNDARY", &self.airgap_arc.handles())?;
        registry.register("STATOR_SLIDING_BOUNDARY", &self.sliding.handles())?;
        Ok(())
    }
}
