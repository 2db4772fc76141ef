use tracing::debug;

use crate::error::{Result, TopologyError};
use crate::kernel::{Handle, Kernel, Tag};
use crate::machine::{MachineModel, RotorBoundary, RotorRegion};
use crate::operations::{
    magnets_group, PeriodicBoundary, PeriodicPair, PeriodicityPlan, PhysicalGroupRegistry,
    RealizeRegion, Realized, Replicate, SectorInstances, SlidingBoundary,
};
use crate::primitives::RegionGeometry;

use super::{region_size, Part};

/// Target element sizes of the rotor regions.
#[derive(Debug, Clone, Copy, PartialEq)]
struct RotorSizes {
    shaft: f64,
    magnets: f64,
    pockets: f64,
    core: f64,
    airgap: f64,
}

impl RotorSizes {
    fn new<M: MachineModel + ?Sized>(machine: &M) -> Result<Self> {
        let shaft = machine
            .rotor_region(RotorRegion::Shaft)
            .and_then(|r| r.mesh_size(2.0))
            .ok_or_else(|| TopologyError::MissingPrimitive("shaft has no points".into()))?;
        let magnets = region_size(machine.magnets().first(), 10.0, shaft / 2.0);
        Ok(Self {
            shaft,
            magnets,
            pockets: region_size(machine.pockets().first(), 10.0, magnets / 2.0),
            core: region_size(machine.rotor_region(RotorRegion::Core), 10.0, shaft / 2.0),
            airgap: region_size(
                machine.rotor_region(RotorRegion::RotorAirgap),
                40.0,
                magnets / 20.0,
            ),
        })
    }
}

/// The rotor, drawn over half a pole pitch.
pub struct RotorPart<'m, M: MachineModel + ?Sized> {
    machine: &'m M,
    plan: PeriodicityPlan,
    shaft_seed: Option<Realized>,
    magnet_seeds: Vec<Realized>,
    pocket_seeds: Vec<Realized>,
    core_seed: Option<Realized>,
    airgap_seed: Option<Realized>,
    shaft: SectorInstances,
    magnets: Vec<SectorInstances>,
    pockets: Vec<SectorInstances>,
    core: SectorInstances,
    airgap: SectorInstances,
    periodic: Option<PeriodicBoundary>,
    sliding: SectorInstances,
}

impl<'m, M: MachineModel + ?Sized> RotorPart<'m, M> {
    #[must_use]
    pub fn new(machine: &'m M, plan: PeriodicityPlan) -> Self {
        Self {
            machine,
            plan,
            shaft_seed: None,
            magnet_seeds: Vec::new(),
            pocket_seeds: Vec::new(),
            core_seed: None,
            airgap_seed: None,
            shaft: SectorInstances::absent(),
            magnets: Vec::new(),
            pockets: Vec::new(),
            core: SectorInstances::absent(),
            airgap: SectorInstances::absent(),
            periodic: None,
            sliding: SectorInstances::absent(),
        }
    }

    #[must_use]
    pub fn magnets(&self) -> &[SectorInstances] {
        &self.magnets
    }

    #[must_use]
    pub fn pockets(&self) -> &[SectorInstances] {
        &self.pockets
    }

    #[must_use]
    pub fn core(&self) -> &SectorInstances {
        &self.core
    }

    fn required(&self, region: RotorRegion, name: &str) -> Result<&'m RegionGeometry> {
        let machine: &'m M = self.machine;
        machine
            .rotor_region(region)
            .ok_or_else(|| TopologyError::MissingPrimitive(format!("rotor has no {name}")).into())
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

    fn replicate_seed<K: Kernel>(&self, kernel: &mut K, seed: Option<Realized>) -> Result<SectorInstances> {
        match seed {
            Some(seed) => Replicate::new(vec![Handle::surface(seed.surface)], true, self.plan.rotor)
                .execute(kernel),
            None => Ok(SectorInstances::absent()),
        }
    }
}

impl<M: MachineModel + ?Sized> Part for RotorPart<'_, M> {
    fn name(&self) -> &'static str {
        "rotor"
    }

    fn load<K: Kernel>(&mut self, kernel: &mut K) -> Result<()> {
        let machine = self.machine;
        let topology = machine.rotor_topology();
        machine
            .magnet_topology()
            .check(topology, machine.magnets().len())?;
        if !topology.is_interior() && !machine.pockets().is_empty() {
            return Err(TopologyError::InvalidTopology(format!(
                "{topology:?} rotor cannot have pockets, {} drawn",
                machine.pockets().len()
            ))
            .into());
        }
        let shaft = self.required(RotorRegion::Shaft, "shaft")?;
        let core = self.required(RotorRegion::Core, "core")?;
        let airgap = self.required(RotorRegion::RotorAirgap, "air gap")?;
        let sizes = RotorSizes::new(machine)?;

        self.shaft_seed = Some(Self::realize(kernel, "shaft", shaft, sizes.shaft, Vec::new())?);
        for (k, magnet) in machine.magnets().iter().enumerate() {
            let seed = Self::realize(kernel, &format!("magnet {k}"), magnet, sizes.magnets, Vec::new())?;
            self.magnet_seeds.push(seed);
        }
        for (k, pocket) in machine.pockets().iter().enumerate() {
            let seed = Self::realize(kernel, &format!("pocket {k}"), pocket, sizes.pockets, Vec::new())?;
            self.pocket_seeds.push(seed);
        }
        // Buried magnets and their pockets are cut out of the core.
        let holes = if topology.is_interior() {
            self.magnet_seeds
                .iter()
                .chain(&self.pocket_seeds)
                .map(|s| s.boundary)
                .collect()
        } else {
            Vec::new()
        };
        self.core_seed = Some(Self::realize(kernel, "core", core, sizes.core, holes)?);
        self.airgap_seed = Some(Self::realize(kernel, "air gap", airgap, sizes.airgap, Vec::new())?);
        Ok(())
    }

    fn replicate<K: Kernel>(&mut self, kernel: &mut K) -> Result<()> {
        self.shaft = self.replicate_seed(kernel, self.shaft_seed)?;
        for seed in self.magnet_seeds.clone() {
            let instances = self.replicate_seed(kernel, Some(seed))?;
            self.magnets.push(instances);
        }
        for seed in self.pocket_seeds.clone() {
            let instances = self.replicate_seed(kernel, Some(seed))?;
            self.pockets.push(instances);
        }
        self.core = self.replicate_seed(kernel, self.core_seed)?;
        self.airgap = self.replicate_seed(kernel, self.airgap_seed)?;
        debug!(
            copies = self.plan.rotor.copies,
            pitch = self.plan.rotor.pitch.to_degrees(),
            "rotor sectors replicated"
        );
        Ok(())
    }

    fn build_boundaries<K: Kernel>(&mut self, kernel: &mut K) -> Result<()> {
        let machine = self.machine;
        self.periodic = Some(
            PeriodicPair::new(
                "rotor master boundary",
                machine.rotor_boundary(RotorBoundary::Master),
                &self.plan,
            )
            .execute(kernel)?,
        );
        self.sliding = SlidingBoundary::new(
            "rotor sliding boundary",
            machine.rotor_boundary(RotorBoundary::Sliding),
            self.plan.rotor,
        )
        .execute(kernel)?;
        Ok(())
    }

    fn tag_phases(&mut self) -> Result<()> {
        debug!("rotor carries no winding");
        Ok(())
    }

    fn register(&self, registry: &mut PhysicalGroupRegistry) -> Result<()> {
        registry.register("SHAFTS", &self.shaft.handles())?;
        registry.register("ROTORCORES", &self.core.handles())?;
        let pockets: Vec<Handle> = self.pockets.iter().flat_map(SectorInstances::handles).collect();
        registry.register("ROTORPOCKETS", &pockets)?;
        registry.register("ROTOR_AIRGAPS", &self.airgap.handles())?;
        // Each pole copy is its own magnet group so it can be magnetized on its own.
        for copy in 0..self.plan.rotor.copies {
            let handles: Vec<Handle> = self
                .magnets
                .iter()
                .filter_map(|m| m.copy(copy))
                .flat_map(|instance| instance.merged())
                .collect();
            registry.register(magnets_group(copy)?.name, &handles)?;
        }
        if let Some(pair) = &self.periodic {
            registry.register("ROTOR_MASTER_BOUNDARY", &pair.master)?;
            registry.register("ROTOR_SLAVE_BOUNDARY", &pair.slave)?;
        }
        registry.register("ROTOR_SLIDING_BOUNDARY", &self.sliding.handles())?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::error::{EmsectorError, RegistryError};
    use crate::kernel::GeoModel;
    use crate::machine::{MagnetTopology, RotorTopology, WindingLayout};
    use crate::testing::machine;

    fn replicated(slots: i32, pole_pairs: i32, topology: RotorTopology) -> (GeoModel, PeriodicityPlan) {
        let m = machine(slots, pole_pairs, topology, WindingLayout::SingleLayer);
        let plan = PeriodicityPlan::new(slots, pole_pairs).unwrap();
        let mut model = GeoModel::default();
        let mut part = RotorPart::new(&m, plan);
        part.load(&mut model).unwrap();
        part.replicate(&mut model).unwrap();
        (model, plan)
    }

    #[test]
    fn sizes_follow_fallback_chain() {
        let mut m = machine(12, 2, RotorTopology::SurfaceMounted, WindingLayout::SingleLayer);
        m.rotor.magnets[0].points.clear();
        m.rotor.rotor_airgap.as_mut().unwrap().points.clear();
        let sizes = RotorSizes::new(&m).unwrap();
        assert_relative_eq!(sizes.magnets, sizes.shaft / 2.0);
        assert_relative_eq!(sizes.pockets, sizes.magnets / 2.0);
        assert_relative_eq!(sizes.airgap, sizes.magnets / 20.0);
    }

    #[test]
    fn interior_core_has_magnet_and_pocket_holes() {
        let m = machine(12, 4, RotorTopology::InteriorRadial, WindingLayout::SingleLayer);
        let plan = PeriodicityPlan::new(12, 4).unwrap();
        let mut model = GeoModel::default();
        let mut part = RotorPart::new(&m, plan);
        part.load(&mut model).unwrap();
        part.replicate(&mut model).unwrap();
        let core = part.core().handles()[0];
        assert_eq!(model.surface(core.tag).unwrap().holes.len(), 2);
        assert_eq!(part.magnets().len(), 1);
        assert_eq!(part.pockets().len(), 1);
        assert_eq!(part.core().copies(), 2);
    }

    #[test]
    fn surface_mounted_core_has_no_holes() {
        let m = machine(12, 2, RotorTopology::SurfaceMounted, WindingLayout::SingleLayer);
        let plan = PeriodicityPlan::new(12, 2).unwrap();
        let mut model = GeoModel::default();
        let mut part = RotorPart::new(&m, plan);
        part.load(&mut model).unwrap();
        part.replicate(&mut model).unwrap();
        let core = part.core().handles()[0];
        assert!(model.surface(core.tag).unwrap().holes.is_empty());
        assert!(part.pockets().is_empty());
    }

    #[test]
    fn rotor_copies_follow_plan() {
        // gcd(12, 2) = 2: a single pole pitch.
        let (_, plan) = replicated(12, 1, RotorTopology::SurfaceMounted);
        assert_eq!(plan.rotor.copies, 1);
        let (model, plan) = replicated(12, 4, RotorTopology::InteriorRadial);
        assert_eq!(plan.rotor.copies, 2);
        assert!(model.count(crate::kernel::Dim::Surface) >= 5 * 4);
    }

    #[test]
    fn surface_mounted_with_pockets_is_rejected() {
        let mut m = machine(12, 2, RotorTopology::SurfaceMounted, WindingLayout::SingleLayer);
        m.rotor.pockets = machine(12, 2, RotorTopology::InteriorRadial, WindingLayout::SingleLayer)
            .rotor
            .pockets;
        let plan = PeriodicityPlan::new(12, 2).unwrap();
        let err = RotorPart::new(&m, plan)
            .load(&mut GeoModel::default())
            .unwrap_err();
        assert!(matches!(
            err,
            EmsectorError::Topology(TopologyError::InvalidTopology(_))
        ));
    }

    #[test]
    fn v_magnets_on_surface_rotor_are_rejected() {
        let mut m = machine(12, 2, RotorTopology::SurfaceMounted, WindingLayout::SingleLayer);
        m.magnet_topology = MagnetTopology::VRectangular;
        let plan = PeriodicityPlan::new(12, 2).unwrap();
        assert!(RotorPart::new(&m, plan).load(&mut GeoModel::default()).is_err());
    }

    #[test]
    fn missing_shaft_is_reported() {
        let mut m = machine(12, 2, RotorTopology::SurfaceMounted, WindingLayout::SingleLayer);
        m.rotor.shaft = None;
        let plan = PeriodicityPlan::new(12, 2).unwrap();
        let err = RotorPart::new(&m, plan)
            .load(&mut GeoModel::default())
            .unwrap_err();
        assert!(err.to_string().contains("shaft"));
    }

    #[test]
    fn too_many_pole_copies_run_out_of_magnet_groups() {
        // MAGNETS1..12 are the only magnet groups.
        let m = machine(12, 2, RotorTopology::SurfaceMounted, WindingLayout::SingleLayer);
        let mut plan = PeriodicityPlan::new(12, 2).unwrap();
        plan.rotor.copies = 13;
        let part = RotorPart::new(&m, plan);
        let mut registry = PhysicalGroupRegistry::new();
        let err = part.register(&mut registry).unwrap_err();
        assert!(matches!(
            err,
            EmsectorError::Registry(RegistryError::UnknownGroup(_))
        ));
    }
}
