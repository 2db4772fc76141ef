//! Stage runner of one machine analysis.
//!
//! `create` builds and tags the stator and the rotor, each on its own kernel
//! session; `mesh` meshes them and writes `stator.msh` and `rotor.msh` into
//! the working directory; `solve` and `post-process` hand those files to a
//! [`FieldSolver`].

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::assembly::{Assembly, BuildState, Part, RotorPart, StatorPart};
use crate::error::Result;
use crate::kernel::GeoModel;
use crate::machine::MachineModel;
use crate::mesh::MeshOptions;
use crate::operations::PeriodicityPlan;

/// Stages to run. Each one is a yes/no switch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stages {
    pub create: bool,
    pub mesh: bool,
    pub solve: bool,
    pub post_process: bool,
}

impl Stages {
    #[must_use]
    pub fn all() -> Self {
        Self {
            create: true,
            mesh: true,
            solve: true,
            post_process: true,
        }
    }
}

/// Downstream field solver working on the exported mesh files.
pub trait FieldSolver {
    /// Solves the field problem on the given meshes.
    ///
    /// # Errors
    ///
    /// Implementations report failures as [`EmsectorError::Solver`](crate::EmsectorError::Solver).
    fn solve(&mut self, dir: &Path, meshes: &[PathBuf]) -> Result<()>;

    /// Derives results from a finished solution.
    ///
    /// # Errors
    ///
    /// Implementations report failures as [`EmsectorError::Solver`](crate::EmsectorError::Solver).
    fn post_process(&mut self, dir: &Path) -> Result<()>;
}

/// Outcome of one part build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartReport {
    pub state: BuildState,
    /// Number of registered physical groups.
    pub groups: usize,
    /// Exported mesh file, if the mesh stage ran.
    pub mesh: Option<PathBuf>,
}

/// What an analysis run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisReport {
    /// Identical machine sectors the drawn model stands for.
    pub fractions_drawn: u32,
    pub stator: Option<PartReport>,
    pub rotor: Option<PartReport>,
    pub solved: bool,
    pub post_processed: bool,
}

/// Runs the stages of one machine in a working directory.
pub struct Analysis<'a, M: MachineModel + ?Sized> {
    machine: &'a M,
    dir: PathBuf,
    options: MeshOptions,
    solver: Option<&'a mut dyn FieldSolver>,
}

impl<'a, M: MachineModel + ?Sized> Analysis<'a, M> {
    pub fn new(machine: &'a M, dir: impl Into<PathBuf>) -> Self {
        Self {
            machine,
            dir: dir.into(),
            options: MeshOptions::default(),
            solver: None,
        }
    }

    #[must_use]
    pub fn with_mesh_options(mut self, options: MeshOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_solver(mut self, solver: &'a mut dyn FieldSolver) -> Self {
        self.solver = Some(solver);
        self
    }

    /// Mesh files the solve stage reads.
    #[must_use]
    pub fn mesh_files(&self) -> [PathBuf; 2] {
        [self.dir.join("stator.msh"), self.dir.join("rotor.msh")]
    }

    /// Runs the requested stages in order, stopping at the first failure.
    ///
    /// Meshing needs the geometry of the same run; solving and
    /// post-processing need a solver. Stages whose prerequisite is missing
    /// are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing stage.
    pub fn run(&mut self, stages: Stages) -> Result<AnalysisReport> {
        let plan = PeriodicityPlan::new(self.machine.slots(), self.machine.pole_pairs())?;
        info!(
            symmetry = plan.symmetry_factor,
            stator_copies = plan.stator.copies,
            rotor_copies = plan.rotor.copies,
            "periodicity planned"
        );
        let mut report = AnalysisReport {
            fractions_drawn: plan.fractions_drawn(),
            ..AnalysisReport::default()
        };

        if stages.create {
            report.stator = Some(self.build(StatorPart::new(self.machine, plan), stages.mesh)?);
            report.rotor = Some(self.build(RotorPart::new(self.machine, plan), stages.mesh)?);
        } else if stages.mesh {
            warn!("mesh stage needs the create stage; skipped");
        }

        let meshes = self.mesh_files();
        if stages.solve {
            if let Some(solver) = self.solver.as_deref_mut() {
                solver.solve(&self.dir, &meshes)?;
                report.solved = true;
                info!(dir = %self.dir.display(), "solved");
            } else {
                warn!("no field solver configured; solve stage skipped");
            }
        }
        if stages.post_process {
            if let Some(solver) = self.solver.as_deref_mut() {
                solver.post_process(&self.dir)?;
                report.post_processed = true;
                info!(dir = %self.dir.display(), "post-processed");
            } else {
                warn!("no field solver configured; post-process stage skipped");
            }
        }
        Ok(report)
    }

    fn build<P: Part>(&self, part: P, mesh: bool) -> Result<PartReport> {
        let mut assembly = Assembly::new(GeoModel::new(part.name(), self.options), part);
        assembly.create()?;
        let mesh = if mesh {
            Some(assembly.mesh(&self.dir)?)
        } else {
            None
        };
        Ok(PartReport {
            state: assembly.state().clone(),
            groups: assembly.registry().len(),
            mesh,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::assembly::BuildStep;
    use crate::error::EmsectorError;
    use crate::machine::{RotorTopology, WindingLayout};
    use crate::testing::{machine, scratch_dir};

    #[derive(Default)]
    struct Recorder {
        solved: Vec<PathBuf>,
        post_processed: bool,
        fail: bool,
    }

    impl FieldSolver for Recorder {
        fn solve(&mut self, _dir: &Path, meshes: &[PathBuf]) -> Result<()> {
            if self.fail {
                return Err(EmsectorError::Solver("diverged".into()));
            }
            self.solved.extend_from_slice(meshes);
            Ok(())
        }

        fn post_process(&mut self, _dir: &Path) -> Result<()> {
            self.post_processed = true;
            Ok(())
        }
    }

    #[test]
    fn all_stages_export_and_hand_over_meshes() {
        let m = machine(12, 2, RotorTopology::SurfaceMounted, WindingLayout::SingleLayer);
        let scratch = scratch_dir("analysis_all_stages");
        let dir = scratch.path();
        let mut solver = Recorder::default();
        let report = Analysis::new(&m, dir)
            .with_solver(&mut solver)
            .run(Stages::all())
            .unwrap();

        assert_eq!(report.fractions_drawn, 4);
        let stator = report.stator.unwrap();
        assert_eq!(stator.state, BuildState::Reached(BuildStep::Exported));
        assert_eq!(stator.mesh, Some(dir.join("stator.msh")));
        assert!(report.rotor.unwrap().mesh.unwrap().is_file());
        assert!(report.solved && report.post_processed);
        assert_eq!(solver.solved, vec![dir.join("stator.msh"), dir.join("rotor.msh")]);
        assert!(solver.post_processed);
    }

    #[test]
    fn create_only_writes_nothing() {
        let m = machine(12, 2, RotorTopology::InteriorRadial, WindingLayout::SingleLayer);
        let scratch = scratch_dir("analysis_create_only");
        let dir = scratch.path();
        let stages = Stages {
            create: true,
            ..Stages::default()
        };
        let report = Analysis::new(&m, dir).run(stages).unwrap();
        let stator = report.stator.unwrap();
        assert_eq!(stator.state, BuildState::Reached(BuildStep::TaggedAndSynchronized));
        assert!(stator.groups > 0);
        assert!(stator.mesh.is_none());
        assert!(!dir.join("stator.msh").exists());
    }

    #[test]
    fn mesh_without_create_is_skipped() {
        let m = machine(12, 2, RotorTopology::SurfaceMounted, WindingLayout::SingleLayer);
        let scratch = scratch_dir("analysis_mesh_only");
        let dir = scratch.path();
        let stages = Stages {
            mesh: true,
            ..Stages::default()
        };
        let report = Analysis::new(&m, dir).run(stages).unwrap();
        assert!(report.stator.is_none() && report.rotor.is_none());
        assert!(!dir.join("rotor.msh").exists());
    }

    #[test]
    fn solve_without_solver_is_skipped() {
        let m = machine(12, 2, RotorTopology::SurfaceMounted, WindingLayout::SingleLayer);
        let stages = Stages {
            solve: true,
            post_process: true,
            ..Stages::default()
        };
        let report = Analysis::new(&m, scratch_dir("analysis_no_solver").path())
            .run(stages)
            .unwrap();
        assert!(!report.solved);
        assert!(!report.post_processed);
    }

    #[test]
    fn solver_failure_stops_the_run() {
        let m = machine(12, 2, RotorTopology::SurfaceMounted, WindingLayout::SingleLayer);
        let mut solver = Recorder {
            fail: true,
            ..Recorder::default()
        };
        let err = Analysis::new(&m, scratch_dir("analysis_solver_failure").path())
            .with_solver(&mut solver)
            .run(Stages {
                solve: true,
                post_process: true,
                ..Stages::default()
            })
            .unwrap_err();
        assert!(matches!(err, EmsectorError::Solver(_)));
        assert!(!solver.post_processed);
    }

    #[test]
    fn invalid_counts_fail_before_any_stage() {
        let mut m = machine(12, 2, RotorTopology::SurfaceMounted, WindingLayout::SingleLayer);
        m.pole_pairs = 0;
        let err = Analysis::new(&m, scratch_dir("analysis_invalid_counts").path())
            .run(Stages::all())
            .unwrap_err();
        assert!(matches!(err, EmsectorError::Topology(_)));
    }
}
