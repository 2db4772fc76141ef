//! Per-part build state machine.
//!
//! A part (stator or rotor) is built in its own [`Session`]:
//! `Idle → PrimitivesLoaded → SectorsReplicated → BoundariesBuilt →
//! PhasesTagged → TaggedAndSynchronized → Meshed → Exported`.
//! Any failing step leaves the build in [`BuildState::Failed`], which is terminal.

mod rotor;
mod stator;

use std::path::{Path, PathBuf};

use tracing::{error, info};

pub use rotor::RotorPart;
pub use stator::StatorPart;

use crate::error::{AssemblyError, Result};
use crate::kernel::{Dim, Kernel, Session};
use crate::operations::PhysicalGroupRegistry;
use crate::primitives::RegionGeometry;

/// A step of a part build, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BuildStep {
    Idle,
    PrimitivesLoaded,
    SectorsReplicated,
    BoundariesBuilt,
    PhasesTagged,
    TaggedAndSynchronized,
    Meshed,
    Exported,
}

/// Where a part build stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildState {
    Reached(BuildStep),
    /// `at` is the last step reached; `cause` the error that stopped the build.
    Failed { at: BuildStep, cause: String },
}

impl BuildState {
    /// The last step reached, failed or not.
    #[must_use]
    pub fn step(&self) -> BuildStep {
        match self {
            Self::Reached(step) | Self::Failed { at: step, .. } => *step,
        }
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// One part of the machine cross-section.
///
/// The assembly calls each method once, in declaration order.
pub trait Part {
    /// Model name; also the stem of the exported mesh file.
    fn name(&self) -> &'static str;

    /// Realizes the drawn regions.
    ///
    /// # Errors
    ///
    /// Returns an error if a required region is missing or cannot be realized.
    fn load<K: Kernel>(&mut self, kernel: &mut K) -> Result<()>;

    /// Mirrors and rotationally copies every realized region.
    ///
    /// # Errors
    ///
    /// Returns a kernel error.
    fn replicate<K: Kernel>(&mut self, kernel: &mut K) -> Result<()>;

    /// Builds the boundary curve sets.
    ///
    /// # Errors
    ///
    /// Returns an error if a chain is missing or a periodic pair does not match.
    fn build_boundaries<K: Kernel>(&mut self, kernel: &mut K) -> Result<()>;

    /// Assigns conductors to phases.
    ///
    /// # Errors
    ///
    /// Returns an error if the winding does not fit the replicated conductors.
    fn tag_phases(&mut self) -> Result<()>;

    /// Registers every physical group of the part.
    ///
    /// # Errors
    ///
    /// Returns a registry error.
    fn register(&self, registry: &mut PhysicalGroupRegistry) -> Result<()>;
}

/// Drives one part build through its states on its own kernel session.
pub struct Assembly<K: Kernel, P: Part> {
    session: Session<K>,
    part: P,
    registry: PhysicalGroupRegistry,
    state: BuildState,
}

impl<K: Kernel, P: Part> Assembly<K, P> {
    /// Opens a session for `part` on `kernel`.
    pub fn new(kernel: K, part: P) -> Self {
        let session = Session::open(kernel, part.name());
        Self {
            session,
            part,
            registry: PhysicalGroupRegistry::new(),
            state: BuildState::Reached(BuildStep::Idle),
        }
    }

    #[must_use]
    pub fn state(&self) -> &BuildState {
        &self.state
    }

    #[must_use]
    pub fn part(&self) -> &P {
        &self.part
    }

    #[must_use]
    pub fn registry(&self) -> &PhysicalGroupRegistry {
        &self.registry
    }

    #[must_use]
    pub fn kernel(&self) -> &K {
        self.session.kernel()
    }

    /// Ends the session, returning the kernel with the built model.
    pub fn close(self) -> K {
        self.session.close()
    }

    /// Builds the tagged, synchronized geometry.
    ///
    /// # Errors
    ///
    /// Returns [`AssemblyError::OutOfOrder`] unless the build is idle, or the
    /// error of the failing step.
    pub fn create(&mut self) -> Result<()> {
        self.expect(BuildStep::Idle)?;
        self.advance(BuildStep::PrimitivesLoaded, |part, kernel, _| part.load(kernel))?;
        self.advance(BuildStep::SectorsReplicated, |part, kernel, _| {
            part.replicate(kernel)
        })?;
        self.advance(BuildStep::BoundariesBuilt, |part, kernel, _| {
            part.build_boundaries(kernel)
        })?;
        self.advance(BuildStep::PhasesTagged, |part, _, _| part.tag_phases())?;
        self.advance(BuildStep::TaggedAndSynchronized, |part, kernel, registry| {
            part.register(registry)?;
            registry.apply(kernel)?;
            kernel.synchronize()
        })
    }

    /// Meshes the created geometry and writes `<dir>/<part>.msh`.
    ///
    /// # Errors
    ///
    /// Returns [`AssemblyError::OutOfOrder`] unless the geometry was created,
    /// or the meshing or export error.
    pub fn mesh(&mut self, dir: &Path) -> Result<PathBuf> {
        self.expect(BuildStep::TaggedAndSynchronized)?;
        self.advance(BuildStep::Meshed, |_, kernel, _| {
            kernel.generate_mesh(Dim::Surface)
        })?;
        let path = dir.join(format!("{}.msh", self.part.name()));
        self.advance(BuildStep::Exported, |_, kernel, _| kernel.write_mesh(&path))?;
        Ok(path)
    }

    fn expect(&self, expected: BuildStep) -> Result<()> {
        if self.state == BuildState::Reached(expected) {
            return Ok(());
        }
        Err(AssemblyError::OutOfOrder {
            part: self.part.name(),
            state: self.state.clone(),
            expected,
        }
        .into())
    }

    fn advance<F>(&mut self, to: BuildStep, step: F) -> Result<()>
    where
        F: FnOnce(&mut P, &mut K, &mut PhysicalGroupRegistry) -> Result<()>,
    {
        let at = self.state.step();
        match step(&mut self.part, self.session.kernel_mut(), &mut self.registry) {
            Ok(()) => {
                info!(part = self.part.name(), from = ?at, to = ?to, "build step");
                self.state = BuildState::Reached(to);
                Ok(())
            }
            Err(e) => {
                error!(part = self.part.name(), at = ?at, error = %e, "build failed");
                self.state = BuildState::Failed {
                    at,
                    cause: e.to_string(),
                };
                Err(e)
            }
        }
    }
}

/// Target element size of a region: its extent over `divisor`, or `fallback`
/// when the region is absent or has no points of its own.
fn region_size(region: Option<&RegionGeometry>, divisor: f64, fallback: f64) -> f64 {
    region.and_then(|r| r.mesh_size(divisor)).unwrap_or(fallback)
}
