use tracing::debug;

use crate::error::{BoundaryError, EmsectorError, KernelError, Result, TopologyError};
use crate::kernel::{CurveKind, Handle, Kernel, Tag};
use crate::math::{Point3, Vector3};

use super::planner::{PeriodicityPlan, Replication};
use super::replicate::{Replicate, SectorInstances};

/// Relative tolerance of the master/slave length comparison.
const LENGTH_TOLERANCE: f64 = 1e-9;

/// Resolves a drawn boundary chain, failing if it is empty or names a curve
/// that was never realized.
fn chain_handles<K: Kernel>(kernel: &K, chain: &[Tag], name: &str) -> Result<Vec<Handle>> {
    if chain.is_empty() {
        return Err(TopologyError::MissingPrimitive(format!("{name} has no curves")).into());
    }
    chain
        .iter()
        .map(|&tag| match kernel.curve_kind(tag) {
            Ok(_) => Ok(Handle::curve(tag)),
            Err(EmsectorError::Kernel(KernelError::EntityNotFound { .. })) => Err(
                TopologyError::MissingPrimitive(format!("{name} names curve {tag}, which was never drawn"))
                    .into(),
            ),
            Err(e) => Err(e),
        })
        .collect()
}

/// Replicates an open boundary chain over the part like its surfaces.
///
/// Used for the outer stator rim and the air-gap arc: the chain is mirrored,
/// then the chain and its mirror are rotated copy by copy.
pub struct OuterBoundary<'a> {
    name: &'a str,
    chain: &'a [Tag],
    replication: Replication,
}

impl<'a> OuterBoundary<'a> {
    #[must_use]
    pub fn new(name: &'a str, chain: &'a [Tag], replication: Replication) -> Self {
        Self {
            name,
            chain,
            replication,
        }
    }

    /// Builds the boundary curves.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::MissingPrimitive`] for an empty or unknown chain,
    /// or a kernel error.
    pub fn execute<K: Kernel>(&self, kernel: &mut K) -> Result<SectorInstances> {
        let seed = chain_handles(kernel, self.chain, self.name)?;
        let instances = Replicate::new(seed, true, self.replication).execute(kernel)?;
        debug!(boundary = self.name, curves = instances.len(), "boundary built");
        Ok(instances)
    }
}

/// The rotor/stator interface arc.
///
/// Replicated exactly like [`OuterBoundary`], bound to the part's own
/// [`Replication`] so the sliding arcs of rotor and stator cover the same span.
pub struct SlidingBoundary<'a> {
    inner: OuterBoundary<'a>,
}

impl<'a> SlidingBoundary<'a> {
    #[must_use]
    pub fn new(name: &'a str, chain: &'a [Tag], replication: Replication) -> Self {
        Self {
            inner: OuterBoundary::new(name, chain, replication),
        }
    }

    /// Builds the sliding interface curves.
    ///
    /// # Errors
    ///
    /// Same as [`OuterBoundary::execute`].
    pub fn execute<K: Kernel>(&self, kernel: &mut K) -> Result<SectorInstances> {
        self.inner.execute(kernel)
    }
}

/// A periodic master/slave boundary pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodicBoundary {
    pub master: Vec<Handle>,
    pub slave: Vec<Handle>,
}

/// Builds the slave of a periodic pair as an independent copy of the master
/// chain rotated by the periodic angle.
pub struct PeriodicPair<'a> {
    name: &'a str,
    chain: &'a [Tag],
    angle: f64,
}

impl<'a> PeriodicPair<'a> {
    #[must_use]
    pub fn new(name: &'a str, chain: &'a [Tag], plan: &PeriodicityPlan) -> Self {
        Self {
            name,
            chain,
            angle: plan.periodic_angle,
        }
    }

    /// Builds and checks the pair.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::MissingPrimitive`] for an empty or unknown chain
    /// and [`BoundaryError::PeriodicMismatch`] if master and slave differ in
    /// count, kind or length.
    pub fn execute<K: Kernel>(&self, kernel: &mut K) -> Result<PeriodicBoundary> {
        let master = chain_handles(kernel, self.chain, self.name)?;
        let slave = kernel.copy(&master)?;
        kernel.rotate(&slave, Point3::origin(), Vector3::z(), self.angle)?;
        let pair = PeriodicBoundary { master, slave };
        self.check(kernel, &pair)?;
        debug!(
            boundary = self.name,
            curves = pair.master.len(),
            angle = self.angle.to_degrees(),
            "periodic pair built"
        );
        Ok(pair)
    }

    fn check<K: Kernel>(&self, kernel: &K, pair: &PeriodicBoundary) -> Result<()> {
        if pair.master.len() != pair.slave.len() {
            return Err(BoundaryError::PeriodicMismatch(format!(
                "{}: {} master curves, {} slave curves",
                self.name,
                pair.master.len(),
                pair.slave.len()
            ))
            .into());
        }
        for (i, (m, s)) in pair.master.iter().zip(&pair.slave).enumerate() {
            let (mk, sk): (CurveKind, CurveKind) = (kernel.curve_kind(m.tag)?, kernel.curve_kind(s.tag)?);
            let (ml, sl) = (kernel.curve_length(m.tag)?, kernel.curve_length(s.tag)?);
            if mk != sk || (ml - sl).abs() > LENGTH_TOLERANCE * ml.max(sl).max(1.0) {
                return Err(BoundaryError::PeriodicMismatch(format!(
                    "{}: curve {i} is a {mk:?} of length {ml} on the master, a {sk:?} of length {sl} on the slave",
                    self.name
                ))
                .into());
            }
        }
        Ok(())
    }
}
