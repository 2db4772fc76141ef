use std::f64::consts::{PI, TAU};

use crate::error::{Result, TopologyError};
use crate::math::gcd;

/// How one part's drawn sector is repeated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Replication {
    /// Number of rotational copies, including the drawn one.
    pub copies: usize,
    /// Rotation between consecutive copies, in radians.
    pub pitch: f64,
}

/// Sector reduction of a machine, shared by stator and rotor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodicityPlan {
    /// `gcd(slots, 2 · pole_pairs)`.
    pub symmetry_factor: u32,
    /// One copy per slot pitch.
    pub stator: Replication,
    /// One copy per pole pitch.
    pub rotor: Replication,
    /// Rotation that maps the master periodic boundary onto the slave.
    pub periodic_angle: f64,
}

impl PeriodicityPlan {
    /// Plans the replication of a machine with `slots` slots and `pole_pairs`
    /// pole pairs.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::InvalidTopology`] if either count is not positive.
    pub fn new(slots: i32, pole_pairs: i32) -> Result<Self> {
        let (Ok(ns), Ok(pp)) = (u32::try_from(slots), u32::try_from(pole_pairs)) else {
            return Err(Self::invalid(slots, pole_pairs));
        };
        if ns == 0 || pp == 0 {
            return Err(Self::invalid(slots, pole_pairs));
        }
        let poles = pp
            .checked_mul(2)
            .ok_or_else(|| Self::invalid(slots, pole_pairs))?;
        let factor = gcd(ns, poles);

        Ok(Self {
            symmetry_factor: factor,
            stator: Replication {
                copies: (ns / factor) as usize,
                pitch: TAU / f64::from(ns),
            },
            rotor: Replication {
                copies: (poles / factor) as usize,
                pitch: PI / f64::from(pp),
            },
            periodic_angle: TAU / f64::from(factor),
        })
    }

    fn invalid(slots: i32, pole_pairs: i32) -> crate::error::EmsectorError {
        TopologyError::InvalidTopology(format!(
            "slot and pole-pair counts must be positive, got {slots} slots and {pole_pairs} pole pairs"
        ))
        .into()
    }

    /// Number of identical machine sectors the drawn model stands for.
    #[must_use]
    pub fn fractions_drawn(&self) -> u32 {
        self.symmetry_factor
    }
}
