use tracing::debug;

use super::Kernel;

/// Exclusive scope of one model build on a kernel.
///
/// Opening a session discards whatever the kernel held before, so the stator
/// and the rotor can reuse one kernel without leaking entities or groups into
/// each other.
#[derive(Debug)]
pub struct Session<K: Kernel> {
    name: String,
    kernel: K,
}

impl<K: Kernel> Session<K> {
    /// Starts a fresh build named `name` on `kernel`.
    pub fn open(mut kernel: K, name: impl Into<String>) -> Self {
        kernel.reset();
        let name = name.into();
        debug!(session = %name, "session opened");
        Self { name, kernel }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub fn kernel_mut(&mut self) -> &mut K {
        &mut self.kernel
    }

    /// Ends the session and hands the kernel back with the built model intact.
    pub fn close(self) -> K {
        debug!(session = %self.name, "session closed");
        self.kernel
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::kernel::{Dim, GeoModel};
    use crate::math::Point3;

    #[test]
    fn opening_discards_previous_model() {
        let mut model = GeoModel::default();
        model.add_point(Point3::origin(), 0.1, 1).unwrap();

        let mut session = Session::open(model, "rotor");
        assert_eq!(session.kernel().count(Dim::Point), 0);
        session
            .kernel_mut()
            .add_point(Point3::origin(), 0.1, 1)
            .unwrap();
        assert_eq!(session.name(), "rotor");

        let model = session.close();
        assert_eq!(model.count(Dim::Point), 1);
    }
}
