//! Exclusive, single-satellite access to an [`AstroLibrary`].

use log::debug;

use super::{AstroLibrary, SatHandle};
use crate::element_record::ElementRecord;
use crate::fit_errors::FitError;

/// Owner of an astrodynamics library that keeps at most one satellite loaded.
///
/// Every call to [`PropagatorSlot::with_loaded`] clears the library, loads the record,
/// initializes propagation, runs the closure and clears again, whether or not one of the
/// steps failed. Because the slot hands out the library only through `&mut self`, two
/// evaluations can never interleave on the same instance.
#[derive(Debug)]
pub struct PropagatorSlot<L> {
    library: L,
}

impl<L: AstroLibrary> PropagatorSlot<L> {
    pub fn new(library: L) -> Self {
        PropagatorSlot { library }
    }

    /// Stateless services of the library (conversions, sensor geometry, text).
    pub fn library(&self) -> &L {
        &self.library
    }

    pub fn into_library(self) -> L {
        self.library
    }

    /// Load `record`, run `f` with the initialized handle, then unload.
    ///
    /// Arguments
    /// ---------
    /// * `record`: the element set to load
    /// * `f`: work to do while the satellite is loaded
    ///
    /// Return
    /// ------
    /// * the closure output, or the load / initialization error
    pub fn with_loaded<T>(
        &mut self,
        record: &ElementRecord,
        f: impl FnOnce(&L, SatHandle) -> T,
    ) -> Result<T, FitError> {
        self.library.clear_all();
        let handle = match self.load_and_init(record) {
            Ok(handle) => handle,
            Err(e) => {
                debug!("element set {} rejected: {e}", record.sat_num);
                self.library.clear_all();
                return Err(e);
            }
        };
        let out = f(&self.library, handle);
        self.library.clear_all();
        Ok(out)
    }

    fn load_and_init(&mut self, record: &ElementRecord) -> Result<SatHandle, FitError> {
        let handle = self.library.load(record)?;
        self.library.init_propagation(handle)?;
        Ok(handle)
    }
}
