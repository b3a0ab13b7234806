use crate::View;

/// The execution-context seam operators are submitted through.
///
/// One encoder per execution stream. Work units run synchronously here; the
/// outer scheduler owns ordering and must uphold the single-writer contract:
/// a unit's registered inputs are not written, and its registered outputs not
/// read, by any concurrently scheduled unit.
#[derive(Debug, Default)]
pub struct Encoder {
    temporaries: Vec<View>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_input(&mut self, view: &View) {
        log::trace!(
            "input  {:?} {:?} strides {:?} offset {}",
            view.dt(),
            view.shape(),
            view.strides(),
            view.offset()
        );
    }

    pub fn register_output(&mut self, view: &View) {
        log::trace!(
            "output {:?} {:?} strides {:?} offset {}",
            view.dt(),
            view.shape(),
            view.strides(),
            view.offset()
        );
    }

    /// Submits one work unit. The unit either completes with fully populated
    /// outputs or must not be considered done; there is no mid-unit
    /// cancellation.
    pub fn dispatch<F: FnOnce()>(&mut self, work: F) {
        work()
    }

    /// Parks a view until the next barrier. Used for results that consuming
    /// work reads after the submitting call frame has returned, e.g. an
    /// undonated dynamic-offset scalar.
    pub fn add_temporary(&mut self, view: View) {
        self.temporaries.push(view);
    }

    pub fn num_temporaries(&self) -> usize {
        self.temporaries.len()
    }

    /// The drain point. All queued consumers have run once the caller reaches
    /// this; parked views are released here and not before.
    pub fn clear_temporaries(&mut self) {
        log::debug!("releasing {} deferred temporaries", self.temporaries.len());
        self.temporaries.clear();
    }
}
