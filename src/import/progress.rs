//! Import progress shared with observers.

use std::sync::Arc;

use parking_lot::RwLock;

/// Rows committed out of rows to import.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct ImportProgress {
    pub total_units: u64,
    pub completed_units: u64,
}

impl ImportProgress {
    pub const fn new(total_units: u64) -> Self {
        Self { total_units, completed_units: 0 }
    }

    /// Fraction in `0.0..=1.0`; 0 when there is nothing to import.
    pub fn fraction_completed(&self) -> f64 {
        if self.total_units == 0 {
            0.0
        } else {
            self.completed_units as f64 / self.total_units as f64
        }
    }

    /// All units committed. Never true for an empty import.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.total_units > 0 && self.completed_units == self.total_units
    }
}

/// Shared, lock-protected [`ImportProgress`].
///
/// The pipeline writes, any number of observers read; each read sees a
/// whole value. Completed units only grow and never pass the total.
#[derive(Clone, Debug, Default)]
pub struct ProgressCell(Arc<RwLock<ImportProgress>>);

impl ProgressCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value.
    #[inline]
    pub fn get(&self) -> ImportProgress {
        *self.0.read()
    }

    /// Set the total and reset completion.
    pub fn start(&self, total_units: u64) -> ImportProgress {
        let mut p = self.0.write();
        *p = ImportProgress::new(total_units);
        *p
    }

    /// Add committed units, saturating at the total.
    pub fn advance(&self, units: u64) -> ImportProgress {
        let mut p = self.0.write();
        p.completed_units = p.completed_units.saturating_add(units).min(p.total_units);
        *p
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_progress() {
        let p = ImportProgress::new(0);
        assert_eq!(p.fraction_completed(), 0.0);
        assert!(!p.is_finished());
    }

    #[test]
    fn test_cell_is_monotone_and_clamped() {
        let cell = ProgressCell::new();
        cell.start(10);
        let mut last = 0.0;
        for _ in 0..4 {
            let p = cell.advance(3);
            assert!(p.fraction_completed() >= last);
            last = p.fraction_completed();
        }
        let p = cell.get();
        assert_eq!(p.completed_units, 10);
        assert!(p.is_finished());
        assert_eq!(p.fraction_completed(), 1.0);
    }

    #[test]
    fn test_cell_shared_between_clones() {
        let cell = ProgressCell::new();
        let observer = cell.clone();
        cell.start(4);
        cell.advance(1);
        assert_eq!(observer.get().completed_units, 1);
    }
}
