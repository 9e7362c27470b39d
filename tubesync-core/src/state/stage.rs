//! Manual override for a pipeline stage

/// Source of a stage's output
///
/// `Computed` runs the stage normally. `Overridden` skips the computation
/// and publishes the held value instead, every frame, until cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Stage<T> {
    Computed,
    Overridden(T),
}

impl<T> Default for Stage<T> {
    fn default() -> Self {
        Stage::Computed
    }
}

impl<T> Stage<T> {
    /// Held value, if overridden
    pub fn overridden(&self) -> Option<&T> {
        match self {
            Stage::Computed => None,
            Stage::Overridden(value) => Some(value),
        }
    }

    /// Whether the stage is overridden
    pub fn is_overridden(&self) -> bool {
        matches!(self, Stage::Overridden(_))
    }

    /// Return to normal computation
    pub fn clear(&mut self) {
        *self = Stage::Computed;
    }
}

impl<T> From<Option<T>> for Stage<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Stage::Overridden(value),
            None => Stage::Computed,
        }
    }
}
