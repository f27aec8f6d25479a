//! Effect trait definition
//!
//! Base trait for every graph stage that processes a window in place.

use crate::engine::{RenderClock, StereoBuffer};
use crate::model::EffectKind;

/// A processing stage owned by exactly one graph
///
/// Stages process a whole window in place. `clock` maps local frame indices
/// to the timeline so periodic modulation can follow timeline phase.
pub trait Effect: Send + Sync {
    /// Process a window in-place
    fn process(&mut self, buffer: &mut StereoBuffer, clock: &RenderClock);

    /// Size internal state for the sample rate
    ///
    /// Called once by the builder before the graph renders.
    fn prepare(&mut self, sample_rate: u32);

    /// Clear delay lines, filter history and accumulators
    fn reset(&mut self);

    /// Catalog entry this stage implements; `None` for fixed stages
    fn kind(&self) -> Option<EffectKind>;

    /// Human-readable display name
    fn display_name(&self) -> &str;
}

/// Helper macro to implement the identity methods of the Effect trait
#[macro_export]
macro_rules! impl_effect_common {
    ($kind:expr, $display_name:expr) => {
        fn kind(&self) -> Option<$crate::model::EffectKind> {
            $kind
        }

        fn display_name(&self) -> &str {
            $display_name
        }
    };
}
