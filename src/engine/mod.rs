//! Render engine
//!
//! Offline rendering core:
//! - Stereo sample buffers
//! - Render clock and per-window offline contexts
//! - Timeline slicing and the chunked renderer
//! - Cooperative cancellation

pub mod buffer;
pub mod cancel;
pub mod context;
pub mod renderer;
pub mod slice;

pub use buffer::{linear_to_db, StereoBuffer, STEREO_CHANNELS};
pub use cancel::CancellationToken;
pub use context::{OfflineContext, RenderClock};
pub use renderer::ChunkedRenderer;
pub use slice::{plan_slices, plan_span, Slice};
