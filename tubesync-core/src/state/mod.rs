//! Render buffers and their overrides
//!
//! Every buffer the pipeline produces or consumes lives in one
//! [`RenderState`], owned by the pipeline of the controller.

pub mod render_state;
pub mod stage;

pub use render_state::RenderState;
pub use stage::Stage;
