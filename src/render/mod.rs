pub mod action;
pub mod observation;

pub use action::render_action;
pub use observation::{render_observation, ObservationOptions};
