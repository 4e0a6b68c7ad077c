// Haptic feedback channels: vibration, friction, detent and boundary.
// Each controller owns its own de-duplication state.

pub mod boundary;
pub mod detent;
pub mod friction;
pub mod vibration;

pub use boundary::BoundaryController;
pub use detent::DetentController;
pub use friction::FrictionController;
pub use vibration::{DecayHandle, VibrationController};
