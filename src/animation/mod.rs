/// Offset state machine, gestures and the time-to-progress mapping.
pub mod controller;
/// Animation function.
pub mod kind;
