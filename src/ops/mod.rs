pub mod brush;
pub mod classify;
pub mod composite;
pub mod extract;
pub mod ramp;
pub mod region_fill;
