pub mod progress;
pub mod spinner;
