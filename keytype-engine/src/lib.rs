pub mod controller;
pub mod directory;
pub mod engine;
pub mod error;
pub mod session;
pub mod synth;
pub mod tracker;
pub mod traits;
