//! Board control: the render loop and the state machines it drives.

pub mod controller;
pub mod debounce;
pub mod refresh;
pub mod rotation;
pub mod state;
pub mod ticker;
pub mod worker;
