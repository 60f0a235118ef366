//! Common types shared across the sky-map workspace.

pub mod coords;
pub mod window;

pub use coords::{CoordinateError, Coordinates};
pub use window::{normalize_lon, LonLatWindow, WindowError};
