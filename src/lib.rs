//! Star Ace: a frame-driven arcade shooter.
//!
//! The simulation lives in [`session`] and [`compute`]; [`display`] turns a
//! read-only [`session::SessionView`] into a character raster.

pub mod caption;
pub mod compute;
pub mod display;
pub mod entities;
pub mod high_score;
pub mod session;
pub mod timer;
pub mod tuning;
