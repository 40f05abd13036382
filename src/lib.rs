//! A minimal game engine scaffold
//!
//! Window creation, a type-keyed event dispatch loop, keyboard state, a frame
//! clock and a thin Metal renderer wrapper. The sample in [`app`] moves a
//! square with WASD and exits on Q.
//!
//! # Example
//! ```no_run
//! use square_engine::app::App;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     App::run()?;
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod core;
pub mod events;
pub mod input;
pub mod math;
pub mod renderer;
pub mod window;
