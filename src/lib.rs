//! BRIKS - a falling-block puzzle engine
//!
//! The engine is a synchronous state machine over a 10x24 board. Drivers
//! feed it actions and timer ticks and read state back for rendering; the
//! `briks` binary is one such driver for the terminal.

pub mod bag;
pub mod board;
pub mod clock;
pub mod engine;
pub mod input;
pub mod piece;
pub mod score;
pub mod settings;
pub mod srs;
pub mod tetromino;
pub mod timer;
