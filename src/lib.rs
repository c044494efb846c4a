pub mod chips;
pub mod compiler;
pub mod error;
pub mod s98;
pub mod sequencer;
pub mod song;

pub use compiler::Compiler;
pub use error::Error;
