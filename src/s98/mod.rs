pub mod commands;
pub mod header;
pub mod json;
pub mod reader;
pub mod sync;
pub mod tag;
pub mod writer;

pub use commands::S98Command;
pub use header::{DeviceRecord, S98Header};
pub use json::S98Json;
pub use reader::S98Reader;
pub use writer::S98Writer;
