mod encoding;
mod reader;
mod writer;

pub use reader::{deserialize_base64_openlr, deserialize_binary_openlr};
pub use writer::{serialize_base64_openlr, serialize_binary_openlr};
