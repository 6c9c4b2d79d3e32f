pub mod clock;
pub mod licenses;
mod registry;

pub use clock::GetTimeTool;
pub use licenses::{CheckLicensesTool, ToolError};
pub use registry::{json_schema_object, json_schema_string, Tool, ToolRegistry};
