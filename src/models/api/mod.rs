pub mod params;

pub use params::{CreateProjectRequest, ExportParams};
