pub mod projects;
pub mod reports;

pub use projects::{
    cancel_project, create_project, delete_project, list_projects, project_status, push_snapshot,
};
pub use reports::{export_report, project_results};
