mod certificates;
mod config_management;
mod maintenance;
mod users;

pub use certificates::{revoke_certificate, verify_certificate};
pub use config_management::config_generate;
pub use maintenance::reconcile;
pub use users::{create_admin, set_role};
