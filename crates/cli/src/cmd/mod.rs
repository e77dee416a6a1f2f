mod build;
mod deploy;
mod providers;

pub use build::cmd_build;
pub use deploy::cmd_deploy;
pub use providers::cmd_providers;
