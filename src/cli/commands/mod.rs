mod admin;
mod logs;
mod tokens;

pub use admin::cmd_reset_admin_password;
pub use logs::cmd_cleanup_logs;
pub use tokens::cmd_sweep_tokens;
