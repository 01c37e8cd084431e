pub mod prelude;

pub mod admins;
pub mod api_logs;
pub mod categories;
pub mod mods;
pub mod ratings;
pub mod users;
