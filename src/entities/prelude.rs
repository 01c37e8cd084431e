pub use super::admins::Entity as Admins;
pub use super::api_logs::Entity as ApiLogs;
pub use super::categories::Entity as Categories;
pub use super::mods::Entity as Mods;
pub use super::ratings::Entity as Ratings;
pub use super::users::Entity as Users;
