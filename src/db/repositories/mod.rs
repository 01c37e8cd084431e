pub mod admin;
pub mod catalog;
pub mod category;
pub mod logs;
pub mod rating;
pub mod user;
