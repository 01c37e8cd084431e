pub mod password;
pub mod rate_limiter;
pub use rate_limiter::{Clock, ManualClock, RateDecision, RateLimiter, SystemClock};

pub mod token_store;
pub use token_store::{AdminIdentity, Principal, PrincipalKind, TokenStore, UserIdentity};

pub mod scheduler;
pub use scheduler::Scheduler;

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AdminSession, AuthError, AuthService, UserSession};
pub use auth_service_impl::SeaOrmAuthService;

pub mod catalog_service;
pub mod catalog_service_impl;
pub use catalog_service::{CatalogError, CatalogService, CategoryFields};
pub use catalog_service_impl::SeaOrmCatalogService;

pub mod rating_service;
pub mod rating_service_impl;
pub use rating_service::{RatedStatus, RatingError, RatingOutcome, RatingService};
pub use rating_service_impl::SeaOrmRatingService;

pub mod log_service;
pub mod log_service_impl;
pub use log_service::{CleanupReport, ExportFormat, ExportStream, LogError, LogService};
pub use log_service_impl::SeaOrmLogService;
