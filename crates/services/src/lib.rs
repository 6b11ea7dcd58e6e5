#![forbid(unsafe_code)]

pub mod app_services;
pub mod catalog_service;
pub mod error;
pub mod leaderboard;
pub mod sessions;

pub use quiz_core::Clock;

pub use app_services::AppServices;
pub use catalog_service::{CatalogService, EmptyResultError, sample, sample_with};
pub use error::{AppServicesError, CatalogError, QuizError};
pub use leaderboard::{LeaderboardEntry, LeaderboardService};
pub use sessions::{QuizEngine, SessionView, StartRequest};
