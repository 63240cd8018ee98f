//! Core library for uimscache.
//!
//! Storage, session gate, cache controller and routing for the attendance
//! and timetable dashboard, plus the HTTP fetch collaborator that keeps
//! the cache filled. Front ends drive it through `Dashboard::activate`
//! and `TabNav::select`.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod dashboard;
pub mod fetch;
pub mod models;
pub mod routes;
pub mod storage;
pub mod utils;

pub use dashboard::{Activation, Dashboard, DashboardUpdate, FetchCollaborator, StateSetters};
pub use routes::{History, Navigation, Route, Tab, TabNav};
