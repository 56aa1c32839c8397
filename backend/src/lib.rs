//! # Trainer Backend
//!
//! Backend for a fitness-training management application. Trainers manage
//! trainees, clubs, exercises, weight logs and recurring training schedules.
//!
//! ## Architecture
//!
//! - [`scheduler`]: weekly recurrence expansion into dated sessions
//! - [`services`]: training-schedule assembly and user credentials
//! - [`db`]: document repository trait, in-memory and Postgres backends
//! - [`auth`]: Google OAuth code exchange and password hashing
//! - [`config`]: server settings from the environment
//! - [`http`]: axum REST API (feature `http-server`)

// RepositoryError carries rich context for debugging
#![allow(clippy::result_large_err)]

pub mod auth;
pub mod config;
pub mod db;
pub mod models;
pub mod scheduler;
pub mod services;

#[cfg(feature = "http-server")]
pub mod http;
