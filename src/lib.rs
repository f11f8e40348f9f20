//! LearnHub - a learning-management backend
//!
//! Courses and lessons, enrollments with progress tracking, paid checkout with
//! promo codes and referrals, and PDF certificates that can be verified publicly.
//!
//! # Architecture
//! - `storage`: SeaORM data access and migrations
//! - `services`: business rules (auth, courses, enrollments, payments, certificates, ...)
//! - `api`: HTTP handlers, middleware and SSE streams
//! - `interfaces`: CLI management commands
//! - `config`: Configuration management
//! - `runtime`: Application lifecycle and execution modes
//! - `system`: Event bus, logging, panic handling

pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod interfaces;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
