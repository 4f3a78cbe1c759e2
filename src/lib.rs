//! # Tutor Bot
//!
//! A Telegram bot that connects students with their tutors.
//!
//! ## Features
//! - Student registration dialogue ending in a request to the chosen tutor
//! - Request approval, lessons, weekly templates, free slots and vacations
//! - Homework assignment and submission with text or media
//! - Lesson and homework reminders
//! - Role-based menus for students, tutors and superadmins
//! - Persistent storage with SQLite

/// Bot command handlers, dialogue state and keyboards
pub mod bot;
/// Configuration management and environment variables
pub mod config;
/// Database models, connections, and migrations
pub mod database;
/// Registration, roles, notifications, reminders and health checks
pub mod services;
/// Utility functions for datetime, validation, feedback and logging
pub mod utils;
