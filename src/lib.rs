//! inkplay: content rotation for e-paper picture frames
//!
//! This library provides:
//! - The config store holding playlists and refresh state
//! - Playlist selection and the background refresh scheduler
//! - A line-oriented control channel for a running scheduler

pub mod config;
pub mod control;
pub mod core;

// Re-export commonly used types
pub use config::{AppConfig, ConfigStore, StoreError};
pub use core::{RefreshScheduler, RefreshTarget, SchedulerHandle, SchedulerState};
