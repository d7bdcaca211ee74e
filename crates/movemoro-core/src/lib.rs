//! # Movemoro Core Library
//!
//! Core logic for Movemoro, a work/break timer that gates every break
//! behind a short physical exercise and lets a break be lengthened by
//! doing another one. The `movemoro` CLI is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Timer**: a drift-corrected countdown. It derives remaining time from
//!   a wall-clock anchor and is driven by the caller's periodic `tick()`
//! - **Exercise**: catalog, rolling completion history and a randomized
//!   selector with an explicit relaxation policy
//! - **Session**: the work/break state machine and the extension sub-flow
//! - **Storage**: TOML settings and SQLite history behind the [`Store`] seam
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: countdown state machine
//! - [`ExerciseSelector`]: snack pairs and extension candidates
//! - [`SessionMachine`]: owns the live timer and emits [`Event`]s
//! - [`Settings`]: user configuration

pub mod achievements;
pub mod error;
pub mod events;
pub mod exercise;
pub mod notify;
pub mod session;
pub mod stats;
pub mod storage;
pub mod timer;

pub use achievements::Achievement;
pub use error::{CatalogError, ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::Event;
pub use exercise::{Catalog, Exercise, ExerciseSelector, SelectionPreferences, SnackPair};
pub use notify::{Notification, Notifier};
pub use session::{Mode, SessionConfig, SessionMachine, SessionState};
pub use stats::Stats;
pub use storage::{Database, FileStore, MemoryStore, Settings, Store};
pub use timer::{Clock, ManualClock, SystemClock, TimerEngine, TimerState};
