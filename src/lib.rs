//! Live Football Betting Bot
//!
//! An automated bet lifecycle tracker for live football matches.
//!
//! ## Architecture
//!
//! ```text
//! Feed (api-football) → Cycle → Detector → Storage (SQLite) → Notifier (Telegram)
//!                         ↓                     ↑
//!                      Resolver → Evaluator ────┘
//! ```

pub mod config;
pub mod cycle;
pub mod detector;
pub mod error;
pub mod evaluator;
pub mod feed;
pub mod notify;
pub mod resolver;
pub mod storage;
pub mod types;
