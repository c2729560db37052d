//! Domain Layer
//!
//! Core scheduling logic: task lifecycle, admission control, and
//! observer notification.

pub mod task;
