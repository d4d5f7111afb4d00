//! Integration tests for the hatsune service.
//!
//! These build a whole [`crate::app::App`] on a simulated platform and drive
//! it through its router and limits watcher.


pub mod support;
