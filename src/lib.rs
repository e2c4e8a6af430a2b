//! **spotcast** projects webcam image feeds onto secondary displays.
//!
//! A selection of feed locations ("spots") is shown on a target display in
//! one of two modes: a single image that rotates through the selection on a
//! fixed interval, or a uniform grid showing every image at once.  Image
//! URLs carry a cache-busting timestamp that is bumped on a refresh interval
//! so the host re-fetches otherwise identical URLs.
//!
//! # Architecture
//!
//! The crate is organised around the [`projector::Projector`], which owns
//! every open projection window, the two interval timers and the per-window
//! display mode.  It talks to the outside world through the traits in
//! [`traits`]:
//!
//! * [`traits::ProjectionHost`]: enumerates displays and owns the actual
//!   windows, so the projection logic is not coupled to any UI toolkit.
//! * [`traits::FeedSource`]: fetches per-spot metadata off the UI thread.
//! * [`traits::CommandSource`]: delivers operator intent (a Unix socket,
//!   a test harness, …) to the main loop.
//!
//! Concrete implementations live in [`host`] (JSON-lines host),
//! [`feed`] (HTTP metadata client) and [`ipc`] (Unix-socket listener).

pub mod catalog;
pub mod command;
pub mod config;
pub mod controller;
pub mod feed;
pub mod geometry;
pub mod host;
pub mod ipc;
pub mod projector;
pub mod render;
pub mod spot;
pub mod timer;
pub mod traits;
