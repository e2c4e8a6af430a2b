//! IPC listener that accepts commands over a Unix socket.
//!
//! Operator front-ends, scripts and the renderer process connect to the
//! socket and send newline-delimited JSON commands.

pub mod listener;
