//! Danmu TUI - Terminal caption overlay
//!
//! Paints a danmu overlay in the terminal: captions for one video scroll
//! right-to-left across a placeholder frame, timed against the time since the
//! overlay was mounted.
//!
//! # Architecture
//!
//! The TUI is a thin surface over `danmu-core`. Caption loading, lane
//! assignment and element timing all live in the core [`RenderLoop`];
//! this crate only maps pixels to cells and keys to settings.
//!
//! - **App**: Event loop, caption loading, settings persistence
//! - **Surface**: Cell/pixel mapping for the render loop
//! - **Controls**: Key bindings for display settings
//! - **UI**: Layout and painting
//!
//! ## Event Flow
//!
//! ```text
//! Terminal Events -> Control -> DisplaySettings -> RenderLoop -> OverlayElements -> Paint
//! ```
//!
//! [`RenderLoop`]: danmu_core::RenderLoop

pub mod app;
pub mod controls;
pub mod surface;
pub mod theme;
pub mod ui;

pub use app::{App, AppOptions};
pub use controls::Control;
pub use surface::TerminalSurface;
