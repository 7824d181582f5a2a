//! HTML views for the rendered-pages surface.

pub mod views;
