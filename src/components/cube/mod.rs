//! Decorative 3D Rubik's cube widget
//!
//! A mouse-draggable, idle-rotating cube rendered with a software
//! rasterizer onto a 2D canvas, active only while its container is visible.
//! Pure scene/animation logic is kept out of the DOM glue so it can be unit
//! tested by stepping ticks directly.

mod controller;
mod envmap;
mod raster;
mod scene;
mod viewer;
mod viewport;
mod visibility;
mod widget;

pub use viewer::CubeViewer;
