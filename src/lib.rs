//! Sitepipe - asset pipeline and live-reload dev server for static sites
//!
//! This library provides functionality to:
//! - Compile Sass into one prefixed, minified stylesheet
//! - Concatenate and minify scripts
//! - Derive AVIF, WebP and optimized copies of raster images
//! - Assemble SVG icons into a symbol sprite with a preview page
//! - Convert fonts to WOFF, TTF and WOFF2
//! - Expand include directives in page templates
//! - Serve the working tree with live reload while watching for changes
//! - Clean and package the deployable output directory

pub mod build;
pub mod cli;
pub mod config;
pub mod font;
pub mod include;
pub mod reload;
pub mod server;
pub mod tasks;
pub mod watch;
