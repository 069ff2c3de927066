//! Snapshot-driven analytics dashboard core.
//!
//! Pages fetch pre-aggregated query results through a cached
//! [`feed::SnapshotFetcher`], reshape them ([`aggregate`], [`topn`],
//! [`shares`], [`heatmap`]) and hand render-ready [`render::PageView`]s to
//! a [`render::Renderer`].

pub mod aggregate;
pub mod bucket;
pub mod catalog;
pub mod config;
pub mod error;
pub mod feed;
pub mod format;
pub mod heatmap;
pub mod logging;
pub mod pages;
pub mod render;
pub mod shares;
pub mod snapshot;
pub mod topn;
pub mod ui_state;
pub mod value;

pub use error::{DashError, Result};
