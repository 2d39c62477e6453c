//! Printable, linked PDF atlases from OpenStreetMap raster tiles.
//!
//! The geometric core lives in [`projection`], [`layout`], [`track`] and
//! [`links`]; it is pure and never touches the network or the filesystem.
//! [`download`], [`compose`] and [`pdf`] do the I/O, and [`atlas`] ties
//! everything together.

pub mod atlas;
pub mod cache;
pub mod compose;
pub mod download;
pub mod layout;
pub mod links;
pub mod model;
pub mod pdf;
pub mod projection;
pub mod tile_server;
pub mod track;
