//! Core library for the sheet-recon command line application.
//!
//! The library reconciles spreadsheet data keyed by CNPJ/CPF or company name.
//! Workbook adapters live under [`io`] and the in-memory sheet representation
//! in [`model`]. Keys are canonicalised by [`normalize`], grouped by
//! [`aggregate`] and looked up exactly or through [`matcher`]. The steps that
//! write values back into a sheet are under [`reconcile`], and [`jobs`] wires
//! them into the batch pipelines the binary exposes.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod io;
pub mod jobs;
pub mod logging;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod reconcile;
pub mod validate;

pub use error::{Result, ToolError};
