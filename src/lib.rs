//! asbb-analysis - analysis pipeline for SIMD/parallel bioinformatics benchmarks
//!
//! This library turns the raw CSVs produced by benchmark runs into derived
//! statistics and reports: records are loaded against a declared schema,
//! joined to their group's baseline configuration, aggregated, and rendered
//! as text tables, Markdown, CSV, JSON or SVG charts. A small regression
//! predictor estimates speedup from operation complexity and data scale.

pub mod aggregate;
pub mod analyses;
pub mod baseline;
pub mod cli;
pub mod config;
pub mod error;
pub mod loader;
pub mod powerlog;
pub mod predictor;
pub mod report;
pub mod scale;
pub mod statistics;
