//! nuget-helper - NuGet package maintenance library
//!
//! This library provides the core functionality behind the CLI:
//! - Bounded concurrent fan-out with cancellation and per-item timeouts
//! - Unused package detection through `dotnet nuget why`
//! - Version upgrades against a NuGet V3 feed
//! - Format-preserving edits to MSBuild files, saved once per run

pub mod apply;
pub mod audit;
pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod error;
pub mod manifest;
pub mod mapper;
pub mod progress;
pub mod registry;
pub mod report;
pub mod upgrade;
