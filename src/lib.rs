//! # Mirror Console
//!
//! A form-driven client for the mirror backend: ingest text and files about
//! a subject, chat with the subject's mirror, and edit the facts and
//! preferences the backend extracted.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────┐   ┌──────────────┐   ┌─────────────┐
//! │   CLI    │──▶│    Page    │◀──│  FormBridge  │──▶│ MirrorClient│──▶ backend
//! │ (mirror) │   │ inputs,    │   │ one handler  │   │ reqwest     │
//! └──────────┘   │ tables     │   │ per trigger  │   └─────────────┘
//!                └────────────┘   └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! mirror sample --subject alice              # ingest the bundled sample
//! mirror ingest notes.md bio.txt --subject alice
//! mirror chat "What do I do for work?" --subject alice
//! mirror facts show --subject alice
//! mirror facts add-fact employer Acme --confidence 0.9 --subject alice
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Records exchanged with the backend |
//! | [`table`] | Table schema and editable rows |
//! | [`page`] | Element ids and page state |
//! | [`client`] | HTTP client |
//! | [`bridge`] | Form handlers |
//! | [`commands`] | CLI entry points |

pub mod bridge;
pub mod client;
pub mod commands;
pub mod config;
pub mod models;
pub mod page;
pub mod table;
