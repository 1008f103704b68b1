//! # Activity Lens
//!
//! Tab-activity clustering, summarization, and insight retrieval for
//! productivity assistants.
//!
//! Activity Lens ingests browser context events (tab lists, the active
//! tab, optional screenshots), clusters related tabs into "activities"
//! using weak signals only (URL, title, text sample, OCR excerpt),
//! summarizes each cluster through a hosted model or a deterministic
//! stub, ranks the results active-first / largest-first, and persists
//! them for later retrieval.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌────────────────────────────────┐   ┌──────────┐
//! │  Capture  │──▶│           Pipeline              │──▶│  SQLite  │
//! │  clients  │   │ normalize → cluster → summarize │   │ activities│
//! └───────────┘   │        → label → rank           │   └────┬─────┘
//!                 └────────────────┬────────────────┘        │
//!                                  │                         ▼
//!                             ┌────┴─────┐             ┌──────────┐
//!                             │   CLI    │             │   HTTP   │
//!                             │ (alens)  │             │   API    │
//!                             └──────────┘             └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! alens init                          # create database
//! alens ingest capture.json           # process a context event
//! alens insights --user-id dev-user   # recent ranked activities
//! alens serve                         # start the HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`normalize`] | Context event sanitization boundary |
//! | [`feature`] | Tab feature extraction |
//! | [`similarity`] | Pairwise similarity scoring |
//! | [`cluster`] | Union-find single-link clustering |
//! | [`label`] | Label heuristics and sanitization |
//! | [`summarize`] | Summarizer collaborator (stub / Anthropic) |
//! | [`screenshot`] | Screenshot payload validation |
//! | [`pipeline`] | Assembly and ranking |
//! | [`store`] | Activity persistence |
//! | [`insights`] | Recent-activity retrieval |
//! | [`server`] | HTTP API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod cluster;
pub mod config;
pub mod db;
pub mod feature;
pub mod insights;
pub mod label;
pub mod migrate;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod screenshot;
pub mod server;
pub mod similarity;
pub mod store;
pub mod summarize;
