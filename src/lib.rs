//! Conversational copywriting backend — chat sessions over Ollama, records in SurrealDB.
//!
//! Copydesk glues three layers together:
//!
//! - **Records**: a small repository layer that translates document-style
//!   filters into parameterized SurrealQL against SurrealDB
//! - **Agent**: a retrying, fallback-aware driver over a local
//!   [Ollama](https://ollama.com) server, with per-session history in SQLite
//! - **Server**: WebSocket chat that streams replies and flattens markdown
//!   into `speech_text` for downstream synthesis
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`store`] — SurrealDB connection, record references, and the query protocol
//! - [`orm`] — Filters, SurrealQL statement building, and typed repositories
//! - [`entities`] — The stored record types
//! - [`db`] — SQLite session database: schema and migrations
//! - [`agent`] — Content parts, retry policy, session history, and the Ollama runner
//! - [`speech`] — Markdown and symbol flattening for speech synthesis

pub mod agent;
pub mod config;
pub mod db;
pub mod entities;
pub mod orm;
pub mod speech;
pub mod store;
