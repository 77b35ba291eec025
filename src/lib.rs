//! # Schema Atlas
//!
//! A harvester that maintains a catalog of OpenAPI/Swagger schemas gathered
//! from curated seed lists, the APIs.guru index, well-known endpoint probing
//! and community issue mining.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌────────────┐   ┌──────────────┐   ┌────────────┐
//! │ Source lists│──▶│ Aggregator │──▶│ Batch driver │──▶│ Repository │
//! │ seeds/guru/ │   │ first-seen │   │ normalize +  │   │ schemas/   │
//! │ disc./comm. │   │ wins       │   │ fetch state  │   └─────┬──────┘
//! └─────────────┘   └────────────┘   └──────────────┘         │
//!        ▲                                                     ▼
//!   ┌────┴──────────────┐                             ┌──────────────┐
//!   │ Discovery probe   │                             │ Catalog views│
//!   │ Community intake  │                             │ plain/search/│
//!   └───────────────────┘                             │ bridge       │
//!                                                     └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! atlas seed                # download the APIs.guru index
//! atlas refresh             # harvest every source, rebuild the catalog
//! atlas fetch-all --max 200 # resumable harvest of every indexed version
//! atlas validate            # re-check every stored schema
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Error taxonomy |
//! | [`logging`] | Subscriber setup and secret redaction |
//! | [`models`] | Core data types |
//! | [`aggregate`] | First-seen-wins candidate merge |
//! | [`sources`] | Candidate source lists on disk |
//! | [`normalize`] | Normalization gateway |
//! | [`repository`] | Schema repository on disk |
//! | [`state`] | Durable fetch state store |
//! | [`batch`] | Resumable batch driver |
//! | [`ingest`] | `refresh` and `fetch-all` orchestration |
//! | [`catalog`] | Plain, search and bridge catalog views |
//! | [`discovery`] | Well-known suffix probing |
//! | [`community`] | Issue-tracker URL mining |
//! | [`guru`] | APIs.guru index seeding |
//! | [`validate`] | Repository re-validation |
//! | [`stats`] | Repository and state overview |
//! | [`progress`] | Batch progress reporting |
//! | [`export`] | JSON artifact I/O |

pub mod aggregate;
pub mod batch;
pub mod catalog;
pub mod community;
pub mod config;
pub mod discovery;
pub mod error;
pub mod export;
pub mod guru;
pub mod ingest;
pub mod logging;
pub mod models;
pub mod normalize;
pub mod progress;
pub mod repository;
pub mod sources;
pub mod state;
pub mod stats;
pub mod validate;
