//! # ecs_store
//!
//! An in-memory entity/component storage engine. Entities are rows,
//! component types are fixed-size byte columns, and a query is a
//! projection over the columns of every live entity that holds all of them.
//!
//! This crate provides:
//!
//! - [`IndexMap`] / [`IdIndex`]: the id ↔ dense-slot translation index.
//! - [`EntityTable`]: entity ids, liveness flags and component masks.
//! - [`ComponentStore`] / [`ComponentRegistry`]: packed swap-remove storage.
//! - [`World`]: one isolated namespace, plus [`World::query`].
//! - [`WorldRegistry`]: world ownership and the deferred-destruction sweep.
//! - [`Ecs`]: convenience surface routed to a current world.
//!
//! Everything is single-threaded. Accessors return borrows of the owning
//! world, so a slice obtained from a store or a query cannot outlive the next
//! mutation of that world.

pub mod component;
pub mod context;
pub mod entity;
pub mod error;
pub mod index_map;
pub mod query;
pub mod registry;
pub mod world;

pub use component::{ComponentId, ComponentRegistry, ComponentStore};
pub use context::Ecs;
pub use entity::{ComponentMask, Entity, EntityRecord, EntityTable};
pub use error::{EcsError, Result};
pub use index_map::{IdIndex, IndexMap};
pub use query::{QueryResult, QueryResultMut, QueryRow};
pub use registry::{UpdateReport, WorldRegistry};
pub use world::{World, WorldConfig, WorldId};
