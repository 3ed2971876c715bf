// Embedded transport: an in-process graph engine shared by every driver.
//
// - engine: the SQLite-backed store and its native API
// - plan: which statements the engine understands
// - registry: the one-time initializer handing out the shared engine
// - transaction: native transactions and the transaction source
// - driver: `EmbeddedDriver`

pub mod driver;
pub mod engine;
mod plan;
pub mod registry;
mod transaction;

pub use driver::EmbeddedDriver;
pub use engine::EmbeddedEngine;
pub use registry::EngineRegistry;
