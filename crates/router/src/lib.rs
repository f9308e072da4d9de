//! The dialogue orchestration routers: the v1 fixed-stage pipeline and
//! the v2 facilitator-driven round loop.

pub mod common;
pub mod conflict;
pub mod dynamic;
pub mod error;
pub mod events;
pub mod staged;

pub use dynamic::DynamicRouter;
pub use error::{Result, RouterError};
pub use events::{EventSink, RouterEvent};
pub use staged::StagedRouter;
