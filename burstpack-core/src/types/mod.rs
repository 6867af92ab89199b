//! Item, batch and identifier types shared by every stage component.

mod batch;
mod ids;
mod item;

pub use batch::{Lane, LaneBatch};
pub use ids::RunId;
pub use item::{CorrelationEdge, Item};
