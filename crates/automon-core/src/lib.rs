//! Automon core data model
//!
//! Types shared by the detection engine and the navigation sequencer: asset
//! identifiers, search regions, canonical-resolution geometry, frames, and the
//! device collaborator trait.

pub mod asset;
pub mod control;
pub mod device;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod region;

pub use asset::{AssetId, Detection};
pub use control::RunControl;
pub use device::FrameSource;
pub use error::{Error, Result};
pub use frame::{luma, Frame, FrameCell};
pub use geometry::{DeviceScale, Orientation, Point, Rect, CANONICAL_HEIGHT, CANONICAL_WIDTH};
pub use region::Region;
