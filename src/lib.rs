#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod parser;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::LayoutConfig;
pub use ir::{CircleRecord, RoleRecord, RoleStatus};
pub use layout::{LayoutError, PackedLayout, PositionedNode, compute_layout};
