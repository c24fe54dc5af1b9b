//! Board aggregation and presentation.
//!
//! - Status colors
//! - Paginated collection of listings
//! - Concurrent per-label board fetch
//! - Milestone lookup by title fragments
//! - Projection into display blocks

pub mod color;
pub mod fanout;
pub mod milestone;
pub mod pagination;
pub mod projection;

pub use fanout::{fetch_board, BoardResult};
pub use milestone::find_milestone;
pub use pagination::{collect, collect_issues, collect_milestones};
pub use projection::DisplayBlock;
