//! Project graph build orchestration
//!
//! [`build_project_graph`] runs the whole sequence: scan, cache check, lock
//! file seeding, project nodes, plugins, cached and freshly extracted file
//! dependencies, implicit dependencies, and finally the cache write.

pub mod build;
pub mod context;
pub mod implicit;
pub mod lock_merger;


pub use build::{BuildOutput, BuildStats, build_project_graph, build_project_graph_using_file_map};
pub use context::BuildContext;
pub use lock_merger::LockGraphMerger;
