//! Task orchestration for sitepipe
//!
//! # Overview
//!
//! - **Tasks**: the named units of work and the plans that combine them
//! - **Discovery**: glob expansion and package manifest selection
//! - **Freshness**: timestamp comparison for incremental image work
//! - **Execution**: [`TaskRunner`] walks a plan, reporting progress and
//!   publishing reload signals
//!
//! # Example
//!
//! ```ignore
//! use sitepipe::build::{BuildContext, Plan, TaskRunner};
//! use sitepipe::config::load_config;
//!
//! let loaded = load_config(None)?;
//! let context = BuildContext::new(loaded.config, loaded.base_dir);
//! let runner = TaskRunner::new(context);
//!
//! let result = runner.run(&Plan::build_project());
//! println!("{}", result.summary());
//! ```

pub mod context;
pub mod discovery;
pub mod freshness;
pub mod pipeline;
pub mod progress;
pub mod result;
pub mod task;

pub use context::*;
pub use discovery::*;
pub use freshness::*;
pub use pipeline::*;
pub use progress::*;
pub use result::*;
pub use task::*;
