//! Common test infrastructure
//!
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{scripted_warehouse, test_config};
//! use sparkify_dwh::Pipeline;
//!
//! #[tokio::test]
//! async fn test_setup() {
//!     let mut warehouse = scripted_warehouse();
//!     Pipeline::setup().run(&mut warehouse, &test_config()).await.unwrap();
//! }
//! ```

mod constants;
mod fixtures;

pub use constants::*;
#[allow(unused_imports)]
pub use fixtures::{live_config, scripted_warehouse, test_config, test_config_with};
