// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Process-run execution: the DAG driver that walks a
//! [`procrun_core::ProcessDefinition`]'s `waitFor` edges and dispatches
//! each task to the executor registered for its class.

mod driver;
mod error;

pub use driver::RunDriver;
pub use error::DriverError;
