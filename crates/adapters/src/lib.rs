// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Task executors and the loader's HTTP sender.

mod executor;
mod local_cmd;
pub mod registry;
mod scp_cmd;
mod sender;
mod ssh_cmd;

pub use executor::{ExecuteError, Executor};
pub use local_cmd::LocalCmdExecutor;
pub use registry::ExecutorRegistry;
pub use scp_cmd::ScpCmdExecutor;
pub use sender::{ProducerClient, SendError};
pub use ssh_cmd::SshCmdExecutor;

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeExecutor;
