// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod executor;
pub mod plugin;
pub mod sink;
pub mod source;

pub use executor::KeyExecutor;
pub use plugin::ExtensionPlugin;
pub use sink::{OutputSink, RunStatus};
pub use source::TensorSource;
