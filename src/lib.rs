// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod config;     // config files, recipe documents, runtime
pub mod engine;     // streaming evaluation + executors
pub mod errors;     // error handling
pub mod io;         // sources, sinks, ordered flushing
pub mod methods;    // built-in merge methods
pub mod observability;
pub mod recipe;     // recipe graph, parser, serializer
pub mod registry;   // extension registry
pub mod resolver;   // cross-architecture key alignment
pub mod tensor;
pub mod traits;     // unified abstractions
