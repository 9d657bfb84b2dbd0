// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Recipe graphs: construction, text format and structural comparison.

mod builder;
mod graph;
mod node;
mod parser;
mod serializer;

pub use builder::RecipeBuilder;
pub use graph::Recipe;
pub use node::{LeafNode, MergeOpNode, NodeRef, ParameterNode, RecipeNode};
pub use parser::parse;
pub use serializer::{literal, serialize};

pub(crate) use node::node_id;
