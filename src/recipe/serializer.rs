// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Recipe graph to recipe text.
//!
//! Nodes with more than one parent, and named parameters, are written as
//! bindings ahead of the final expression so that parsing the output
//! rebuilds the same sharing.

use std::collections::{HashMap, HashSet};

use crate::recipe::graph::Recipe;
use crate::recipe::node::{node_id, NodeRef, RecipeNode};
use crate::registry::{is_identifier, HyperValue, RESERVED_WORDS};

pub fn serialize(recipe: &Recipe) -> String {
    let mut writer = Writer {
        parents: recipe.parent_counts(),
        root: node_id(recipe.root()),
        names: HashMap::new(),
        used: HashSet::new(),
        lines: Vec::new(),
    };
    writer.emit_bindings(recipe.root());
    let root = writer.expr(recipe.root());
    writer.lines.push(root);

    let mut text = writer.lines.join("\n");
    text.push('\n');
    text
}

/// Render a literal the way the parser reads it back.
pub fn literal(value: &HyperValue) -> String {
    match value {
        HyperValue::Float(v) => format!("{:?}", v),
        HyperValue::Int(v) => v.to_string(),
        HyperValue::Bool(v) => v.to_string(),
        HyperValue::String(v) => quote(v),
    }
}

pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

struct Writer {
    parents: HashMap<usize, usize>,
    root: usize,
    names: HashMap<usize, String>,
    used: HashSet<String>,
    lines: Vec<String>,
}

impl Writer {
    fn needs_binding(&self, node: &NodeRef) -> bool {
        let id = node_id(node);
        if id == self.root {
            return false;
        }
        let shared = self.parents.get(&id).copied().unwrap_or(0) > 1;
        let named = matches!(node.as_ref(), RecipeNode::Parameter(p) if p.name.is_some());
        shared || named
    }

    /// Post-order walk writing a binding for every node that needs one.
    fn emit_bindings(&mut self, node: &NodeRef) {
        if self.names.contains_key(&node_id(node)) {
            return;
        }
        for child in node.children() {
            self.emit_bindings(child);
        }
        if self.needs_binding(node) {
            let name = self.fresh_name(node);
            let expr = self.expr(node);
            self.lines.push(format!("{} = {}", name, expr));
            self.names.insert(node_id(node), name);
        }
    }

    fn reference(&self, node: &NodeRef) -> String {
        match self.names.get(&node_id(node)) {
            Some(name) => name.clone(),
            None => self.expr(node),
        }
    }

    fn expr(&self, node: &NodeRef) -> String {
        match node.as_ref() {
            RecipeNode::Leaf(leaf) => match &leaf.architecture {
                Some(schema) => format!(
                    "leaf({}, architecture={})",
                    quote(&leaf.source_id),
                    quote(&schema.name)
                ),
                None => format!("leaf({})", quote(&leaf.source_id)),
            },
            RecipeNode::Parameter(param) => literal(&param.value),
            RecipeNode::MergeOp(op) => {
                let args: Vec<String> = op
                    .inputs
                    .iter()
                    .map(|input| self.reference(input))
                    .chain(
                        op.hyperparameters
                            .iter()
                            .map(|(name, value)| format!("{}={}", name, self.reference(value))),
                    )
                    .collect();
                format!("{}({})", op.method.name(), args.join(", "))
            }
        }
    }

    fn fresh_name(&mut self, node: &NodeRef) -> String {
        let base = match node.as_ref() {
            RecipeNode::Parameter(param) => param.name.clone().unwrap_or_else(|| "param".into()),
            RecipeNode::Leaf(leaf) if is_identifier(&leaf.source_id) => leaf.source_id.clone(),
            RecipeNode::Leaf(_) => "model".to_string(),
            RecipeNode::MergeOp(op) => op.method.name().to_string(),
        };

        let mut candidate = base.clone();
        let mut suffix = 1;
        while self.used.contains(&candidate) || RESERVED_WORDS.contains(&candidate.as_str()) {
            candidate = format!("{}_{}", base, suffix);
            suffix += 1;
        }
        self.used.insert(candidate.clone());
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::RecipeBuilder;
    use crate::registry::ExtensionRegistry;

    fn builder() -> RecipeBuilder {
        RecipeBuilder::new(ExtensionRegistry::with_builtins().unwrap().freeze())
    }

    #[test]
    fn test_literals() {
        assert_eq!(literal(&HyperValue::Float(1.0)), "1.0");
        assert_eq!(literal(&HyperValue::Float(0.1)), "0.1");
        assert_eq!(literal(&HyperValue::Int(3)), "3");
        assert_eq!(literal(&HyperValue::Bool(false)), "false");
        assert_eq!(literal(&HyperValue::from("a\"b\\c\n")), r#""a\"b\\c\n""#);
    }

    #[test]
    fn test_single_use_nodes_inline() {
        let b = builder();
        let root = b
            .merge(
                "weighted_sum",
                vec![b.leaf("a"), b.leaf("b")],
                &[("alpha", HyperValue::Float(0.25))],
            )
            .unwrap();
        assert_eq!(
            b.build(root).to_text(),
            "weighted_sum(leaf(\"a\"), leaf(\"b\"), alpha=0.25)\n"
        );
    }

    #[test]
    fn test_shared_nodes_become_bindings() {
        let b = builder();
        let base = b.leaf("base");
        let delta = b
            .merge("subtract", vec![b.leaf("tuned"), base.clone()], &[])
            .unwrap();
        let root = b.merge("add_difference", vec![base, delta], &[]).unwrap();
        assert_eq!(
            b.build(root).to_text(),
            "base = leaf(\"base\")\nadd_difference(base, subtract(leaf(\"tuned\"), base))\n"
        );
    }

    #[test]
    fn test_reserved_and_duplicate_names_are_renamed() {
        let b = builder();
        let shared_a = b.leaf("leaf");
        let alpha1 = b.named_parameter("alpha", HyperValue::Float(0.1)).unwrap();
        let alpha2 = b.named_parameter("alpha", HyperValue::Float(0.2)).unwrap();
        let left = b
            .merge_op(
                "weighted_sum",
                vec![shared_a.clone(), shared_a.clone()],
                vec![("alpha".into(), alpha1)],
            )
            .unwrap();
        let root = b
            .merge_op("weighted_sum", vec![left, shared_a], vec![("alpha".into(), alpha2)])
            .unwrap();
        let text = b.build(root).to_text();
        assert!(text.contains("leaf_1 = leaf(\"leaf\")"), "{}", text);
        assert!(text.contains("alpha = 0.1"), "{}", text);
        assert!(text.contains("alpha_1 = 0.2"), "{}", text);
    }
}
