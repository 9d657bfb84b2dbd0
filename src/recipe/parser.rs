// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Recipe text to recipe graph.
//!
//! ```text
//! document  := binding* expr
//! binding   := IDENT '=' expr
//! expr      := call | IDENT | literal
//! call      := IDENT '(' [ arg (',' arg)* [','] ] ')'
//! arg       := expr | IDENT '=' expr
//! literal   := NUMBER | STRING | 'true' | 'false'
//! ```
//!
//! `#` starts a comment that runs to the end of the line. Nodes are built
//! through [`RecipeBuilder`], so every structural check applies here too.

use std::collections::HashMap;

use crate::config::consts::MAX_NESTING_DEPTH;
use crate::errors::RecipeError;
use crate::observability::messages::recipe::RecipeParsed;
use crate::observability::messages::StructuredLog;
use crate::recipe::builder::RecipeBuilder;
use crate::recipe::graph::Recipe;
use crate::recipe::node::NodeRef;
use crate::registry::HyperValue;

/// Parse recipe text against the methods and architectures in `builder`'s registry.
pub fn parse(text: &str, builder: &RecipeBuilder) -> Result<Recipe, RecipeError> {
    let tokens = Lexer::new(text).tokenize()?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        builder,
        bindings: HashMap::new(),
        depth: 0,
    };
    let root = parser.document()?;
    let recipe = builder.build(root);
    RecipeParsed {
        node_count: recipe.node_count(),
        binding_count: parser.bindings.len(),
    }
    .log();
    Ok(recipe)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    LParen,
    RParen,
    Comma,
    Equals,
    Eof,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("'{}'", name),
            Token::Int(v) => v.to_string(),
            Token::Float(v) => format!("{:?}", v),
            Token::Str(_) => "string".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Comma => "','".to_string(),
            Token::Equals => "'='".to_string(),
            Token::Eof => "end of input".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    line: usize,
    column: usize,
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            chars: text.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(line: usize, column: usize, message: impl Into<String>) -> RecipeError {
        RecipeError::Syntax {
            line,
            column,
            message: message.into(),
        }
    }

    fn tokenize(mut self) -> Result<Vec<Spanned>, RecipeError> {
        let mut tokens = Vec::new();
        loop {
            while let Some(&c) = self.chars.peek() {
                if c == '#' {
                    while let Some(&c) = self.chars.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                } else if c.is_whitespace() {
                    self.bump();
                } else {
                    break;
                }
            }

            let (line, column) = (self.line, self.column);
            let Some(&c) = self.chars.peek() else {
                tokens.push(Spanned {
                    token: Token::Eof,
                    line,
                    column,
                });
                return Ok(tokens);
            };

            let token = match c {
                '(' | ')' | ',' | '=' => {
                    self.bump();
                    match c {
                        '(' => Token::LParen,
                        ')' => Token::RParen,
                        ',' => Token::Comma,
                        _ => Token::Equals,
                    }
                }
                '"' => self.string(line, column)?,
                c if c.is_ascii_digit() || c == '-' => self.number(line, column)?,
                c if c.is_ascii_alphabetic() || c == '_' => {
                    let mut ident = String::new();
                    while let Some(&c) = self.chars.peek() {
                        if c.is_ascii_alphanumeric() || c == '_' {
                            ident.push(c);
                            self.bump();
                        } else {
                            break;
                        }
                    }
                    Token::Ident(ident)
                }
                other => {
                    return Err(Self::error(
                        line,
                        column,
                        format!("unexpected character '{}'", other),
                    ))
                }
            };
            tokens.push(Spanned {
                token,
                line,
                column,
            });
        }
    }

    fn string(&mut self, line: usize, column: usize) -> Result<Token, RecipeError> {
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => {
                    return Err(Self::error(line, column, "unterminated string"));
                }
                Some('"') => return Ok(Token::Str(value)),
                Some('\\') => {
                    let (esc_line, esc_column) = (self.line, self.column);
                    match self.bump() {
                        Some('"') => value.push('"'),
                        Some('\\') => value.push('\\'),
                        Some('n') => value.push('\n'),
                        Some('r') => value.push('\r'),
                        Some('t') => value.push('\t'),
                        other => {
                            return Err(Self::error(
                                esc_line,
                                esc_column,
                                format!("unknown escape sequence {:?}", other),
                            ))
                        }
                    }
                }
                Some(c) => value.push(c),
            }
        }
    }

    fn number(&mut self, line: usize, column: usize) -> Result<Token, RecipeError> {
        let mut text = String::new();
        if self.chars.peek() == Some(&'-') {
            text.push('-');
            self.bump();
        }
        let mut is_float = false;
        while let Some(&c) = self.chars.peek() {
            let accept = match c {
                '0'..='9' => true,
                '.' | 'e' | 'E' => {
                    is_float = true;
                    true
                }
                '+' | '-' => text.ends_with('e') || text.ends_with('E'),
                _ => false,
            };
            if !accept {
                break;
            }
            text.push(c);
            self.bump();
        }

        if is_float {
            text.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Token::Float)
                .ok_or_else(|| Self::error(line, column, format!("invalid number '{}'", text)))
        } else {
            text.parse::<i64>()
                .map(Token::Int)
                .map_err(|_| Self::error(line, column, format!("invalid number '{}'", text)))
        }
    }
}

struct Parser<'b> {
    tokens: Vec<Spanned>,
    pos: usize,
    builder: &'b RecipeBuilder,
    bindings: HashMap<String, NodeRef>,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> &Spanned {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_second(&self) -> &Token {
        &self.tokens[(self.pos + 1).min(self.tokens.len() - 1)].token
    }

    fn advance(&mut self) -> Spanned {
        let spanned = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        spanned
    }

    fn unexpected(&self, expected: &str) -> RecipeError {
        Self::unexpected_at(self.peek(), expected)
    }

    fn unexpected_at(found: &Spanned, expected: &str) -> RecipeError {
        RecipeError::Syntax {
            line: found.line,
            column: found.column,
            message: format!("expected {}, found {}", expected, found.token.describe()),
        }
    }

    fn expect(&mut self, token: Token, expected: &str) -> Result<(), RecipeError> {
        if self.peek().token == token {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn document(&mut self) -> Result<NodeRef, RecipeError> {
        while let (Token::Ident(name), Token::Equals) = (&self.peek().token, self.peek_second()) {
            let name = name.clone();
            let spanned = self.advance();
            if crate::registry::RESERVED_WORDS.contains(&name.as_str()) {
                return Err(RecipeError::Syntax {
                    line: spanned.line,
                    column: spanned.column,
                    message: format!("'{}' is reserved and cannot be bound", name),
                });
            }
            if self.bindings.contains_key(&name) {
                return Err(RecipeError::DuplicateBinding {
                    name,
                    line: spanned.line,
                });
            }
            self.advance();
            let node = self.expr(Some(&name))?;
            self.bindings.insert(name, node);
        }

        let root = self.expr(None)?;
        if self.peek().token != Token::Eof {
            return Err(self.unexpected("end of input"));
        }
        Ok(root)
    }

    /// `binding` names the parameter when the expression is a bare literal.
    fn expr(&mut self, binding: Option<&str>) -> Result<NodeRef, RecipeError> {
        let spanned = self.advance();
        let literal = match spanned.token {
            Token::Ident(name) if self.peek().token == Token::LParen => {
                return self.call(&name, spanned.line, spanned.column);
            }
            Token::Ident(name) if name == "true" => HyperValue::Bool(true),
            Token::Ident(name) if name == "false" => HyperValue::Bool(false),
            Token::Ident(name) => {
                return self
                    .bindings
                    .get(&name)
                    .cloned()
                    .ok_or(RecipeError::UndefinedName {
                        name,
                        line: spanned.line,
                    });
            }
            Token::Int(v) => HyperValue::Int(v),
            Token::Float(v) => HyperValue::Float(v),
            Token::Str(v) => HyperValue::String(v),
            _ => return Err(Self::unexpected_at(&spanned, "an expression")),
        };

        match binding {
            Some(name) => self.builder.named_parameter(name, literal),
            None => self.builder.parameter(literal),
        }
    }

    fn call(&mut self, name: &str, line: usize, column: usize) -> Result<NodeRef, RecipeError> {
        if self.depth == MAX_NESTING_DEPTH {
            return Err(RecipeError::Syntax {
                line,
                column,
                message: format!("calls nest deeper than {} levels", MAX_NESTING_DEPTH),
            });
        }
        self.depth += 1;
        let node = self.method_call(name, line, column);
        self.depth -= 1;
        node
    }

    fn method_call(&mut self, name: &str, line: usize, column: usize) -> Result<NodeRef, RecipeError> {
        if name == "leaf" {
            return self.leaf(line, column);
        }
        self.builder
            .registry()
            .lookup_method(name)
            .map_err(|_| RecipeError::UnknownMethod(name.to_string()))?;

        self.expect(Token::LParen, "'('")?;
        let mut inputs = Vec::new();
        let mut hyperparameters = Vec::new();
        while self.peek().token != Token::RParen {
            if let (Token::Ident(key), Token::Equals) = (&self.peek().token, self.peek_second()) {
                let key = key.clone();
                self.advance();
                self.advance();
                hyperparameters.push((key, self.expr(None)?));
            } else if !hyperparameters.is_empty() {
                return Err(self.unexpected("a keyword argument after keyword arguments"));
            } else {
                inputs.push(self.expr(None)?);
            }

            if self.peek().token == Token::Comma {
                self.advance();
            } else if self.peek().token != Token::RParen {
                return Err(self.unexpected("',' or ')'"));
            }
        }
        self.advance();

        self.builder.merge_op(name, inputs, hyperparameters)
    }

    fn leaf(&mut self, line: usize, column: usize) -> Result<NodeRef, RecipeError> {
        self.expect(Token::LParen, "'('")?;
        let spanned = self.advance();
        let source_id = match spanned.token {
            Token::Str(ref source_id) => source_id.clone(),
            _ => return Err(Self::unexpected_at(&spanned, "a quoted source id")),
        };

        let mut architecture = None;
        if self.peek().token == Token::Comma {
            self.advance();
            if let Token::Ident(key) = &self.peek().token {
                if key != "architecture" {
                    return Err(RecipeError::Syntax {
                        line,
                        column,
                        message: format!("leaf() has no argument named '{}'", key),
                    });
                }
                self.advance();
                self.expect(Token::Equals, "'='")?;
                let spanned = self.advance();
                match spanned.token {
                    Token::Str(ref name) => architecture = Some(name.clone()),
                    _ => return Err(Self::unexpected_at(&spanned, "a quoted architecture name")),
                }
                if self.peek().token == Token::Comma {
                    self.advance();
                }
            }
        }
        self.expect(Token::RParen, "')'")?;

        match architecture {
            Some(architecture) => self.builder.leaf_with_architecture(&source_id, &architecture),
            None => Ok(self.builder.leaf(&source_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::node::RecipeNode;
    use crate::registry::{ArchitectureSchema, ExtensionRegistry};

    fn builder() -> RecipeBuilder {
        let mut registry = ExtensionRegistry::with_builtins().unwrap();
        registry
            .register_architecture(ArchitectureSchema::new("tiny", ["a.weight", "b.weight"]))
            .unwrap();
        RecipeBuilder::new(registry.freeze())
    }

    #[test]
    fn test_parse_simple_call() {
        let b = builder();
        let recipe = parse(
            "weighted_sum(leaf(\"a\"), leaf(\"b\", architecture=\"tiny\"), alpha=0.3)",
            &b,
        )
        .unwrap();
        match recipe.root().as_ref() {
            RecipeNode::MergeOp(op) => {
                assert_eq!(op.method.name(), "weighted_sum");
                assert_eq!(op.inputs.len(), 2);
                assert_eq!(op.resolved.get("alpha"), Some(&HyperValue::Float(0.3)));
            }
            other => panic!("unexpected root {:?}", other),
        }
    }

    #[test]
    fn test_bindings_share_nodes() {
        let b = builder();
        let text = r#"
            # base model shared by both branches
            base = leaf("base")
            alpha = 0.75
            weighted_sum(base, add_difference(base, subtract(leaf("x"), base)), alpha=alpha)
        "#;
        let recipe = parse(text, &b).unwrap();
        assert_eq!(recipe.leaves().len(), 2);
        let RecipeNode::MergeOp(op) = recipe.root().as_ref() else {
            panic!("expected merge root");
        };
        let RecipeNode::Parameter(alpha) = op.hyperparameters["alpha"].as_ref() else {
            panic!("expected parameter");
        };
        assert_eq!(alpha.name.as_deref(), Some("alpha"));
    }

    #[test]
    fn test_syntax_error_position() {
        let b = builder();
        let err = parse("weighted_sum(leaf(\"a\"),\n  leaf(\"b\") leaf(\"c\"))", &b).unwrap_err();
        match err {
            RecipeError::Syntax { line, column, .. } => assert_eq!((line, column), (2, 13)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_nesting_depth_is_capped() {
        let depth = MAX_NESTING_DEPTH + 1;
        let text = format!("{}leaf(\"a\"){}", "fallback(".repeat(depth), ")".repeat(depth));
        match parse(&text, &builder()).unwrap_err() {
            RecipeError::Syntax { line, column, message } => {
                assert_eq!((line, column), (1, 1 + 9 * MAX_NESTING_DEPTH));
                assert!(message.contains("nest"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unterminated_string() {
        let err = parse("leaf(\"a)", &builder()).unwrap_err();
        assert!(matches!(err, RecipeError::Syntax { line: 1, column: 6, .. }));
    }

    #[test]
    fn test_unknown_names() {
        let b = builder();
        assert!(matches!(
            parse("blend(leaf(\"a\"))", &b),
            Err(RecipeError::UnknownMethod(name)) if name == "blend"
        ));
        assert!(matches!(
            parse("leaf(\"a\", architecture=\"huge\")", &b),
            Err(RecipeError::UnknownArchitecture(name)) if name == "huge"
        ));
        assert!(matches!(
            parse("x = leaf(\"a\")\nweighted_sum(x, y)", &b),
            Err(RecipeError::UndefinedName { name, line: 2 }) if name == "y"
        ));
    }

    #[test]
    fn test_forward_reference_is_undefined() {
        let err = parse("x = y\ny = leaf(\"a\")\nx", &builder()).unwrap_err();
        assert!(matches!(err, RecipeError::UndefinedName { line: 1, .. }));
    }

    #[test]
    fn test_duplicate_binding() {
        let err = parse("x = leaf(\"a\")\nx = leaf(\"b\")\nx", &builder()).unwrap_err();
        assert!(matches!(err, RecipeError::DuplicateBinding { line: 2, .. }));
    }

    #[test]
    fn test_arity_checked_while_parsing() {
        let err = parse("weighted_sum(leaf(\"a\"))", &builder()).unwrap_err();
        assert!(matches!(err, RecipeError::Arity { actual: 1, .. }));
    }

    #[test]
    fn test_positional_after_keyword_rejected() {
        let err = parse(
            "weighted_sum(leaf(\"a\"), alpha=0.5, leaf(\"b\"))",
            &builder(),
        )
        .unwrap_err();
        assert!(matches!(err, RecipeError::Syntax { .. }));
    }

    #[test]
    fn test_literal_kinds() {
        let b = builder();
        let recipe = parse(
            "key_filter(leaf(\"a\"), prefix=\"unet.\\\"x\\\"\", exclude=true)",
            &b,
        )
        .unwrap();
        let RecipeNode::MergeOp(op) = recipe.root().as_ref() else {
            panic!("expected merge root");
        };
        assert_eq!(
            op.resolved.get("prefix"),
            Some(&HyperValue::from("unet.\"x\""))
        );
        assert_eq!(op.resolved.get("exclude"), Some(&HyperValue::Bool(true)));

        let recipe = parse("clamp(leaf(\"a\"), -1, 2.5e-1)", &b).unwrap();
        let RecipeNode::MergeOp(op) = recipe.root().as_ref() else {
            panic!("expected merge root");
        };
        let values: Vec<_> = op.inputs[1..]
            .iter()
            .map(|n| match n.as_ref() {
                RecipeNode::Parameter(p) => p.value.clone(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(values, vec![HyperValue::Int(-1), HyperValue::Float(0.25)]);
    }

    #[test]
    fn test_round_trip_preserves_structure() {
        let b = builder();
        let text = r#"
            base = leaf("base", architecture="tiny")
            tuned = leaf("tuned")
            delta = subtract(tuned, base)
            strength = 0.5
            n_average(
                add_difference(base, delta, alpha=strength),
                add_difference(base, ties_sum(delta, delta, k=1), alpha=strength),
                weighted_sum(tuned, base),
            )
        "#;
        let recipe = parse(text, &b).unwrap();
        let serialized = recipe.to_text();
        let reparsed = parse(&serialized, &b).unwrap();
        assert!(recipe.structurally_eq(&reparsed), "{}", serialized);
        assert_eq!(serialized, reparsed.to_text());
    }

    #[test]
    fn test_round_trip_of_built_recipe() {
        let b = builder();
        let shared = b.parameter(HyperValue::Float(1e-7)).unwrap();
        let x = b.leaf("with space");
        let root = b
            .merge_op(
                "weighted_sum",
                vec![x.clone(), x],
                vec![("alpha".to_string(), shared.clone())],
            )
            .unwrap();
        let root = b
            .merge_op("weighted_sum", vec![root.clone(), root], vec![("alpha".to_string(), shared)])
            .unwrap();
        let recipe = b.build(root);
        let reparsed = parse(&recipe.to_text(), &b).unwrap();
        assert!(recipe.structurally_eq(&reparsed));
    }
}
