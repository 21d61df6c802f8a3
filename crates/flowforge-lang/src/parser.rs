//! Recursive-descent parser for FlowScript.
//!
//! ```text
//! digraph {
//!   { node [shape="circle"]; inputs [data='{"command":"make"}']; }
//!   { node [shape="box"]; compileJob; compileParseJob; parseOutputJob; }
//!   inputs -> compileJob;
//!   compileJob -> compileParseJob;
//!   compileParseJob -> parseOutputJob;
//! }
//! ```

use rustc_hash::FxHashSet;

use crate::ast::{NodeId, NodeType, ParsedGraph};
use crate::error::{ParseError, ParseResult};
use crate::lexer::{tokenize, SpannedToken, Token};

/// Parse FlowScript source into a `ParsedGraph`, fully validated per §4.G/§4.H
/// of the data contract: every reference resolves, the graph is acyclic,
/// `Data` nodes carry payloads, `Status` nodes carry at most one dependency.
pub fn parse(source: &str) -> ParseResult<ParsedGraph> {
    let tokens = tokenize(source)?;
    let mut parser = Parser::new(tokens);
    let graph = parser.parse_digraph()?;
    check_references(&graph)?;
    check_node_invariants(&graph)?;
    check_acyclic(&graph)?;
    Ok(graph)
}

struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
    graph: ParsedGraph,
    current_type: NodeType,
}

impl Parser {
    fn new(tokens: Vec<SpannedToken>) -> Self {
        Self {
            tokens,
            pos: 0,
            graph: ParsedGraph::new(),
            current_type: NodeType::Undefined,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).map(|t| t.token.clone());
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, expected: &Token, what: &str) -> ParseResult<()> {
        match self.advance() {
            Some(ref t) if std::mem::discriminant(t) == std::mem::discriminant(expected) => {
                Ok(())
            }
            Some(t) => Err(ParseError::UnexpectedToken {
                expected: what.to_string(),
                found: t.to_string(),
            }),
            None => Err(ParseError::UnexpectedEof(what.to_string())),
        }
    }

    fn expect_identifier(&mut self, what: &str) -> ParseResult<String> {
        match self.advance() {
            Some(Token::Identifier(s)) => Ok(s),
            Some(t) => Err(ParseError::UnexpectedToken {
                expected: what.to_string(),
                found: t.to_string(),
            }),
            None => Err(ParseError::UnexpectedEof(what.to_string())),
        }
    }

    fn parse_digraph(&mut self) -> ParseResult<ParsedGraph> {
        self.expect(&Token::Digraph, "'digraph'")?;
        self.expect(&Token::LBrace, "'{'")?;
        self.parse_stmts_until_rbrace()?;
        self.expect(&Token::RBrace, "'}'")?;
        if self.pos != self.tokens.len() {
            let extra = &self.tokens[self.pos].token;
            return Err(ParseError::UnexpectedToken {
                expected: "end of input".to_string(),
                found: extra.to_string(),
            });
        }
        Ok(std::mem::take(&mut self.graph))
    }

    fn parse_stmts_until_rbrace(&mut self) -> ParseResult<()> {
        while !matches!(self.peek(), Some(Token::RBrace) | None) {
            self.parse_stmt()?;
        }
        Ok(())
    }

    fn parse_stmt(&mut self) -> ParseResult<()> {
        match self.peek() {
            Some(Token::LBrace) => self.parse_block(),
            Some(Token::Node) => self.parse_default_shape_decl(),
            Some(Token::Identifier(_)) => self.parse_identifier_stmt(),
            Some(other) => Err(ParseError::UnexpectedToken {
                expected: "a node, edge or nested block".to_string(),
                found: other.to_string(),
            }),
            None => Err(ParseError::UnexpectedEof("a statement".to_string())),
        }
    }

    /// A nested `{ ... }` block scopes a default shape to its own statements.
    fn parse_block(&mut self) -> ParseResult<()> {
        self.expect(&Token::LBrace, "'{'")?;
        let saved = self.current_type;
        self.current_type = NodeType::Undefined;
        self.parse_stmts_until_rbrace()?;
        self.current_type = saved;
        self.expect(&Token::RBrace, "'}'")?;
        Ok(())
    }

    /// `node [shape="circle"];` — sets this block's default node type.
    fn parse_default_shape_decl(&mut self) -> ParseResult<()> {
        self.expect(&Token::Node, "'node'")?;
        if matches!(self.peek(), Some(Token::LBracket)) {
            self.advance();
            while !matches!(self.peek(), Some(Token::RBracket)) {
                match self.advance() {
                    Some(Token::Shape) => {
                        self.expect(&Token::Equals, "'='")?;
                        let shape = self.expect_string_literal("a quoted shape")?;
                        self.current_type = shape_to_node_type(&shape);
                    }
                    Some(_) => {}
                    None => return Err(ParseError::UnexpectedEof("']'".to_string())),
                }
            }
            self.expect(&Token::RBracket, "']'")?;
        }
        self.expect(&Token::Semicolon, "';'")?;
        Ok(())
    }

    fn expect_string_literal(&mut self, what: &str) -> ParseResult<String> {
        match self.advance() {
            Some(Token::StringLiteral(s)) => Ok(s),
            Some(t) => Err(ParseError::UnexpectedToken {
                expected: what.to_string(),
                found: t.to_string(),
            }),
            None => Err(ParseError::UnexpectedEof(what.to_string())),
        }
    }

    /// An identifier starts either a node declaration, an edge, or (inside a
    /// block) a bare type-inheriting reference.
    fn parse_identifier_stmt(&mut self) -> ParseResult<()> {
        let first = self.expect_identifier("an identifier")?;

        match self.peek() {
            Some(Token::LBracket) => self.parse_node_props(first),
            Some(Token::Arrow) => self.parse_edge(first),
            Some(Token::Semicolon) => {
                self.advance();
                let inherited = self.current_type;
                let node = self.graph.entry(&first);
                if matches!(node.node_type, NodeType::Undefined) {
                    node.node_type = inherited;
                }
                Ok(())
            }
            Some(other) => Err(ParseError::UnexpectedToken {
                expected: "'[', '->' or ';'".to_string(),
                found: other.to_string(),
            }),
            None => Err(ParseError::UnexpectedEof(
                "'[', '->' or ';' after identifier".to_string(),
            )),
        }
    }

    /// `ident [ shape="…" label="…" data='…' ];`
    fn parse_node_props(&mut self, id: NodeId) -> ParseResult<()> {
        self.expect(&Token::LBracket, "'['")?;
        let mut shape: Option<String> = None;
        let mut label: Option<String> = None;
        let mut data: Option<String> = None;

        while !matches!(self.peek(), Some(Token::RBracket)) {
            match self.advance() {
                Some(Token::Shape) => {
                    self.expect(&Token::Equals, "'='")?;
                    shape = Some(self.expect_string_literal("a quoted shape")?);
                }
                Some(Token::Label) => {
                    self.expect(&Token::Equals, "'='")?;
                    label = Some(self.expect_string_literal("a quoted label")?);
                }
                Some(Token::Data) => {
                    self.expect(&Token::Equals, "'='")?;
                    data = Some(self.expect_json_payload("a quoted data payload")?);
                }
                Some(t) => {
                    return Err(ParseError::UnexpectedToken {
                        expected: "'shape', 'label' or 'data'".to_string(),
                        found: t.to_string(),
                    })
                }
                None => return Err(ParseError::UnexpectedEof("']'".to_string())),
            }
        }
        self.expect(&Token::RBracket, "']'")?;
        self.expect(&Token::Semicolon, "';'")?;

        let inherited = self.current_type;
        let node = self.graph.entry(&id);
        if let Some(shape) = shape {
            node.node_type = shape_to_node_type(&shape);
        } else if matches!(node.node_type, NodeType::Undefined) {
            node.node_type = inherited;
        }
        if label.is_some() {
            node.label = label;
        }
        if let Some(raw) = data {
            node.input_data = Some(parse_data_payload(&id, &raw)?);
        }
        Ok(())
    }

    fn expect_json_payload(&mut self, what: &str) -> ParseResult<String> {
        match self.advance() {
            Some(Token::Json(s)) => Ok(s),
            Some(t) => Err(ParseError::UnexpectedToken {
                expected: what.to_string(),
                found: t.to_string(),
            }),
            None => Err(ParseError::UnexpectedEof(what.to_string())),
        }
    }

    /// `A -> B -> C [label="…"];` — chains of prerequisite → dependent edges.
    fn parse_edge(&mut self, first: NodeId) -> ParseResult<()> {
        let mut chain = vec![first];
        while matches!(self.peek(), Some(Token::Arrow)) {
            self.advance();
            let next = self.expect_identifier("an identifier after '->'")?;
            chain.push(next);
        }

        if matches!(self.peek(), Some(Token::LBracket)) {
            self.advance();
            while !matches!(self.peek(), Some(Token::RBracket)) {
                match self.advance() {
                    Some(_) => {}
                    None => return Err(ParseError::UnexpectedEof("']'".to_string())),
                }
            }
            self.expect(&Token::RBracket, "']'")?;
        }
        self.expect(&Token::Semicolon, "';'")?;

        for id in &chain {
            self.graph.entry(id);
        }
        for pair in chain.windows(2) {
            let (prereq, dependent) = (&pair[0], &pair[1]);
            let node = self.graph.entry(dependent);
            if !node.dependencies.contains(prereq) {
                node.dependencies.push(prereq.clone());
            }
        }
        Ok(())
    }
}

fn shape_to_node_type(shape: &str) -> NodeType {
    match shape {
        "circle" => NodeType::Data,
        "box" => NodeType::Job,
        "diamond" => NodeType::Status,
        _ => NodeType::Undefined,
    }
}

/// Accepts either a pre-formed JSON object (`'{"x":1}'`) or the lightweight
/// `'key,value'` form, per §4.G's data-property grammar.
fn parse_data_payload(node_id: &str, raw: &str) -> ParseResult<serde_json::Value> {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) {
        return Ok(value);
    }

    let Some((key, value)) = raw.split_once(',') else {
        return Err(ParseError::MalformedData {
            node: node_id.to_string(),
            reason: "expected a JSON object or a 'key,value' pair".to_string(),
        });
    };
    let key = key.trim();
    if key.is_empty() {
        return Err(ParseError::MalformedData {
            node: node_id.to_string(),
            reason: "empty key".to_string(),
        });
    }
    let mut obj = serde_json::Map::new();
    obj.insert(key.to_string(), serde_json::Value::String(value.trim().to_string()));
    Ok(serde_json::Value::Object(obj))
}

fn check_references(graph: &ParsedGraph) -> ParseResult<()> {
    for node in graph.nodes_in_order() {
        for dep in &node.dependencies {
            if graph.get(dep).is_none() {
                return Err(ParseError::UndefinedNode(dep.clone()));
            }
        }
    }
    Ok(())
}

fn check_node_invariants(graph: &ParsedGraph) -> ParseResult<()> {
    for node in graph.nodes_in_order() {
        match node.node_type {
            NodeType::Data => {
                let is_object = matches!(node.input_data, Some(serde_json::Value::Object(_)));
                if !is_object {
                    return Err(ParseError::MissingDataPayload(node.id.clone()));
                }
            }
            NodeType::Status => {
                if node.dependencies.len() > 1 {
                    return Err(ParseError::TooManyStatusDependencies(
                        node.id.clone(),
                        node.dependencies.len(),
                    ));
                }
            }
            NodeType::Job | NodeType::Undefined => {}
        }
    }
    Ok(())
}

fn check_acyclic(graph: &ParsedGraph) -> ParseResult<()> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        InProgress,
        Done,
    }

    let mut marks: rustc_hash::FxHashMap<NodeId, Mark> = graph
        .node_order()
        .iter()
        .map(|id| (id.clone(), Mark::Unvisited))
        .collect();

    fn visit(
        id: &str,
        graph: &ParsedGraph,
        marks: &mut rustc_hash::FxHashMap<NodeId, Mark>,
        stack: &mut Vec<NodeId>,
        seen: &mut FxHashSet<NodeId>,
    ) -> ParseResult<()> {
        match marks.get(id).copied() {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::InProgress) => {
                stack.push(id.to_string());
                let cycle_start = stack.iter().position(|x| x == id).unwrap_or(0);
                return Err(ParseError::Cycle(stack[cycle_start..].join(" -> ")));
            }
            _ => {}
        }
        marks.insert(id.to_string(), Mark::InProgress);
        stack.push(id.to_string());
        seen.insert(id.to_string());
        if let Some(node) = graph.get(id) {
            for dep in &node.dependencies {
                visit(dep, graph, marks, stack, seen)?;
            }
        }
        stack.pop();
        marks.insert(id.to_string(), Mark::Done);
        Ok(())
    }

    let mut stack = Vec::new();
    let mut seen = FxHashSet::default();
    for id in graph.node_order() {
        visit(id, graph, &mut marks, &mut stack, &mut seen)?;
    }
    Ok(())
}
