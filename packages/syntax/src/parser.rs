use crate::ast::*;
use crate::error::{ParseError, ParseResult, TokenSpan};
use crate::tokenizer::{split_dimension, tokenize, Token};
use crate::tree::Tree;
use std::ops::Range;

/// At-rules whose block holds declarations rather than rules
const DECLARATION_BLOCK_ATRULES: &[&str] = &[
    "font-face",
    "page",
    "viewport",
    "counter-style",
    "property",
    "font-palette-values",
];

/// Pseudo-class functions whose argument is a selector list
const SELECTOR_ARGUMENT_PSEUDOS: &[&str] = &[
    "not",
    "is",
    "matches",
    "has",
    "where",
    "-webkit-any",
    "-moz-any",
    "host",
    "host-context",
];

/// Parse a stylesheet into a fresh tree
pub fn parse(source: &str) -> ParseResult<Tree> {
    Parser::new(source)?.parse_stylesheet()
}

/// Recursive descent parser producing the arena tree
pub struct Parser<'src> {
    source: &'src str,
    tokens: Vec<(Token<'src>, Range<usize>)>,
    pos: usize,
    tree: Tree,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> ParseResult<Self> {
        let tokens = tokenize(source).map_err(|span| ParseError::LexError { span: span.into() })?;
        Ok(Self {
            source,
            tokens,
            pos: 0,
            tree: Tree::new(),
        })
    }

    /// Parse the whole input and hand over the tree
    pub fn parse_stylesheet(mut self) -> ParseResult<Tree> {
        let root = self.tree.root();
        self.parse_rule_list(root, true)?;

        let has_content = self.tree.children(root).into_iter().any(|item| {
            !matches!(self.tree.atrule(item), Some(atrule) if is_leading_atrule(&atrule.name))
        });
        self.tree.stylesheet_mut().leading_at_rules_allowed = !has_content;

        Ok(self.tree)
    }

    // ---------------------------------------------------------------------
    // Blocks
    // ---------------------------------------------------------------------

    fn parse_rule_list(&mut self, list: NodeId, top_level: bool) -> ParseResult<()> {
        loop {
            self.skip_whitespace();
            match self.peek() {
                None if top_level => return Ok(()),
                None => return Err(ParseError::unexpected_eof("'}'")),
                Some(Token::RBrace) if top_level => {
                    return Err(ParseError::unexpected_token(
                        self.peek_span(),
                        "rule or at-rule",
                        "'}'",
                    ));
                }
                Some(Token::RBrace) => return Ok(()),
                Some(Token::Semicolon) => {
                    self.advance();
                }
                Some(Token::AtKeyword(_)) => self.parse_atrule(list)?,
                Some(_) => self.parse_rule(list)?,
            }
        }
    }

    fn parse_declaration_list(&mut self, block: NodeId) -> ParseResult<()> {
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(ParseError::unexpected_eof("'}'")),
                Some(Token::RBrace) => return Ok(()),
                Some(Token::Semicolon) => {
                    self.advance();
                }
                Some(Token::AtKeyword(_)) => self.parse_atrule(block)?,
                Some(_) => self.parse_declaration(block)?,
            }
        }
    }

    fn parse_atrule(&mut self, list: NodeId) -> ParseResult<()> {
        let name = match self.advance() {
            Some((Token::AtKeyword(name), _)) => name.to_string(),
            Some((token, span)) => {
                return Err(ParseError::unexpected_token(span, "at-keyword", token.to_string()))
            }
            None => return Err(ParseError::unexpected_eof("at-keyword")),
        };

        let prelude_start = self.pos;
        let prelude_end = self.scan_until(|token| {
            matches!(token, Token::LBrace | Token::Semicolon | Token::RBrace)
        });
        let prelude = self.compact_text(prelude_start..prelude_end);
        let prelude = if prelude.is_empty() { None } else { Some(prelude) };

        let block = match self.peek() {
            Some(Token::LBrace) => {
                self.advance();
                let block = self.tree.new_block(false);
                let basename = strip_vendor_prefix(&name).to_ascii_lowercase();
                if DECLARATION_BLOCK_ATRULES.contains(&basename.as_str()) {
                    self.parse_declaration_list(block)?;
                } else {
                    self.parse_rule_list(block, false)?;
                }
                self.expect(Token::RBrace, "'}'")?;
                Some(block)
            }
            Some(Token::Semicolon) => {
                self.advance();
                None
            }
            _ => None,
        };

        let atrule = self.tree.new_atrule(name, prelude, block);
        self.tree.append(list, atrule);
        Ok(())
    }

    fn parse_rule(&mut self, list: NodeId) -> ParseResult<()> {
        let start = self.pos;
        let end = self.scan_until(|token| {
            matches!(token, Token::LBrace | Token::RBrace | Token::Semicolon)
        });

        match self.peek() {
            Some(Token::LBrace) => {}
            Some(token) => {
                return Err(ParseError::unexpected_token(
                    self.peek_span(),
                    "'{'",
                    token.to_string(),
                ))
            }
            None => return Err(ParseError::unexpected_eof("'{'")),
        }

        let span = self.span_of(start..end);
        let prelude = self.read_rule_prelude(start..end, span)?;

        self.advance();
        let block = self.tree.new_block(false);
        self.parse_declaration_list(block)?;
        self.expect(Token::RBrace, "'}'")?;

        let rule = self.tree.new_rule(prelude, block, None);
        self.tree.append(list, rule);
        Ok(())
    }

    fn parse_declaration(&mut self, block: NodeId) -> ParseResult<()> {
        let start_span = self.peek_span();
        let mut property = String::new();

        // legacy `*zoom` hack
        if matches!(self.peek(), Some(Token::Delim('*'))) {
            self.advance();
            property.push('*');
        }

        match self.advance() {
            Some((Token::Ident(name), _)) => property.push_str(name),
            Some((token, span)) => {
                return Err(ParseError::unexpected_token(span, "property name", token.to_string()))
            }
            None => return Err(ParseError::unexpected_eof("property name")),
        }

        self.skip_whitespace();
        match self.advance() {
            Some((Token::Colon, _)) => {}
            Some((_, span)) => {
                return Err(ParseError::invalid_syntax(
                    start_span.start..span.end,
                    "expected ':' after property name",
                ))
            }
            None => return Err(ParseError::unexpected_eof("':'")),
        }

        let value_start = self.pos;
        let mut value_end =
            self.scan_until(|token| matches!(token, Token::Semicolon | Token::RBrace));
        let important = self.strip_important(value_start, &mut value_end);

        let value = if property.starts_with("--") {
            Value::Raw(self.collapsed_text(value_start..value_end))
        } else {
            let mut cursor = value_start;
            match self.read_value(&mut cursor, value_end, false) {
                Some(nodes) if !nodes.is_empty() => Value::Tokens(nodes),
                _ => Value::Raw(self.collapsed_text(value_start..value_end)),
            }
        };

        let declaration = self
            .tree
            .new_declaration(Declaration::new(property, value, important));
        self.tree.append(block, declaration);
        Ok(())
    }

    /// Detect a trailing `!important`, shrinking the value range in front of it
    fn strip_important(&self, start: usize, end: &mut usize) -> bool {
        let mut last = *end;
        while last > start && self.tokens[last - 1].0.is_whitespace() {
            last -= 1;
        }
        if last == start {
            return false;
        }
        match self.tokens[last - 1].0 {
            Token::Ident(name) if name.eq_ignore_ascii_case("important") => {}
            _ => return false,
        }
        let mut bang = last - 1;
        while bang > start && self.tokens[bang - 1].0.is_whitespace() {
            bang -= 1;
        }
        if bang > start && self.tokens[bang - 1].0.is_delim('!') {
            *end = bang - 1;
            true
        } else {
            false
        }
    }

    // ---------------------------------------------------------------------
    // Selectors
    // ---------------------------------------------------------------------

    fn read_rule_prelude(&self, range: Range<usize>, span: TokenSpan) -> ParseResult<SelectorList> {
        let mut selectors = Vec::new();
        for part in self.split_commas(range) {
            let text = self.collapsed_text(part.clone());
            if text.is_empty() {
                return Err(ParseError::invalid_syntax(span, "empty selector"));
            }
            selectors.push(self.read_selector(part, false).unwrap_or_else(|| Selector::raw(text)));
        }
        Ok(SelectorList::new(selectors))
    }

    fn read_selector_list(&self, range: Range<usize>, relative: bool) -> Option<SelectorList> {
        let selectors = self
            .split_commas(range)
            .into_iter()
            .map(|part| self.read_selector(part, relative))
            .collect::<Option<Vec<_>>>()?;
        Some(SelectorList::new(selectors))
    }

    fn read_selector(&self, range: Range<usize>, relative: bool) -> Option<Selector> {
        let mut children: Vec<SimpleSelector> = Vec::new();
        let mut pending_descendant = false;
        let mut i = range.start;

        while i < range.end {
            match self.tokens[i].0 {
                Token::Whitespace => {
                    pending_descendant = true;
                    i += 1;
                    continue;
                }
                Token::Delim(c @ ('>' | '+' | '~')) => {
                    if (children.is_empty() && !relative)
                        || matches!(children.last(), Some(SimpleSelector::Combinator { .. }))
                    {
                        return None;
                    }
                    children.push(SimpleSelector::Combinator {
                        name: c.to_string(),
                    });
                    pending_descendant = false;
                    i += 1;
                    continue;
                }
                _ => {}
            }

            if pending_descendant
                && !children.is_empty()
                && !matches!(children.last(), Some(SimpleSelector::Combinator { .. }))
            {
                children.push(SimpleSelector::Combinator {
                    name: " ".to_string(),
                });
            }
            pending_descendant = false;

            let simple = self.read_simple_selector(&mut i, range.end)?;
            children.push(simple);
        }

        if children.is_empty() || matches!(children.last(), Some(SimpleSelector::Combinator { .. })) {
            return None;
        }
        Some(Selector::new(children))
    }

    fn read_simple_selector(&self, i: &mut usize, end: usize) -> Option<SimpleSelector> {
        let token = self.tokens[*i].0;
        *i += 1;

        match token {
            Token::Ident(_) | Token::Delim('*') => {
                let mut name = match token {
                    Token::Ident(name) => name.to_string(),
                    _ => "*".to_string(),
                };
                if *i + 1 < end && self.tokens[*i].0.is_delim('|') {
                    match self.tokens[*i + 1].0 {
                        Token::Ident(local) => name = format!("{}|{}", name, local),
                        Token::Delim('*') => name = format!("{}|*", name),
                        _ => return None,
                    }
                    *i += 2;
                }
                Some(SimpleSelector::Type { name })
            }
            Token::Hash(name) => Some(SimpleSelector::Id {
                name: name.to_string(),
            }),
            Token::Delim('.') => match self.tokens.get(*i).map(|(token, _)| *token) {
                Some(Token::Ident(name)) if *i < end => {
                    *i += 1;
                    Some(SimpleSelector::Class {
                        name: name.to_string(),
                    })
                }
                _ => None,
            },
            Token::Percentage(value) => Some(SimpleSelector::Percentage {
                value: format!("{}%", value),
            }),
            Token::LBracket => self.read_attribute(i, end),
            Token::Colon => self.read_pseudo(i, end),
            _ => None,
        }
    }

    fn read_pseudo(&self, i: &mut usize, end: usize) -> Option<SimpleSelector> {
        let element = *i < end && self.tokens[*i].0 == Token::Colon;
        if element {
            *i += 1;
        }
        if *i >= end {
            return None;
        }

        let token = self.tokens[*i].0;
        *i += 1;
        match token {
            Token::Ident(name) if element => Some(SimpleSelector::PseudoElement {
                name: name.to_string(),
                argument: None,
            }),
            Token::Ident(name) => Some(SimpleSelector::PseudoClass {
                name: name.to_string(),
                argument: None,
            }),
            Token::Function(name) => {
                let close = self.find_closing(*i, end)?;
                let inner = *i..close;
                *i = close + 1;

                if element {
                    return Some(SimpleSelector::PseudoElement {
                        name: name.to_string(),
                        argument: Some(self.collapsed_text(inner)),
                    });
                }

                let lower = name.to_ascii_lowercase();
                let argument = if SELECTOR_ARGUMENT_PSEUDOS.contains(&lower.as_str()) {
                    PseudoArgument::Selectors(self.read_selector_list(inner, lower == "has")?)
                } else {
                    PseudoArgument::Raw(self.collapsed_text(inner))
                };
                Some(SimpleSelector::PseudoClass {
                    name: name.to_string(),
                    argument: Some(argument),
                })
            }
            _ => None,
        }
    }

    fn read_attribute(&self, i: &mut usize, end: usize) -> Option<SimpleSelector> {
        let token_at = |index: usize| -> Option<Token<'src>> {
            if index < end {
                Some(self.tokens[index].0)
            } else {
                None
            }
        };
        let skip_ws = |index: &mut usize| {
            while matches!(token_at(*index), Some(Token::Whitespace)) {
                *index += 1;
            }
        };

        skip_ws(i);
        let mut name = match token_at(*i)? {
            Token::Ident(name) => name.to_string(),
            _ => return None,
        };
        *i += 1;
        if matches!(token_at(*i), Some(Token::Delim('|'))) {
            if let Some(Token::Ident(local)) = token_at(*i + 1) {
                name = format!("{}|{}", name, local);
                *i += 2;
            }
        }
        skip_ws(i);

        let mut attribute = AttributeSelector {
            name,
            matcher: None,
            value: None,
            flags: None,
        };

        match token_at(*i)? {
            Token::RBracket => {
                *i += 1;
                return Some(SimpleSelector::Attribute(attribute));
            }
            Token::Delim('=') => {
                attribute.matcher = Some("=".to_string());
                *i += 1;
            }
            Token::Delim(c @ ('~' | '|' | '^' | '$' | '*')) => {
                if !matches!(token_at(*i + 1), Some(Token::Delim('='))) {
                    return None;
                }
                attribute.matcher = Some(format!("{}=", c));
                *i += 2;
            }
            _ => return None,
        }

        skip_ws(i);
        attribute.value = match token_at(*i)? {
            Token::Ident(value) | Token::String(value) | Token::Number(value) | Token::Dimension(value) => {
                Some(value.to_string())
            }
            _ => return None,
        };
        *i += 1;
        skip_ws(i);

        if let Some(Token::Ident(flags)) = token_at(*i) {
            attribute.flags = Some(flags.to_string());
            *i += 1;
            skip_ws(i);
        }

        match token_at(*i)? {
            Token::RBracket => {
                *i += 1;
                Some(SimpleSelector::Attribute(attribute))
            }
            _ => None,
        }
    }

    // ---------------------------------------------------------------------
    // Values
    // ---------------------------------------------------------------------

    /// Read value tokens up to `end`, or up to the `)` closing the enclosing
    /// function when `nested`. `None` means the value is not understood.
    fn read_value(&self, pos: &mut usize, end: usize, nested: bool) -> Option<Vec<ValueNode>> {
        let mut nodes = Vec::new();

        while *pos < end {
            let token = self.tokens[*pos].0;
            *pos += 1;

            let node = match token {
                Token::Whitespace => ValueNode::WhiteSpace,
                Token::Ident(name) => ValueNode::Identifier {
                    name: name.to_string(),
                },
                Token::Number(value) => ValueNode::Number {
                    value: value.to_string(),
                },
                Token::Percentage(value) => ValueNode::Percentage {
                    value: value.to_string(),
                },
                Token::Dimension(text) => {
                    let (value, unit) = split_dimension(text);
                    ValueNode::Dimension {
                        value: value.to_string(),
                        unit: unit.to_string(),
                    }
                }
                Token::Hash(value) if is_hex_color(value) => ValueNode::HexColor {
                    value: value.to_string(),
                },
                Token::String(value) => ValueNode::String {
                    value: value.to_string(),
                },
                Token::Url(value) => ValueNode::Url {
                    value: value.to_string(),
                },
                Token::Function(name) => {
                    let children = self.read_value(pos, end, true)?;
                    if name.eq_ignore_ascii_case("url") {
                        match children.as_slice() {
                            [ValueNode::String { value }] => ValueNode::Url {
                                value: value.clone(),
                            },
                            _ => return None,
                        }
                    } else {
                        ValueNode::Function {
                            name: name.to_string(),
                            children,
                        }
                    }
                }
                Token::LParen => ValueNode::Parentheses {
                    children: self.read_value(pos, end, true)?,
                },
                Token::RParen if nested => return Some(tidy_whitespace(nodes)),
                Token::Comma => ValueNode::Operator {
                    value: ",".to_string(),
                },
                Token::Delim(c @ ('/' | '+' | '-' | '*')) => ValueNode::Operator {
                    value: c.to_string(),
                },
                _ => return None,
            };
            nodes.push(node);
        }

        if nested {
            None
        } else {
            Some(tidy_whitespace(nodes))
        }
    }

    // ---------------------------------------------------------------------
    // Token helpers
    // ---------------------------------------------------------------------

    fn peek(&self) -> Option<Token<'src>> {
        self.tokens.get(self.pos).map(|(token, _)| *token)
    }

    fn peek_span(&self) -> Range<usize> {
        self.tokens
            .get(self.pos)
            .map(|(_, span)| span.clone())
            .unwrap_or(self.source.len()..self.source.len())
    }

    fn advance(&mut self) -> Option<(Token<'src>, Range<usize>)> {
        let item = self.tokens.get(self.pos).cloned();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }

    fn expect(&mut self, expected: Token<'src>, description: &str) -> ParseResult<()> {
        match self.advance() {
            Some((token, _)) if token == expected => Ok(()),
            Some((token, span)) => Err(ParseError::unexpected_token(span, description, token.to_string())),
            None => Err(ParseError::unexpected_eof(description)),
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(Token::Whitespace)) {
            self.pos += 1;
        }
    }

    /// Advance to the first token matching `stop` outside of any bracket pair
    /// and return its index (not consumed)
    fn scan_until(&mut self, stop: impl Fn(&Token<'src>) -> bool) -> usize {
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            if depth == 0 && stop(&token) {
                break;
            }
            match token {
                Token::LParen | Token::Function(_) | Token::LBracket | Token::LBrace => depth += 1,
                Token::RParen | Token::RBracket | Token::RBrace => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.pos += 1;
        }
        self.pos
    }

    /// Index of the `)` matching an already consumed opening at `start - 1`
    fn find_closing(&self, start: usize, end: usize) -> Option<usize> {
        let mut depth = 1usize;
        for index in start..end {
            match self.tokens[index].0 {
                Token::LParen | Token::Function(_) => depth += 1,
                Token::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(index);
                    }
                }
                _ => {}
            }
        }
        None
    }

    fn split_commas(&self, range: Range<usize>) -> Vec<Range<usize>> {
        let mut parts = Vec::new();
        let mut depth = 0usize;
        let mut start = range.start;
        for index in range.clone() {
            match self.tokens[index].0 {
                Token::LParen | Token::Function(_) | Token::LBracket => depth += 1,
                Token::RParen | Token::RBracket => depth = depth.saturating_sub(1),
                Token::Comma if depth == 0 => {
                    parts.push(start..index);
                    start = index + 1;
                }
                _ => {}
            }
        }
        parts.push(start..range.end);
        parts
    }

    fn span_of(&self, range: Range<usize>) -> TokenSpan {
        let start = self
            .tokens
            .get(range.start)
            .map(|(_, span)| span.start)
            .unwrap_or(self.source.len());
        let end = if range.end > range.start {
            self.tokens[range.end - 1].1.end
        } else {
            start
        };
        TokenSpan::new(start, end)
    }

    fn token_text(&self, index: usize) -> &'src str {
        &self.source[self.tokens[index].1.clone()]
    }

    /// Source text of a token range with whitespace runs collapsed and trimmed
    fn collapsed_text(&self, range: Range<usize>) -> String {
        self.join_tokens(range, false)
    }

    /// Like [`Self::collapsed_text`], also dropping spaces after `(`, `,`, `:`
    /// and before `)`, `,`
    fn compact_text(&self, range: Range<usize>) -> String {
        self.join_tokens(range, true)
    }

    fn join_tokens(&self, range: Range<usize>, compact: bool) -> String {
        let mut text = String::new();
        let mut pending_space = false;
        for index in range {
            let token = self.tokens[index].0;
            if token.is_whitespace() {
                pending_space = !text.is_empty();
                continue;
            }
            if pending_space {
                let after_opening = text.ends_with(['(', ',', ':']);
                let before_closing = matches!(token, Token::RParen | Token::Comma);
                if !compact || !(after_opening || before_closing) {
                    text.push(' ');
                }
            }
            pending_space = false;
            text.push_str(self.token_text(index));
        }
        text
    }
}

fn is_leading_atrule(name: &str) -> bool {
    name.eq_ignore_ascii_case("charset") || name.eq_ignore_ascii_case("import")
}

fn is_hex_color(value: &str) -> bool {
    matches!(value.len(), 3 | 4 | 6 | 8) && value.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Drop leading/trailing whitespace, collapse runs, and drop whitespace
/// around `,` and `/`
fn tidy_whitespace(nodes: Vec<ValueNode>) -> Vec<ValueNode> {
    let eats_space = |node: &ValueNode| {
        matches!(node, ValueNode::Operator { value } if value == "," || value == "/")
    };

    let mut out: Vec<ValueNode> = Vec::with_capacity(nodes.len());
    for node in nodes {
        if matches!(node, ValueNode::WhiteSpace) {
            match out.last() {
                None | Some(ValueNode::WhiteSpace) => continue,
                Some(last) if eats_space(last) => continue,
                _ => out.push(node),
            }
        } else {
            if eats_space(&node) && matches!(out.last(), Some(ValueNode::WhiteSpace)) {
                out.pop();
            }
            out.push(node);
        }
    }
    if matches!(out.last(), Some(ValueNode::WhiteSpace)) {
        out.pop();
    }
    out
}
