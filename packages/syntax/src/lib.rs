//! Stylesheet syntax: arena tree, tokenizer, parser and compact serializer.

pub mod ast;
pub mod error;
pub mod parser;
pub mod serializer;
pub mod tokenizer;
pub mod tree;
pub mod visitor;

pub use ast::*;
pub use error::{format_error, ParseError, ParseResult, TokenSpan};
pub use parser::{parse, Parser};
pub use serializer::{
    generate_declaration, generate_selector, generate_selector_list, generate_value,
    generate_value_node, generate_value_nodes, serialize,
};
pub use tokenizer::{tokenize, Token};
pub use tree::Tree;
pub use visitor::{walk_atrules, walk_rules, WalkContext};
