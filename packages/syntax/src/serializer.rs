//! Compact serializer
//!
//! Emits the shortest form the tree allows without changing values:
//! no whitespace between tokens except where a value requires it.
//! The same generators produce the canonical text used for selector ids and
//! declaration ids.

use crate::ast::*;
use crate::tree::Tree;

/// Serialize a whole tree
pub fn serialize(tree: &Tree) -> String {
    let mut output = String::new();
    write_list(tree, tree.root(), &mut output);
    output
}

fn write_list(tree: &Tree, list: NodeId, output: &mut String) {
    let mut prev: Option<NodeId> = None;
    for item in tree.children(list) {
        if let Some(prev) = prev {
            if tree.kind(prev) == NodeKind::Declaration {
                output.push(';');
            }
        }
        write_item(tree, item, output);
        prev = Some(item);
    }
}

fn write_item(tree: &Tree, id: NodeId, output: &mut String) {
    match tree.node(id) {
        Node::Rule(rule) => {
            output.push_str(&generate_selector_list(&rule.prelude));
            output.push('{');
            write_list(tree, rule.block, output);
            output.push('}');
        }
        Node::Atrule(atrule) => {
            output.push('@');
            output.push_str(&atrule.name);
            if let Some(prelude) = &atrule.prelude {
                output.push(' ');
                output.push_str(prelude);
            }
            match atrule.block {
                Some(block) => {
                    output.push('{');
                    write_list(tree, block, output);
                    output.push('}');
                }
                None => output.push(';'),
            }
        }
        Node::Declaration(declaration) => output.push_str(&generate_declaration(declaration)),
        Node::Block(_) | Node::Stylesheet(_) => write_list(tree, id, output),
    }
}

/// `property:value` with a trailing `!important` when set
pub fn generate_declaration(declaration: &Declaration) -> String {
    let mut text = format!(
        "{}:{}",
        declaration.property,
        generate_value(&declaration.value)
    );
    if declaration.important {
        text.push_str("!important");
    }
    text
}

pub fn generate_value(value: &Value) -> String {
    match value {
        Value::Tokens(nodes) => generate_value_nodes(nodes),
        Value::Raw(text) => text.clone(),
    }
}

pub fn generate_value_nodes(nodes: &[ValueNode]) -> String {
    let mut text = String::new();
    for node in nodes {
        write_value_node(node, &mut text);
    }
    text
}

pub fn generate_value_node(node: &ValueNode) -> String {
    let mut text = String::new();
    write_value_node(node, &mut text);
    text
}

fn write_value_node(node: &ValueNode, text: &mut String) {
    match node {
        ValueNode::Identifier { name } => text.push_str(name),
        ValueNode::Number { value } => text.push_str(value),
        ValueNode::Dimension { value, unit } => {
            text.push_str(value);
            text.push_str(unit);
        }
        ValueNode::Percentage { value } => {
            text.push_str(value);
            text.push('%');
        }
        ValueNode::HexColor { value } => {
            text.push('#');
            text.push_str(value);
        }
        ValueNode::Function { name, children } => {
            text.push_str(name);
            text.push('(');
            for child in children {
                write_value_node(child, text);
            }
            text.push(')');
        }
        ValueNode::String { value } | ValueNode::Operator { value } | ValueNode::Raw { value } => {
            text.push_str(value)
        }
        ValueNode::Url { value } => {
            text.push_str("url(");
            text.push_str(value);
            text.push(')');
        }
        ValueNode::Parentheses { children } => {
            text.push('(');
            for child in children {
                write_value_node(child, text);
            }
            text.push(')');
        }
        ValueNode::WhiteSpace => text.push(' '),
    }
}

pub fn generate_selector_list(list: &SelectorList) -> String {
    list.selectors
        .iter()
        .map(generate_selector)
        .collect::<Vec<_>>()
        .join(",")
}

pub fn generate_selector(selector: &Selector) -> String {
    let mut text = String::new();
    for child in &selector.children {
        write_simple_selector(child, &mut text);
    }
    text
}

fn write_simple_selector(selector: &SimpleSelector, text: &mut String) {
    match selector {
        SimpleSelector::Type { name } => text.push_str(name),
        SimpleSelector::Id { name } => {
            text.push('#');
            text.push_str(name);
        }
        SimpleSelector::Class { name } => {
            text.push('.');
            text.push_str(name);
        }
        SimpleSelector::Attribute(attribute) => {
            text.push('[');
            text.push_str(&attribute.name);
            if let (Some(matcher), Some(value)) = (&attribute.matcher, &attribute.value) {
                text.push_str(matcher);
                text.push_str(value);
            }
            if let Some(flags) = &attribute.flags {
                text.push(' ');
                text.push_str(flags);
            }
            text.push(']');
        }
        SimpleSelector::PseudoClass { name, argument } => {
            text.push(':');
            text.push_str(name);
            if let Some(argument) = argument {
                text.push('(');
                match argument {
                    PseudoArgument::Selectors(list) => text.push_str(&generate_selector_list(list)),
                    PseudoArgument::Raw(raw) => text.push_str(raw),
                }
                text.push(')');
            }
        }
        SimpleSelector::PseudoElement { name, argument } => {
            text.push_str("::");
            text.push_str(name);
            if let Some(argument) = argument {
                text.push('(');
                text.push_str(argument);
                text.push(')');
            }
        }
        SimpleSelector::Percentage { value } => text.push_str(value),
        SimpleSelector::Combinator { name } => text.push_str(name),
        SimpleSelector::Raw(raw) => text.push_str(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn roundtrip(source: &str) -> String {
        serialize(&parse(source).unwrap())
    }

    #[test]
    fn test_compact_rule() {
        assert_eq!(
            roundtrip(".a , .b > c { color : red ; margin : 0 auto ! important }"),
            ".a,.b>c{color:red;margin:0 auto!important}"
        );
    }

    #[test]
    fn test_atrules_and_nested_blocks() {
        assert_eq!(
            roundtrip("@import url(a.css);\n@media print {\n  a { color: red }\n}\n"),
            "@import url(a.css);@media print{a{color:red}}"
        );
    }

    #[test]
    fn test_values() {
        assert_eq!(
            roundtrip("a{background:url( 'x.png' ) no-repeat, #FFF rgb( 1 , 2 , 3 );width:calc(100% - 2px)}"),
            "a{background:url('x.png') no-repeat,#FFF rgb(1,2,3);width:calc(100% - 2px)}"
        );
    }

    #[test]
    fn test_selectors() {
        assert_eq!(
            roundtrip("a:not( .b ),svg|rect[x='1' i]::before,li:nth-child( 2n + 1 ){x:y}"),
            "a:not(.b),svg|rect[x='1' i]::before,li:nth-child(2n + 1){x:y}"
        );
    }

    #[test]
    fn test_keyframes_and_raw() {
        assert_eq!(
            roundtrip("@keyframes spin { from { x : y } 50% { x : z } }"),
            "@keyframes spin{from{x:y}50%{x:z}}"
        );
        assert_eq!(roundtrip("a{--x: 1  2 }"), "a{--x:1 2}");
    }
}
