use serde::{Deserialize, Serialize};

/// Handle to a node stored in a [`Tree`](crate::tree::Tree) arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identity of a list container, used to bucket per-scope state
pub type ScopeId = u32;

/// Every node kind that lives in the arena
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Node {
    Stylesheet(Stylesheet),
    Atrule(Atrule),
    Rule(Rule),
    Block(Block),
    Declaration(Declaration),
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Stylesheet(_) => NodeKind::Stylesheet,
            Node::Atrule(_) => NodeKind::Atrule,
            Node::Rule(_) => NodeKind::Rule,
            Node::Block(_) => NodeKind::Block,
            Node::Declaration(_) => NodeKind::Declaration,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Stylesheet,
    Atrule,
    Rule,
    Block,
    Declaration,
}

/// Root list of a parsed stylesheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stylesheet {
    pub scope: ScopeId,
    /// Whether `@charset`/`@import` may still legally appear at the end of this sheet
    pub leading_at_rules_allowed: bool,
}

/// `{ ... }` body of a rule or an at-rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub scope: ScopeId,
    /// Set for `@keyframes` bodies, whose rules must not be split or synthesized
    pub merge_averse: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atrule {
    pub name: String,
    /// Normalized prelude text, doubles as the prelude identity
    pub prelude: Option<String>,
    pub block: Option<NodeId>,
}

impl Atrule {
    /// Lowercased name without a vendor prefix (`-webkit-keyframes` -> `keyframes`)
    pub fn basename(&self) -> String {
        strip_vendor_prefix(&self.name).to_ascii_lowercase()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub prelude: SelectorList,
    pub block: NodeId,
    /// Non-ignorable pseudo classes/elements summary, `None` when there are none
    pub pseudo_signature: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectorList {
    pub selectors: Vec<Selector>,
}

impl SelectorList {
    pub fn new(selectors: Vec<Selector>) -> Self {
        Self { selectors }
    }

    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    pub fn first(&self) -> Option<&Selector> {
        self.selectors.first()
    }
}

/// One comma separated member of a selector list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selector {
    pub children: Vec<SimpleSelector>,
    /// Canonical text, filled by the indexer
    pub id: String,
    /// Specificity/scope/tag summary, filled by the indexer
    pub compare_marker: String,
}

impl Selector {
    pub fn new(children: Vec<SimpleSelector>) -> Self {
        Self {
            children,
            id: String::new(),
            compare_marker: String::new(),
        }
    }

    pub fn raw(text: impl Into<String>) -> Self {
        Self::new(vec![SimpleSelector::Raw(text.into())])
    }

    pub fn is_raw(&self) -> bool {
        self.children
            .iter()
            .any(|child| matches!(child, SimpleSelector::Raw(_)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SimpleSelector {
    /// Element name, `*`, or a namespaced form such as `svg|rect`
    Type { name: String },
    Id { name: String },
    Class { name: String },
    Attribute(AttributeSelector),
    PseudoClass {
        name: String,
        argument: Option<PseudoArgument>,
    },
    PseudoElement {
        name: String,
        argument: Option<String>,
    },
    /// Keyframe offset such as `50%`
    Percentage { value: String },
    /// `" "`, `>`, `+` or `~`
    Combinator { name: String },
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeSelector {
    pub name: String,
    pub matcher: Option<String>,
    /// Value as written, including quotes for string values
    pub value: Option<String>,
    pub flags: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum PseudoArgument {
    Selectors(SelectorList),
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    pub property: String,
    pub value: Value,
    pub important: bool,
    /// Interned identity of the canonical text, filled by the indexer
    pub id: u32,
    /// Length of the canonical text
    pub length: usize,
    /// `property + fingerprint`, filled by the indexer
    pub fingerprint: Option<String>,
}

impl Declaration {
    pub fn new(property: impl Into<String>, value: Value, important: bool) -> Self {
        Self {
            property: property.into(),
            value,
            important,
            id: 0,
            length: 0,
            fingerprint: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    Tokens(Vec<ValueNode>),
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ValueNode {
    Identifier { name: String },
    Number { value: String },
    Dimension { value: String, unit: String },
    Percentage { value: String },
    HexColor { value: String },
    Function { name: String, children: Vec<ValueNode> },
    /// String literal including its quotes
    String { value: String },
    /// Contents between `url(` and `)`, quotes kept as written
    Url { value: String },
    Operator { value: String },
    Parentheses { children: Vec<ValueNode> },
    WhiteSpace,
    Raw { value: String },
}

impl ValueNode {
    pub fn ident(name: impl Into<String>) -> Self {
        ValueNode::Identifier { name: name.into() }
    }
}

/// Split `-webkit-foo` into (`-webkit-`, `foo`); custom properties have no prefix
pub fn vendor_prefix(name: &str) -> &str {
    let bytes = name.as_bytes();
    if bytes.len() > 3 && bytes[0] == b'-' && bytes[1] != b'-' {
        if let Some(pos) = name[2..].find('-') {
            return &name[..pos + 3];
        }
    }
    ""
}

pub fn strip_vendor_prefix(name: &str) -> &str {
    &name[vendor_prefix(name).len()..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_prefix() {
        assert_eq!(vendor_prefix("-webkit-keyframes"), "-webkit-");
        assert_eq!(vendor_prefix("-moz-box"), "-moz-");
        assert_eq!(vendor_prefix("keyframes"), "");
        assert_eq!(vendor_prefix("--custom-prop"), "");
        assert_eq!(vendor_prefix("-x"), "");
    }

    #[test]
    fn test_atrule_basename() {
        let atrule = Atrule {
            name: "-WebKit-Keyframes".to_string(),
            prelude: Some("spin".to_string()),
            block: None,
        };
        assert_eq!(atrule.basename(), "keyframes");
    }

    #[test]
    fn test_raw_selector() {
        assert!(Selector::raw("a!!b").is_raw());
        assert!(!Selector::new(vec![SimpleSelector::Class { name: "a".into() }]).is_raw());
    }
}
