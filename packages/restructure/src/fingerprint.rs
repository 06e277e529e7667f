//! Declaration fingerprints
//!
//! A fingerprint keeps only what decides whether one value may silently
//! replace another: vendor prefixes, legacy `\0`/`\9` hacks, functions,
//! poorly supported units and keywords that must not be mixed. Two
//! declarations of the same property with equal fingerprints are
//! interchangeable for override analysis.

use crate::error::RestructureResult;
use csspress_syntax::{generate_value, strip_vendor_prefix, vendor_prefix, Declaration, Value, ValueNode};
use regex::Regex;
use std::collections::{BTreeSet, HashMap};

/// Keywords that may be overridden freely, per property
const SAFE_VALUES: &[(&str, &[&str])] = &[
    (
        "cursor",
        &[
            "auto",
            "crosshair",
            "default",
            "move",
            "text",
            "wait",
            "help",
            "n-resize",
            "e-resize",
            "s-resize",
            "w-resize",
            "ne-resize",
            "nw-resize",
            "se-resize",
            "sw-resize",
            "pointer",
            "progress",
            "not-allowed",
            "no-drop",
            "vertical-text",
            "all-scroll",
            "col-resize",
            "row-resize",
        ],
    ),
    ("overflow", &["hidden", "visible", "scroll", "auto"]),
    ("position", &["static", "relative", "absolute", "fixed"]),
];

/// Units with uneven browser support
const SPECIAL_UNITS: &[&str] = &["rem", "vw", "vh", "vmin", "vmax", "vm"];

pub struct Fingerprinter {
    hack: Regex,
    dont_mix_display: Regex,
    dont_mix_text_align: Regex,
    cache: HashMap<u32, String>,
    raw_count: usize,
}

impl Fingerprinter {
    pub fn new() -> RestructureResult<Self> {
        Ok(Self {
            hack: Regex::new(r"\\[09]")?,
            dont_mix_display: Regex::new(r"(?i)table|ruby|flex|-(flex)?box$|grid|contents|run-in")?,
            dont_mix_text_align: Regex::new(r"(?i)^(start|end|match-parent|justify-all)$")?,
            cache: HashMap::new(),
            raw_count: 0,
        })
    }

    /// `property + summary` for a declaration under its own property name
    pub fn fingerprint(&mut self, declaration: &Declaration) -> String {
        self.fingerprint_as(&declaration.property, declaration)
    }

    /// Fingerprint of a declaration's value as if it were set on `property`
    pub fn fingerprint_as(&mut self, property: &str, declaration: &Declaration) -> String {
        let basename = strip_vendor_prefix(property.trim_start_matches(['*', '_'])).to_ascii_lowercase();

        if basename == "background" {
            return format!("{}:{}", property, generate_value(&declaration.value));
        }

        if let Some(summary) = self.cache.get(&declaration.id) {
            return format!("{}{}", property, summary);
        }

        let summary = self.summarize(&basename, declaration);
        self.cache.insert(declaration.id, summary.clone());
        format!("{}{}", property, summary)
    }

    fn summarize(&mut self, basename: &str, declaration: &Declaration) -> String {
        let nodes = match &declaration.value {
            Value::Raw(text) => return format!("raw:{}", text),
            Value::Tokens(nodes) => nodes,
        };

        let mut summary = Summary::default();
        self.walk(basename, nodes, &mut summary);

        if summary.raw {
            self.raw_count += 1;
            return format!("raw:#{}", self.raw_count);
        }

        let specials = summary.specials.into_iter().collect::<Vec<_>>().join(",");
        format!("!{}|{}|{}", specials, summary.hack, summary.vendor)
    }

    fn walk(&self, basename: &str, nodes: &[ValueNode], summary: &mut Summary) {
        for node in nodes {
            match node {
                ValueNode::Parentheses { children } => self.walk(basename, children, summary),
                ValueNode::Raw { .. } => summary.raw = true,
                ValueNode::Identifier { name } => {
                    summary.note_vendor(name);
                    if let Some(found) = self.hack.find(name) {
                        summary.note_hack(found.as_str());
                    }

                    if let Some((_, safe)) = SAFE_VALUES.iter().find(|(property, _)| *property == basename) {
                        if !safe.contains(&name.as_str()) {
                            summary.specials.insert(name.clone());
                        }
                    } else if self.dont_mix(basename, name) {
                        summary.specials.insert(name.clone());
                    }
                }
                ValueNode::Function { name, children } => {
                    summary.note_vendor(name);

                    // rect(a, b, c, d) and rect(a b c d) must not replace each other
                    let has_comma = children
                        .iter()
                        .any(|child| matches!(child, ValueNode::Operator { value } if value == ","));
                    let name = if name == "rect" && !has_comma { "rect-backward" } else { name };
                    summary.specials.insert(format!("{}()", name));

                    self.walk(basename, children, summary);
                }
                ValueNode::Dimension { unit, .. } => {
                    if let Some(found) = self.hack.find(unit) {
                        summary.note_hack(found.as_str());
                    }
                    if SPECIAL_UNITS.contains(&unit.as_str()) {
                        summary.specials.insert(unit.clone());
                    }
                }
                _ => {}
            }
        }
    }

    fn dont_mix(&self, basename: &str, name: &str) -> bool {
        match basename {
            "display" => self.dont_mix_display.is_match(name),
            "text-align" => self.dont_mix_text_align.is_match(name),
            _ => false,
        }
    }
}

#[derive(Default)]
struct Summary {
    specials: BTreeSet<String>,
    hack: String,
    vendor: String,
    raw: bool,
}

impl Summary {
    fn note_vendor(&mut self, name: &str) {
        if self.vendor.is_empty() {
            self.vendor = vendor_prefix(name).to_string();
        }
    }

    fn note_hack(&mut self, hack: &str) {
        if self.hack.is_empty() {
            self.hack = hack.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use csspress_syntax::parse;

    fn declaration(source: &str, id: u32) -> Declaration {
        let tree = parse(&format!("a{{{}}}", source)).unwrap();
        let rule = tree.rule(tree.first_child(tree.root()).unwrap()).unwrap();
        let mut declaration = tree
            .declaration(tree.first_child(rule.block).unwrap())
            .unwrap()
            .clone();
        declaration.id = id;
        declaration
    }

    fn fingerprint(source: &str) -> String {
        Fingerprinter::new().unwrap().fingerprint(&declaration(source, 1))
    }

    #[test]
    fn test_plain_values_share_a_fingerprint() {
        assert_eq!(fingerprint("color:red"), fingerprint("color:#00f"));
        assert_eq!(fingerprint("margin:0 auto"), fingerprint("margin:1px"));
        assert_eq!(fingerprint("color:red"), "color!||");
    }

    #[test]
    fn test_functions_and_units_are_special() {
        assert_eq!(fingerprint("color:rgba(0,0,0,.5)"), "color!rgba()||");
        assert_eq!(fingerprint("width:1rem"), "width!rem||");
        assert_ne!(fingerprint("width:1rem"), fingerprint("width:1px"));
    }

    #[test]
    fn test_rect_forms() {
        assert_eq!(fingerprint("clip:rect(1px,2px,3px,4px)"), "clip!rect()||");
        assert_eq!(fingerprint("clip:rect(1px 2px 3px 4px)"), "clip!rect-backward()||");
    }

    #[test]
    fn test_vendor_and_hack() {
        assert_eq!(fingerprint("display:-webkit-box"), "display!-webkit-box||-webkit-");
        assert_eq!(fingerprint("color:red\\9"), "color!|\\9|");
    }

    #[test]
    fn test_safe_values_and_dont_mix() {
        assert_eq!(fingerprint("cursor:pointer"), "cursor!||");
        assert_eq!(fingerprint("cursor:grab"), "cursor!grab||");
        assert_eq!(fingerprint("display:block"), "display!||");
        assert_eq!(fingerprint("display:inline-flex"), "display!inline-flex||");
        assert_eq!(fingerprint("text-align:start"), "text-align!start||");
        assert_eq!(fingerprint("text-align:left"), "text-align!||");
    }

    #[test]
    fn test_background_is_literal() {
        assert_eq!(fingerprint("background:red"), "background:red");
        assert_ne!(fingerprint("background:red"), fingerprint("background:blue"));
    }

    #[test]
    fn test_raw_values() {
        assert_eq!(fingerprint("--x:1 2"), "--xraw:1 2");

        let mut fingerprinter = Fingerprinter::new().unwrap();
        let mut first = declaration("color:red", 1);
        first.value = Value::Tokens(vec![ValueNode::Raw { value: "x".into() }]);
        let mut second = first.clone();
        second.id = 2;
        assert_ne!(fingerprinter.fingerprint(&first), fingerprinter.fingerprint(&second));
        assert_eq!(fingerprinter.fingerprint(&first), fingerprinter.fingerprint(&first));
    }

    #[test]
    fn test_alternate_property_name() {
        let mut fingerprinter = Fingerprinter::new().unwrap();
        let margin_top = declaration("margin-top:1px", 7);
        assert_eq!(fingerprinter.fingerprint_as("margin", &margin_top), "margin!||");
    }
}
