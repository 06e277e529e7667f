//! Annotates a parsed tree for the restructuring passes: declaration ids,
//! lengths and fingerprints, selector ids, compare markers and rule
//! pseudo-signatures. Nothing is moved or removed here, so configuration
//! errors surface before the tree changes shape.

use crate::error::{RestructureError, RestructureResult};
use crate::fingerprint::Fingerprinter;
use crate::options::RestructureOptions;
use crate::specificity::specificity;
use crate::usage::UsageScopes;
use crate::utils::OPAQUE_MARKER;
use csspress_syntax::{
    generate_declaration, generate_selector, walk_atrules, walk_rules, Declaration, NodeId,
    SimpleSelector, Tree,
};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, instrument};

/// Pseudo-classes that never change which rule wins, so they don't split signatures
const NEUTRAL_PSEUDO_CLASSES: &[&str] = &[
    "link",
    "visited",
    "hover",
    "active",
    "first-letter",
    "first-line",
    "after",
    "before",
];

const NEUTRAL_PSEUDO_ELEMENTS: &[&str] = &["first-letter", "first-line", "after", "before"];

pub struct Indexer {
    ids: HashMap<String, u32>,
    pub fingerprinter: Fingerprinter,
    usage: Option<UsageScopes>,
}

impl Indexer {
    pub fn new(options: &RestructureOptions) -> RestructureResult<Self> {
        let usage = match &options.usage {
            Some(usage) => Some(UsageScopes::from_usage(usage)?),
            None => None,
        };

        Ok(Self {
            ids: HashMap::new(),
            fingerprinter: Fingerprinter::new()?,
            usage,
        })
    }

    #[instrument(skip(self, tree))]
    pub fn run(&mut self, tree: &mut Tree) -> RestructureResult<()> {
        let mut failure = None;
        walk_rules(tree, false, |tree, ctx| {
            if failure.is_some() {
                return;
            }
            if let Some(block) = tree.block_of(ctx.item) {
                for item in tree.children(block) {
                    if let Some(declaration) = tree.declaration_mut(item) {
                        self.mark_declaration(declaration);
                    }
                }
            }
            if let Err(error) = self.process_selectors(tree, ctx.item) {
                failure = Some(error);
            }
        });
        if let Some(error) = failure {
            return Err(error);
        }

        walk_atrules(tree, false, |tree, ctx| {
            let is_keyframes = tree
                .atrule(ctx.item)
                .map(|atrule| atrule.basename() == "keyframes")
                .unwrap_or(false);
            if !is_keyframes {
                return;
            }
            let Some(block) = tree.block_of(ctx.item) else {
                return;
            };

            if let Some(block) = tree.block_mut(block) {
                block.merge_averse = true;
            }
            for item in tree.children(block) {
                if let Some(rule) = tree.rule_mut(item) {
                    for selector in &mut rule.prelude.selectors {
                        selector.compare_marker = selector.id.clone();
                    }
                }
            }
        });

        debug!(declarations = self.ids.len(), "Indexed declarations");
        Ok(())
    }

    /// Intern a declaration's canonical text and refresh its fingerprint
    pub fn mark_declaration(&mut self, declaration: &mut Declaration) {
        let text = generate_declaration(declaration);
        let next = self.ids.len() as u32 + 1;

        declaration.length = text.len();
        declaration.id = *self.ids.entry(text).or_insert(next);
        declaration.fingerprint = Some(self.fingerprinter.fingerprint(declaration));
    }

    fn process_selectors(&self, tree: &mut Tree, rule: NodeId) -> RestructureResult<()> {
        let Some(rule) = tree.rule_mut(rule) else {
            return Ok(());
        };

        let mut pseudos = BTreeSet::new();
        let mut raw = Vec::new();

        for selector in &mut rule.prelude.selectors {
            let id = generate_selector(selector);
            selector.id = id;

            if selector.is_raw() {
                selector.compare_marker = OPAQUE_MARKER.to_string();
                raw.push(selector.id.clone());
                continue;
            }

            let mut tag = String::from("*");
            let mut scope = None;

            for node in &selector.children {
                match node {
                    SimpleSelector::Class { name } => {
                        let class_scope = self.usage.as_ref().and_then(|usage| usage.scope_of(name));
                        if let Some(class_scope) = class_scope {
                            if scope.is_some_and(|scope| scope != class_scope) {
                                return Err(RestructureError::SelectorMixesScopes {
                                    selector: selector.id.clone(),
                                });
                            }
                            scope = Some(class_scope);
                        }
                    }
                    SimpleSelector::PseudoClass { name, .. } => {
                        let name = name.to_ascii_lowercase();
                        if !NEUTRAL_PSEUDO_CLASSES.contains(&name.as_str()) {
                            pseudos.insert(format!(":{}", name));
                        }
                    }
                    SimpleSelector::PseudoElement { name, .. } => {
                        let name = name.to_ascii_lowercase();
                        if !NEUTRAL_PSEUDO_ELEMENTS.contains(&name.as_str()) {
                            pseudos.insert(format!("::{}", name));
                        }
                    }
                    SimpleSelector::Attribute(attribute) => {
                        if let Some(flags) = &attribute.flags {
                            pseudos.insert(format!("[{}]", flags.to_ascii_lowercase()));
                        }
                    }
                    SimpleSelector::Type { name } => tag = name.to_ascii_lowercase(),
                    SimpleSelector::Combinator { .. } => tag = String::from("*"),
                    _ => {}
                }
            }

            let [a, b, c] = specificity(selector);
            let mut marker = format!("{},{},{}", a, b, c);
            if let Some(scope) = scope {
                marker.push_str(&format!(":{}", scope));
            }
            if tag != "*" {
                marker.push(',');
                marker.push_str(&tag);
            }
            selector.compare_marker = marker;
        }

        rule.pseudo_signature = if !raw.is_empty() {
            Some(format!("raw:{}", raw.join(",")))
        } else if pseudos.is_empty() {
            None
        } else {
            Some(pseudos.into_iter().collect::<Vec<_>>().join(","))
        };

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Usage;
    use csspress_syntax::{parse, Rule};

    fn indexed(source: &str) -> Tree {
        let mut tree = parse(source).unwrap();
        Indexer::new(&RestructureOptions::default())
            .unwrap()
            .run(&mut tree)
            .unwrap();
        tree
    }

    fn rules(tree: &Tree) -> Vec<Rule> {
        let mut found = Vec::new();
        let mut tree = tree.clone();
        walk_rules(&mut tree, false, |tree, ctx| {
            found.push(tree.rule(ctx.item).unwrap().clone());
        });
        found
    }

    fn markers(rule: &Rule) -> Vec<&str> {
        rule.prelude
            .selectors
            .iter()
            .map(|selector| selector.compare_marker.as_str())
            .collect()
    }

    #[test]
    fn test_identical_declarations_share_an_id() {
        let tree = indexed(".a{color:red;margin:0}.b{color:red}");
        let rules = rules(&tree);
        let first = tree.children(rules[0].block);
        let second = tree.children(rules[1].block);
        let a = tree.declaration(first[0]).unwrap();
        let b = tree.declaration(first[1]).unwrap();
        let c = tree.declaration(second[0]).unwrap();
        assert_eq!(a.id, c.id);
        assert_ne!(a.id, b.id);
        assert_eq!(a.length, "color:red".len());
        assert_eq!(a.fingerprint.as_deref(), Some("color!||"));
    }

    #[test]
    fn test_compare_markers() {
        let tree = indexed("a.b,#x > li,.c .d,svg{x:y}");
        let rules = rules(&tree);
        assert_eq!(markers(&rules[0]), vec!["0,1,1,a", "1,0,1,li", "0,2,0", "0,0,1,svg"]);
        assert_eq!(rules[0].prelude.selectors[1].id, "#x>li");
    }

    #[test]
    fn test_pseudo_signature() {
        let tree = indexed("a:hover{x:y}a:focus::selection{x:y}a::before{x:y}[a=b i]{x:y}");
        let rules = rules(&tree);
        assert_eq!(rules[0].pseudo_signature, None);
        assert_eq!(rules[1].pseudo_signature.as_deref(), Some("::selection,:focus"));
        assert_eq!(rules[2].pseudo_signature, None);
        assert_eq!(rules[3].pseudo_signature.as_deref(), Some("[i]"));
    }

    #[test]
    fn test_keyframes_blocks() {
        let tree = indexed("@-webkit-keyframes spin{from{x:y}to{x:z}}");
        let rules = rules(&tree);
        assert_eq!(markers(&rules[0]), vec!["from"]);
        assert_eq!(markers(&rules[1]), vec!["to"]);

        let atrule = tree.first_child(tree.root()).unwrap();
        let block = tree.block_of(atrule).unwrap();
        assert!(tree.block(block).unwrap().merge_averse);
    }

    #[test]
    fn test_usage_scopes_in_markers() {
        let mut tree = parse(".a{x:y}.a .z{x:y}").unwrap();
        let options = RestructureOptions {
            usage: Some(Usage {
                scopes: vec![vec!["a".into()], vec!["b".into()]],
            }),
            ..Default::default()
        };
        Indexer::new(&options).unwrap().run(&mut tree).unwrap();
        let rules = rules(&tree);
        assert_eq!(markers(&rules[0]), vec!["0,1,0:1"]);
        assert_eq!(markers(&rules[1]), vec!["0,2,0:1"]);
    }

    #[test]
    fn test_selector_mixing_scopes_fails() {
        let mut tree = parse(".a.b{x:y}").unwrap();
        let options = RestructureOptions {
            usage: Some(Usage {
                scopes: vec![vec!["a".into()], vec!["b".into()]],
            }),
            ..Default::default()
        };
        let error = Indexer::new(&options).unwrap().run(&mut tree).unwrap_err();
        assert!(matches!(error, RestructureError::SelectorMixesScopes { selector } if selector == ".a.b"));
    }
}
