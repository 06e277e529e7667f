use csspress_syntax::{Node, NodeId, Rule, SelectorList, Tree};
use std::collections::HashMap;
use std::ops::ControlFlow;

/// Compare marker of selectors the indexer could not read; it competes with every marker
pub const OPAQUE_MARKER: &str = "?";

pub fn stop_if(stop: bool) -> ControlFlow<()> {
    if stop {
        ControlFlow::Break(())
    } else {
        ControlFlow::Continue(())
    }
}

/// Bucket key shared by rules with the same pseudo-signature and first selector
pub fn rule_identity(rule: &Rule) -> String {
    format!(
        "{}|{}",
        rule.pseudo_signature.as_deref().unwrap_or(""),
        rule.prelude.first().map(|selector| selector.id.as_str()).unwrap_or("")
    )
}

pub fn markers_compete(a: &str, b: &str) -> bool {
    a == b || a == OPAQUE_MARKER || b == OPAQUE_MARKER
}

pub fn is_equal_selectors(a: &SelectorList, b: &SelectorList) -> bool {
    a.len() == b.len()
        && a.selectors
            .iter()
            .zip(&b.selectors)
            .all(|(left, right)| left.id == right.id)
}

/// Same declaration ids in the same order
pub fn is_equal_declarations(tree: &Tree, a: NodeId, b: NodeId) -> bool {
    let left = declaration_ids(tree, a);
    let right = declaration_ids(tree, b);
    left == right
}

fn declaration_ids(tree: &Tree, block: NodeId) -> Vec<Option<u32>> {
    tree.children(block)
        .into_iter()
        .map(|item| tree.declaration(item).map(|declaration| declaration.id))
        .collect()
}

/// Insert `source` selectors into `dest`, keeping `dest` sorted by id and free of duplicates
pub fn add_selectors(dest: &mut SelectorList, source: &SelectorList) {
    for selector in &source.selectors {
        let mut position = dest.selectors.len();
        let mut duplicate = false;
        for (index, existing) in dest.selectors.iter().enumerate() {
            if existing.id == selector.id {
                duplicate = true;
                break;
            }
            if existing.id > selector.id {
                position = index;
                break;
            }
        }
        if !duplicate {
            dest.selectors.insert(position, selector.clone());
        }
    }
}

/// Whether any selector of `a` competes with any selector of `b`
pub fn has_similar_selectors(a: &SelectorList, b: &SelectorList) -> bool {
    a.selectors.iter().any(|left| {
        b.selectors
            .iter()
            .any(|right| markers_compete(&left.compare_marker, &right.compare_marker))
    })
}

/// Whether a merge scan must stop at a non-candidate sibling
pub fn unsafe_to_skip_node(tree: &Tree, node: NodeId, selectors: &SelectorList) -> bool {
    match tree.node(node) {
        Node::Rule(rule) => has_similar_selectors(&rule.prelude, selectors),
        Node::Atrule(atrule) => match atrule.block {
            Some(block) => tree
                .children(block)
                .into_iter()
                .any(|child| unsafe_to_skip_node(tree, child, selectors)),
            None => true,
        },
        Node::Declaration(_) => false,
        Node::Block(_) | Node::Stylesheet(_) => true,
    }
}

/// Declaration sets of two rules split by shared identity
#[derive(Debug, Default, PartialEq)]
pub struct DeclarationDiff {
    /// In both rules; the nodes belong to the first block
    pub eq: Vec<NodeId>,
    /// Only in the first block
    pub ne1: Vec<NodeId>,
    /// Only in the second block and not dominated by an equal-fingerprint declaration of the first
    pub ne2: Vec<NodeId>,
    /// Only in the second block
    pub ne2_overridden: Vec<NodeId>,
}

pub fn compare_declarations(tree: &Tree, first: NodeId, second: NodeId) -> DeclarationDiff {
    let mut diff = DeclarationDiff::default();
    let second_items = tree.children(second);

    let mut unmatched: HashMap<u32, bool> = HashMap::new();
    for &item in &second_items {
        if let Some(declaration) = tree.declaration(item) {
            unmatched.insert(declaration.id, true);
        }
    }

    let mut fingerprints: HashMap<&str, bool> = HashMap::new();
    for item in tree.children(first) {
        let Some(declaration) = tree.declaration(item) else {
            continue;
        };
        if let Some(fingerprint) = &declaration.fingerprint {
            fingerprints.insert(fingerprint.as_str(), declaration.important);
        }

        if unmatched.get(&declaration.id) == Some(&true) {
            unmatched.insert(declaration.id, false);
            diff.eq.push(item);
        } else {
            diff.ne1.push(item);
        }
    }

    for item in second_items {
        let Some(declaration) = tree.declaration(item) else {
            continue;
        };
        if unmatched.get(&declaration.id) != Some(&true) {
            continue;
        }

        let dominated = match declaration
            .fingerprint
            .as_deref()
            .and_then(|fingerprint| fingerprints.get(fingerprint))
        {
            Some(&important) => important || !declaration.important,
            None => false,
        };
        if !dominated {
            diff.ne2.push(item);
        }
        diff.ne2_overridden.push(item);
    }

    diff
}

/// Estimated text length of a selector list
pub fn selector_length(list: &SelectorList) -> usize {
    list.selectors
        .iter()
        .map(|selector| selector.id.len() + 1)
        .sum::<usize>()
        .saturating_sub(1)
}

/// Estimated text length of a declaration run, separators included
pub fn declarations_length(tree: &Tree, items: &[NodeId]) -> usize {
    let length: usize = items
        .iter()
        .filter_map(|&item| tree.declaration(item))
        .map(|declaration| declaration.length)
        .sum();
    (length + items.len()).saturating_sub(1)
}

/// Rule and declaration totals across the whole tree
pub fn count_nodes(tree: &Tree) -> (usize, usize) {
    fn visit(tree: &Tree, list: NodeId, totals: &mut (usize, usize)) {
        for item in tree.children(list) {
            match tree.node(item) {
                Node::Rule(rule) => {
                    totals.0 += 1;
                    visit(tree, rule.block, totals);
                }
                Node::Atrule(atrule) => {
                    if let Some(block) = atrule.block {
                        visit(tree, block, totals);
                    }
                }
                Node::Declaration(_) => totals.1 += 1,
                Node::Block(_) | Node::Stylesheet(_) => {}
            }
        }
    }

    let mut totals = (0, 0);
    visit(tree, tree.root(), &mut totals);
    totals
}
