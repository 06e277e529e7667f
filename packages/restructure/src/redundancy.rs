use crate::fingerprint::Fingerprinter;
use crate::utils::rule_identity;
use csspress_syntax::{vendor_prefix, walk_rules, NodeId, ScopeId, Tree, WalkContext};
use std::collections::HashMap;
use tracing::{debug, instrument};

/// Longhand -> shorthands that fully cover it, in lookup order
const NEEDLESS_TABLE: &[(&str, &[&str])] = &[
    ("border-width", &["border"]),
    ("border-style", &["border"]),
    ("border-color", &["border"]),
    ("border-top", &["border"]),
    ("border-right", &["border"]),
    ("border-bottom", &["border"]),
    ("border-left", &["border"]),
    ("border-top-width", &["border-top", "border-width", "border"]),
    ("border-right-width", &["border-right", "border-width", "border"]),
    ("border-bottom-width", &["border-bottom", "border-width", "border"]),
    ("border-left-width", &["border-left", "border-width", "border"]),
    ("border-top-style", &["border-top", "border-style", "border"]),
    ("border-right-style", &["border-right", "border-style", "border"]),
    ("border-bottom-style", &["border-bottom", "border-style", "border"]),
    ("border-left-style", &["border-left", "border-style", "border"]),
    ("border-top-color", &["border-top", "border-color", "border"]),
    ("border-right-color", &["border-right", "border-color", "border"]),
    ("border-bottom-color", &["border-bottom", "border-color", "border"]),
    ("border-left-color", &["border-left", "border-color", "border"]),
    ("margin-top", &["margin"]),
    ("margin-right", &["margin"]),
    ("margin-bottom", &["margin"]),
    ("margin-left", &["margin"]),
    ("padding-top", &["padding"]),
    ("padding-right", &["padding"]),
    ("padding-bottom", &["padding"]),
    ("padding-left", &["padding"]),
];

/// Properties whose repeated declarations are all meaningful
const KEEP_REPEATS: &[&str] = &["src"];

#[derive(Debug, Clone, Copy)]
struct Seen {
    declaration: NodeId,
    rule: NodeId,
}

type Properties = HashMap<String, Seen>;

struct RedundancyPass<'a> {
    fingerprinter: &'a mut Fingerprinter,
    scopes: HashMap<ScopeId, HashMap<String, Properties>>,
    removed: usize,
}

impl RedundancyPass<'_> {
    fn process_rule(&mut self, tree: &mut Tree, ctx: WalkContext) {
        let Some(rule) = tree.rule(ctx.item) else {
            return;
        };
        let block = rule.block;
        let identity = rule_identity(rule);

        let properties = self
            .scopes
            .entry(ctx.scope)
            .or_default()
            .entry(identity)
            .or_default();
        let fingerprinter = &mut *self.fingerprinter;
        let removed = &mut self.removed;

        tree.for_each_child(block, true, |tree, item| {
            let Some(declaration) = tree.declaration(item) else {
                return;
            };
            let key = match &declaration.fingerprint {
                Some(fingerprint) => fingerprint.clone(),
                None => fingerprinter.fingerprint(declaration),
            };
            let important = declaration.important;
            let repeatable = KEEP_REPEATS.contains(&declaration.property.as_str());

            if let Some(seen) = properties.get(&key).copied().filter(|_| !repeatable) {
                let seen_important = tree
                    .declaration(seen.declaration)
                    .map(|declaration| declaration.important)
                    .unwrap_or(false);

                if important && !seen_important {
                    properties.insert(
                        key,
                        Seen {
                            declaration: item,
                            rule: ctx.item,
                        },
                    );
                    tree.detach(seen.declaration);
                    if seen.rule != ctx.item {
                        if let Some(seen_block) = tree.block_of(seen.rule) {
                            if tree.is_empty(seen_block) {
                                tree.detach(seen.rule);
                            }
                        }
                    }
                } else {
                    tree.detach(item);
                }
                *removed += 1;
                return;
            }

            if is_needless(tree, properties, fingerprinter, item) {
                tree.detach(item);
                *removed += 1;
                return;
            }

            if let Some(declaration) = tree.declaration_mut(item) {
                declaration.fingerprint = Some(key.clone());
            }
            properties.insert(
                key,
                Seen {
                    declaration: item,
                    rule: ctx.item,
                },
            );
        });

        if tree.is_empty(block) {
            tree.detach(ctx.item);
        }
    }
}

/// Whether a covering shorthand with a compatible value already wins over `item`
fn is_needless(
    tree: &Tree,
    properties: &Properties,
    fingerprinter: &mut Fingerprinter,
    item: NodeId,
) -> bool {
    let Some(declaration) = tree.declaration(item) else {
        return false;
    };

    let unhacked = declaration.property.trim_start_matches(['*', '_']);
    let hack = &declaration.property[..declaration.property.len() - unhacked.len()];
    let vendor = vendor_prefix(unhacked);
    let basename = &unhacked[vendor.len()..];

    let Some((_, shorthands)) = NEEDLESS_TABLE.iter().find(|(longhand, _)| *longhand == basename) else {
        return false;
    };

    for shorthand in shorthands.iter() {
        let property = format!("{}{}{}", hack, vendor, shorthand);
        let key = fingerprinter.fingerprint_as(&property, declaration);
        let Some(seen) = properties.get(&key) else {
            continue;
        };
        let seen_important = tree
            .declaration(seen.declaration)
            .map(|seen| seen.important)
            .unwrap_or(false);
        if !declaration.important || seen_important {
            return true;
        }
    }

    false
}

/// Drop declarations that a later declaration of the same rule identity overrides
#[instrument(skip(tree, fingerprinter))]
pub fn eliminate_redundancy(tree: &mut Tree, fingerprinter: &mut Fingerprinter) {
    let mut pass = RedundancyPass {
        fingerprinter,
        scopes: HashMap::new(),
        removed: 0,
    };
    walk_rules(tree, true, |tree, ctx| pass.process_rule(tree, ctx));
    debug!(removed = pass.removed, "Redundant declarations removed");
}
