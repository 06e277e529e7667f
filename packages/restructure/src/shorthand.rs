//! Rebuilds `margin`, `padding` and `border-{color,style,width}` shorthands
//! from their side longhands.
//!
//! Rules are visited right to left. Each family keeps an accumulator per rule
//! identity; the first declaration seen (the cascade winner) becomes the
//! replace target and earlier ones are folded in and later removed. Only
//! accumulators that end up with all four sides set and uniform importance are
//! materialized.

use crate::indexer::Indexer;
use crate::utils::rule_identity;
use csspress_syntax::{
    generate_value_node, walk_rules, Declaration, NodeId, ScopeId, Tree, Value, ValueNode,
    WalkContext,
};
use std::collections::HashMap;
use tracing::{debug, instrument};

const FAMILIES: &[(&str, [&str; 4])] = &[
    (
        "margin",
        ["margin-top", "margin-right", "margin-bottom", "margin-left"],
    ),
    (
        "padding",
        ["padding-top", "padding-right", "padding-bottom", "padding-left"],
    ),
    (
        "border-color",
        [
            "border-top-color",
            "border-right-color",
            "border-bottom-color",
            "border-left-color",
        ],
    ),
    (
        "border-width",
        [
            "border-top-width",
            "border-right-width",
            "border-bottom-width",
            "border-left-width",
        ],
    ),
    (
        "border-style",
        [
            "border-top-style",
            "border-right-style",
            "border-bottom-style",
            "border-left-style",
        ],
    ),
];

const TOP: usize = 0;
const RIGHT: usize = 1;
const BOTTOM: usize = 2;
const LEFT: usize = 3;

const SPECIAL_UNITS: &[&str] = &["rem", "vw", "vh", "vmin", "vmax", "vm"];

/// Family shorthand a property belongs to
fn family_of(property: &str) -> Option<&'static str> {
    FAMILIES
        .iter()
        .find(|(shorthand, sides)| *shorthand == property || sides.contains(&property))
        .map(|(shorthand, _)| *shorthand)
}

/// Side index of a longhand
fn side_of(property: &str) -> Option<usize> {
    FAMILIES
        .iter()
        .find_map(|(_, sides)| sides.iter().position(|side| *side == property))
}

#[derive(Debug, Clone, PartialEq)]
struct SideValue {
    node: ValueNode,
    special: Option<String>,
    important: bool,
}

/// Four-side accumulator for one shorthand family
#[derive(Debug, Clone)]
struct Trbl {
    name: &'static str,
    hack: Option<String>,
    sides: [Option<SideValue>; 4],
}

impl Trbl {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            hack: None,
            sides: [None, None, None, None],
        }
    }

    /// Foldable values of a declaration, or `None` when the value can't be folded
    fn value_sequence(&mut self, declaration: &Declaration, limit: usize) -> Option<Vec<SideValue>> {
        let Value::Tokens(nodes) = &declaration.value else {
            return None;
        };

        let mut values = Vec::new();
        let mut hack = String::new();

        for node in nodes {
            let special = match node {
                ValueNode::WhiteSpace => continue,
                ValueNode::Identifier { name } => match name.as_str() {
                    "\\0" | "\\9" => {
                        hack = name.clone();
                        continue;
                    }
                    "inherit" | "initial" | "unset" | "revert" => Some(name.clone()),
                    _ => None,
                },
                ValueNode::Dimension { unit, .. } => SPECIAL_UNITS
                    .contains(&unit.as_str())
                    .then(|| unit.clone()),
                ValueNode::Number { .. } | ValueNode::Percentage { .. } | ValueNode::HexColor { .. } => {
                    None
                }
                ValueNode::Function { name, .. } => {
                    if name.eq_ignore_ascii_case("var") {
                        return None;
                    }
                    Some(name.clone())
                }
                _ => return None,
            };

            values.push(SideValue {
                node: node.clone(),
                special,
                important: declaration.important,
            });
        }

        if values.len() > limit {
            return None;
        }
        if let Some(existing) = &self.hack {
            if *existing != hack {
                return None;
            }
        }
        self.hack = Some(hack);

        Some(values)
    }

    fn can_override(&self, side: usize, value: &SideValue) -> bool {
        match &self.sides[side] {
            None => true,
            Some(current) => value.important && !current.important,
        }
    }

    fn specials_match(&self, value: &SideValue) -> bool {
        self.sides
            .iter()
            .flatten()
            .all(|side| side.special == value.special)
    }

    /// Fold a declaration of this family in; `false` when it doesn't fit
    fn add(&mut self, property: &str, declaration: &Declaration) -> bool {
        if let Some(side) = side_of(property) {
            let Some(values) = self.value_sequence(declaration, 1) else {
                return false;
            };
            let Some(value) = values.into_iter().next() else {
                return false;
            };
            if !self.specials_match(&value) {
                return false;
            }
            if self.can_override(side, &value) {
                self.sides[side] = Some(value);
            }
            return true;
        }

        if property != self.name {
            return false;
        }

        let Some(mut values) = self.value_sequence(declaration, 4) else {
            return false;
        };
        match values.len() {
            0 => return false,
            1 => {
                let value = values[TOP].clone();
                values.extend([value.clone(), value.clone(), value]);
            }
            2 => {
                values.push(values[TOP].clone());
                values.push(values[RIGHT].clone());
            }
            3 => values.push(values[RIGHT].clone()),
            _ => {}
        }

        if !values.iter().all(|value| self.specials_match(value)) {
            return false;
        }
        for (side, value) in values.into_iter().enumerate() {
            if self.can_override(side, &value) {
                self.sides[side] = Some(value);
            }
        }
        true
    }

    fn is_ok_to_minimize(&self) -> bool {
        let important = self
            .sides
            .iter()
            .flatten()
            .filter(|side| side.important)
            .count();
        self.sides.iter().all(Option::is_some) && (important == 0 || important == 4)
    }

    /// Shortest shorthand value for the four sides
    fn value(&self) -> Option<Value> {
        let sides: Vec<&SideValue> = self.sides.iter().flatten().collect();
        if sides.len() != 4 {
            return None;
        }

        let text: Vec<String> = sides.iter().map(|side| generate_value_node(&side.node)).collect();
        let mut count = 4;
        if text[LEFT] == text[RIGHT] {
            count = 3;
            if text[BOTTOM] == text[TOP] {
                count = 2;
                if text[RIGHT] == text[TOP] {
                    count = 1;
                }
            }
        }

        let mut nodes = Vec::new();
        for (index, side) in sides.iter().take(count).enumerate() {
            if index > 0 {
                nodes.push(ValueNode::WhiteSpace);
            }
            nodes.push(side.node.clone());
        }
        if let Some(hack) = self.hack.as_deref().filter(|hack| !hack.is_empty()) {
            nodes.push(ValueNode::WhiteSpace);
            nodes.push(ValueNode::ident(hack));
        }

        Some(Value::Tokens(nodes))
    }

    fn declaration(&self) -> Option<Declaration> {
        let value = self.value()?;
        let important = self.sides[TOP].as_ref()?.important;
        Some(Declaration::new(self.name, value, important))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Replace,
    Remove,
}

#[derive(Debug)]
struct Pending {
    operation: Operation,
    declaration: NodeId,
    shorthand: usize,
}

#[derive(Default)]
struct ScopeState {
    last_selector: Option<String>,
    rules: HashMap<String, HashMap<&'static str, usize>>,
}

#[derive(Default)]
struct ShorthandPass {
    shorthands: Vec<Trbl>,
    pending: Vec<Pending>,
    scopes: HashMap<ScopeId, ScopeState>,
}

impl ShorthandPass {
    fn process_rule(&mut self, tree: &mut Tree, ctx: WalkContext) {
        let Some(rule) = tree.rule(ctx.item) else {
            return;
        };
        let block = rule.block;
        let identity = rule_identity(rule);
        let selector = rule
            .prelude
            .first()
            .map(|selector| selector.id.clone())
            .unwrap_or_default();

        let state = self.scopes.entry(ctx.scope).or_default();
        let mut last = state.last_selector.take();
        let families = state.rules.entry(identity).or_default();
        let shorthands = &mut self.shorthands;
        let pending = &mut self.pending;

        tree.for_each_child(block, true, |tree, item| {
            let Some(declaration) = tree.declaration(item) else {
                return;
            };
            let property = declaration.property.as_str();
            let Some(family) = family_of(property) else {
                return;
            };

            let mut reused = None;
            if last.is_none() || last.as_deref() == Some(selector.as_str()) {
                if let Some(&index) = families.get(family) {
                    if shorthands[index].add(property, declaration) {
                        reused = Some(index);
                    }
                }
            }

            let (operation, index) = match reused {
                Some(index) => (Operation::Remove, index),
                None => {
                    let mut shorthand = Trbl::new(family);
                    if !shorthand.add(property, declaration) {
                        last = None;
                        return;
                    }
                    shorthands.push(shorthand);
                    (Operation::Replace, shorthands.len() - 1)
                }
            };

            families.insert(family, index);
            pending.push(Pending {
                operation,
                declaration: item,
                shorthand: index,
            });
            last = Some(selector.clone());
        });

        state.last_selector = last;
    }

    fn apply(self, tree: &mut Tree, indexer: &mut Indexer) -> (usize, usize) {
        let mut replaced = 0;
        let mut removed = 0;

        for pending in &self.pending {
            let shorthand = &self.shorthands[pending.shorthand];
            if !shorthand.is_ok_to_minimize() {
                continue;
            }

            match pending.operation {
                Operation::Replace => {
                    let Some(declaration) = shorthand.declaration() else {
                        continue;
                    };
                    if let Some(target) = tree.declaration_mut(pending.declaration) {
                        *target = declaration;
                        indexer.mark_declaration(target);
                        replaced += 1;
                    }
                }
                Operation::Remove => {
                    tree.detach(pending.declaration);
                    removed += 1;
                }
            }
        }

        (replaced, removed)
    }
}

/// Collapse side longhands into family shorthands where all four sides are known
#[instrument(skip(tree, indexer))]
pub fn restructure_shorthands(tree: &mut Tree, indexer: &mut Indexer) {
    let mut pass = ShorthandPass::default();
    walk_rules(tree, true, |tree, ctx| pass.process_rule(tree, ctx));
    let (replaced, removed) = pass.apply(tree, indexer);
    debug!(replaced, removed, "Shorthands rebuilt");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::RestructureOptions;
    use csspress_syntax::{parse, serialize};

    fn run(source: &str) -> String {
        let mut tree = parse(source).unwrap();
        let mut indexer = Indexer::new(&RestructureOptions::default()).unwrap();
        indexer.run(&mut tree).unwrap();
        restructure_shorthands(&mut tree, &mut indexer);
        serialize(&tree)
    }

    #[test]
    fn test_four_sides_collapse() {
        assert_eq!(
            run(".a{margin-top:1px;margin-right:2px;margin-bottom:3px;margin-left:4px}"),
            ".a{margin:1px 2px 3px 4px}"
        );
    }

    #[test]
    fn test_side_elision() {
        assert_eq!(
            run(".a{padding-top:0;padding-right:0;padding-bottom:0;padding-left:0}"),
            ".a{padding:0}"
        );
        assert_eq!(
            run(".a{margin-top:1px;margin-right:2px;margin-bottom:1px;margin-left:2px}"),
            ".a{margin:1px 2px}"
        );
        assert_eq!(
            run(".a{margin-top:1px;margin-right:2px;margin-bottom:3px;margin-left:2px}"),
            ".a{margin:1px 2px 3px}"
        );
    }

    #[test]
    fn test_shorthand_overridden_by_later_side() {
        assert_eq!(run(".a{margin:0;margin-left:5px}"), ".a{margin:0 0 0 5px}");
    }

    #[test]
    fn test_incomplete_sides_are_left_alone() {
        assert_eq!(
            run(".a{margin-top:1px;margin-left:2px}"),
            ".a{margin-top:1px;margin-left:2px}"
        );
    }

    #[test]
    fn test_mixed_importance_is_left_alone() {
        let source = ".a{margin-top:1px!important;margin-right:2px;margin-bottom:3px;margin-left:4px}";
        assert_eq!(run(source), source);
    }

    #[test]
    fn test_special_values_do_not_mix() {
        let source = ".a{margin:0;margin-left:1rem}";
        assert_eq!(run(source), source);

        let source = ".a{margin:0;margin-left:var(--x)}";
        assert_eq!(run(source), source);
    }

    #[test]
    fn test_split_rules_with_same_selector() {
        assert_eq!(
            run(".a{margin-top:1px;margin-right:1px}.a{margin-bottom:1px;margin-left:1px}"),
            ".a{}.a{margin:1px}"
        );
    }

    #[test]
    fn test_intervening_selector_breaks_the_chain() {
        let source = ".a{margin-top:1px;margin-right:1px}.b{margin-top:0}.a{margin-bottom:1px;margin-left:1px}";
        assert_eq!(run(source), source);
    }

    #[test]
    fn test_hack_suffix_is_kept() {
        assert_eq!(
            run(".a{margin-top:1px \\9;margin-right:1px \\9;margin-bottom:1px \\9;margin-left:1px \\9}"),
            ".a{margin:1px \\9}"
        );
    }

    #[test]
    fn test_family_lookup() {
        assert_eq!(family_of("border-top-color"), Some("border-color"));
        assert_eq!(family_of("padding"), Some("padding"));
        assert_eq!(family_of("border-top"), None);
        assert_eq!(side_of("margin-left"), Some(LEFT));
    }
}
