//! Right-to-left restructuring by declaration diff.
//!
//! Each rule is compared with the rules before it. Shared declarations move
//! to whichever side makes the output shorter: up into the earlier rule, down
//! into the current one, or into a new rule carrying both selector lists. Two
//! masks keep the cascade intact while scanning backward: moving the current
//! selectors up is forbidden once an earlier rule competes with them, and
//! moving earlier selectors down is forbidden for markers already crossed.

use crate::utils::{
    add_selectors, compare_declarations, declarations_length, has_similar_selectors,
    is_equal_selectors, selector_length, stop_if, unsafe_to_skip_node,
};
use csspress_syntax::{walk_rules, NodeId, SelectorList, Tree, WalkContext};
use std::collections::HashSet;
use std::ops::ControlFlow;
use tracing::{debug, instrument};

#[derive(Debug, Default)]
struct Stats {
    merged: usize,
    moved_up: usize,
    moved_down: usize,
    created: usize,
}

#[instrument(skip(tree))]
pub fn restructure_rules(tree: &mut Tree) {
    let mut stats = Stats::default();
    walk_rules(tree, true, |tree, ctx| process_rule(tree, ctx, &mut stats));
    debug!(
        merged = stats.merged,
        moved_up = stats.moved_up,
        moved_down = stats.moved_down,
        created = stats.created,
        "Rules restructured"
    );
}

/// Markers of every rule nested anywhere below `list`
fn collect_markers(tree: &Tree, list: NodeId, markers: &mut HashSet<String>) {
    for item in tree.children(list) {
        if let Some(rule) = tree.rule(item) {
            for selector in &rule.prelude.selectors {
                markers.insert(selector.compare_marker.clone());
            }
        }
        if let Some(block) = tree.block_of(item) {
            collect_markers(tree, block, markers);
        }
    }
}

fn process_rule(tree: &mut Tree, ctx: WalkContext, stats: &mut Stats) {
    let merge_averse = tree
        .block(ctx.list)
        .map(|block| block.merge_averse)
        .unwrap_or(false);
    let Some(rule) = tree.rule(ctx.item) else {
        return;
    };
    let block = rule.block;
    let signature = rule.pseudo_signature.clone();
    let mut selectors = rule.prelude.clone();

    let mut skip_down: HashSet<String> = HashSet::new();
    let mut allow_up = true;

    tree.prev_until(ctx.item, |tree, prev| {
        let (prev_block, prev_signature, mut prev_selectors) = match tree.rule(prev) {
            Some(prev_rule) => (
                prev_rule.block,
                prev_rule.pseudo_signature.clone(),
                prev_rule.prelude.clone(),
            ),
            None => {
                let unsafe_to_skip = unsafe_to_skip_node(tree, prev, &selectors);
                if !unsafe_to_skip && tree.atrule(prev).is_some() {
                    if let Some(nested) = tree.block_of(prev) {
                        collect_markers(tree, nested, &mut skip_down);
                    }
                }
                return stop_if(unsafe_to_skip);
            }
        };

        if prev_signature != signature {
            return ControlFlow::Break(());
        }

        let allow_down = !prev_selectors
            .selectors
            .iter()
            .any(|selector| skip_down.contains(&selector.compare_marker));
        if !allow_down && !allow_up {
            return ControlFlow::Break(());
        }

        if allow_up && is_equal_selectors(&prev_selectors, &selectors) {
            tree.append_children(prev_block, block);
            tree.detach(ctx.item);
            stats.merged += 1;
            return ControlFlow::Break(());
        }

        let diff = compare_declarations(tree, block, prev_block);

        if !diff.eq.is_empty() {
            if diff.ne1.is_empty() && diff.ne2.is_empty() {
                if allow_down {
                    add_selectors(&mut selectors, &prev_selectors);
                    set_selectors(tree, ctx.item, &selectors);
                    tree.detach(prev);
                    stats.merged += 1;
                }
                return ControlFlow::Break(());
            }

            if !merge_averse {
                let shared = declarations_length(tree, &diff.eq);

                if diff.ne2.is_empty() {
                    // the earlier rule's declarations are a subset of the current ones
                    if allow_up && selector_length(&selectors) < shared {
                        add_selectors(&mut prev_selectors, &selectors);
                        set_selectors(tree, prev, &prev_selectors);
                        tree.set_children(block, &diff.ne1);
                        stats.moved_up += 1;
                    }
                } else if diff.ne1.is_empty() {
                    if allow_down && selector_length(&prev_selectors) < shared {
                        add_selectors(&mut selectors, &prev_selectors);
                        set_selectors(tree, ctx.item, &selectors);
                        tree.set_children(prev_block, &diff.ne2);
                        stats.moved_down += 1;
                    }
                } else {
                    let mut union = prev_selectors.clone();
                    add_selectors(&mut union, &selectors);

                    // selector text plus the braces
                    if shared >= selector_length(&union) + 2 {
                        let common = tree.new_block(false);
                        tree.set_children(common, &diff.eq);
                        let created = tree.new_rule(union, common, signature.clone());

                        tree.set_children(block, &diff.ne1);
                        tree.set_children(prev_block, &diff.ne2_overridden);

                        let before = if allow_up { prev } else { ctx.item };
                        tree.insert_before(ctx.list, created, Some(before));
                        stats.created += 1;
                        return ControlFlow::Break(());
                    }
                }
            }
        }

        if allow_up {
            allow_up = !has_similar_selectors(&prev_selectors, &selectors);
        }
        for selector in &prev_selectors.selectors {
            skip_down.insert(selector.compare_marker.clone());
        }

        ControlFlow::Continue(())
    });
}

fn set_selectors(tree: &mut Tree, item: NodeId, selectors: &SelectorList) {
    if let Some(rule) = tree.rule_mut(item) {
        rule.prelude = selectors.clone();
    }
}
