use crate::utils::{add_selectors, is_equal_declarations, stop_if, unsafe_to_skip_node};
use csspress_syntax::{walk_rules, NodeId, Tree};
use std::collections::HashSet;
use std::ops::ControlFlow;
use tracing::{debug, instrument};

/// Pull following rules with the same selector or the same declarations into
/// the current rule, scanning forward through the window that is safe to cross.
#[instrument(skip(tree))]
pub fn merge_rules(tree: &mut Tree) {
    let mut merged = 0usize;
    walk_rules(tree, false, |tree, ctx| {
        merged += merge_following(tree, ctx.item);
    });
    debug!(merged, "Rules merged forward");
}

fn merge_following(tree: &mut Tree, item: NodeId) -> usize {
    let Some(rule) = tree.rule(item) else {
        return 0;
    };
    let block = rule.block;
    let signature = rule.pseudo_signature.clone();
    let first_marker = rule.prelude.first().map(|selector| selector.compare_marker.clone());

    let mut skipped: HashSet<String> = HashSet::new();
    let mut merged = 0;

    tree.next_until(item, |tree, next| {
        // Selectors joined earlier in this scan are part of the window check
        let Some(selectors) = tree.rule(item).map(|rule| &rule.prelude) else {
            return ControlFlow::Break(());
        };
        let Some(next_rule) = tree.rule(next) else {
            return stop_if(unsafe_to_skip_node(tree, next, selectors));
        };
        if next_rule.pseudo_signature != signature {
            return ControlFlow::Break(());
        }

        let next_block = next_rule.block;
        let Some(next_first) = next_rule.prelude.first() else {
            return ControlFlow::Continue(());
        };
        if skipped.contains(&next_first.compare_marker) {
            return ControlFlow::Break(());
        }

        let same_selector = selectors.len() == 1
            && selectors.first().map(|selector| selector.id.as_str()) == Some(next_first.id.as_str());
        let next_marker = next_first.compare_marker.clone();
        let next_prelude = next_rule.prelude.clone();

        if same_selector {
            tree.append_children(block, next_block);
            tree.detach(next);
            merged += 1;
            return ControlFlow::Continue(());
        }

        if is_equal_declarations(tree, block, next_block) {
            if let Some(rule) = tree.rule_mut(item) {
                add_selectors(&mut rule.prelude, &next_prelude);
            }
            tree.detach(next);
            merged += 1;
            return ControlFlow::Continue(());
        }

        if first_marker.as_deref() == Some(next_marker.as_str()) {
            return ControlFlow::Break(());
        }
        skipped.insert(next_marker);
        ControlFlow::Continue(())
    });

    merged
}
