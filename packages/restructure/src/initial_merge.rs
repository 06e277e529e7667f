use crate::utils::{
    add_selectors, has_similar_selectors, is_equal_declarations, is_equal_selectors, stop_if,
    unsafe_to_skip_node,
};
use csspress_syntax::{walk_rules, NodeId, Tree};
use std::ops::ControlFlow;
use tracing::{debug, instrument};

/// Fold each rule into an earlier sibling with the same selectors or the same
/// declarations, as long as nothing in between could be affected.
#[instrument(skip(tree))]
pub fn initial_merge(tree: &mut Tree) {
    let mut merged = 0usize;
    walk_rules(tree, false, |tree, ctx| {
        if merge_into_previous(tree, ctx.item) {
            merged += 1;
        }
    });
    debug!(merged, "Initial merge complete");
}

fn merge_into_previous(tree: &mut Tree, item: NodeId) -> bool {
    let Some(rule) = tree.rule(item) else {
        return false;
    };
    let selectors = rule.prelude.clone();
    let signature = rule.pseudo_signature.clone();
    let block = rule.block;
    let mut merged = false;

    tree.prev_until(item, |tree, prev| {
        let Some(prev_rule) = tree.rule(prev) else {
            return stop_if(unsafe_to_skip_node(tree, prev, &selectors));
        };
        let prev_block = prev_rule.block;
        let same_signature = prev_rule.pseudo_signature == signature;
        let same_selectors = is_equal_selectors(&prev_rule.prelude, &selectors);
        let similar = has_similar_selectors(&prev_rule.prelude, &selectors);

        if same_signature {
            if same_selectors {
                tree.append_children(prev_block, block);
                tree.detach(item);
                merged = true;
                return ControlFlow::Break(());
            }

            if is_equal_declarations(tree, block, prev_block) {
                if let Some(prev_rule) = tree.rule_mut(prev) {
                    add_selectors(&mut prev_rule.prelude, &selectors);
                }
                tree.detach(item);
                merged = true;
                return ControlFlow::Break(());
            }
        }

        stop_if(similar)
    });

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::Indexer;
    use crate::options::RestructureOptions;
    use csspress_syntax::{parse, serialize};

    fn run(source: &str) -> String {
        let mut tree = parse(source).unwrap();
        Indexer::new(&RestructureOptions::default())
            .unwrap()
            .run(&mut tree)
            .unwrap();
        initial_merge(&mut tree);
        serialize(&tree)
    }

    #[test]
    fn test_same_selectors_merge() {
        assert_eq!(run(".a{color:red}#b{x:y}.a{margin:0}"), ".a{color:red;margin:0}#b{x:y}");
        assert_eq!(run(".a{color:red}.b{x:y}.a{margin:0}"), ".a{color:red}.b{x:y}.a{margin:0}");
    }

    #[test]
    fn test_same_declarations_merge() {
        assert_eq!(run(".b{color:red}.a{color:red}"), ".a,.b{color:red}");
    }

    #[test]
    fn test_competing_rule_blocks_the_scan() {
        assert_eq!(
            run(".a{color:red}.c{color:blue}.b{color:red}"),
            ".a{color:red}.c{color:blue}.b{color:red}"
        );
    }

    #[test]
    fn test_different_pseudo_signature_does_not_merge() {
        assert_eq!(run("a:focus{color:red}b{color:red}"), "a:focus{color:red}b{color:red}");
    }

    #[test]
    fn test_import_stops_the_scan() {
        assert_eq!(run(".a{x:y}@import url(b.css);.a{z:w}"), ".a{x:y}@import url(b.css);.a{z:w}");
    }

    #[test]
    fn test_safe_media_is_skipped() {
        assert_eq!(
            run(".a{x:y}@media print{#b{x:y}}.a{z:w}"),
            ".a{x:y;z:w}@media print{#b{x:y}}"
        );
    }
}
