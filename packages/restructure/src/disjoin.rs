use csspress_syntax::{walk_rules, SelectorList, Tree};
use tracing::{debug, instrument};

/// Split every multi-selector rule into single-selector rules, keeping order
#[instrument(skip(tree))]
pub fn disjoin(tree: &mut Tree) {
    let mut created = 0usize;
    walk_rules(tree, true, |tree, ctx| {
        loop {
            let Some(rule) = tree.rule_mut(ctx.item) else {
                break;
            };
            if rule.prelude.len() <= 1 {
                break;
            }

            let head = rule.prelude.selectors.remove(0);
            let block = rule.block;
            let signature = rule.pseudo_signature.clone();

            let copy = tree.clone_block(block);
            let split = tree.new_rule(SelectorList::new(vec![head]), copy, signature);
            tree.insert_before(ctx.list, split, Some(ctx.item));
            created += 1;
        }
    });
    debug!(created, "Rules disjoined");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::Indexer;
    use crate::options::RestructureOptions;
    use csspress_syntax::{parse, serialize};

    fn run(source: &str) -> Tree {
        let mut tree = parse(source).unwrap();
        Indexer::new(&RestructureOptions::default())
            .unwrap()
            .run(&mut tree)
            .unwrap();
        disjoin(&mut tree);
        tree
    }

    #[test]
    fn test_split_keeps_order() {
        let tree = run(".a,.b,.c{color:red}.d{x:y}");
        assert_eq!(serialize(&tree), ".a{color:red}.b{color:red}.c{color:red}.d{x:y}");
    }

    #[test]
    fn test_nested_rules_split() {
        let tree = run("@media print{a,b{x:y}}");
        assert_eq!(serialize(&tree), "@media print{a{x:y}b{x:y}}");
    }

    #[test]
    fn test_copies_are_independent() {
        let mut tree = run(".a,.b{color:red}");
        let root = tree.root();
        let first = tree.first_child(root).unwrap();
        let block = tree.block_of(first).unwrap();
        let declaration = tree.first_child(block).unwrap();
        tree.detach(declaration);
        assert_eq!(serialize(&tree), ".a{}.b{color:red}");
    }
}
