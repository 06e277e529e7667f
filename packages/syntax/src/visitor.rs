use crate::ast::{NodeId, NodeKind, ScopeId};
use crate::tree::Tree;

/// Position of a visited item: the item itself, the list holding it and the
/// at-rule whose block that list is (if any)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkContext {
    pub item: NodeId,
    pub list: NodeId,
    pub scope: ScopeId,
    pub atrule: Option<NodeId>,
}

/// Visit every Rule in the tree, descending into at-rule blocks.
///
/// The callback may remove or insert siblings of the visited rule; the walk
/// continues from the list cursor rather than a precomputed snapshot.
pub fn walk_rules<F>(tree: &mut Tree, reverse: bool, mut f: F)
where
    F: FnMut(&mut Tree, WalkContext),
{
    let root = tree.root();
    walk_list(tree, root, None, reverse, NodeKind::Rule, &mut f);
}

/// Visit every Atrule in the tree, nested ones included.
///
/// An at-rule is visited before its block is descended into.
pub fn walk_atrules<F>(tree: &mut Tree, reverse: bool, mut f: F)
where
    F: FnMut(&mut Tree, WalkContext),
{
    let root = tree.root();
    walk_list(tree, root, None, reverse, NodeKind::Atrule, &mut f);
}

fn walk_list<F>(
    tree: &mut Tree,
    list: NodeId,
    atrule: Option<NodeId>,
    reverse: bool,
    kind: NodeKind,
    f: &mut F,
) where
    F: FnMut(&mut Tree, WalkContext),
{
    let scope = tree.scope(list);
    tree.for_each_child(list, reverse, |tree, item| {
        let item_kind = tree.kind(item);
        if item_kind == kind {
            f(
                tree,
                WalkContext {
                    item,
                    list,
                    scope,
                    atrule,
                },
            );
        }

        if item_kind == NodeKind::Atrule {
            if let Some(block) = tree.block_of(item) {
                walk_list(tree, block, Some(item), reverse, kind, f);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn test_walk_rules_descends_into_media() {
        let mut tree = parse(".a{color:red}@media print{.b{color:red}}.c{color:red}").unwrap();
        let mut seen = Vec::new();
        walk_rules(&mut tree, false, |tree, ctx| {
            let rule = tree.rule(ctx.item).unwrap();
            seen.push((crate::serializer::generate_selector_list(&rule.prelude), ctx.atrule.is_some()));
        });

        assert_eq!(
            seen,
            vec![
                (".a".to_string(), false),
                (".b".to_string(), true),
                (".c".to_string(), false),
            ]
        );
    }

    #[test]
    fn test_walk_rules_reverse_with_removal() {
        let mut tree = parse(".a{color:red}.b{color:red}.c{color:red}").unwrap();
        let mut seen = 0;
        walk_rules(&mut tree, true, |tree, ctx| {
            seen += 1;
            tree.detach(ctx.item);
        });

        assert_eq!(seen, 3);
        assert!(tree.is_empty(tree.root()));
    }

    #[test]
    fn test_walk_atrules_nested() {
        let mut tree = parse("@media a{@supports (x:y){.a{color:red}}}@font-face{src:url(a)}").unwrap();
        let mut names = Vec::new();
        walk_atrules(&mut tree, false, |tree, ctx| {
            names.push(tree.atrule(ctx.item).unwrap().name.clone());
        });
        assert_eq!(names, vec!["media", "supports", "font-face"]);
    }
}
