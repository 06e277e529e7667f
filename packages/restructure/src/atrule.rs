use csspress_syntax::{walk_atrules, NodeId, Tree, WalkContext};
use indexmap::IndexMap;
use tracing::{debug, instrument};

/// Groups of relocated at-rules: basename -> group key -> members in source order
type Groups = IndexMap<String, IndexMap<String, Vec<NodeId>>>;

/// Gather `@keyframes` (and `@media` when forced) into groups, then fuse
/// adjacent `@media` blocks with the same prelude.
#[instrument(skip(tree))]
pub fn merge_atrules(tree: &mut Tree, force_media_merge: bool) {
    relocate(tree, force_media_merge);

    let mut fused = 0usize;
    walk_atrules(tree, true, |tree, ctx| {
        if merge_into_previous_media(tree, ctx) {
            fused += 1;
        }
    });

    let root = tree.root();
    let has_content = tree.children(root).into_iter().any(|item| match tree.atrule(item) {
        Some(atrule) => !matches!(atrule.basename().as_str(), "charset" | "import"),
        None => true,
    });
    tree.stylesheet_mut().leading_at_rules_allowed = !has_content;

    debug!(fused, "At-rules consolidated");
}

fn relocate(tree: &mut Tree, force_media_merge: bool) {
    let root = tree.root();
    let mut groups = Groups::new();
    let mut inject_point: Option<NodeId> = None;

    for item in tree.children(root) {
        let Some(atrule) = tree.atrule(item) else {
            if inject_point.is_none() {
                inject_point = Some(item);
            }
            continue;
        };

        let basename = atrule.basename();
        let key = format!(
            "{}/{}",
            atrule.name.to_ascii_lowercase(),
            atrule.prelude.as_deref().unwrap_or("")
        );

        match basename.as_str() {
            "keyframes" => {
                collect(tree, &mut groups, basename, key, item, true);
                continue;
            }
            "media" if force_media_merge => {
                collect(tree, &mut groups, basename, key, item, false);
                continue;
            }
            _ => {}
        }

        if inject_point.is_none() && basename != "charset" && basename != "import" {
            inject_point = Some(item);
        }
    }

    for (basename, members) in groups {
        let before = if basename == "media" { None } else { inject_point };
        for item in members.into_values().flatten() {
            tree.insert_before(root, item, before);
        }
    }
}

fn collect(
    tree: &mut Tree,
    groups: &mut Groups,
    basename: String,
    key: String,
    item: NodeId,
    single: bool,
) {
    tree.detach(item);

    let group = groups.entry(basename).or_default();
    if single {
        // a later definition wins; the replaced one is dropped
        if let Some(replaced) = group.shift_remove(&key) {
            debug!(key = %key, replaced = replaced.len(), "Dropping earlier keyframes");
        }
    }
    group.entry(key).or_default().push(item);
}

fn merge_into_previous_media(tree: &mut Tree, ctx: WalkContext) -> bool {
    let Some(atrule) = tree.atrule(ctx.item) else {
        return false;
    };
    if !atrule.name.eq_ignore_ascii_case("media") {
        return false;
    }
    let (Some(prelude), Some(block)) = (atrule.prelude.clone(), atrule.block) else {
        return false;
    };

    let Some(prev) = tree.prev_sibling(ctx.item) else {
        return false;
    };
    let Some(prev_atrule) = tree.atrule(prev) else {
        return false;
    };
    if !prev_atrule.name.eq_ignore_ascii_case("media")
        || prev_atrule.prelude.as_deref() != Some(prelude.as_str())
    {
        return false;
    }
    let Some(prev_block) = prev_atrule.block else {
        return false;
    };

    tree.append_children(prev_block, block);
    tree.detach(ctx.item);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use csspress_syntax::{parse, serialize};

    fn consolidate(source: &str, force_media_merge: bool) -> String {
        let mut tree = parse(source).unwrap();
        merge_atrules(&mut tree, force_media_merge);
        serialize(&tree)
    }

    #[test]
    fn test_keyframes_move_before_content() {
        assert_eq!(
            consolidate("@charset \"u\";.a{x:y}@keyframes k{to{x:z}}", false),
            "@charset \"u\";@keyframes k{to{x:z}}.a{x:y}"
        );
    }

    #[test]
    fn test_later_keyframes_replace_earlier() {
        assert_eq!(
            consolidate("@keyframes k{to{x:1}}@keyframes j{to{x:2}}@keyframes k{to{x:3}}", false),
            "@keyframes j{to{x:2}}@keyframes k{to{x:3}}"
        );
    }

    #[test]
    fn test_vendor_keyframes_group_together() {
        assert_eq!(
            consolidate(
                ".a{x:y}@-webkit-keyframes k{to{x:1}}@font-face{x:y}@keyframes k{to{x:1}}",
                false
            ),
            "@-webkit-keyframes k{to{x:1}}@keyframes k{to{x:1}}.a{x:y}@font-face{x:y}"
        );
    }

    #[test]
    fn test_adjacent_media_fuse() {
        assert_eq!(
            consolidate("@media print{.a{x:y}}@media print{.b{x:y}}@media screen{.c{x:y}}", false),
            "@media print{.a{x:y}.b{x:y}}@media screen{.c{x:y}}"
        );
    }

    #[test]
    fn test_media_apart_stays_apart_unless_forced() {
        let source = "@media print{.a{x:y}}.b{x:y}@media print{.c{x:y}}";
        assert_eq!(consolidate(source, false), source);
        assert_eq!(consolidate(source, true), ".b{x:y}@media print{.a{x:y}.c{x:y}}");
    }

    #[test]
    fn test_leading_flag() {
        let mut tree = parse("@import url(a.css);@keyframes k{to{x:y}}").unwrap();
        merge_atrules(&mut tree, false);
        assert!(!tree.stylesheet().leading_at_rules_allowed);

        let mut tree = parse("@charset \"u\";@import url(a.css);").unwrap();
        merge_atrules(&mut tree, false);
        assert!(tree.stylesheet().leading_at_rules_allowed);
    }
}
