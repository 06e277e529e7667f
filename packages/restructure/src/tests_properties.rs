/// End-to-end behaviour of the full restructuring pipeline
use crate::*;

#[cfg(test)]
mod property_tests {
    use super::*;
    use csspress_syntax::{generate_selector, generate_value, parse, Node, NodeId, Tree};
    use std::collections::BTreeMap;

    /// Selector (prefixed by its at-rule context) to property to winning `(value, important)`
    type Cascade = BTreeMap<String, BTreeMap<String, (String, bool)>>;

    fn cascade(source: &str) -> Cascade {
        let tree = parse(source).expect("Failed to parse");
        let mut cascade = Cascade::new();
        collect(&tree, tree.root(), "", &mut cascade);
        cascade
    }

    fn collect(tree: &Tree, list: NodeId, context: &str, cascade: &mut Cascade) {
        for item in tree.children(list) {
            match tree.node(item) {
                Node::Rule(rule) => {
                    for selector in &rule.prelude.selectors {
                        let key = format!("{}{}", context, generate_selector(selector));
                        let winners = cascade.entry(key).or_default();
                        for child in tree.children(rule.block) {
                            let Node::Declaration(declaration) = tree.node(child) else {
                                continue;
                            };
                            let earlier_important =
                                matches!(winners.get(&declaration.property), Some((_, true)));
                            if declaration.important || !earlier_important {
                                winners.insert(
                                    declaration.property.clone(),
                                    (generate_value(&declaration.value), declaration.important),
                                );
                            }
                        }
                    }
                }
                Node::Atrule(atrule) => {
                    if let Some(block) = atrule.block {
                        let context = format!(
                            "{}@{} {}|",
                            context,
                            atrule.name,
                            atrule.prelude.as_deref().unwrap_or_default()
                        );
                        collect(tree, block, &context, cascade);
                    }
                }
                _ => {}
            }
        }
    }

    const GROWING_SELECTOR_SHEETS: [&str; 4] = [
        ".a{color:red}.b{color:red}.a{margin:0}",
        ".a{color:red}.b{color:red}.c{margin:0}.a{margin:0}",
        ".x,.z{color:red;padding:0}.x{top:0}#y{left:0}.z{bottom:0}",
        ".a{color:red}#b{color:red}@media print{#b{margin:0}}.c{color:red}",
    ];

    fn run(source: &str) -> String {
        compress(source, &RestructureOptions::default()).expect("Failed to compress")
    }

    #[test]
    fn test_sides_collapse_into_shorthand() {
        assert_eq!(
            run(".a{margin-top:1px;margin-right:2px;margin-bottom:3px;margin-left:4px}"),
            ".a{margin:1px 2px 3px 4px}"
        );
    }

    #[test]
    fn test_equal_sides_elide() {
        assert_eq!(
            run("a{margin-top:0;margin-right:0;margin-bottom:0;margin-left:0}"),
            "a{margin:0}"
        );
    }

    #[test]
    fn test_later_side_folds_into_shorthand() {
        assert_eq!(run(".a{margin:0;margin-left:5px}"), ".a{margin:0 0 0 5px}");
    }

    #[test]
    fn test_importance_is_not_downgraded() {
        assert_eq!(run(".a{color:red;color:blue!important}"), ".a{color:blue!important}");
        assert_eq!(run(".a{color:red!important}.a{color:blue}"), ".a{color:red!important}");
    }

    #[test]
    fn test_selector_group_roundtrip() {
        assert_eq!(run(".a{color:red}.b{color:red}"), ".a,.b{color:red}");
        assert_eq!(run(".a,.b{color:red}"), ".a,.b{color:red}");
    }

    #[test]
    fn test_pseudo_signature_isolation() {
        assert_eq!(run("a:focus{color:red}b{color:red}"), "a:focus{color:red}b{color:red}");
        assert_eq!(run("a:hover{color:red}b{color:red}"), "a:hover,b{color:red}");
    }

    #[test]
    fn test_keyframes_replace_not_append() {
        assert_eq!(
            run("@keyframes x{from{top:0}to{top:1px}}.a{color:red}@keyframes x{from{top:5px}to{top:9px}}"),
            "@keyframes x{from{top:5px}to{top:9px}}.a{color:red}"
        );
    }

    #[test]
    fn test_incompatible_values_survive() {
        let source = ".a{color:red;color:rgba(0,0,0,.5)}";
        assert_eq!(run(source), source);
    }

    #[test]
    fn test_shared_declarations_move_to_the_shorter_side() {
        assert_eq!(
            run(".a{color:red;margin:0}.b{color:red}"),
            ".a{margin:0}.a,.b{color:red}"
        );
    }

    #[test]
    fn test_idempotence() {
        for source in [
            ".a{color:red;margin:0}.b{color:red}",
            ".a{color:red}.b{color:red}",
            "a{margin:0}",
            "a:focus{color:red}b{color:red}",
        ]
        .into_iter()
        .chain(GROWING_SELECTOR_SHEETS)
        {
            let once = run(source);
            assert_eq!(run(&once), once, "not stable for {}", source);
        }
    }

    #[test]
    fn test_every_selector_keeps_its_declarations() {
        for source in GROWING_SELECTOR_SHEETS {
            let output = run(source);
            assert_eq!(cascade(&output), cascade(source), "{} became {}", source, output);
        }
    }

    #[test]
    fn test_grown_selector_list_does_not_take_later_declarations() {
        assert_eq!(
            run(".a{color:red}.b{color:red}.a{margin:0}"),
            ".a,.b{color:red}.a{margin:0}"
        );
    }
}
