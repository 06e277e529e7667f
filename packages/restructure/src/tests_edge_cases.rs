/// Edge cases: empty input, at-rule only sheets, opaque selectors, usage
/// scopes and configuration switches
use crate::*;
use csspress_syntax::{parse, serialize};

#[cfg(test)]
mod edge_case_tests {
    use super::*;

    fn run(source: &str) -> String {
        compress(source, &RestructureOptions::default()).expect("Failed to compress")
    }

    fn scoped(scopes: &[&[&str]]) -> RestructureOptions {
        RestructureOptions {
            usage: Some(Usage {
                scopes: scopes
                    .iter()
                    .map(|scope| scope.iter().map(|name| name.to_string()).collect())
                    .collect(),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_sheet() {
        assert_eq!(run(""), "");
    }

    #[test]
    fn test_leading_at_rules_only() {
        let source = "@charset \"utf-8\";@import url(a.css);";
        assert_eq!(run(source), source);
    }

    #[test]
    fn test_rule_emptied_by_override_is_dropped() {
        assert_eq!(
            run(".a{color:red}.b{color:blue}.a{color:green}"),
            ".b{color:blue}.a{color:green}"
        );
    }

    #[test]
    fn test_opaque_selectors_block_merging() {
        let source = "a!b{color:red}.c{color:red}";
        assert_eq!(run(source), source);

        let source = ".c{color:red}a!b{color:red}.c{margin:0}";
        assert_eq!(run(source), source);
    }

    #[test]
    fn test_adjacent_media_fuse_and_merge_inside() {
        assert_eq!(
            run("@media print{.a{color:red}}@media print{.b{color:red}}"),
            "@media print{.a,.b{color:red}}"
        );
    }

    #[test]
    fn test_nested_blocks_are_restructured() {
        assert_eq!(
            run("@supports (display:grid){.a{color:red}.b{color:red}}"),
            "@supports (display:grid){.a,.b{color:red}}"
        );
    }

    #[test]
    fn test_force_media_merge() {
        let source = "@media print{.a{color:red}}.b{x:y}@media print{.c{color:blue}}";
        assert_eq!(run(source), source);

        let options = RestructureOptions {
            force_media_merge: true,
            ..Default::default()
        };
        assert_eq!(
            compress(source, &options).unwrap(),
            ".b{x:y}@media print{.a{color:red}.c{color:blue}}"
        );
    }

    #[test]
    fn test_restructure_disabled() {
        let options = RestructureOptions {
            restructure: false,
            ..Default::default()
        };
        let source = ".a{color:red}.a{color:blue}";
        assert_eq!(compress(source, &options).unwrap(), source);
    }

    #[test]
    fn test_selector_mixing_scopes_fails_without_mutation() {
        let mut tree = parse(".a.b{color:red}.c{color:red}").unwrap();
        let error = restructure(&mut tree, &scoped(&[&["a"], &["b"]])).unwrap_err();
        assert!(matches!(error, RestructureError::SelectorMixesScopes { .. }));
        assert_eq!(serialize(&tree), ".a.b{color:red}.c{color:red}");
    }

    #[test]
    fn test_class_in_two_scopes_fails() {
        let mut tree = parse(".a{color:red}").unwrap();
        let error = restructure(&mut tree, &scoped(&[&["a"], &["a"]])).unwrap_err();
        assert!(matches!(error, RestructureError::ClassInSeveralScopes { class } if class == "a"));
    }

    #[test]
    fn test_scopes_let_unrelated_classes_pass() {
        // `.a` and `.b` never meet on one element, so `.b` no longer blocks the merge
        let options = scoped(&[&["a"], &["b"]]);
        assert_eq!(
            compress(".a{color:red}.b{color:blue}.a{margin:0}", &options).unwrap(),
            ".a{color:red;margin:0}.b{color:blue}"
        );
        assert_eq!(
            run(".a{color:red}.b{color:blue}.a{margin:0}"),
            ".a{color:red}.b{color:blue}.a{margin:0}"
        );
    }

    #[test]
    fn test_parse_error_surfaces() {
        let error = compress("a{color red}", &RestructureOptions::default()).unwrap_err();
        assert!(error.to_string().contains("':'"));
    }
}
