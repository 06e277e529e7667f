use crate::atrule::merge_atrules;
use crate::disjoin::disjoin;
use crate::error::RestructureResult;
use crate::indexer::Indexer;
use crate::initial_merge::initial_merge;
use crate::merge_rules::merge_rules;
use crate::options::RestructureOptions;
use crate::redundancy::eliminate_redundancy;
use crate::restructure_rules::restructure_rules;
use crate::shorthand::restructure_shorthands;
use crate::utils::count_nodes;
use csspress_syntax::{parse, serialize, Tree};
use serde::Serialize;
use tracing::{info, instrument};

/// Tree totals after one pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassStats {
    pub name: &'static str,
    pub rules: usize,
    pub declarations: usize,
}

/// Pass log of one restructuring run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestructureReport {
    pub passes: Vec<PassStats>,
}

impl RestructureReport {
    fn record(&mut self, name: &'static str, tree: &Tree) {
        let (rules, declarations) = count_nodes(tree);
        self.passes.push(PassStats {
            name,
            rules,
            declarations,
        });
    }

    pub fn pass(&self, name: &str) -> Option<&PassStats> {
        self.passes.iter().find(|pass| pass.name == name)
    }

    /// Totals after the last pass that ran
    pub fn last(&self) -> Option<&PassStats> {
        self.passes.last()
    }
}

/// Restructure a parsed stylesheet in place.
///
/// Indexing and at-rule consolidation always run; the remaining passes only
/// when `options.restructure` is set.
#[instrument(skip(tree, options), fields(restructure = options.restructure, force_media_merge = options.force_media_merge))]
pub fn restructure(tree: &mut Tree, options: &RestructureOptions) -> RestructureResult<RestructureReport> {
    let (rules, declarations) = count_nodes(tree);
    info!(rules, declarations, "Starting restructure");

    let mut report = RestructureReport::default();
    let mut indexer = Indexer::new(options)?;

    indexer.run(tree)?;
    report.record("index", tree);

    merge_atrules(tree, options.force_media_merge);
    report.record("merge_atrules", tree);

    if options.restructure {
        initial_merge(tree);
        report.record("initial_merge", tree);

        disjoin(tree);
        report.record("disjoin", tree);

        restructure_shorthands(tree, &mut indexer);
        report.record("shorthands", tree);

        eliminate_redundancy(tree, &mut indexer.fingerprinter);
        report.record("redundancy", tree);

        merge_rules(tree);
        report.record("merge_rules", tree);

        restructure_rules(tree);
        report.record("restructure_rules", tree);
    }

    let (rules, declarations) = count_nodes(tree);
    info!(rules, declarations, passes = report.passes.len(), "Restructure complete");
    Ok(report)
}

/// Parse, restructure and serialize a stylesheet
pub fn compress(source: &str, options: &RestructureOptions) -> anyhow::Result<String> {
    let mut tree = parse(source)?;
    restructure(&mut tree, options)?;
    Ok(serialize(&tree))
}
