use serde::{Deserialize, Serialize};

/// Knobs consulted by [`crate::restructure`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RestructureOptions {
    /// Run the merge/split/shorthand/redundancy passes
    pub restructure: bool,

    /// Collect every top-level `@media` into one group per prelude, not only adjacent ones
    pub force_media_merge: bool,

    /// Class usage data; classes listed in different scopes never share a selector
    pub usage: Option<Usage>,
}

impl Default for RestructureOptions {
    fn default() -> Self {
        Self {
            restructure: true,
            force_media_merge: false,
            usage: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Usage {
    /// Each inner list is one scope of class names
    pub scopes: Vec<Vec<String>>,
}
