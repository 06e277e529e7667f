use thiserror::Error;

pub type RestructureResult<T> = Result<T, RestructureError>;

#[derive(Error, Debug)]
pub enum RestructureError {
    #[error("Class can't be used for several scopes: {class}")]
    ClassInSeveralScopes { class: String },

    #[error("Selector can't have classes from different scopes: {selector}")]
    SelectorMixesScopes { selector: String },

    #[error("Invalid value pattern: {0}")]
    Pattern(#[from] regex::Error),
}
