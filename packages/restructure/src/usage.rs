use crate::error::{RestructureError, RestructureResult};
use crate::options::Usage;
use std::collections::HashMap;

/// Class name to scope number (1-based) lookup
#[derive(Debug, Clone, Default)]
pub struct UsageScopes {
    scopes: HashMap<String, u32>,
}

impl UsageScopes {
    /// Build the lookup, rejecting a class listed in two scopes
    pub fn from_usage(usage: &Usage) -> RestructureResult<Self> {
        let mut scopes = HashMap::new();
        for (index, names) in usage.scopes.iter().enumerate() {
            let scope = index as u32 + 1;
            for name in names {
                match scopes.get(name) {
                    Some(&existing) if existing != scope => {
                        return Err(RestructureError::ClassInSeveralScopes {
                            class: name.clone(),
                        });
                    }
                    _ => {
                        scopes.insert(name.clone(), scope);
                    }
                }
            }
        }
        Ok(Self { scopes })
    }

    /// Scope of a class, `None` for classes outside every scope
    pub fn scope_of(&self, class: &str) -> Option<u32> {
        self.scopes.get(class).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(scopes: &[&[&str]]) -> Usage {
        Usage {
            scopes: scopes
                .iter()
                .map(|scope| scope.iter().map(|name| name.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn test_scope_numbers_are_one_based() {
        let scopes = UsageScopes::from_usage(&usage(&[&["a", "b"], &["c"]])).unwrap();
        assert_eq!(scopes.scope_of("a"), Some(1));
        assert_eq!(scopes.scope_of("c"), Some(2));
        assert_eq!(scopes.scope_of("z"), None);
    }

    #[test]
    fn test_repeat_in_same_scope_is_fine() {
        assert!(UsageScopes::from_usage(&usage(&[&["a", "a"]])).is_ok());
    }

    #[test]
    fn test_class_in_two_scopes_fails() {
        let error = UsageScopes::from_usage(&usage(&[&["a"], &["b", "a"]])).unwrap_err();
        assert!(matches!(error, RestructureError::ClassInSeveralScopes { class } if class == "a"));
    }
}
