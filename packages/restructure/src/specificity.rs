use csspress_syntax::{PseudoArgument, Selector, SelectorList, SimpleSelector};

/// (ids, classes/attributes/pseudo-classes, types/pseudo-elements)
pub type Specificity = [u32; 3];

pub fn specificity(selector: &Selector) -> Specificity {
    let mut result = [0u32; 3];

    for node in &selector.children {
        match node {
            SimpleSelector::Id { .. } => result[0] += 1,
            SimpleSelector::Class { .. } | SimpleSelector::Attribute(_) => result[1] += 1,
            SimpleSelector::PseudoClass { name, argument } => {
                match name.to_ascii_lowercase().as_str() {
                    "not" | "has" | "is" | "matches" | "-webkit-any" | "-moz-any" => {
                        if let Some(PseudoArgument::Selectors(list)) = argument {
                            let [a, b, c] = max_specificity(list);
                            result[0] += a;
                            result[1] += b;
                            result[2] += c;
                        }
                    }
                    "where" => {}
                    // legacy single-colon pseudo-elements
                    "before" | "after" | "first-line" | "first-letter" => result[2] += 1,
                    _ => result[1] += 1,
                }
            }
            SimpleSelector::Type { name } => {
                if !name.ends_with('*') {
                    result[2] += 1;
                }
            }
            SimpleSelector::PseudoElement { .. } => result[2] += 1,
            SimpleSelector::Percentage { .. }
            | SimpleSelector::Combinator { .. }
            | SimpleSelector::Raw(_) => {}
        }
    }

    result
}

/// Highest specificity among a selector list, compared lexicographically
pub fn max_specificity(list: &SelectorList) -> Specificity {
    list.selectors
        .iter()
        .map(specificity)
        .fold([0, 0, 0], |best, current| if current > best { current } else { best })
}
