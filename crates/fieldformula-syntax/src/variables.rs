//! Variable extraction

use crate::error::SyntaxResult;
use crate::parser::parse;
use crate::tree::NodeKind;

/// List every variable path a formula refers to
///
/// Paths come back in the order they appear, with their dotted spelling
/// and duplicates kept. Nothing is evaluated.
///
/// # Example
/// ```rust
/// use fieldformula_syntax::extract_variables;
///
/// let vars = extract_variables("IF(Account.Active, Amount * 2, Amount)").unwrap();
/// assert_eq!(vars, vec!["Account.Active", "Amount", "Amount"]);
/// ```
pub fn extract_variables(formula: &str) -> SyntaxResult<Vec<String>> {
    let tree = parse(formula)?;

    Ok(tree
        .preorder()
        .filter(|(_, node)| node.kind == NodeKind::Variable)
        .map(|(_, node)| {
            node.children
                .iter()
                .map(|&segment| tree.text(segment, formula))
                .collect::<Vec<_>>()
                .join(".")
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_variables() {
        assert!(extract_variables("1 + 2").unwrap().is_empty());
        assert!(extract_variables("").unwrap().is_empty());
    }

    #[test]
    fn test_nested_calls_in_order() {
        let vars = extract_variables("CONTAINS(LOWER(Name), Search) && a.b.c > Limit").unwrap();
        assert_eq!(vars, vec!["Name", "Search", "a.b.c", "Limit"]);
    }

    #[test]
    fn test_spaced_path_comes_back_dotted() {
        let vars = extract_variables("Account . Owner .Name & x").unwrap();
        assert_eq!(vars, vec!["Account.Owner.Name", "x"]);
    }

    #[test]
    fn test_sentinels_are_variables() {
        let vars = extract_variables("NULLVALUE(null, undefined)").unwrap();
        assert_eq!(vars, vec!["null", "undefined"]);
    }

    #[test]
    fn test_syntax_error_propagates() {
        assert!(extract_variables("MAX(a,").is_err());
    }
}
