//! Context matching - selects the variant describing an `@odata.context`.

use tracing::{debug, info};

use crate::document::{ContextVariant, MetadataDocument};
use crate::error::ResolveError;
use crate::types::METADATA_SEGMENT;

/// Find the variant whose pattern matches a context fragment.
///
/// Each pattern is tried against `$metadata#<fragment>` and then against the
/// bare fragment, so patterns written for either form select. Variants are
/// tested in document order and the first match wins. Variants after the
/// match take no part in the decision.
///
/// # Errors
///
/// Returns `ResolveError::InvalidPattern` if a variant tried before the match
/// has a pattern that does not compile, and `ResolveError::ContextNotFound`
/// if no variant matches.
pub fn match_context<'d>(
    document: &'d MetadataDocument,
    fragment: &str,
) -> Result<&'d ContextVariant, ResolveError> {
    let target = format!("{}#{}", METADATA_SEGMENT, fragment);

    let mut variants = document.variants().iter();
    let mut selected = None;
    for variant in variants.by_ref() {
        if variant.matches(&target)? || variant.matches(fragment)? {
            selected = Some(variant);
            break;
        }
    }
    let variant = selected.ok_or_else(|| ResolveError::ContextNotFound {
        context: target.clone(),
    })?;

    // Patterns that fail to compile never shadow
    let shadowed = variants.find(|other| {
        matches!(other.matches(&target), Ok(true)) || matches!(other.matches(fragment), Ok(true))
    });
    if let Some(shadowed) = shadowed {
        debug!(
            context = %target,
            shadowed = shadowed.label(),
            "several variants match, using the first"
        );
    }

    info!(context = %target, "using schema \"{}\"", variant.label());
    Ok(variant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ContextTarget;
    use serde_json::json;

    fn variant(pattern: &str, description: &str) -> ContextVariant {
        ContextVariant::new(
            pattern,
            Some(description.to_string()),
            ContextTarget::Collection(json!({ "$ref": description })),
        )
    }

    fn document(variants: Vec<ContextVariant>) -> MetadataDocument {
        MetadataDocument::new(variants, serde_json::Map::new())
    }

    #[test]
    fn fragment_patterns_select_by_key_segment() {
        let doc = document(vec![
            variant(r"^users$", "collection"),
            variant(r"^users\(.*\)$", "entity"),
        ]);

        assert_eq!(match_context(&doc, "users").unwrap().label(), "collection");
        assert_eq!(match_context(&doc, "users('abc')").unwrap().label(), "entity");
    }

    #[test]
    fn full_context_patterns() {
        let doc = document(vec![
            variant(r"^(.*/)?\$metadata#users$", "users"),
            variant(r"^(.*/)?\$metadata#groups(\('[^/]+'\))/members$", "members"),
        ]);

        assert_eq!(match_context(&doc, "users").unwrap().label(), "users");
        assert_eq!(
            match_context(&doc, "groups('x')/members").unwrap().label(),
            "members"
        );
    }

    #[test]
    fn first_match_wins() {
        let doc = document(vec![
            variant(r"^users", "first"),
            variant(r"^users$", "second"),
        ]);
        assert_eq!(match_context(&doc, "users").unwrap().label(), "first");
    }

    #[test]
    fn unknown_context_errors() {
        let doc = document(vec![variant(r"^users$", "users")]);
        let result = match_context(&doc, "nonexistentEntity");
        assert!(matches!(
            result,
            Err(ResolveError::ContextNotFound { context }) if context == "$metadata#nonexistentEntity"
        ));
    }

    #[test]
    fn invalid_pattern_before_match_errors() {
        let doc = document(vec![
            variant(r"^users(?=\()", "lookahead"),
            variant(r"^users$", "users"),
        ]);
        assert!(matches!(
            match_context(&doc, "users"),
            Err(ResolveError::InvalidPattern { pattern, .. }) if pattern == r"^users(?=\()"
        ));
    }

    #[test]
    fn invalid_pattern_after_match_ignored() {
        let doc = document(vec![
            variant(r"^users$", "users"),
            variant(r"^groups(?=\()", "lookahead"),
        ]);
        assert_eq!(match_context(&doc, "users").unwrap().label(), "users");
    }

    #[test]
    fn empty_document_errors() {
        let doc = document(Vec::new());
        assert!(matches!(
            match_context(&doc, "users"),
            Err(ResolveError::ContextNotFound { .. })
        ));
    }
}
