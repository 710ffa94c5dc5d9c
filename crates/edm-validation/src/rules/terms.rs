//! Term declarations

use crate::engine::ValidationContext;
use edm_model::{EdmErrorCode, Term};

pub(crate) fn term_type_resolves<'m>(context: &mut ValidationContext<'m>, term: &'m Term) {
    let resolved = context.resolver().resolve_type(&term.type_ref);
    if let Some(name) = resolved.unresolved_name() {
        context.report(
            EdmErrorCode::BadUnresolvedType,
            format!("type '{name}' of term '{}' cannot be resolved", term.full_name()),
            term.location.as_ref(),
        );
    }
}

pub(crate) fn base_term_resolves<'m>(context: &mut ValidationContext<'m>, term: &'m Term) {
    let Some(base) = term.base_term.as_deref() else {
        return;
    };
    if context.resolver().find_term(base).is_not_found() {
        context.report(
            EdmErrorCode::BadUnresolvedTerm,
            format!("base term '{base}' of '{}' cannot be resolved", term.full_name()),
            term.location.as_ref(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edm_model::{Model, PrimitiveKind, SchemaElement, TypeReference};

    #[test]
    fn test_term_references() {
        let mut model = Model::default();
        model
            .add_element(Term::new(
                "Vocab",
                "Description",
                TypeReference::primitive(PrimitiveKind::String, true),
            ))
            .unwrap();
        let mut derived = Term::new("Vocab", "Summary", TypeReference::named("Vocab.Text", true));
        derived.base_term = Some("Vocab.Missing".to_string());
        model.add_element(derived).unwrap();

        let mut context = ValidationContext::new(&model, model.version());
        for element in model.elements() {
            if let SchemaElement::Term(term) = element {
                term_type_resolves(&mut context, term);
                base_term_resolves(&mut context, term);
            }
        }
        let codes: Vec<_> = context.into_errors().into_iter().map(|e| e.code).collect();
        assert_eq!(
            codes,
            vec![EdmErrorCode::BadUnresolvedType, EdmErrorCode::BadUnresolvedTerm]
        );
    }
}
