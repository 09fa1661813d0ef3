//! Two-level request classification.

use carton_core::{Error, Request, Result};

use crate::category::Category;
use crate::operation::Operation;

/// Classifies `(category, action)` pairs for one target unit.
#[derive(Debug, Clone)]
pub struct RequestParser {
    name: String,
}

impl RequestParser {
    /// Create a parser whose operations target `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Classify a `(category, action)` pair.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Classification`] when the category is not one of the
    /// seven known literals (expected lists the categories) or the action is
    /// not accepted by the matched category (expected lists that category's
    /// advertised actions).
    pub fn parse(&self, category: &str, action: &str) -> Result<Operation> {
        let Some(matched) = Category::from_literal(category) else {
            return Err(Error::classification(
                &[category, action],
                Category::literals().as_slice(),
            ));
        };

        self.parse_action(matched, action)
    }

    fn parse_action(&self, category: Category, action: &str) -> Result<Operation> {
        category
            .actions()
            .iter()
            .find(|entry| entry.literal == action)
            .map(|entry| Operation::new(entry.kind, self.name.as_str(), entry.hard))
            .ok_or_else(|| {
                Error::classification(
                    &[category.literal(), action],
                    category.advertised_actions(),
                )
            })
    }
}

/// Classify `(category, action)` for the unit `target_id`.
pub fn parse(category: &str, action: &str, target_id: &str) -> Result<Operation> {
    RequestParser::new(target_id).parse(category, action)
}

/// Classify an inbound [`Request`] against its `cat_id`.
pub fn parse_request(request: &Request) -> Result<Operation> {
    let op = parse(&request.category, &request.action, &request.cat_id)?;
    tracing::debug!("Classified {} as {}", request, op);
    Ok(op)
}
