//! Inbound lifecycle requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::RequestId;

/// A lifecycle request as delivered by the queue or the catalog API.
///
/// Immutable once received; `category` and `action` are matched literally by
/// the parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub id: RequestId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub account_id: String,
    /// Id of the target carton or box.
    pub cat_id: String,
    pub action: String,
    pub category: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Request {
    /// Build a request stamped with a fresh id and the current time.
    pub fn new(
        cat_id: impl Into<String>,
        category: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            id: RequestId::new(),
            name: String::new(),
            account_id: String::new(),
            cat_id: cat_id.into(),
            action: action.into(),
            category: category.into(),
            created_at: Utc::now(),
        }
    }

    /// Builder: set the owning account.
    pub fn with_account(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = account_id.into();
        self
    }

    /// Builder: set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "request {} ({},{}) for {}",
            self.id, self.category, self.action, self.cat_id
        )
    }
}

/// Envelope the catalog API wraps request listings in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiRequests {
    #[serde(default)]
    pub json_claz: String,
    #[serde(default)]
    pub results: Vec<Request>,
}
