//! Box hydration: turn a request's `cat_id` into the [`BoxSpec`] the pipeline
//! acts on.

use std::collections::HashMap;

use async_trait::async_trait;
use carton_core::{BoxSpec, Error, Request, Result};

use crate::config::DefaultsConfig;

/// Source of box descriptions.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Describe the box `request` targets.
    async fn hydrate(&self, request: &Request) -> Result<BoxSpec>;
}

/// Catalog backed by configured defaults plus explicitly registered boxes.
#[derive(Debug, Clone)]
pub struct InlineCatalog {
    defaults: DefaultsConfig,
    boxes: HashMap<String, BoxSpec>,
}

impl InlineCatalog {
    pub fn new(defaults: DefaultsConfig) -> Self {
        Self {
            defaults,
            boxes: HashMap::new(),
        }
    }

    /// Builder: register a box by name; requests for that `cat_id` get it
    /// verbatim.
    pub fn with_box(mut self, unit: BoxSpec) -> Self {
        self.boxes.insert(unit.name.clone(), unit);
        self
    }

    /// Builder: override the default image.
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.defaults.image = image.into();
        self
    }

    fn from_defaults(&self, request: &Request) -> BoxSpec {
        let mut unit = BoxSpec::new(&request.cat_id, &self.defaults.provider)
            .with_image(&self.defaults.image)
            .with_compute(self.defaults.compute.clone());
        unit.account_id = request.account_id.clone();
        unit.region = self.defaults.region.clone();
        unit
    }
}

#[async_trait]
impl Catalog for InlineCatalog {
    async fn hydrate(&self, request: &Request) -> Result<BoxSpec> {
        if request.cat_id.is_empty() {
            return Err(Error::Validation(format!("{request} has no cat_id")));
        }

        let unit = match self.boxes.get(&request.cat_id) {
            Some(unit) => unit.clone(),
            None => self.from_defaults(request),
        };
        tracing::debug!("Hydrated {} as {} ({})", request.cat_id, unit.full_name(), unit.compute);
        Ok(unit)
    }
}
