//! truck
//!
//! Entry point tying configuration, network layer and model factory
//! together.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use serde_json::json;
//! use truck::config::TruckConfig;
//! use truck::model::ModelOptions;
//! use truck::network::mock::MockTransport;
//! use truck::Truck;
//!
//! let config = TruckConfig::from_toml_str(r#"
//!     [models.section]
//!     fields = ["name"]
//!
//!     [models.resume]
//!     fields = ["name"]
//!     [models.resume.has_many.sections]
//!     model = "section"
//! "#).unwrap();
//!
//! let truck = Truck::with_transport(config, Arc::new(MockTransport::new()));
//! let models = truck.define_all().unwrap();
//!
//! let resume = models["resume"].make(&json!({
//!     "id": 1,
//!     "sections": [{ "id": 2, "name": "Experience" }]
//! }));
//! let section = resume.has_many("sections").unwrap().get(0).unwrap();
//! assert_eq!(section.api_path(), "/resume/1/section/2");
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::TruckConfig;
use crate::model::{ModelClass, ModelFactory, ModelOptions, SchemaError};
use crate::network::{HttpTransport, NetworkRequest, Transport};

/// Holds the configuration and network layer model classes are built with.
#[derive(Debug, Clone)]
pub struct Truck {
    config: Arc<TruckConfig>,
    network: NetworkRequest,
}

impl Truck {
    /// Entry point talking HTTP.
    pub fn new(config: TruckConfig) -> Self {
        Self::with_transport(config, Arc::new(HttpTransport::new()))
    }

    /// Entry point over any transport.
    pub fn with_transport(config: TruckConfig, transport: Arc<dyn Transport>) -> Self {
        let network = NetworkRequest::new(transport).with_headers(config.headers.clone());
        Self {
            config: Arc::new(config),
            network,
        }
    }

    pub fn config(&self) -> &Arc<TruckConfig> {
        &self.config
    }

    pub fn network(&self) -> &NetworkRequest {
        &self.network
    }

    /// Build a model class from caller options.
    pub fn define(&self, options: ModelOptions) -> Result<ModelClass, SchemaError> {
        ModelFactory::build(options, self.config.clone(), self.network.clone())
    }

    /// Build every model declared in the configuration, keyed by table name.
    ///
    /// Related models are built before the models referring to them.
    ///
    /// # Errors
    ///
    /// `UnknownModel` for a relation to an undeclared model,
    /// `CyclicRelation` when declarations refer to each other in a loop, and
    /// any validation error from the factory.
    pub fn define_all(&self) -> Result<BTreeMap<String, ModelClass>, SchemaError> {
        let mut built = BTreeMap::new();
        for table in self.config.models.keys() {
            let mut path = Vec::new();
            self.define_declared(table, &mut built, &mut path)?;
        }
        Ok(built)
    }

    fn define_declared(
        &self,
        table: &str,
        built: &mut BTreeMap<String, ModelClass>,
        path: &mut Vec<String>,
    ) -> Result<ModelClass, SchemaError> {
        if let Some(class) = built.get(table) {
            return Ok(class.clone());
        }

        if path.iter().any(|p| p == table) {
            path.push(table.to_string());
            return Err(SchemaError::CyclicRelation(path.join(" -> ")));
        }

        let decl = self
            .config
            .models
            .get(table)
            .ok_or_else(|| SchemaError::UnknownModel(table.to_string()))?;

        path.push(table.to_string());
        let options = decl.to_options(table, |dep| self.define_declared(dep, built, path))?;
        path.pop();

        let class = self.define(options)?;
        built.insert(table.to_string(), class.clone());
        Ok(class)
    }
}
