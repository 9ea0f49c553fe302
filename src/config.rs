use crate::model::{ResourceTypeRegistry, UserContext, DEFAULT_RESOURCE_TYPES};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub registry: RegistryConfig,
    pub catalog: CatalogConfig,
    pub submission: SubmissionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Resource type tags accepted in field specs
    pub resource_types: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// JSON snapshot of the resource catalog
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionConfig {
    pub user_id: String,
    pub workspace_id: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            resource_types: DEFAULT_RESOURCE_TYPES
                .iter()
                .map(|(tag, _)| tag.to_string())
                .collect(),
        }
    }
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            user_id: "local".to_string(),
            workspace_id: "default".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, an optional config file and
    /// `MEV_` environment variables, in that order of precedence.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = config::Config::builder();

        // Add default configuration
        config = config.add_source(config::Config::try_from(&AppConfig::default())?);

        // Add config file if it exists
        config = config.add_source(config::File::with_name("config").required(false));

        // e.g. MEV_SUBMISSION__USER_ID, MEV_REGISTRY__RESOURCE_TYPES=MTX,ANN
        config = config.add_source(
            config::Environment::with_prefix("MEV")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("registry.resource_types")
                .try_parsing(true),
        );

        let config = config.build()?;
        let app_config: AppConfig = config.try_deserialize()?;

        Ok(app_config)
    }

    /// Registry built from the configured tags. Known tags keep their
    /// default label.
    pub fn resource_type_registry(&self) -> ResourceTypeRegistry {
        ResourceTypeRegistry::new(self.registry.resource_types.iter().map(|tag| {
            let label = DEFAULT_RESOURCE_TYPES
                .iter()
                .find(|(known, _)| *known == tag.as_str())
                .map(|(_, label)| label.to_string())
                .unwrap_or_else(|| tag.clone());
            (tag.clone(), label)
        }))
    }

    pub fn submission_context(&self) -> UserContext {
        UserContext::new(
            self.submission.user_id.clone(),
            self.submission.workspace_id.clone(),
        )
    }
}
