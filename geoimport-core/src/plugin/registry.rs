//! Static plugin registry.

use log::{debug, warn};

use super::{
    DatasetsImporter, ImportPlugin, ImporterSettings, OverpassImporter, PluginConfig,
    PluginOutcome, PluginParams, PluginServices,
};
use crate::{ImportContext, ImportError};

type Factory = fn(&str, &PluginConfig, &ImporterSettings, &PluginServices) -> Box<dyn ImportPlugin>;

/// Settings keys with a dedicated plugin.
const FACTORIES: &[(&str, Factory)] = &[("overpass", build_overpass)];

/// Settings keys starting with this prefix configure a dataset catalog.
const DATASETS_PREFIX: &str = "datasets";

fn build_overpass(
    _key: &str,
    config: &PluginConfig,
    _settings: &ImporterSettings,
    services: &PluginServices,
) -> Box<dyn ImportPlugin> {
    Box::new(OverpassImporter::new(config, services.clone()))
}

fn build_datasets(
    key: &str,
    config: &PluginConfig,
    settings: &ImporterSettings,
    services: &PluginServices,
) -> Box<dyn ImportPlugin> {
    let overpass = settings.importers.get("overpass").cloned().unwrap_or_default();
    Box::new(DatasetsImporter::new(
        key,
        config,
        &overpass,
        settings.data_api_url.clone(),
        services.clone(),
    ))
}

fn factory_for(key: &str) -> Option<Factory> {
    FACTORIES
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, factory)| *factory)
        .or_else(|| key.starts_with(DATASETS_PREFIX).then_some(build_datasets as Factory))
}

/// Plugins built from settings, ordered by display name.
pub struct PluginRegistry {
    plugins: Vec<Box<dyn ImportPlugin>>,
}

impl PluginRegistry {
    /// Instantiate a plugin for every recognised settings key.
    ///
    /// Unknown keys are skipped.
    #[must_use]
    pub fn from_settings(settings: &ImporterSettings, services: &PluginServices) -> Self {
        let mut plugins: Vec<Box<dyn ImportPlugin>> = settings
            .importers
            .iter()
            .filter_map(|(key, config)| {
                let Some(factory) = factory_for(key) else {
                    debug!("ignoring unknown importer {key}");
                    return None;
                };
                Some(factory(key, config, settings, services))
            })
            .collect();
        plugins.sort_by_cached_key(|plugin| plugin.name().to_lowercase());
        Self { plugins }
    }

    /// Number of plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Whether no plugin is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// `(id, name)` pairs ordered by name.
    #[must_use]
    pub fn sorted(&self) -> Vec<(&str, &str)> {
        self.plugins
            .iter()
            .map(|plugin| (plugin.id(), plugin.name()))
            .collect()
    }

    /// Plugin whose id or name matches `name_or_id`, ignoring case.
    pub fn find_mut(&mut self, name_or_id: &str) -> Option<&mut (dyn ImportPlugin + 'static)> {
        let wanted = name_or_id.trim().to_lowercase();
        self.plugins
            .iter_mut()
            .find(|plugin| {
                plugin.id().to_lowercase() == wanted || plugin.name().to_lowercase() == wanted
            })
            .map(Box::as_mut)
    }

    /// Open the plugin matching `name_or_id`.
    ///
    /// Returns `Ok(None)` and logs a warning when nothing matches.
    ///
    /// # Errors
    ///
    /// Propagates the plugin's error.
    pub async fn open_helper(
        &mut self,
        name_or_id: &str,
        ctx: &mut ImportContext,
        params: PluginParams,
    ) -> Result<Option<PluginOutcome>, ImportError> {
        let Some(plugin) = self.find_mut(name_or_id) else {
            warn!("no importer matches {name_or_id}");
            return Ok(None);
        };
        plugin.open(ctx, params).await.map(Some)
    }
}
