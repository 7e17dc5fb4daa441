//! Grouped dataset catalogs.
//!
//! A catalog lists curated entries. Picking one resolves it in one of three
//! ways: a direct file URL, a filter expression handed to an embedded
//! Overpass helper, or a data-API dataset narrowed by a filter value.

use async_trait::async_trait;
use log::debug;

use super::{
    DatasetPrompt, DatasetSelection, FilterPrompt, ImportPlugin, OverpassImporter, PluginConfig,
    PluginOutcome, PluginParams, PluginServices,
};
use crate::boundary::DEFAULT_SEARCH_URL;
use crate::dataset::{DatasetTarget, data_url};
use crate::query;
use crate::{
    BoundaryChoice, DatasetChoice, FilterOption, ImportContext, ImportError, ValidationError,
};

/// Identifier derived from a display name: lower-cased, whitespace runs
/// replaced by `-`.
///
/// ```
/// use geoimport_core::plugin::plugin_id;
///
/// assert_eq!(plugin_id("Open  Data\tLyon"), "open-data-lyon");
/// ```
#[must_use]
pub fn plugin_id(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// Plugin presenting one catalog of [`DatasetChoice`] entries.
pub struct DatasetsImporter {
    id: String,
    name: String,
    choices: Vec<DatasetChoice>,
    search_url: String,
    data_api_url: Option<String>,
    boundary: Option<BoundaryChoice>,
    overpass: OverpassImporter,
    services: PluginServices,
}

impl DatasetsImporter {
    /// Build a catalog plugin.
    ///
    /// `key` names the catalog when the configuration has no `name`.
    /// Expression entries run through an Overpass helper built from
    /// `overpass`, so they share the configured endpoint.
    #[must_use]
    pub fn new(
        key: &str,
        config: &PluginConfig,
        overpass: &PluginConfig,
        data_api_url: Option<String>,
        services: PluginServices,
    ) -> Self {
        let name = config.name.clone().unwrap_or_else(|| key.to_owned());
        Self {
            id: plugin_id(&name),
            name,
            choices: config.choices.clone(),
            search_url: config
                .search_url
                .clone()
                .unwrap_or_else(|| DEFAULT_SEARCH_URL.to_owned()),
            data_api_url,
            boundary: None,
            overpass: OverpassImporter::new(overpass, services.clone()),
            services,
        }
    }

    /// Catalog entries.
    #[must_use]
    pub fn choices(&self) -> &[DatasetChoice] {
        &self.choices
    }

    fn choice_by_label(&self, label: &str) -> Option<usize> {
        let wanted = label.trim();
        self.choices
            .iter()
            .position(|choice| choice.label.eq_ignore_ascii_case(wanted))
    }

    async fn select(&self, params: &PluginParams) -> Result<Option<DatasetSelection>, ImportError> {
        if params.auto_confirm {
            let label = params
                .dataset
                .as_deref()
                .ok_or(ValidationError::MissingDataset)?;
            let index = self
                .choice_by_label(label)
                .ok_or(ValidationError::MissingDataset)?;
            return Ok(Some(DatasetSelection {
                index,
                boundary: params.area.clone(),
            }));
        }
        let prompt = DatasetPrompt {
            title: &self.name,
            choices: &self.choices,
            boundary: params.area.as_ref().or(self.boundary.as_ref()),
            search_url: &self.search_url,
        };
        Ok(self
            .services
            .dialog
            .dataset(prompt, self.services.boundary_search.as_ref())
            .await)
    }

    async fn pick_filter(
        &self,
        choice: &DatasetChoice,
        key: &str,
        options: &[FilterOption],
        params: &PluginParams,
    ) -> Option<FilterOption> {
        if params.auto_confirm {
            let wanted = params.filter.as_deref()?;
            return options.iter().find(|option| option.value == wanted).cloned();
        }
        let prompt = FilterPrompt {
            label: &choice.label,
            key,
            options,
        };
        self.services.dialog.filter(prompt).await
    }

    async fn apply(
        &mut self,
        ctx: &mut ImportContext,
        choice: &DatasetChoice,
        boundary: Option<BoundaryChoice>,
        params: &PluginParams,
    ) -> Result<(), ImportError> {
        let target = choice.target().ok_or(ValidationError::MissingDataset)?;
        match target {
            DatasetTarget::Url(url) => {
                ctx.url = Some(url.to_owned());
            }
            DatasetTarget::Expression(expression) => {
                if choice.requires_area && boundary.is_none() {
                    return Err(ValidationError::BoundaryRequired.into());
                }
                let delegated = PluginParams {
                    expression: Some(expression.to_owned()),
                    mode: query::output_mode(expression).or(params.mode),
                    area: boundary,
                    auto_confirm: true,
                    ..PluginParams::default()
                };
                self.overpass.open(ctx, delegated).await?;
                ctx.layer_name = Some(choice.label.clone());
                return Ok(());
            }
            DatasetTarget::DataApi {
                slug,
                geographic_query,
            } => {
                let base = self
                    .data_api_url
                    .as_deref()
                    .ok_or(ValidationError::MissingDataApi)?;
                let url = match geographic_query {
                    None => data_url(base, slug, None),
                    Some(key) => {
                        let options = self.services.dataset_api.filters(base, slug).await?;
                        let picked = self
                            .pick_filter(choice, key, &options, params)
                            .await
                            .ok_or(ValidationError::BoundaryRequired)?;
                        data_url(base, slug, Some((key, &picked.value)))
                    }
                };
                debug!("dataset {} resolved to {url}", choice.label);
                ctx.url = Some(url);
            }
        }
        ctx.format = Some(choice.import_format());
        ctx.layer_name = Some(choice.label.clone());
        Ok(())
    }
}

#[async_trait(?Send)]
impl ImportPlugin for DatasetsImporter {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn open(
        &mut self,
        ctx: &mut ImportContext,
        params: PluginParams,
    ) -> Result<PluginOutcome, ImportError> {
        let Some(selection) = self.select(&params).await? else {
            return Ok(PluginOutcome::Cancelled);
        };
        let choice = self
            .choices
            .get(selection.index)
            .cloned()
            .ok_or(ValidationError::MissingDataset)?;
        self.boundary.clone_from(&selection.boundary);
        self.apply(ctx, &choice, selection.boundary, &params).await?;
        Ok(PluginOutcome::Confirmed)
    }
}
