//! Overpass helper: builds a filter query from an expression and a boundary.

use async_trait::async_trait;
use log::debug;

use super::{
    ImportPlugin, OverpassForm, OverpassPrompt, PluginConfig, PluginOutcome, PluginParams,
    PluginServices,
};
use crate::boundary::DEFAULT_SEARCH_URL;
use crate::query::{self, GeometryMode, QuerySpec};
use crate::{BoundaryChoice, ImportContext, ImportError};

/// Default display name.
pub const DEFAULT_NAME: &str = "Overpass";

/// Default query endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://overpass-api.de/api/interpreter";

/// Plugin turning a tag or element expression into an Overpass query URL.
///
/// The last confirmed expression, mode and boundary are remembered and
/// pre-fill the next opening.
pub struct OverpassImporter {
    name: String,
    endpoint: String,
    search_url: String,
    expression: Option<String>,
    mode: GeometryMode,
    boundary: Option<BoundaryChoice>,
    services: PluginServices,
}

impl OverpassImporter {
    /// Build the plugin from its configuration.
    #[must_use]
    pub fn new(config: &PluginConfig, services: PluginServices) -> Self {
        Self {
            name: config.name.clone().unwrap_or_else(|| DEFAULT_NAME.to_owned()),
            endpoint: config.url.clone().unwrap_or_else(|| DEFAULT_ENDPOINT.to_owned()),
            search_url: config
                .search_url
                .clone()
                .unwrap_or_else(|| DEFAULT_SEARCH_URL.to_owned()),
            expression: None,
            mode: GeometryMode::default(),
            boundary: None,
            services,
        }
    }

    /// Query endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Last confirmed expression.
    #[must_use]
    pub fn expression(&self) -> Option<&str> {
        self.expression.as_deref()
    }

    /// Last confirmed boundary.
    #[must_use]
    pub const fn boundary(&self) -> Option<&BoundaryChoice> {
        self.boundary.as_ref()
    }

    /// Build the query and write it onto `ctx`.
    ///
    /// The query is built before anything is written, so a failure leaves
    /// both `ctx` and the remembered values untouched.
    fn confirm(&mut self, ctx: &mut ImportContext, form: OverpassForm) -> Result<(), ImportError> {
        let built = query::build(&form.expression, form.mode, form.boundary.as_ref())?;
        let spec = QuerySpec::new(&self.endpoint, &built);
        debug!("overpass query resolved to {}", spec.url);
        ctx.url = Some(spec.url);
        ctx.format = Some(spec.format);
        if let Some(boundary) = &form.boundary {
            ctx.layer_name = Some(boundary.label.clone());
        }
        self.expression = Some(form.expression);
        self.mode = form.mode;
        self.boundary = form.boundary;
        Ok(())
    }
}

#[async_trait(?Send)]
impl ImportPlugin for OverpassImporter {
    fn id(&self) -> &str {
        "overpass"
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn open(
        &mut self,
        ctx: &mut ImportContext,
        params: PluginParams,
    ) -> Result<PluginOutcome, ImportError> {
        let mode = params.mode.unwrap_or(self.mode);
        if params.auto_confirm {
            let expression = params
                .expression
                .or_else(|| self.expression.clone())
                .unwrap_or_default();
            let form = OverpassForm {
                expression,
                mode,
                boundary: params.area,
            };
            self.confirm(ctx, form)?;
            return Ok(PluginOutcome::Confirmed);
        }
        let boundary = params.area.as_ref().or(self.boundary.as_ref());
        let prompt = OverpassPrompt {
            title: &self.name,
            expression: params.expression.as_deref().or(self.expression.as_deref()),
            mode,
            boundary,
            search_url: &self.search_url,
        };
        let services = self.services.clone();
        let answer = services
            .dialog
            .overpass(prompt, services.boundary_search.as_ref())
            .await;
        match answer {
            Some(form) => {
                self.confirm(ctx, form)?;
                Ok(PluginOutcome::Confirmed)
            }
            None => Ok(PluginOutcome::Cancelled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ImportFormat;
    use crate::test_support::{ScriptedDialog, block_on, plugin_services};
    use rstest::rstest;
    use std::rc::Rc;

    fn importer(dialog: Rc<ScriptedDialog>) -> OverpassImporter {
        let config = PluginConfig {
            url: Some("https://o.example/api".into()),
            ..PluginConfig::default()
        };
        OverpassImporter::new(&config, plugin_services(dialog))
    }

    #[rstest]
    fn auto_confirm_writes_url_and_format() {
        let mut plugin = importer(Rc::new(ScriptedDialog::default()));
        let mut ctx = ImportContext::new();
        let lyon = BoundaryChoice::new("3600002202", "Lyon");
        let params = PluginParams::auto("amenity=bench", Some(lyon));
        let outcome = block_on(plugin.open(&mut ctx, params)).expect("confirmed");
        assert_eq!(outcome, PluginOutcome::Confirmed);
        assert_eq!(ctx.format, Some(ImportFormat::Osm));
        assert_eq!(ctx.layer_name.as_deref(), Some("Lyon"));
        let url = ctx.url.expect("url");
        assert!(url.starts_with("https://o.example/api?data="));
        assert!(url.contains("area%3A3600002202"));
    }

    #[rstest]
    fn auto_confirm_without_area_uses_viewport() {
        let mut plugin = importer(Rc::new(ScriptedDialog::default()));
        let mut ctx = ImportContext::new();
        block_on(plugin.open(&mut ctx, PluginParams::auto("amenity=bench", None)))
            .expect("confirmed");
        assert!(ctx.url.as_deref().is_some_and(|u| u.contains("{south}")));
        assert_eq!(ctx.layer_name, None);
    }

    #[rstest]
    fn cancel_leaves_context_untouched() {
        let dialog = Rc::new(ScriptedDialog::default().cancel_overpass());
        let mut plugin = importer(dialog);
        let mut ctx = ImportContext::new();
        ctx.set_url("https://kept.example/");
        let outcome = block_on(plugin.open(&mut ctx, PluginParams::default())).expect("outcome");
        assert_eq!(outcome, PluginOutcome::Cancelled);
        assert_eq!(ctx.url.as_deref(), Some("https://kept.example/"));
        assert!(plugin.expression().is_none());
    }

    #[rstest]
    fn empty_expression_is_rejected_without_side_effects() {
        let mut plugin = importer(Rc::new(ScriptedDialog::default()));
        let mut ctx = ImportContext::new();
        let err = block_on(plugin.open(&mut ctx, PluginParams::auto("  ", None)))
            .expect_err("empty");
        assert_eq!(err.user_message(), "Expression is empty");
        assert_eq!(ctx, ImportContext::new());
    }

    #[rstest]
    fn remembers_last_confirmed_values() {
        let form = OverpassForm {
            expression: "shop=bakery".into(),
            mode: GeometryMode::Center,
            boundary: Some(BoundaryChoice::new("3600000001", "Somewhere")),
        };
        let dialog = Rc::new(
            ScriptedDialog::default()
                .answer_overpass(form.clone())
                .cancel_overpass(),
        );
        let mut plugin = importer(Rc::clone(&dialog));
        let mut ctx = ImportContext::new();
        block_on(plugin.open(&mut ctx, PluginParams::default())).expect("first");
        block_on(plugin.open(&mut ctx, PluginParams::default())).expect("second");
        let prompts = dialog.overpass_prompts();
        let second = prompts.get(1).expect("second prompt");
        assert_eq!(second.expression.as_deref(), Some("shop=bakery"));
        assert_eq!(second.mode, GeometryMode::Center);
        assert_eq!(second.boundary, form.boundary);
    }
}
