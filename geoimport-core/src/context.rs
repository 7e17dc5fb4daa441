//! Mutable state of one import dialog session.
//!
//! Accessors are plain field reads. Transitions that keep fields consistent
//! with each other (for example re-resolving the format when the file list
//! changes) are explicit methods.

use serde::{Deserialize, Serialize};

use crate::{
    FeatureOptions, ImportFile, ImportFormat, LayerId, LayerOptions, ValidationError,
    resolve_format,
};

/// What to do with a remote URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportAction {
    /// Copy the features into the layer once.
    #[default]
    Copy,
    /// Keep the layer pointing at the URL and refetch on demand.
    Link,
}

/// Which input supplies the data. Files win over pasted text, which wins
/// over a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Uploaded files.
    Files,
    /// Pasted text.
    Raw,
    /// A remote URL.
    Url,
}

/// Execution strategy chosen for a submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitPlan {
    /// Merge whole native documents.
    Full,
    /// Copy features into the destination layer.
    Copy,
    /// Link the destination layer to the URL.
    Link,
}

/// Which form controls are relevant for the current inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormVisibility {
    /// Destination layer picker.
    pub destination: bool,
    /// Copy/link choice.
    pub action: bool,
    /// "Replace layer content" toggle.
    pub clear: bool,
}

/// State of an import session.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportContext {
    /// Uploaded files.
    pub files: Vec<ImportFile>,
    /// Pasted text.
    pub raw: Option<String>,
    /// Remote URL.
    pub url: Option<String>,
    /// Selected or detected format.
    pub format: Option<ImportFormat>,
    /// Existing destination layer; `None` creates a new one.
    pub layer_id: Option<LayerId>,
    /// Name for a newly created layer.
    pub layer_name: Option<String>,
    /// Further options for a newly created layer.
    pub layer_options: LayerOptions,
    /// Purge the destination before importing.
    pub clear: bool,
    /// Copy or link, for URL sources.
    pub action: Option<ImportAction>,
    /// Feature options staged by plugins.
    pub feature_options: FeatureOptions,
    /// Options carried across a copy, applied to every inserted feature.
    pub pending_feature_options: FeatureOptions,
}

impl Default for ImportContext {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            raw: None,
            url: None,
            format: None,
            layer_id: None,
            layer_name: None,
            layer_options: LayerOptions::default(),
            clear: false,
            action: Some(ImportAction::Copy),
            feature_options: FeatureOptions::default(),
            pending_feature_options: FeatureOptions::default(),
        }
    }
}

fn non_blank(value: Option<&str>) -> bool {
    value.is_some_and(|text| !text.trim().is_empty())
}

impl ImportContext {
    /// Fresh session state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return to the initial state, with `copy` as action.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Replace the uploaded files and re-resolve the format from them.
    pub fn set_files(&mut self, files: Vec<ImportFile>) {
        self.format = resolve_format(&files);
        self.files = files;
    }

    /// Set the pasted text.
    pub fn set_raw(&mut self, raw: impl Into<String>) {
        self.raw = Some(raw.into());
    }

    /// Set the remote URL.
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = Some(url.into());
    }

    /// Choose the format explicitly.
    pub const fn set_format(&mut self, format: ImportFormat) {
        self.format = Some(format);
    }

    /// Import into an existing layer, or a new one with `None`.
    pub const fn set_destination(&mut self, layer_id: Option<LayerId>) {
        self.layer_id = layer_id;
    }

    /// Active source, if any.
    #[must_use]
    pub fn source(&self) -> Option<SourceKind> {
        if !self.files.is_empty() {
            Some(SourceKind::Files)
        } else if non_blank(self.raw.as_deref()) {
            Some(SourceKind::Raw)
        } else if non_blank(self.url.as_deref()) {
            Some(SourceKind::Url)
        } else {
            None
        }
    }

    /// Check submit readiness and pick the execution strategy.
    ///
    /// A URL, when present, needs an action and `link` always fetches it,
    /// whatever other source is set.
    ///
    /// # Errors
    ///
    /// Returns the first missing piece: format, then source, then action.
    /// A `link` action without a URL is rejected.
    pub fn validate(&self) -> Result<SubmitPlan, ValidationError> {
        let format = self.format.ok_or(ValidationError::MissingFormat)?;
        self.source().ok_or(ValidationError::MissingSource)?;
        if format.is_native() {
            return Ok(SubmitPlan::Full);
        }
        match (self.has_url(), self.action) {
            (true, None) => Err(ValidationError::MissingAction),
            (true, Some(ImportAction::Link)) => Ok(SubmitPlan::Link),
            (false, Some(ImportAction::Link)) => Err(ValidationError::LinkWithoutUrl),
            _ => Ok(SubmitPlan::Copy),
        }
    }

    fn has_url(&self) -> bool {
        non_blank(self.url.as_deref())
    }

    /// Whether [`validate`](Self::validate) would succeed.
    #[must_use]
    pub fn can_submit(&self) -> bool {
        self.validate().is_ok()
    }

    /// Controls to show for the current inputs. Native imports hide
    /// everything layer-related; the action only matters for URLs and
    /// clearing only for an existing destination.
    #[must_use]
    pub fn visibility(&self) -> FormVisibility {
        let native = self.format.is_some_and(ImportFormat::is_native);
        FormVisibility {
            destination: !native,
            action: !native && self.has_url(),
            clear: !native
                && self.layer_id.is_some()
                && self.action != Some(ImportAction::Link),
        }
    }

    /// Options for the layer created when no destination is chosen.
    #[must_use]
    pub fn layer_creation_options(&self) -> LayerOptions {
        let mut options = self.layer_options.clone();
        if let Some(name) = self.layer_name.as_deref().filter(|n| !n.trim().is_empty()) {
            options.name = Some(name.to_owned());
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn ctx() -> ImportContext {
        ImportContext::new()
    }

    #[rstest]
    fn reset_defaults_to_copy(mut ctx: ImportContext) {
        ctx.action = None;
        ctx.set_url("https://a.example/x.csv");
        ctx.reset();
        assert_eq!(ctx.action, Some(ImportAction::Copy));
        assert_eq!(ctx.url, None);
    }

    #[rstest]
    fn files_drive_format(mut ctx: ImportContext) {
        ctx.set_files(vec![ImportFile::new("a.kml", ""), ImportFile::new("b.kml", "")]);
        assert_eq!(ctx.format, Some(ImportFormat::Kml));
        ctx.set_files(vec![ImportFile::new("a.kml", ""), ImportFile::new("b.gpx", "")]);
        assert_eq!(ctx.format, None);
        assert_eq!(ctx.validate(), Err(ValidationError::MissingFormat));
    }

    #[rstest]
    fn missing_source_blocks_submit(mut ctx: ImportContext) {
        ctx.set_format(ImportFormat::Csv);
        ctx.set_raw("   ");
        assert_eq!(ctx.validate(), Err(ValidationError::MissingSource));
        assert!(!ctx.can_submit());
    }

    #[rstest]
    fn url_requires_action(mut ctx: ImportContext) {
        ctx.set_format(ImportFormat::GeoJson);
        ctx.set_url("https://a.example/x.geojson");
        ctx.action = None;
        assert_eq!(ctx.validate(), Err(ValidationError::MissingAction));
        ctx.action = Some(ImportAction::Link);
        assert_eq!(ctx.validate(), Ok(SubmitPlan::Link));
    }

    #[rstest]
    fn raw_text_does_not_need_action(mut ctx: ImportContext) {
        ctx.set_format(ImportFormat::Csv);
        ctx.set_raw("lat,lon\n1,2");
        ctx.action = None;
        assert_eq!(ctx.validate(), Ok(SubmitPlan::Copy));
    }

    #[rstest]
    fn link_needs_a_url(mut ctx: ImportContext) {
        ctx.set_format(ImportFormat::Csv);
        ctx.set_raw("lat,lon\n1,2");
        ctx.action = Some(ImportAction::Link);
        assert_eq!(ctx.validate(), Err(ValidationError::LinkWithoutUrl));
    }

    #[rstest]
    fn native_format_ignores_action(mut ctx: ImportContext) {
        ctx.set_format(ImportFormat::Umap);
        ctx.set_url("https://a.example/map.umap");
        ctx.action = None;
        assert_eq!(ctx.validate(), Ok(SubmitPlan::Full));
        let visibility = ctx.visibility();
        assert!(!visibility.destination && !visibility.action && !visibility.clear);
    }

    #[rstest]
    fn url_shows_action_picker(mut ctx: ImportContext) {
        ctx.set_format(ImportFormat::Osm);
        ctx.set_url("https://o.example/api?data=x");
        assert!(ctx.visibility().action);
        ctx.action = Some(ImportAction::Link);
        assert!(!ctx.visibility().clear);
    }

    #[rstest]
    fn url_with_link_wins_over_files(mut ctx: ImportContext) {
        ctx.set_files(vec![ImportFile::new("a.csv", "lat,lon\n1,2")]);
        ctx.set_url("https://a.example/x.csv");
        ctx.action = None;
        assert_eq!(ctx.validate(), Err(ValidationError::MissingAction));
        ctx.action = Some(ImportAction::Link);
        assert_eq!(ctx.validate(), Ok(SubmitPlan::Link));
        ctx.action = Some(ImportAction::Copy);
        assert_eq!(ctx.validate(), Ok(SubmitPlan::Copy));
    }

    #[rstest]
    fn clear_needs_an_existing_destination(mut ctx: ImportContext) {
        ctx.set_format(ImportFormat::Csv);
        ctx.set_raw("lat,lon\n1,2");
        assert!(!ctx.visibility().clear);
        ctx.set_destination(Some(LayerId(3)));
        assert!(ctx.visibility().clear);
    }

    #[rstest]
    fn layer_name_feeds_creation_options(mut ctx: ImportContext) {
        ctx.layer_options.draggable = Some(false);
        ctx.layer_name = Some("Benches".into());
        let options = ctx.layer_creation_options();
        assert_eq!(options.name.as_deref(), Some("Benches"));
        assert_eq!(options.draggable, Some(false));
    }
}
