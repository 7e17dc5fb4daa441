//! Collaborators wired into the commands.
//!
//! The CLI never prompts: helpers must be opened with every value they
//! need, and [`NonInteractiveDialog`] cancels any prompt a helper raises.

use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use geoimport_core::plugin::{
    DatasetPrompt, DatasetSelection, FilterPrompt, ImportDialog, OverpassForm, OverpassPrompt,
    PluginServices,
};
use geoimport_core::{BoundarySearch, FilterOption, ImportServices};
use geoimport_data::http::{HttpClient, HttpClientConfig};
use geoimport_data::{GeoDecoder, HttpDatasetApi, HttpRemoteSource, PhotonBoundarySearch};

use crate::CliError;

/// Dialog that cancels every prompt.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct NonInteractiveDialog;

#[async_trait(?Send)]
impl ImportDialog for NonInteractiveDialog {
    async fn overpass(
        &self,
        prompt: OverpassPrompt<'_>,
        _search: &dyn BoundarySearch,
    ) -> Option<OverpassForm> {
        log::debug!("cancelling overpass prompt {:?}", prompt.title);
        None
    }

    async fn dataset(
        &self,
        prompt: DatasetPrompt<'_>,
        _search: &dyn BoundarySearch,
    ) -> Option<DatasetSelection> {
        log::debug!("cancelling dataset prompt {:?}", prompt.title);
        None
    }

    async fn filter(&self, prompt: FilterPrompt<'_>) -> Option<FilterOption> {
        log::debug!(
            "cancelling filter prompt for {:?}; pass --filter with one of {:?}",
            prompt.label,
            prompt.options.iter().map(|o| &o.value).collect::<Vec<_>>()
        );
        None
    }
}

/// Network settings shared by the HTTP-backed collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NetworkConfig {
    pub(crate) timeout: Duration,
    pub(crate) user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        let defaults = HttpClientConfig::new();
        Self {
            timeout: defaults.timeout,
            user_agent: defaults.user_agent,
        }
    }
}

/// Builds the collaborators for one invocation.
pub(crate) trait ServiceBuilder {
    /// Services the importer fetches and decodes with.
    fn import_services(&self, network: &NetworkConfig) -> Result<ImportServices, CliError>;

    /// Services the plugins prompt and search with.
    fn plugin_services(&self, network: &NetworkConfig) -> Result<PluginServices, CliError>;
}

/// Builds HTTP-backed collaborators.
pub(crate) struct HttpServiceBuilder;

impl HttpServiceBuilder {
    fn client(network: &NetworkConfig) -> Result<HttpClient, CliError> {
        let config = HttpClientConfig::new()
            .with_timeout(network.timeout)
            .with_user_agent(network.user_agent.clone());
        Ok(HttpClient::with_config(config)?)
    }
}

impl ServiceBuilder for HttpServiceBuilder {
    fn import_services(&self, network: &NetworkConfig) -> Result<ImportServices, CliError> {
        let client = Self::client(network)?;
        Ok(ImportServices::new(
            Rc::new(HttpRemoteSource::new(client)),
            Rc::new(GeoDecoder),
        ))
    }

    fn plugin_services(&self, network: &NetworkConfig) -> Result<PluginServices, CliError> {
        let client = Self::client(network)?;
        Ok(PluginServices::new(
            Rc::new(NonInteractiveDialog),
            Rc::new(PhotonBoundarySearch::new(client.clone())),
            Rc::new(HttpDatasetApi::new(client)),
        ))
    }
}

/// Drive `future` to completion on a current-thread runtime.
pub(crate) fn block_on<F: Future>(future: F) -> Result<F::Output, CliError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    Ok(runtime.block_on(future))
}
