//! Geographic boundaries resolvable into query area clauses.
//!
//! A boundary search service turns free text such as "Lyon" into ranked
//! candidates. Each candidate carries an area identifier derived from the
//! OpenStreetMap relation id, so it can be dropped verbatim into an
//! `area:<id>` clause.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ImportError;

/// Offset added to a relation id to obtain its area id.
pub const AREA_ID_OFFSET: u64 = 3_600_000_000;

/// Default boundary search endpoint. `{q}` is replaced by the search text.
pub const DEFAULT_SEARCH_URL: &str =
    "https://photon.komoot.io/api?q={q}&layer=county&layer=city&layer=state";

/// A resolved geographic boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundaryChoice {
    /// Area identifier usable in an `area:<id>` clause.
    pub id: String,
    /// Human-readable label.
    pub label: String,
}

impl BoundaryChoice {
    /// Construct a choice from an area id and label.
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }

    /// Derive a choice from an OpenStreetMap relation id.
    ///
    /// Returns `None` if adding [`AREA_ID_OFFSET`] would overflow.
    ///
    /// # Examples
    ///
    /// ```
    /// use geoimport_core::BoundaryChoice;
    ///
    /// let choice = BoundaryChoice::from_osm_id(2202, "Lyon").unwrap();
    /// assert_eq!(choice.id, "3600002202");
    /// ```
    pub fn from_osm_id(osm_id: u64, label: impl Into<String>) -> Option<Self> {
        let area = osm_id.checked_add(AREA_ID_OFFSET)?;
        Some(Self::new(area.to_string(), label))
    }

    /// Interpret a raw area parameter such as `3600002202` or
    /// `area:3600002202`.
    ///
    /// The id doubles as label since no name is known. Blank input yields
    /// `None`.
    #[must_use]
    pub fn from_area_param(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let id = trimmed.strip_prefix("area:").unwrap_or(trimmed).trim();
        (!id.is_empty()).then(|| Self::new(id, id))
    }
}

/// Join label parts with `", "`, skipping absent and blank parts.
///
/// ```
/// use geoimport_core::boundary::join_label;
///
/// let label = join_label([Some("Lyon"), None, Some(" "), Some("France")]);
/// assert_eq!(label, "Lyon, France");
/// ```
pub fn join_label<'a>(parts: impl IntoIterator<Item = Option<&'a str>>) -> String {
    parts
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Expand a search URL template for `text`.
#[must_use]
pub fn search_request_url(template: &str, text: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(text.as_bytes()).collect();
    template.replace("{q}", &encoded)
}

/// Service resolving free text into boundary candidates.
#[async_trait(?Send)]
pub trait BoundarySearch {
    /// Search `search_url` (a template containing `{q}`) for `text`.
    async fn search(&self, search_url: &str, text: &str)
    -> Result<Vec<BoundaryChoice>, ImportError>;
}

/// Candidate list and current selection behind a boundary input.
///
/// Responses are applied in arrival order, so the last one shown wins even
/// if it answers an older query.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BoundaryPicker {
    candidates: Vec<BoundaryChoice>,
    selected: Option<BoundaryChoice>,
}

impl BoundaryPicker {
    /// Picker with an initial selection, as restored from a previous opening.
    #[must_use]
    pub const fn with_selection(selected: Option<BoundaryChoice>) -> Self {
        Self {
            candidates: Vec::new(),
            selected,
        }
    }

    /// Replace the displayed candidates.
    pub fn show(&mut self, candidates: Vec<BoundaryChoice>) {
        self.candidates = candidates;
    }

    /// Displayed candidates.
    #[must_use]
    pub fn candidates(&self) -> &[BoundaryChoice] {
        &self.candidates
    }

    /// Select the candidate at `index`, returning it.
    pub fn select(&mut self, index: usize) -> Option<&BoundaryChoice> {
        let choice = self.candidates.get(index)?.clone();
        self.selected = Some(choice);
        self.selected.as_ref()
    }

    /// Drop the current selection.
    pub fn unselect(&mut self) {
        self.selected = None;
    }

    /// Drop candidates and selection, as when the dialog closes.
    pub fn clear(&mut self) {
        self.candidates.clear();
        self.selected = None;
    }

    /// Current selection.
    #[must_use]
    pub const fn selected(&self) -> Option<&BoundaryChoice> {
        self.selected.as_ref()
    }

    /// Run a search and show its results.
    ///
    /// Blank text clears the candidates without calling the service.
    ///
    /// # Errors
    ///
    /// Propagates the search service's error; the displayed candidates are
    /// left unchanged in that case.
    pub async fn refresh(
        &mut self,
        search: &dyn BoundarySearch,
        search_url: &str,
        text: &str,
    ) -> Result<&[BoundaryChoice], ImportError> {
        if text.trim().is_empty() {
            self.candidates.clear();
        } else {
            let found = search.search(search_url, text.trim()).await?;
            self.show(found);
        }
        Ok(&self.candidates)
    }
}
