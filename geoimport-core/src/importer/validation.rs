//! Post-fetch checks applied before features reach a layer.

use log::warn;

use crate::{ImportBounds, ImportedFeature};

/// Features that can be shown, with the union of their extents.
#[derive(Debug, Default)]
pub(super) struct UsableFeatures {
    pub(super) features: Vec<ImportedFeature>,
    pub(super) bounds: ImportBounds,
}

/// Keep features that have a rendering handle and finite bounds.
///
/// Everything else is dropped with a warning.
pub(super) fn usable_features(features: Vec<ImportedFeature>) -> UsableFeatures {
    let mut usable = UsableFeatures::default();
    for feature in features {
        let Some(handle) = feature.handle.as_ref() else {
            warn!("skipping feature {} without geometry", feature.id);
            continue;
        };
        match handle.bounds() {
            Ok(rect) => {
                usable.bounds.extend(rect);
                usable.features.push(feature);
            }
            Err(err) => warn!("skipping feature {}: {err}", feature.id),
        }
    }
    usable
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, Point};
    use rstest::rstest;

    #[rstest]
    fn drops_features_without_handle_or_bounds() {
        let usable = usable_features(vec![
            ImportedFeature::new("ok", Some(Point::new(1.0, 2.0).into())),
            ImportedFeature::new("null", None),
            ImportedFeature::new("empty", Some(LineString::<f64>::new(Vec::new()).into())),
            ImportedFeature::new("nan", Some(Point::new(f64::NAN, 0.0).into())),
        ]);
        let ids: Vec<_> = usable.features.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, ["ok"]);
        assert_eq!(usable.bounds.count(), 1);
    }

    #[rstest]
    fn nothing_in_nothing_out() {
        let usable = usable_features(Vec::new());
        assert!(usable.features.is_empty());
        assert!(usable.bounds.rect().is_none());
    }
}
