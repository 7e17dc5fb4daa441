//! Error types shared by the import workflow.

use thiserror::Error;

use crate::ImportFormat;

/// Reasons an import cannot be submitted or a plugin cannot confirm.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// No format was detected or chosen.
    #[error("no import format selected")]
    MissingFormat,
    /// None of files, raw text or URL was provided.
    #[error("no import source provided")]
    MissingSource,
    /// A non-native URL import needs a copy or link action.
    #[error("no import action selected")]
    MissingAction,
    /// The query expression is blank once settings and output statements are
    /// stripped.
    #[error("query expression is empty")]
    EmptyExpression,
    /// The selected entry needs a geographic boundary and none was chosen.
    #[error("a geographic boundary is required")]
    BoundaryRequired,
    /// The dataset dialog was confirmed without a dataset.
    #[error("no dataset selected")]
    MissingDataset,
    /// A data-API dataset was chosen but no data-API base URL is configured.
    #[error("no data API base URL configured")]
    MissingDataApi,
    /// Only URL sources can be linked.
    #[error("link imports require a URL source")]
    LinkWithoutUrl,
}

impl ValidationError {
    /// Alert text shown to the user for this validation failure.
    #[must_use]
    pub const fn user_message(self) -> &'static str {
        match self {
            Self::MissingFormat => "Please choose a format",
            Self::MissingSource => "Please choose a file, paste some data or enter a URL",
            Self::MissingAction => "Please choose whether to copy or link the data",
            Self::EmptyExpression => "Expression is empty",
            Self::BoundaryRequired => "Please choose an area",
            Self::MissingDataset => "Please choose a dataset",
            Self::MissingDataApi => "No data API is configured",
            Self::LinkWithoutUrl => "Only remote URLs can be linked",
        }
    }
}

/// Errors surfaced by an import run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ImportError {
    /// The context is not ready to submit.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The source contained no feature with usable geometry.
    #[error("no usable features found")]
    EmptyResult,
    /// The request could not reach the remote host.
    #[error("network error fetching {url}: {message}")]
    Network {
        /// Requested URL.
        url: String,
        /// Transport error description.
        message: String,
    },
    /// The request exceeded the configured timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Requested URL.
        url: String,
        /// Timeout that elapsed.
        timeout_secs: u64,
    },
    /// The remote host answered with a non-success status.
    #[error("HTTP {status} from {url}: {message}")]
    Http {
        /// Requested URL.
        url: String,
        /// Status code returned.
        status: u16,
        /// Reason phrase or body excerpt.
        message: String,
    },
    /// The payload could not be decoded in the requested format.
    #[error("failed to parse {format} data: {message}")]
    Parse {
        /// Format the payload was decoded as.
        format: ImportFormat,
        /// Decoder error description.
        message: String,
    },
    /// Another import is still running on this controller.
    #[error("an import is already in progress")]
    Busy,
}

impl ImportError {
    /// Convenience constructor for parse failures.
    pub fn parse(format: ImportFormat, message: impl Into<String>) -> Self {
        Self::Parse {
            format,
            message: message.into(),
        }
    }

    /// Alert text shown to the user.
    ///
    /// # Examples
    ///
    /// ```
    /// use geoimport_core::ImportError;
    ///
    /// assert_eq!(
    ///     ImportError::EmptyResult.user_message(),
    ///     "No data has been found for import"
    /// );
    /// ```
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(err) => err.user_message().to_owned(),
            Self::EmptyResult => "No data has been found for import".to_owned(),
            Self::Network { url, .. } | Self::Timeout { url, .. } => {
                format!("Unable to reach {url}")
            }
            Self::Http { url, status, .. } => format!("Problem in the response from {url} ({status})"),
            Self::Parse {
                format: ImportFormat::Umap,
                ..
            } => "Invalid umap data".to_owned(),
            Self::Parse { format, .. } => format!("Unable to read the {format} data"),
            Self::Busy => "An import is already running".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ValidationError::MissingFormat.into(), "Please choose a format")]
    #[case(ValidationError::EmptyExpression.into(), "Expression is empty")]
    #[case(ImportError::EmptyResult, "No data has been found for import")]
    #[case(ImportError::parse(ImportFormat::Umap, "eof"), "Invalid umap data")]
    #[case(ImportError::parse(ImportFormat::Csv, "eof"), "Unable to read the csv data")]
    fn user_messages(#[case] err: ImportError, #[case] expected: &str) {
        assert_eq!(err.user_message(), expected);
    }

    #[rstest]
    fn http_message_names_status() {
        let err = ImportError::Http {
            url: "https://example.org/a".to_owned(),
            status: 502,
            message: "Bad Gateway".to_owned(),
        };
        assert_eq!(
            err.user_message(),
            "Problem in the response from https://example.org/a (502)"
        );
    }
}
