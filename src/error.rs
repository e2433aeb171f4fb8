use thiserror::Error;
use wasm_bindgen::JsValue;

/// Malformed track-file structure. Always fatal to the whole analysis.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Input is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("Missing attribute '{attribute}' on <{element}>")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    #[error("Invalid value '{value}' for attribute '{attribute}' on <{element}>")]
    InvalidAttribute {
        element: &'static str,
        attribute: &'static str,
        value: String,
    },

    #[error("Invalid content '{value}' in <{element}>")]
    InvalidValue {
        element: &'static str,
        value: String,
    },

    #[error("Unexpected end of input inside <{element}>")]
    UnclosedElement { element: String },
}

/// Failure of a full `analyze` call.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Track contains {found} points, at least 1 required")]
    EmptyTrack { found: usize },
}

impl From<quick_xml::Error> for AnalysisError {
    fn from(e: quick_xml::Error) -> Self {
        Self::Parse(ParseError::Xml(e))
    }
}

impl From<AnalysisError> for JsValue {
    fn from(e: AnalysisError) -> Self {
        JsValue::from_str(&e.to_string())
    }
}
