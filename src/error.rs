/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Error taxonomy for the view engine.
//!
//! Validation problems recover locally (malformed elements are dropped and
//! counted, bad windows are rejected with the prior window retained); only a
//! render-backend failure is terminal for the session.

#[derive(Debug)]
pub enum ReplayError {
    /// An ingested element was missing required fields and was dropped.
    MalformedInput(String),
    /// A requested window violated start < end or bounds containment.
    InvalidWindow(String),
    /// The active render backend failed during mount, apply, or refresh.
    RenderBackend(String),
    /// The upstream data collaborator reported a fetch failure.
    UpstreamFetch(String),
}

impl std::fmt::Display for ReplayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReplayError::MalformedInput(e) => write!(f, "Malformed input: {e}"),
            ReplayError::InvalidWindow(e) => write!(f, "Invalid window: {e}"),
            ReplayError::RenderBackend(e) => write!(f, "Render backend failure: {e}"),
            ReplayError::UpstreamFetch(e) => write!(f, "Upstream fetch failure: {e}"),
        }
    }
}

impl std::error::Error for ReplayError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_detail() {
        let err = ReplayError::InvalidWindow("start 10 >= end 10".to_string());
        assert_eq!(err.to_string(), "Invalid window: start 10 >= end 10");

        let err = ReplayError::RenderBackend("mount refused".to_string());
        assert!(err.to_string().contains("mount refused"));
    }

    #[test]
    fn test_error_trait_object() {
        let err: Box<dyn std::error::Error> =
            Box::new(ReplayError::MalformedInput("node without id".to_string()));
        assert!(err.to_string().starts_with("Malformed input"));
    }
}
