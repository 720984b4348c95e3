//! Non-fatal error collection. The pipeline never aborts on a bad document;
//! it records what went wrong, where, and keeps going.

use crate::box_tree::BoxId;
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The markup was malformed enough that recovery changed the tree.
    /// html5ever recovers without telling us, so the pipeline itself never
    /// emits this; it is part of the taxonomy for hosts that validate the
    /// markup before handing it over and append their own events.
    MarkupParsing,
    /// An external stylesheet could not be fetched or parsed.
    StylesheetLoad,
    /// A structural correction pass could not repair a subtree.
    StructuralCorrection,
}

#[derive(Debug, Clone)]
pub struct ReportedError {
    pub kind: ErrorKind,
    /// The box the problem was detected at, when it maps to one.
    pub subtree: Option<BoxId>,
    pub message: String,
}

/// Accumulates reported errors for the duration of one render.
#[derive(Default)]
pub struct ErrorReporter {
    events: Vec<ReportedError>,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, kind: ErrorKind, subtree: Option<BoxId>, message: impl Into<String>) {
        let message = message.into();
        warn!("{:?} at {:?}: {}", kind, subtree, message);
        self.events.push(ReportedError {
            kind,
            subtree,
            message,
        });
    }

    pub fn events(&self) -> &[ReportedError] {
        &self.events
    }

    pub fn into_events(self) -> Vec<ReportedError> {
        self.events
    }
}

/// Why a structural correction gave up on a subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorrectionError {
    /// An inline box mixing inline and block children could not be split
    /// because descending through it made no progress.
    UnsplittableBox(BoxId),
}

impl fmt::Display for CorrectionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            CorrectionError::UnsplittableBox(id) => {
                write!(f, "could not split inline box {} around its block children", id)
            },
        }
    }
}
