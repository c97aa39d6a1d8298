//! Per-item outcomes collected over a run.
//!
//! A failing instrument never aborts its section. The pipeline records a
//! `Skipped` outcome with the error and moves on; the summary is printed at the end.

use std::path::PathBuf;

use crate::error::{AppError, ErrorKind};
use crate::publish::PublishedArtifact;

/// Result of processing one instrument (or one snapshot name).
#[derive(Debug, Clone)]
pub enum ItemOutcome {
    Rendered { label: String, detail: String },
    Skipped { label: String, error: AppError },
}

impl ItemOutcome {
    pub fn is_rendered(&self) -> bool {
        matches!(self, ItemOutcome::Rendered { .. })
    }
}

/// One generated workbook and what went into it.
#[derive(Debug, Clone)]
pub struct SectionReport {
    pub title: String,
    pub output: PathBuf,
    pub outcomes: Vec<ItemOutcome>,
}

impl SectionReport {
    pub fn new(title: impl Into<String>, output: PathBuf) -> Self {
        Self {
            title: title.into(),
            output,
            outcomes: Vec::new(),
        }
    }

    pub fn record(&mut self, outcome: ItemOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn rendered(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_rendered()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.len() - self.rendered()
    }

    /// Skip counts per error kind, in first-seen order.
    pub fn skipped_by_kind(&self) -> Vec<(ErrorKind, usize)> {
        let mut out: Vec<(ErrorKind, usize)> = Vec::new();
        for outcome in &self.outcomes {
            if let ItemOutcome::Skipped { error, .. } = outcome {
                match out.iter_mut().find(|(k, _)| *k == error.kind()) {
                    Some((_, n)) => *n += 1,
                    None => out.push((error.kind(), 1)),
                }
            }
        }
        out
    }
}

/// What happened in the publish step.
#[derive(Debug, Clone)]
pub enum PublishOutcome {
    /// Local mode: nothing to publish.
    Disabled,
    /// Both sub-steps ran, each succeeding or failing on its own.
    /// Local reports are untouched either way.
    Attempted {
        /// Commit message; `None` when the site repository had nothing to commit.
        site: Result<Option<String>, AppError>,
        uploads: Result<Vec<PublishedArtifact>, AppError>,
    },
}

impl PublishOutcome {
    /// Errors from the sub-steps that failed, site first.
    pub fn failures(&self) -> Vec<&AppError> {
        match self {
            PublishOutcome::Disabled => Vec::new(),
            PublishOutcome::Attempted { site, uploads } => {
                site.as_ref().err().into_iter().chain(uploads.as_ref().err()).collect()
            }
        }
    }
}

/// Summary of a whole run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub sections: Vec<SectionReport>,
    pub publish: PublishOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_counts_outcomes() {
        let mut section = SectionReport::new("Prices", PathBuf::from("out.xlsx"));
        section.record(ItemOutcome::Rendered {
            label: "Gold (GC=F)".into(),
            detail: "10 rows".into(),
        });
        section.record(ItemOutcome::Skipped {
            label: "Silver (SI=F)".into(),
            error: AppError::data("empty"),
        });
        section.record(ItemOutcome::Skipped {
            label: "Copper (HG=F)".into(),
            error: AppError::data("empty"),
        });
        section.record(ItemOutcome::Skipped {
            label: "Iron ore".into(),
            error: AppError::render("no image"),
        });

        assert_eq!(section.rendered(), 1);
        assert_eq!(section.skipped(), 3);
        assert_eq!(
            section.skipped_by_kind(),
            vec![(ErrorKind::Data, 2), (ErrorKind::Render, 1)]
        );
    }
}
