//! Inline editing of a monthly report grid.
//!
//! An `EditSession` keeps the rows as they were loaded next to a draft copy.
//! Setters only touch the draft. Saving writes the draft reports in one batch;
//! if the batch fails the session is left as it was so the save can be
//! retried.

use tracing::{info, warn};

use crate::error::{Error, StoreError, ValidationError};
use crate::models::{ServiceReport, AUXILIARY_MARKER};
use crate::reports::GroupReportRow;
use crate::store::{BatchWrite, DocumentStore, REPORTS};

#[derive(Debug, Clone, PartialEq)]
pub struct EditSession {
    original: Vec<GroupReportRow>,
    draft: Vec<ServiceReport>,
}

impl EditSession {
    pub fn open(rows: Vec<GroupReportRow>) -> Self {
        let draft = rows.iter().map(|row| row.report.clone()).collect();
        Self {
            original: rows,
            draft,
        }
    }

    /// Session over a single publisher's row, so saving writes only that
    /// report. `None` when the publisher is not in `rows`.
    pub fn for_publisher(rows: Vec<GroupReportRow>, publisher_id: &str) -> Option<Self> {
        let row = rows.into_iter().find(|row| row.publisher.id == publisher_id)?;
        Some(Self::open(vec![row]))
    }

    pub fn rows(&self) -> &[GroupReportRow] {
        &self.original
    }

    pub fn draft(&self) -> &[ServiceReport] {
        &self.draft
    }

    fn row_mut(&mut self, row: usize) -> Result<&mut ServiceReport, ValidationError> {
        self.draft.get_mut(row).ok_or(ValidationError::UnknownRow(row))
    }

    pub fn set_participation(&mut self, row: usize, participated: bool) -> Result<(), ValidationError> {
        self.row_mut(row)?.participated = participated;
        Ok(())
    }

    pub fn set_auxiliary(&mut self, row: usize, auxiliary: bool) -> Result<(), ValidationError> {
        let marker = if auxiliary { AUXILIARY_MARKER } else { "" };
        self.row_mut(row)?.auxiliary_marker = marker.to_string();
        Ok(())
    }

    /// `None` clears the field.
    pub fn set_courses(&mut self, row: usize, courses: Option<u32>) -> Result<(), ValidationError> {
        self.row_mut(row)?.bible_courses = courses;
        Ok(())
    }

    /// Hours must be finite and non-negative; `None` clears the field.
    pub fn set_hours(&mut self, row: usize, hours: Option<f64>) -> Result<(), ValidationError> {
        if let Some(h) = hours {
            if !h.is_finite() || h < 0.0 {
                return Err(ValidationError::InvalidNumber {
                    field: "horas",
                    value: h.to_string(),
                });
            }
        }
        self.row_mut(row)?.hours = hours;
        Ok(())
    }

    /// Parse user text for the hours cell; blank clears it.
    pub fn set_hours_text(&mut self, row: usize, text: &str) -> Result<(), ValidationError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return self.set_hours(row, None);
        }
        let hours = trimmed
            .replace(',', ".")
            .parse::<f64>()
            .map_err(|_| ValidationError::InvalidNumber {
                field: "horas",
                value: text.to_string(),
            })?;
        self.set_hours(row, Some(hours))
    }

    /// Parse user text for the courses cell; blank clears it.
    pub fn set_courses_text(&mut self, row: usize, text: &str) -> Result<(), ValidationError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return self.set_courses(row, None);
        }
        let courses = trimmed
            .parse::<u32>()
            .map_err(|_| ValidationError::InvalidNumber {
                field: "cursosBiblicos",
                value: text.to_string(),
            })?;
        self.set_courses(row, Some(courses))
    }

    pub fn set_notes(&mut self, row: usize, notes: &str) -> Result<(), ValidationError> {
        self.row_mut(row)?.notes = notes.to_string();
        Ok(())
    }

    /// Indices of rows whose draft differs from what was loaded.
    pub fn changed_rows(&self) -> Vec<usize> {
        self.original
            .iter()
            .zip(&self.draft)
            .enumerate()
            .filter(|(_, (row, draft))| row.report != **draft)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn is_dirty(&self) -> bool {
        !self.changed_rows().is_empty()
    }

    /// Throw away the draft.
    pub fn discard(&mut self) {
        self.draft = self.original.iter().map(|row| row.report.clone()).collect();
    }

    /// Batch-upsert every draft report that names a publisher.
    ///
    /// On success the draft becomes the new baseline (with any ids assigned
    /// by the store). On failure nothing in the session changes.
    pub async fn save<S: DocumentStore>(&mut self, store: &S) -> Result<usize, Error> {
        let targets: Vec<usize> = self
            .draft
            .iter()
            .enumerate()
            .filter(|(_, report)| !report.publisher_id.trim().is_empty())
            .map(|(i, _)| i)
            .collect();

        let writes = targets
            .iter()
            .map(|&i| BatchWrite::from_record(&self.draft[i]))
            .collect::<Result<Vec<_>, StoreError>>()?;

        let ids = match store.batch_upsert(REPORTS, writes).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, rows = targets.len(), "Batch save failed, keeping edits");
                return Err(e.into());
            }
        };

        for (&i, id) in targets.iter().zip(ids) {
            self.draft[i].id = Some(id);
        }
        for (row, draft) in self.original.iter_mut().zip(&self.draft) {
            if !draft.publisher_id.trim().is_empty() {
                row.report = draft.clone();
                row.stored = true;
            }
        }
        info!(saved = targets.len(), "Edit session saved");
        Ok(targets.len())
    }
}
