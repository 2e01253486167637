//! Auxiliary pioneer applications: drafting, committee signatures, approval
//! and the printable form layout.
//!
//! Signature capture and PDF rendering are external. `SignaturePad` and
//! `FormRenderer` are the seams the UI plugs into.

use chrono::Local;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, ValidationError};
use crate::models::{ApplicationStatus, PioneerApplication, SIGNATURE_SLOTS};
use crate::period::{Month, MonthYear};
use crate::snapshot::Snapshot;
use crate::store::{record_fields, DocumentStore, APPLICATIONS};

/// Parse a month list such as "Marzo, Abril y Mayo".
///
/// Tokens are separated by commas, whitespace and the word "y". Blank input
/// yields an empty list.
pub fn parse_months(text: &str) -> Result<Vec<Month>, ValidationError> {
    let mut months = Vec::new();
    for token in text
        .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .map(str::trim)
        .filter(|t| !t.is_empty() && !t.eq_ignore_ascii_case("y"))
    {
        let month = Month::parse(token).ok_or_else(|| ValidationError::UnknownMonth(token.to_string()))?;
        if !months.contains(&month) {
            months.push(month);
        }
    }
    Ok(months)
}

/// Same as `parse_months` but drops tokens it cannot read.
fn months_lenient(text: &str) -> Vec<Month> {
    text.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .filter_map(Month::parse)
        .collect()
}

/// Draft of a new application before it is stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplicationForm {
    pub publisher_id: String,
    pub name: String,
    pub months: String,
    pub continuous: bool,
    /// Defaults to today when submitted without one
    pub date: Option<String>,
}

impl ApplicationForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("nombre"));
        }
        if self.publisher_id.trim().is_empty() {
            return Err(ValidationError::MissingField("idPublicador"));
        }
        if !self.continuous && parse_months(&self.months)?.is_empty() {
            return Err(ValidationError::MissingField("meses"));
        }
        Ok(())
    }

    /// Validated application, pending and unsigned.
    pub fn into_application(self) -> Result<PioneerApplication, ValidationError> {
        self.validate()?;
        let date = self
            .date
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| Local::now().format("%Y-%m-%d").to_string());
        Ok(PioneerApplication {
            id: None,
            publisher_id: self.publisher_id.trim().to_string(),
            name: self.name.trim().to_string(),
            months: self.months.trim().to_string(),
            continuous: self.continuous,
            date: Some(date),
            status: ApplicationStatus::Pending,
            signatures: Default::default(),
        })
    }
}

/// Drawing surface that captures a committee member's signature.
pub trait SignaturePad {
    fn is_empty(&self) -> bool;
    fn clear(&mut self);
    /// PNG image of the strokes as a `data:` URL.
    fn to_data_url(&self) -> String;
}

/// Store the pad's signature in `slot` and clear the pad for the next signer.
pub fn sign<P: SignaturePad>(
    application: &mut PioneerApplication,
    slot: usize,
    pad: &mut P,
) -> Result<(), ValidationError> {
    if slot >= SIGNATURE_SLOTS {
        return Err(ValidationError::SignatureSlot(slot));
    }
    if pad.is_empty() {
        return Err(ValidationError::EmptySignature);
    }
    application.signatures[slot] = Some(pad.to_data_url());
    pad.clear();
    debug!(slot, signed = application.signature_count(), "Signature captured");
    Ok(())
}

pub fn clear_signature(application: &mut PioneerApplication, slot: usize) -> Result<(), ValidationError> {
    let signature = application
        .signatures
        .get_mut(slot)
        .ok_or(ValidationError::SignatureSlot(slot))?;
    *signature = None;
    Ok(())
}

/// Mark an application approved. All signatures must be present.
pub fn approve(application: &mut PioneerApplication) -> Result<(), ValidationError> {
    let missing = SIGNATURE_SLOTS - application.signature_count();
    if missing > 0 {
        return Err(ValidationError::MissingSignatures { missing });
    }
    application.status = ApplicationStatus::Approved;
    Ok(())
}

/// Validate and store a new application. Returns it with its new id.
pub async fn submit<S: DocumentStore>(store: &S, form: ApplicationForm) -> Result<PioneerApplication, Error> {
    let mut application = form.into_application()?;
    let (_, fields) = record_fields(&application)?;
    let id = store.add(APPLICATIONS, fields).await?;
    info!(id = %id, publisher = %application.publisher_id, "Application submitted");
    application.id = Some(id);
    Ok(application)
}

/// Write the signatures and status of a stored application.
pub async fn save_signatures<S: DocumentStore>(store: &S, application: &PioneerApplication) -> Result<(), Error> {
    let id = application
        .id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or(ValidationError::MissingField("id"))?;
    let (_, mut fields) = record_fields(application)?;
    fields.retain(|key, _| key == "firmas" || key == "status");
    store.update(APPLICATIONS, id, fields).await?;
    info!(id, signed = application.signature_count(), "Signatures saved");
    Ok(())
}

/// Approved applications that cover `period`.
///
/// Continuous applications cover every month. The month list carries no
/// year, so a listed month matches in any year.
pub fn applications_for(snapshot: &Snapshot, period: MonthYear) -> Vec<&PioneerApplication> {
    let mut covering: Vec<&PioneerApplication> = snapshot
        .applications
        .iter()
        .filter(|app| app.is_approved())
        .filter(|app| app.continuous || months_lenient(&app.months).contains(&period.month))
        .collect();
    covering.sort_by(|a, b| crate::utils::cmp_ignore_case(&a.name, &b.name));
    covering
}

// Printable form layout, in PDF points with the origin at the top left.

/// US Letter
pub const PAGE_WIDTH: f32 = 612.0;
pub const PAGE_HEIGHT: f32 = 792.0;

const FIELD_FONT_SIZE: f32 = 11.0;
const SIGNATURE_WIDTH: f32 = 160.0;
const SIGNATURE_HEIGHT: f32 = 50.0;
const SIGNATURE_TOP: f32 = 560.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextField {
    pub label: &'static str,
    pub value: String,
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignatureImage {
    pub slot: usize,
    /// `None` leaves the line blank
    pub data_url: Option<String>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Everything a renderer needs to draw one application form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrintableApplication {
    pub page: PageSize,
    pub fields: Vec<TextField>,
    pub signatures: Vec<SignatureImage>,
}

impl PrintableApplication {
    pub fn from_application(application: &PioneerApplication) -> Self {
        let months = if application.continuous {
            "De continuo".to_string()
        } else {
            application.months.clone()
        };
        let field = |label, value: String, x, y| TextField {
            label,
            value,
            x,
            y,
            font_size: FIELD_FONT_SIZE,
        };

        let fields = vec![
            field("Nombre", application.name.clone(), 120.0, 180.0),
            field("Meses", months, 120.0, 230.0),
            field("Fecha", application.date.clone().unwrap_or_default(), 120.0, 280.0),
            field("Estado", application.status.to_string(), 420.0, 280.0),
        ];

        let signatures = (0..SIGNATURE_SLOTS)
            .map(|slot| SignatureImage {
                slot,
                data_url: application.signatures[slot].clone(),
                x: 36.0 + slot as f32 * (SIGNATURE_WIDTH + 20.0),
                y: SIGNATURE_TOP,
                width: SIGNATURE_WIDTH,
                height: SIGNATURE_HEIGHT,
            })
            .collect();

        Self {
            page: PageSize {
                width: PAGE_WIDTH,
                height: PAGE_HEIGHT,
            },
            fields,
            signatures,
        }
    }

    pub fn field(&self, label: &str) -> Option<&TextField> {
        self.fields.iter().find(|f| f.label == label)
    }

    /// Suggested file name, e.g. `solicitud-ana-gomez.pdf`.
    pub fn file_name(&self) -> String {
        let name = self.field("Nombre").map(|f| f.value.as_str()).unwrap_or("");
        let slug: Vec<String> = name
            .split_whitespace()
            .map(|part| {
                part.chars()
                    .filter(|c| c.is_alphanumeric())
                    .flat_map(char::to_lowercase)
                    .collect::<String>()
            })
            .filter(|part| !part.is_empty())
            .collect();
        if slug.is_empty() {
            "solicitud.pdf".to_string()
        } else {
            format!("solicitud-{}.pdf", slug.join("-"))
        }
    }
}

/// Turns a laid-out form into document bytes (typically PDF).
pub trait FormRenderer {
    fn render(&self, form: &PrintableApplication) -> anyhow::Result<Vec<u8>>;
}
