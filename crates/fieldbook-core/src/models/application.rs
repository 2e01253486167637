use serde::{Deserialize, Deserializer, Serialize};

/// Committee signatures required to approve an application
pub const SIGNATURE_SLOTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ApplicationStatus {
    #[serde(rename = "Pendiente", alias = "Pending", alias = "pendiente")]
    #[default]
    Pending,
    #[serde(rename = "Aprobada", alias = "Approved", alias = "aprobada", alias = "Aprobado")]
    Approved,
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApplicationStatus::Pending => write!(f, "Pendiente"),
            ApplicationStatus::Approved => write!(f, "Aprobada"),
        }
    }
}

/// Request to serve as auxiliary pioneer for one or more months, or
/// continuously.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PioneerApplication {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "idPublicador", default)]
    pub publisher_id: String,
    #[serde(rename = "nombre", default)]
    pub name: String,
    /// Free-text month list, e.g. "Marzo, Abril y Mayo"
    #[serde(rename = "meses", default)]
    pub months: String,
    #[serde(rename = "deContinuo", default)]
    pub continuous: bool,
    #[serde(rename = "fecha", default)]
    pub date: Option<String>,
    #[serde(default)]
    pub status: ApplicationStatus,
    /// Signature images as data URLs, one per committee member
    #[serde(rename = "firmas", default, deserialize_with = "fixed_signatures")]
    pub signatures: [Option<String>; SIGNATURE_SLOTS],
}

impl PioneerApplication {
    pub fn signature_count(&self) -> usize {
        self.signatures
            .iter()
            .filter(|s| s.as_deref().map(|s| !s.is_empty()).unwrap_or(false))
            .count()
    }

    pub fn is_fully_signed(&self) -> bool {
        self.signature_count() == SIGNATURE_SLOTS
    }

    pub fn is_approved(&self) -> bool {
        self.status == ApplicationStatus::Approved
    }
}

/// Stored signature lists are padded or cut to exactly three slots.
fn fixed_signatures<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<[Option<String>; SIGNATURE_SLOTS], D::Error> {
    let raw = Option::<Vec<Option<String>>>::deserialize(deserializer)?.unwrap_or_default();
    let mut slots: [Option<String>; SIGNATURE_SLOTS] = Default::default();
    for (slot, value) in slots.iter_mut().zip(raw) {
        *slot = value.filter(|s| !s.is_empty());
    }
    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_deserialize() {
        let json = r#"{
            "id": "a1",
            "idPublicador": "p1",
            "nombre": "Ana Gómez",
            "meses": "Marzo y Abril",
            "deContinuo": false,
            "status": "Pendiente",
            "firmas": ["data:image/png;base64,AAA", null]
        }"#;
        let app: PioneerApplication = serde_json::from_str(json).unwrap();
        assert_eq!(app.status, ApplicationStatus::Pending);
        assert_eq!(app.signature_count(), 1);
        assert!(!app.is_fully_signed());
        assert!(app.signatures[2].is_none());
    }

    #[test]
    fn test_extra_signatures_dropped() {
        let json = r#"{"firmas": ["a", "b", "c", "d"], "status": "Approved"}"#;
        let app: PioneerApplication = serde_json::from_str(json).unwrap();
        assert!(app.is_fully_signed());
        assert!(app.is_approved());
    }

    #[test]
    fn test_blank_signature_not_counted() {
        let json = r#"{"firmas": ["", "b", "c"]}"#;
        let app: PioneerApplication = serde_json::from_str(json).unwrap();
        assert_eq!(app.signature_count(), 2);
    }
}
