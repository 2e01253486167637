use serde::{Deserialize, Deserializer, Serialize};

/// Additional privilege value that marks a regular pioneer
pub const REGULAR_PIONEER: &str = "Precursor Regular";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum PublisherStatus {
    #[serde(rename = "Activo")]
    Active,
    #[serde(rename = "Inactivo")]
    #[default]
    Inactive,
    #[serde(rename = "Trasladado")]
    Transferred,
    #[serde(rename = "Fallecido")]
    Deceased,
    #[serde(rename = "Expulsado")]
    Removed,
}

impl PublisherStatus {
    /// Parse a stored status, accepting Spanish and English spellings.
    /// Anything unrecognized counts as inactive.
    pub fn from_str_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "activo" | "activa" | "active" => PublisherStatus::Active,
            "trasladado" | "trasladada" | "transferred" => PublisherStatus::Transferred,
            "fallecido" | "fallecida" | "deceased" => PublisherStatus::Deceased,
            "expulsado" | "expulsada" | "removed" => PublisherStatus::Removed,
            _ => PublisherStatus::Inactive,
        }
    }
}

impl std::fmt::Display for PublisherStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PublisherStatus::Active => write!(f, "Activo"),
            PublisherStatus::Inactive => write!(f, "Inactivo"),
            PublisherStatus::Transferred => write!(f, "Trasladado"),
            PublisherStatus::Deceased => write!(f, "Fallecido"),
            PublisherStatus::Removed => write!(f, "Expulsado"),
        }
    }
}

impl<'de> Deserialize<'de> for PublisherStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw
            .as_deref()
            .map(PublisherStatus::from_str_lenient)
            .unwrap_or_default())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Publisher {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "Nombre", default)]
    pub first_name: String,
    #[serde(rename = "Apellidos", default)]
    pub last_name: String,
    #[serde(rename = "Grupo", default)]
    pub group: Option<String>,
    #[serde(rename = "Estatus", default)]
    pub status: PublisherStatus,
    #[serde(rename = "Priv Adicional", default)]
    pub additional_privilege: Option<String>,
    #[serde(rename = "Privilegio", default)]
    pub privilege: Option<String>,
}

impl Publisher {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    pub fn display_name(&self) -> String {
        if self.last_name.is_empty() {
            self.first_name.clone()
        } else {
            format!("{}, {}", self.last_name, self.first_name)
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == PublisherStatus::Active
    }

    /// Uses the current privilege; history is not kept.
    pub fn is_regular_pioneer(&self) -> bool {
        self.additional_privilege
            .as_deref()
            .map(|p| p.trim().eq_ignore_ascii_case(REGULAR_PIONEER))
            .unwrap_or(false)
    }

    /// Group name, with blank groups treated as none
    pub fn group_name(&self) -> Option<&str> {
        self.group.as_deref().map(str::trim).filter(|g| !g.is_empty())
    }

    pub fn in_group(&self, group: Option<&str>) -> bool {
        match group {
            None => true,
            Some(g) => self.group_name().map(|own| own.eq_ignore_ascii_case(g.trim())).unwrap_or(false),
        }
    }
}
