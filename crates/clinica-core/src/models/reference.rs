//! Reference entities owned by the clinic backend.
//!
//! The core never mutates these: a [`ReferenceSnapshot`] is captured before a
//! batch starts and stays fixed until the caller fetches a new one.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ClinicaError;

/// A canonical entity that free text can be matched against.
pub trait Reference {
    /// Canonical identifier.
    fn id(&self) -> &str;

    /// Name shown to users and compared during matching.
    fn display_name(&self) -> &str;

    /// Whether the backend marks the entity as active.
    fn is_active(&self) -> bool;
}

fn default_true() -> bool {
    true
}

/// A doctor (surgeon) registered in the clinic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub doctor_id: String,
    pub name: String,
    #[serde(default)]
    pub specialty: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// A study (procedure) offered by the clinic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Study {
    pub study_id: String,
    pub name: String,
    #[serde(default)]
    pub duration_minutes: u32,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// An insurer ("obra social").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObraSocial {
    pub obra_social_id: String,
    pub nombre: String,
    #[serde(default = "default_true")]
    pub activa: bool,
}

/// Price configured for one (study, insurer) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tarifa {
    #[serde(default)]
    pub tarifa_id: String,
    pub estudio_id: String,
    pub obra_social_id: String,
    pub precio: Decimal,
}

impl Reference for Doctor {
    fn id(&self) -> &str {
        &self.doctor_id
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

impl Reference for Study {
    fn id(&self) -> &str {
        &self.study_id
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

impl Reference for ObraSocial {
    fn id(&self) -> &str {
        &self.obra_social_id
    }

    fn display_name(&self) -> &str {
        &self.nombre
    }

    fn is_active(&self) -> bool {
        self.activa
    }
}

/// Read-only copy of the backend reference data used by one batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReferenceSnapshot {
    pub doctors: Vec<Doctor>,
    pub studies: Vec<Study>,
    pub obras_sociales: Vec<ObraSocial>,
    pub tarifas: Vec<Tarifa>,
}

impl ReferenceSnapshot {
    /// Load a snapshot from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ClinicaError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Drop inactive doctors, studies and insurers.
    ///
    /// Price rows have no active flag and are kept as-is.
    pub fn active_only(mut self) -> Self {
        self.doctors.retain(|d| d.is_active());
        self.studies.retain(|s| s.is_active());
        self.obras_sociales.retain(|o| o.is_active());
        self
    }

    pub fn doctor_name(&self, id: &str) -> Option<&str> {
        find_name(&self.doctors, id)
    }

    pub fn study_name(&self, id: &str) -> Option<&str> {
        find_name(&self.studies, id)
    }

    pub fn obra_social_name(&self, id: &str) -> Option<&str> {
        find_name(&self.obras_sociales, id)
    }
}

fn find_name<'a, R: Reference>(items: &'a [R], id: &str) -> Option<&'a str> {
    if id.is_empty() {
        return None;
    }
    items
        .iter()
        .find(|item| item.id() == id)
        .map(|item| item.display_name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_deserialize_backend_shapes() {
        let json = r#"{
            "doctors": [{"doctorId": "d1", "name": "PEREZ JUAN", "specialty": "Cirugia", "active": true}],
            "studies": [{"studyId": "s1", "name": "COLECISTECTOMIA", "durationMinutes": 90, "active": false}],
            "obrasSociales": [{"obraSocialId": "os1", "nombre": "OSDE"}],
            "tarifas": [{"tarifaId": "t1", "estudioId": "s1", "obraSocialId": "os1", "precio": 1500.5}]
        }"#;

        let snapshot: ReferenceSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.doctors[0].doctor_id, "d1");
        assert!(snapshot.obras_sociales[0].activa);
        assert_eq!(snapshot.tarifas[0].precio, Decimal::new(15005, 1));
    }

    #[test]
    fn test_from_file_reports_invalid_json() {
        let dir = std::env::temp_dir().join(format!("clinica-refs-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("refs.json");
        std::fs::write(&path, r#"{"doctors": "nope"}"#).unwrap();

        assert!(matches!(
            ReferenceSnapshot::from_file(&path),
            Err(ClinicaError::Json(_))
        ));
        assert!(matches!(
            ReferenceSnapshot::from_file(&dir.join("missing.json")),
            Err(ClinicaError::Io(_))
        ));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_active_only_filters_entities() {
        let snapshot = ReferenceSnapshot {
            studies: vec![
                Study {
                    study_id: "s1".into(),
                    name: "A".into(),
                    duration_minutes: 30,
                    active: false,
                },
                Study {
                    study_id: "s2".into(),
                    name: "B".into(),
                    duration_minutes: 30,
                    active: true,
                },
            ],
            ..Default::default()
        }
        .active_only();

        assert_eq!(snapshot.studies.len(), 1);
        assert_eq!(snapshot.study_name("s2"), Some("B"));
        assert_eq!(snapshot.study_name("s1"), None);
        assert_eq!(snapshot.study_name(""), None);
    }
}
