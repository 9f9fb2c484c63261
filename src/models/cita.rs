use serde::{Deserialize, Serialize};

use crate::utils::contains_ignore_case;

/// A single appointment record from the remote `citas` table.
///
/// Records are created elsewhere (the public booking form); this console only
/// reads them and transitions their status. Column names on the wire are the
/// table's Spanish identifiers, mapped here via serde renames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cita {
    pub id: i64,
    #[serde(rename = "nombre")]
    pub name: String,
    pub email: String,
    #[serde(rename = "telefono", default)]
    pub phone: Option<String>,
    /// ISO date string (`YYYY-MM-DD`), the table's `date` column
    #[serde(rename = "fecha")]
    pub date: String,
    #[serde(rename = "hora")]
    pub time: String,
    #[serde(rename = "motivo", default)]
    pub reason: Option<String>,
    /// Absent status means the record was booked before the status column
    /// existed; it is treated as pending everywhere.
    #[serde(rename = "estado", default)]
    pub status: Option<CitaStatus>,
}

impl Cita {
    /// Status with the pending default applied
    pub fn effective_status(&self) -> CitaStatus {
        self.status.unwrap_or_default()
    }

    /// Case-insensitive substring match over name, email, and phone.
    /// An absent phone matches like an empty string.
    pub fn matches_search(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        contains_ignore_case(&self.name, needle)
            || contains_ignore_case(&self.email, needle)
            || contains_ignore_case(self.phone.as_deref().unwrap_or(""), needle)
    }
}

/// Appointment status as stored in the `estado` column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CitaStatus {
    #[default]
    #[serde(rename = "pendiente")]
    Pending,
    #[serde(rename = "confirmada")]
    Confirmed,
    #[serde(rename = "cancelada")]
    Cancelled,
}

impl CitaStatus {
    /// Wire value used in query filters and update payloads
    pub fn as_param(&self) -> &'static str {
        match self {
            CitaStatus::Pending => "pendiente",
            CitaStatus::Confirmed => "confirmada",
            CitaStatus::Cancelled => "cancelada",
        }
    }

    /// Display label for the table
    pub fn label(&self) -> &'static str {
        match self {
            CitaStatus::Pending => "Pending",
            CitaStatus::Confirmed => "Confirmed",
            CitaStatus::Cancelled => "Cancelled",
        }
    }

    /// Cycle order for the status filter selector (None = no filter)
    pub fn next_filter(current: Option<CitaStatus>) -> Option<CitaStatus> {
        match current {
            None => Some(CitaStatus::Pending),
            Some(CitaStatus::Pending) => Some(CitaStatus::Confirmed),
            Some(CitaStatus::Confirmed) => Some(CitaStatus::Cancelled),
            Some(CitaStatus::Cancelled) => None,
        }
    }
}

impl std::fmt::Display for CitaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Filters applied to a load, combined conjunctively when present
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CitaFilter {
    /// Exact-match ISO date
    pub date: Option<String>,
    /// Exact-match status
    pub status: Option<CitaStatus>,
}

impl CitaFilter {
    pub fn is_empty(&self) -> bool {
        self.date.is_none() && self.status.is_none()
    }
}

/// Summary counters derived from the snapshot.
/// Pure projection; recomputed after every snapshot change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub confirmed: usize,
    pub pending: usize,
}

impl Stats {
    pub fn from_citas(citas: &[Cita]) -> Self {
        Self {
            total: citas.len(),
            confirmed: citas
                .iter()
                .filter(|c| c.status == Some(CitaStatus::Confirmed))
                .count(),
            pending: citas
                .iter()
                .filter(|c| c.effective_status() == CitaStatus::Pending)
                .count(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cita(id: i64, name: &str, status: Option<CitaStatus>) -> Cita {
        Cita {
            id,
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            phone: None,
            date: "2026-03-01".to_string(),
            time: "10:00".to_string(),
            reason: None,
            status,
        }
    }

    #[test]
    fn test_stats_counts_absent_status_as_pending() {
        let citas = vec![
            cita(1, "Ana", None),
            cita(2, "Luis", Some(CitaStatus::Pending)),
            cita(3, "Marta", Some(CitaStatus::Confirmed)),
            cita(4, "Pedro", Some(CitaStatus::Cancelled)),
        ];

        let stats = Stats::from_citas(&citas);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.confirmed, 1);
        assert_eq!(stats.pending, 2); // absent + explicit pending
    }

    #[test]
    fn test_stats_empty_snapshot() {
        assert_eq!(Stats::from_citas(&[]), Stats::default());
    }

    #[test]
    fn test_matches_search_over_all_contact_fields() {
        let mut c = cita(1, "Ana Torres", None);
        c.phone = Some("612-345-678".to_string());

        assert!(c.matches_search("ana"));
        assert!(c.matches_search("TORRES"));
        assert!(c.matches_search("@example"));
        assert!(c.matches_search("345"));
        assert!(!c.matches_search("bob"));
        // Empty needle matches everything
        assert!(c.matches_search(""));
    }

    #[test]
    fn test_matches_search_missing_phone() {
        let c = cita(1, "Ana", None);
        // Absent phone behaves like "" rather than panicking or matching
        assert!(!c.matches_search("612"));
    }

    #[test]
    fn test_deserialize_wire_record() {
        let json = r#"{
            "id": 7,
            "nombre": "Ana Torres",
            "email": "ana@example.com",
            "telefono": null,
            "fecha": "2026-03-01",
            "hora": "10:30",
            "motivo": "Revision",
            "estado": "confirmada"
        }"#;

        let c: Cita = serde_json::from_str(json).unwrap();
        assert_eq!(c.id, 7);
        assert_eq!(c.name, "Ana Torres");
        assert_eq!(c.phone, None);
        assert_eq!(c.status, Some(CitaStatus::Confirmed));
    }

    #[test]
    fn test_deserialize_without_status_defaults_pending() {
        let json = r#"{
            "id": 8,
            "nombre": "Luis",
            "email": "luis@example.com",
            "telefono": "600111222",
            "fecha": "2026-03-02",
            "hora": "09:00",
            "motivo": null,
            "estado": null
        }"#;

        let c: Cita = serde_json::from_str(json).unwrap();
        assert_eq!(c.status, None);
        assert_eq!(c.effective_status(), CitaStatus::Pending);
    }

    #[test]
    fn test_status_filter_cycle() {
        let mut current = None;
        let mut seen = Vec::new();
        for _ in 0..4 {
            current = CitaStatus::next_filter(current);
            seen.push(current);
        }
        assert_eq!(
            seen,
            vec![
                Some(CitaStatus::Pending),
                Some(CitaStatus::Confirmed),
                Some(CitaStatus::Cancelled),
                None,
            ]
        );
    }
}
