//! Enrichment rules engine.
//!
//! Deterministic, total mapping from issue type to severity and responsible
//! department. The table ships with built-in defaults and can be overridden
//! per deployment from the config file; an override never removes an entry,
//! so the mapping stays total over the closed enumeration.

use crate::config::ShikayatConfig;
use crate::types::{IssueType, Severity};
use std::collections::HashMap;
use tracing::warn;

pub const DEFAULT_DEPARTMENT: &str = "General Administration";

fn builtin_defaults() -> HashMap<IssueType, (Severity, String)> {
    let rows = [
        (IssueType::Pothole, Severity::High, "Roads & Highways Department"),
        (IssueType::Garbage, Severity::Medium, "Sanitation & Waste Management"),
        (IssueType::WaterLeak, Severity::High, "Water & Sewerage Authority"),
        (
            IssueType::BrokenStreetlight,
            Severity::Medium,
            "Electricity Department",
        ),
        (IssueType::DamagedRoad, Severity::High, "Roads & Highways Department"),
        (
            IssueType::IllegalDumping,
            Severity::Medium,
            "Sanitation & Waste Management",
        ),
        (IssueType::SewageOverflow, Severity::High, "Water & Sewerage Authority"),
        (IssueType::Other, Severity::Medium, DEFAULT_DEPARTMENT),
    ];
    rows.into_iter()
        .map(|(t, s, d)| (t, (s, d.to_string())))
        .collect()
}

/// Total severity/department lookup table.
#[derive(Debug, Clone)]
pub struct EnrichmentTable {
    map: HashMap<IssueType, (Severity, String)>,
}

impl EnrichmentTable {
    pub fn builtin() -> Self {
        Self {
            map: builtin_defaults(),
        }
    }

    /// Defaults plus deployment overrides from config. Unknown issue-type
    /// labels and unparseable severities in the config are ignored with a
    /// warning rather than poisoning the table.
    pub fn from_config(config: &ShikayatConfig) -> Self {
        let mut table = Self::builtin();
        for (label, row) in &config.enrichment {
            let issue_type = match IssueType::parse(label) {
                Some(t) => t,
                None => {
                    warn!("Ignoring enrichment override for unknown issue type '{}'", label);
                    continue;
                }
            };
            let severity = match Severity::parse(&row.severity) {
                Some(s) => s,
                None => {
                    warn!(
                        "Ignoring enrichment override for '{}': bad severity '{}'",
                        label, row.severity
                    );
                    continue;
                }
            };
            table
                .map
                .insert(issue_type, (severity, row.department.clone()));
        }
        table
    }

    /// Pure total function: every enum value has an entry. The `Other` row
    /// doubles as the defined default.
    pub fn enrich(&self, issue_type: IssueType) -> (Severity, String) {
        match self.map.get(&issue_type) {
            Some((severity, department)) => (*severity, department.clone()),
            // Unreachable while the builtin table is total; kept as the
            // defined default rather than a panic path.
            None => (Severity::Medium, DEFAULT_DEPARTMENT.to_string()),
        }
    }
}

impl Default for EnrichmentTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totality_over_closed_enumeration() {
        let table = EnrichmentTable::builtin();
        for issue_type in IssueType::ALL {
            let (_, department) = table.enrich(issue_type);
            assert!(!department.is_empty(), "no department for {}", issue_type);
        }
    }

    #[test]
    fn test_pothole_maps_to_roads() {
        let table = EnrichmentTable::builtin();
        let (severity, department) = table.enrich(IssueType::Pothole);
        assert_eq!(severity, Severity::High);
        assert!(department.contains("Roads"));
    }

    #[test]
    fn test_other_default() {
        let table = EnrichmentTable::builtin();
        let (severity, department) = table.enrich(IssueType::Other);
        assert_eq!(severity, Severity::Medium);
        assert_eq!(department, DEFAULT_DEPARTMENT);
    }

    #[test]
    fn test_config_override_preserves_totality() {
        let mut config = ShikayatConfig::seeded_default();
        config.enrichment.insert(
            "Water Leak".to_string(),
            crate::config::EnrichmentOverride {
                severity: "Medium".to_string(),
                department: "WASA Lahore".to_string(),
            },
        );
        config.enrichment.insert(
            "Volcano".to_string(),
            crate::config::EnrichmentOverride {
                severity: "High".to_string(),
                department: "Nowhere".to_string(),
            },
        );
        let table = EnrichmentTable::from_config(&config);
        let (severity, department) = table.enrich(IssueType::WaterLeak);
        assert_eq!(severity, Severity::Medium);
        assert_eq!(department, "WASA Lahore");
        for issue_type in IssueType::ALL {
            table.enrich(issue_type);
        }
    }
}
