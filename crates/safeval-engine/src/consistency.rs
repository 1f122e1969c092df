//! PL ↔ SIL consistency mapping
//!
//! Fixed, overlapping correspondence between ISO 13849 Performance Levels and
//! IEC 62061 SILs. The check is advisory: agreement with the table does not
//! prove equivalence between the two standards.

use crate::levels::{PerformanceLevel, Sil};
use crate::warning::Warning;
use serde::{Deserialize, Serialize};

const PL_TO_SIL: [(PerformanceLevel, &[Sil]); 5] = [
    (PerformanceLevel::A, &[Sil::Sil1]),
    (PerformanceLevel::B, &[Sil::Sil1]),
    (PerformanceLevel::C, &[Sil::Sil1, Sil::Sil2]),
    (PerformanceLevel::D, &[Sil::Sil2, Sil::Sil3]),
    (PerformanceLevel::E, &[Sil::Sil3]),
];

const SIL_TO_PL: [(Sil, &[PerformanceLevel]); 3] = [
    (
        Sil::Sil1,
        &[
            PerformanceLevel::A,
            PerformanceLevel::B,
            PerformanceLevel::C,
        ],
    ),
    (Sil::Sil2, &[PerformanceLevel::C, PerformanceLevel::D]),
    (Sil::Sil3, &[PerformanceLevel::D, PerformanceLevel::E]),
];

/// SILs corresponding to a PL
pub fn map_pl_to_sil(pl: PerformanceLevel) -> &'static [Sil] {
    PL_TO_SIL
        .iter()
        .find(|(p, _)| *p == pl)
        .map(|(_, sils)| *sils)
        .unwrap_or(&[])
}

/// PLs corresponding to a SIL
pub fn map_sil_to_pl(sil: Sil) -> &'static [PerformanceLevel] {
    SIL_TO_PL
        .iter()
        .find(|(s, _)| *s == sil)
        .map(|(_, pls)| *pls)
        .unwrap_or(&[])
}

/// Outcome of a PL↔SIL cross-check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyCheckResult {
    pub is_consistent: bool,
    pub warnings: Vec<Warning>,
    pub recommended_actions: Vec<String>,
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Cross-check an achieved PL against an achieved SIL
///
/// With only one side present the check cannot fail; a warning records that
/// the cross-check was incomplete.
pub fn check_consistency(pl: Option<PerformanceLevel>, sil: Option<Sil>) -> ConsistencyCheckResult {
    let mut warnings = Vec::new();
    let mut recommended_actions = Vec::new();

    let is_consistent = match (pl, sil) {
        (Some(pl), Some(sil)) => {
            let forward = map_pl_to_sil(pl);
            let reverse = map_sil_to_pl(sil);
            let consistent = forward.contains(&sil) || reverse.contains(&pl);
            if !consistent {
                warnings.push(Warning::new(
                    "W0501",
                    format!(
                        "{} corresponds to {{{}}} but {} was achieved (expected PL for {}: {{{}}})",
                        pl,
                        join(forward),
                        sil,
                        sil,
                        join(reverse)
                    ),
                ));
                recommended_actions.push(format!(
                    "Review the independent {} and {} derivations for differing assumptions",
                    pl, sil
                ));
                recommended_actions.push(
                    "Verify device reliability data (MTTFd, PFHd, DC) used by both evaluations"
                        .to_string(),
                );
            }
            consistent
        }
        (Some(pl), None) => {
            warnings.push(Warning::new(
                "W0502",
                format!("No SIL available to cross-check {}", pl),
            ));
            recommended_actions.push(format!(
                "Determine the achieved SIL (expected one of {{{}}})",
                join(map_pl_to_sil(pl))
            ));
            true
        }
        (None, Some(sil)) => {
            warnings.push(Warning::new(
                "W0502",
                format!("No PL available to cross-check {}", sil),
            ));
            recommended_actions.push(format!(
                "Determine the achieved PL (expected one of {{{}}})",
                join(map_sil_to_pl(sil))
            ));
            true
        }
        (None, None) => {
            warnings.push(Warning::new(
                "W0503",
                "Neither PL nor SIL available; consistency not checked",
            ));
            true
        }
    };

    ConsistencyCheckResult {
        is_consistent,
        warnings,
        recommended_actions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_mapped_pair_is_consistent() {
        for pl in PerformanceLevel::ALL {
            for sil in map_pl_to_sil(pl) {
                let result = check_consistency(Some(pl), Some(*sil));
                assert!(result.is_consistent, "{} / {}", pl, sil);
                assert!(result.warnings.is_empty());
            }
        }
    }

    #[test]
    fn test_reverse_table_consistent() {
        for sil in Sil::ALL {
            for pl in map_sil_to_pl(sil) {
                assert!(check_consistency(Some(*pl), Some(sil)).is_consistent);
            }
        }
    }

    #[test]
    fn test_mismatch() {
        let result = check_consistency(Some(PerformanceLevel::A), Some(Sil::Sil3));
        assert!(!result.is_consistent);
        assert!(!result.warnings.is_empty());
        assert!(result.warnings[0].message.contains("SIL1"));
        assert!(!result.recommended_actions.is_empty());
    }

    #[test]
    fn test_overlap() {
        assert_eq!(map_pl_to_sil(PerformanceLevel::C), &[Sil::Sil1, Sil::Sil2]);
        assert!(map_sil_to_pl(Sil::Sil1).contains(&PerformanceLevel::C));
        assert!(map_sil_to_pl(Sil::Sil2).contains(&PerformanceLevel::C));
        assert!(map_sil_to_pl(Sil::Sil2).contains(&PerformanceLevel::D));
        assert!(map_sil_to_pl(Sil::Sil3).contains(&PerformanceLevel::D));
    }

    #[test]
    fn test_partial_inputs() {
        let result = check_consistency(Some(PerformanceLevel::D), None);
        assert!(result.is_consistent);
        assert!(result.warnings[0].is("W0502"));

        let result = check_consistency(None, None);
        assert!(result.is_consistent);
        assert!(result.warnings[0].is("W0503"));
    }
}
