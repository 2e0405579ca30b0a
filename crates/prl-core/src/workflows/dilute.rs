use super::endmember::{self, EndmemberResult};
use crate::core::models::lattice::SupercellMatrix;
use crate::core::models::structure::Structure;
use crate::engine::config::DiluteConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::sublattice::EspeiSublattice;
use crate::engine::utils::combinatorics::dedup_preserving_order;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

/// Candidate entry marking a sublattice that is never substituted.
pub const FIXED_SUBLATTICE: &str = "fix";

/// A structure with one substituted site, and the species found on each of its sublattices.
#[derive(Debug, Clone)]
pub struct DiluteStructure {
    pub structure: Structure,
    pub configuration: BTreeMap<String, EspeiSublattice<String>>,
}

/// Creates single-site substitutions of every endmember.
///
/// For each sublattice label, the first site carrying it is replaced by every candidate of
/// `sublattice_dict`, except [`FIXED_SUBLATTICE`] and the species already on that site.
pub fn dilute_substitution(
    endmembers: &[Structure],
    sublattice_dict: &BTreeMap<String, Vec<String>>,
    supercell: Option<&SupercellMatrix>,
) -> Result<Vec<DiluteStructure>, EngineError> {
    let mut dilutes = Vec::new();
    for endmember in endmembers {
        let mut host = endmember.clone();
        if let Some(matrix) = supercell {
            host.make_supercell(matrix)?;
        }

        for (label, index) in first_site_of_each_sublattice(&host)? {
            let candidates = sublattice_dict
                .get(label.as_str())
                .ok_or_else(|| EngineError::MissingSublattice(label.clone()))?;
            let current = host.sites()[index].species.clone();

            for dopant in dedup_preserving_order(candidates) {
                if dopant == FIXED_SUBLATTICE || dopant == current {
                    continue;
                }
                let mut dilute = host.clone();
                dilute.replace_site_species(index, dopant.as_str())?;
                debug!(sublattice = %label, site = index, host = %current, dopant = %dopant, "Created dilute structure");
                let configuration = sublattice_configuration(&dilute)?;
                dilutes.push(DiluteStructure {
                    structure: dilute,
                    configuration,
                });
            }
        }
    }
    Ok(dilutes)
}

/// Distinct sublattice labels in order of first appearance, each with the index of its first site.
fn first_site_of_each_sublattice(structure: &Structure) -> Result<Vec<(String, usize)>, EngineError> {
    let mut firsts: Vec<(String, usize)> = Vec::new();
    for (index, site) in structure.sites().iter().enumerate() {
        let label = site
            .sublattice()
            .ok_or(EngineError::MissingSiteLabel { index })?;
        if !firsts.iter().any(|(l, _)| l == label) {
            firsts.push((label.to_string(), index));
        }
    }
    Ok(firsts)
}

/// The species on every sublattice: a scalar when the sublattice is pure, otherwise its species in
/// order of first appearance.
fn sublattice_configuration(
    structure: &Structure,
) -> Result<BTreeMap<String, EspeiSublattice<String>>, EngineError> {
    let mut species: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (index, site) in structure.sites().iter().enumerate() {
        let label = site
            .sublattice()
            .ok_or(EngineError::MissingSiteLabel { index })?;
        let entry = species.entry(label.to_string()).or_default();
        if !entry.contains(&site.species) {
            entry.push(site.species.clone());
        }
    }
    Ok(species
        .into_iter()
        .map(|(label, sp)| (label, EspeiSublattice::from_slice(&sp)))
        .collect())
}

#[derive(Debug, Clone)]
pub struct DiluteResult {
    pub endmembers: EndmemberResult,
    pub dilutes: Vec<DiluteStructure>,
}

#[instrument(skip_all, name = "dilute_workflow")]
pub fn run(
    structure: &Structure,
    config: &DiluteConfig,
    reporter: &ProgressReporter,
) -> Result<DiluteResult, EngineError> {
    let endmembers = endmember::run(structure, &config.endmember, reporter)?;

    reporter.report(Progress::PhaseStart {
        name: "Dilute Substitution",
    });
    let hosts: Vec<Structure> = endmembers
        .endmembers
        .iter()
        .map(|e| e.structure.clone())
        .collect();
    let dilutes = dilute_substitution(&hosts, &config.sublattice_dict, config.supercell.as_ref())?;
    reporter.report(Progress::PhaseFinish);

    info!(
        "Generated {} dilute structure(s) from {} endmember(s).",
        dilutes.len(),
        hosts.len()
    );
    Ok(DiluteResult {
        endmembers,
        dilutes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::lattice::Lattice;
    use crate::engine::config::{DiluteConfigBuilder, EndmemberConfigBuilder};
    use nalgebra::Vector3;
    use crate::core::models::structure::Site;

    fn endmember_mn3gac() -> Structure {
        let sites = vec![
            Site::new("Ga", Vector3::new(0.0, 0.0, 0.0)).with_sublattice("a"),
            Site::new("Mn", Vector3::new(0.5, 0.5, 0.0)).with_sublattice("c"),
            Site::new("Mn", Vector3::new(0.5, 0.0, 0.5)).with_sublattice("c"),
            Site::new("Mn", Vector3::new(0.0, 0.5, 0.5)).with_sublattice("c"),
            Site::new("C", Vector3::new(0.5, 0.5, 0.5)).with_sublattice("b"),
        ];
        Structure::new(Lattice::cubic(3.89).unwrap(), sites)
    }

    fn dict(entries: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
            .collect()
    }

    fn single(s: &str) -> EspeiSublattice<String> {
        EspeiSublattice::Single(s.to_string())
    }

    fn mixed(items: &[&str]) -> EspeiSublattice<String> {
        EspeiSublattice::Mixed(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn substitutes_first_site_of_every_sublattice() {
        let dilutes = dilute_substitution(
            &[endmember_mn3gac()],
            &dict(&[("a", &["Ga", "Al"]), ("b", &["fix"]), ("c", &["Mn", "Fe", "Fe"])]),
            None,
        )
        .unwrap();
        assert_eq!(dilutes.len(), 2);

        assert_eq!(dilutes[0].structure.species(), vec!["Al", "Mn", "Mn", "Mn", "C"]);
        assert_eq!(dilutes[0].configuration["a"], single("Al"));
        assert_eq!(dilutes[0].configuration["b"], single("C"));
        assert_eq!(dilutes[0].configuration["c"], single("Mn"));

        assert_eq!(dilutes[1].structure.species(), vec!["Ga", "Fe", "Mn", "Mn", "C"]);
        assert_eq!(dilutes[1].configuration["c"], mixed(&["Fe", "Mn"]));
        assert_eq!(dilutes[1].structure.sites()[1].sublattice(), Some("c"));
    }

    #[test]
    fn supercell_dilutes_mix_dopant_and_host() {
        let dilutes = dilute_substitution(
            &[endmember_mn3gac()],
            &dict(&[("a", &["Al"]), ("b", &["fix"]), ("c", &["fix"])]),
            Some(&SupercellMatrix::Diagonal([2, 2, 2])),
        )
        .unwrap();
        assert_eq!(dilutes.len(), 1);
        let dilute = &dilutes[0];
        assert_eq!(dilute.structure.num_sites(), 40);
        assert_eq!(dilute.configuration["a"], mixed(&["Al", "Ga"]));
        let al_count = dilute
            .structure
            .species()
            .iter()
            .filter(|s| **s == "Al")
            .count();
        assert_eq!(al_count, 1);
    }

    #[test]
    fn missing_sublattice_entry_is_an_error() {
        let result = dilute_substitution(
            &[endmember_mn3gac()],
            &dict(&[("a", &["Al"]), ("c", &["Fe"])]),
            None,
        );
        assert!(matches!(result, Err(EngineError::MissingSublattice(name)) if name == "b"));
    }

    #[test]
    fn unlabelled_sites_are_rejected() {
        let bare = Structure::from_species_and_coords(
            Lattice::cubic(3.0).unwrap(),
            &["Fe"],
            &[[0.0, 0.0, 0.0]],
        );
        let result = dilute_substitution(&[bare], &dict(&[("a", &["Cr"])]), None);
        assert!(matches!(
            result,
            Err(EngineError::MissingSiteLabel { index: 0 })
        ));
    }

    #[test]
    fn run_generates_endmembers_then_dilutes() {
        let structure = Structure::from_species_and_coords(
            Lattice::cubic(3.89).unwrap(),
            &["Ga", "Mn", "Mn", "Mn", "C"],
            &[
                [0.0, 0.0, 0.0],
                [0.5, 0.5, 0.0],
                [0.5, 0.0, 0.5],
                [0.0, 0.5, 0.5],
                [0.5, 0.5, 0.5],
            ],
        );
        let endmember = EndmemberConfigBuilder::new()
            .phase_name("PEROVSKITE")
            .sublattice_configuration(vec![
                vec!["Ga".to_string(), "Al".to_string()],
                vec!["C".to_string()],
                vec!["Mn".to_string()],
            ])
            .build()
            .unwrap();
        let config = DiluteConfigBuilder::new()
            .endmember(endmember)
            .sublattice_dict(dict(&[("a", &["Ga", "Al"]), ("b", &["fix"]), ("c", &["Fe"])]))
            .build()
            .unwrap();

        let result = run(&structure, &config, &ProgressReporter::new()).unwrap();
        assert_eq!(result.endmembers.endmembers.len(), 2);
        // Each endmember yields one swap on `a` and one Fe on `c`.
        assert_eq!(result.dilutes.len(), 4);
    }
}
