use crate::core::models::element::{Element, ElementError};
use crate::core::models::structure::Structure;
use crate::core::symmetry::SymmetryAnalyzer;
use crate::engine::config::EndmemberConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::substitution::{
    ConfigurationMetadata, DensityTable, check_len, substitute_configuration,
};
use crate::engine::utils::combinatorics::cartesian_product;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, instrument, warn};

/// How the sites of a structure split into sublattices.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SublatticeInfo {
    /// Sublattice name of every site, in site order.
    pub site_labels: Vec<String>,
    /// Sorted distinct sublattice names.
    pub sublattice_names: Vec<String>,
    /// Number of sites carrying each name of `sublattice_names`.
    pub site_ratios: Vec<usize>,
}

/// Labels every site of `structure` by its Wyckoff position, ignoring species.
///
/// With `use_equivalent_atom`, orbits that share a Wyckoff letter are told apart as `f`, `f2`, …
pub fn get_sublattice_information(
    structure: &Structure,
    use_equivalent_atom: bool,
    analyzer: &SymmetryAnalyzer,
) -> Result<SublatticeInfo, EngineError> {
    let dataset = analyzer.ignore_species(true).analyze(structure)?;

    let num_letters = dataset.distinct_wyckoffs().len();
    let num_orbits = dataset.orbit_representatives().len();
    if num_letters != num_orbits {
        warn!(
            num_letters,
            num_orbits,
            "Wyckoff letters do not match the orbits of equivalent atoms; check the symmetry \
             information before choosing a sublattice model."
        );
    }

    let site_labels: Vec<String> = if use_equivalent_atom {
        dataset.orbit_labels()
    } else {
        dataset.wyckoffs.iter().map(char::to_string).collect()
    };

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for label in &site_labels {
        *counts.entry(label.as_str()).or_insert(0) += 1;
    }
    let sublattice_names = counts.keys().map(|s| s.to_string()).collect();
    let site_ratios = counts.values().copied().collect();

    Ok(SublatticeInfo {
        site_labels,
        sublattice_names,
        site_ratios,
    })
}

/// Builds the template structure of a sublattice model.
///
/// Labels are first mapped through `equivalent_sites`. Each distinct representative, in sorted
/// order, gets a placeholder element (`H`, `He`, `Li`, …) and every site is tagged with its
/// sublattice. Returns the template and its placeholder configuration.
pub fn get_templates(
    structure: &Structure,
    site_labels: &[String],
    sublattice_names: &[String],
    equivalent_sites: Option<&BTreeMap<String, String>>,
) -> Result<(Structure, Vec<String>), EngineError> {
    check_len("site labels", structure.num_sites(), site_labels.len())?;

    let representative = |name: &str| -> String {
        equivalent_sites
            .and_then(|map| map.get(name))
            .map_or_else(|| name.to_string(), Clone::clone)
    };

    let representatives: Vec<String> = sublattice_names
        .iter()
        .map(|n| representative(n.as_str()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let placeholders: Vec<&'static str> = (1..=representatives.len())
        .map(|z| {
            let z = u8::try_from(z).map_err(|_| ElementError::InvalidAtomicNumber(u8::MAX))?;
            Ok(Element::from_z(z)?.symbol())
        })
        .collect::<Result<_, ElementError>>()?;

    let mut template = structure.clone();
    for (index, (site, label)) in template
        .sites_mut()
        .iter_mut()
        .zip(site_labels)
        .enumerate()
    {
        let rep = representative(label.as_str());
        let position = representatives
            .iter()
            .position(|r| *r == rep)
            .ok_or_else(|| EngineError::MissingSublattice(rep.clone()))?;
        debug!(index, label = %label, sublattice = %rep, "Tagging template site");
        site.species = placeholders[position].to_string();
        site.properties.sublattice = Some(rep);
    }

    let template_config = placeholders.iter().map(|s| s.to_string()).collect();
    Ok((template, template_config))
}

/// Substitutes every combination of candidate species into the template.
///
/// Combinations follow template order: entry `i` of a combination replaces `template_config[i]`.
pub fn get_endmembers_with_templates(
    template: &Structure,
    template_config: &[String],
    sublattice_configuration: &[Vec<String>],
    table: &DensityTable,
) -> Result<(Vec<Vec<String>>, Vec<Structure>), EngineError> {
    check_len(
        "sublattice configuration",
        template_config.len(),
        sublattice_configuration.len(),
    )?;

    let combinations = cartesian_product(sublattice_configuration);
    let old_config = [template_config.to_vec()];
    let endmembers = combinations
        .iter()
        .map(|combination| {
            substitute_configuration(template, &old_config, &[combination.clone()], table)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok((combinations, endmembers))
}

#[derive(Debug, Clone)]
pub struct Endmember {
    pub configuration: Vec<String>,
    pub structure: Structure,
    pub metadata: ConfigurationMetadata,
}

#[derive(Debug, Clone)]
pub struct EndmemberResult {
    pub info: SublatticeInfo,
    pub template: Structure,
    pub template_config: Vec<String>,
    pub endmembers: Vec<Endmember>,
}

#[instrument(skip_all, name = "endmember_workflow")]
pub fn run(
    structure: &Structure,
    config: &EndmemberConfig,
    reporter: &ProgressReporter,
) -> Result<EndmemberResult, EngineError> {
    // === Phase 1: Sublattice analysis ===
    reporter.report(Progress::PhaseStart {
        name: "Sublattice Analysis",
    });
    let table = DensityTable::load_or_default(config.density_table_path.as_deref())?;
    let info = get_sublattice_information(
        structure,
        config.use_equivalent_atom,
        &config.symmetry.analyzer(),
    )?;
    info!(
        "Found sublattices {:?} with site ratios {:?}.",
        info.sublattice_names, info.site_ratios
    );
    reporter.report(Progress::PhaseFinish);

    // === Phase 2: Templates ===
    reporter.report(Progress::PhaseStart { name: "Templates" });
    let (template, template_config) = get_templates(
        structure,
        &info.site_labels,
        &info.sublattice_names,
        config.equivalent_sites.as_ref(),
    )?;
    let site_ratios: Vec<f64> = template_config
        .iter()
        .map(|placeholder| {
            template
                .sites()
                .iter()
                .filter(|s| s.species == *placeholder)
                .count() as f64
        })
        .collect();
    reporter.report(Progress::PhaseFinish);

    // === Phase 3: Endmembers ===
    reporter.report(Progress::PhaseStart { name: "Endmembers" });
    let (combinations, structures) = get_endmembers_with_templates(
        &template,
        &template_config,
        &config.sublattice_configuration,
        &table,
    )?;

    reporter.report(Progress::TaskStart {
        total_steps: combinations.len() as u64,
    });
    let occupancies = vec![vec![1.0]; template_config.len()];
    let mut endmembers = Vec::with_capacity(combinations.len());
    for (configuration, structure) in combinations.into_iter().zip(structures) {
        let per_sublattice: Vec<Vec<String>> =
            configuration.iter().map(|s| vec![s.clone()]).collect();
        let metadata = ConfigurationMetadata::new(
            config.phase_name.as_str(),
            &per_sublattice,
            &occupancies,
            &site_ratios,
        )?;
        endmembers.push(Endmember {
            configuration,
            structure,
            metadata,
        });
        reporter.report(Progress::TaskIncrement);
    }
    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    info!("Generated {} endmember(s).", endmembers.len());
    Ok(EndmemberResult {
        info,
        template,
        template_config,
        endmembers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::lattice::Lattice;
    use crate::engine::config::EndmemberConfigBuilder;
    use std::sync::Mutex;

    fn strings(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    // Anti-perovskite Mn3GaC: Ga on the corner, Mn on the face centres, C in the body centre.
    fn mn3gac() -> Structure {
        Structure::from_species_and_coords(
            Lattice::cubic(3.89).unwrap(),
            &["Ga", "Mn", "Mn", "Mn", "C"],
            &[
                [0.0, 0.0, 0.0],
                [0.5, 0.5, 0.0],
                [0.5, 0.0, 0.5],
                [0.0, 0.5, 0.5],
                [0.5, 0.5, 0.5],
            ],
        )
    }

    #[test]
    fn sublattice_information_ignores_species() {
        let info =
            get_sublattice_information(&mn3gac(), false, &SymmetryAnalyzer::default()).unwrap();
        assert_eq!(info.site_labels, labels(&["a", "c", "c", "c", "b"]));
        assert_eq!(info.sublattice_names, labels(&["a", "b", "c"]));
        assert_eq!(info.site_ratios, vec![1, 1, 3]);
    }

    #[test]
    fn sublattice_information_merges_species_into_one_lattice() {
        let ni3al = Structure::from_species_and_coords(
            Lattice::cubic(3.57).unwrap(),
            &["Al", "Ni", "Ni", "Ni"],
            &[
                [0.0, 0.0, 0.0],
                [0.5, 0.5, 0.0],
                [0.5, 0.0, 0.5],
                [0.0, 0.5, 0.5],
            ],
        );
        let info = get_sublattice_information(&ni3al, true, &SymmetryAnalyzer::default()).unwrap();
        assert_eq!(info.sublattice_names, labels(&["a"]));
        assert_eq!(info.site_ratios, vec![4]);
    }

    #[test]
    fn orbits_sharing_a_letter_are_reported() {
        let log_path = tempfile::NamedTempFile::new().unwrap().into_temp_path();
        let file = std::fs::File::create(&log_path).unwrap();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();

        // Three unrelated sites in a triclinic cell: one Wyckoff letter, three orbits.
        let p1 = Structure::from_species_and_coords(
            Lattice::from_rows([[3.0, 0.0, 0.0], [0.0, 4.0, 0.0], [0.0, 0.0, 5.0]]).unwrap(),
            &["Fe", "Fe", "Fe"],
            &[[0.0, 0.0, 0.0], [0.1, 0.2, 0.3], [0.37, 0.61, 0.13]],
        );
        let (plain, by_orbit) = tracing::subscriber::with_default(subscriber, || {
            let analyzer = SymmetryAnalyzer::default();
            (
                get_sublattice_information(&p1, false, &analyzer).unwrap(),
                get_sublattice_information(&p1, true, &analyzer).unwrap(),
            )
        });

        assert_eq!(plain.site_labels, labels(&["a", "a", "a"]));
        assert_eq!(plain.site_ratios, vec![3]);
        assert_eq!(by_orbit.site_labels, labels(&["a", "a2", "a3"]));
        assert_eq!(by_orbit.site_ratios, vec![1, 1, 1]);

        let content = std::fs::read_to_string(&log_path).unwrap();
        assert!(content.contains("Wyckoff letters do not match"));
        assert!(content.contains("num_orbits=3"));
    }

    #[test]
    fn templates_use_placeholders_in_sorted_order() {
        let site_labels = labels(&["a", "c", "c", "c", "b"]);
        let (template, config) =
            get_templates(&mn3gac(), &site_labels, &labels(&["a", "b", "c"]), None).unwrap();
        assert_eq!(config, labels(&["H", "He", "Li"]));
        assert_eq!(template.species(), vec!["H", "Li", "Li", "Li", "He"]);
        assert_eq!(template.sites()[4].sublattice(), Some("b"));
    }

    #[test]
    fn templates_merge_equivalent_sites() {
        let site_labels = labels(&["a", "c", "c", "c", "b"]);
        let equivalent = BTreeMap::from([("b".to_string(), "a".to_string())]);
        let (template, config) = get_templates(
            &mn3gac(),
            &site_labels,
            &labels(&["a", "b", "c"]),
            Some(&equivalent),
        )
        .unwrap();
        assert_eq!(config, labels(&["H", "He"]));
        assert_eq!(template.species(), vec!["H", "He", "He", "He", "H"]);
        assert_eq!(template.sites()[4].sublattice(), Some("a"));
    }

    #[test]
    fn templates_reject_wrong_label_count_and_unknown_labels() {
        let result = get_templates(&mn3gac(), &labels(&["a"]), &labels(&["a"]), None);
        assert!(matches!(
            result,
            Err(EngineError::ShapeMismatch {
                expected: 5,
                found: 1,
                ..
            })
        ));

        let site_labels = labels(&["a", "c", "c", "c", "d"]);
        let result = get_templates(&mn3gac(), &site_labels, &labels(&["a", "c"]), None);
        assert!(matches!(result, Err(EngineError::MissingSublattice(name)) if name == "d"));
    }

    #[test]
    fn endmembers_follow_template_order() {
        let site_labels = labels(&["a", "c", "c", "c", "b"]);
        let (template, config) =
            get_templates(&mn3gac(), &site_labels, &labels(&["a", "b", "c"]), None).unwrap();
        let (combinations, endmembers) = get_endmembers_with_templates(
            &template,
            &config,
            &strings(&[&["Ga", "Al"], &["C"], &["Mn"]]),
            &DensityTable::new(),
        )
        .unwrap();
        assert_eq!(combinations, strings(&[&["Ga", "C", "Mn"], &["Al", "C", "Mn"]]));
        assert_eq!(endmembers[1].species(), vec!["Al", "Mn", "Mn", "Mn", "C"]);
        assert_eq!(endmembers[1].sites()[0].sublattice(), Some("a"));
    }

    #[test]
    fn endmembers_reject_mismatched_configuration() {
        let result = get_endmembers_with_templates(
            &mn3gac(),
            &labels(&["H", "He"]),
            &strings(&[&["Ga"]]),
            &DensityTable::new(),
        );
        assert!(matches!(result, Err(EngineError::ShapeMismatch { .. })));
    }

    #[test]
    fn run_chains_analysis_templates_and_endmembers() {
        let config = EndmemberConfigBuilder::new()
            .phase_name("PEROVSKITE")
            .sublattice_configuration(strings(&[&["Ga", "Al"], &["C", "N"], &["Mn"]]))
            .build()
            .unwrap();
        let events = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|e| {
            events.lock().unwrap().push(e);
        }));

        let result = run(&mn3gac(), &config, &reporter).unwrap();
        drop(reporter);

        assert_eq!(result.template_config, labels(&["H", "He", "Li"]));
        assert_eq!(result.endmembers.len(), 4);
        let last = &result.endmembers[3];
        assert_eq!(last.configuration, labels(&["Al", "N", "Mn"]));
        assert_eq!(last.metadata.phase_name, "PEROVSKITE");
        assert_eq!(last.metadata.sublattice.site_ratios, vec![1.0, 1.0, 3.0]);
        assert_eq!(
            last.metadata.sublattice.configuration,
            strings(&[&["Al"], &["N"], &["Mn"]])
        );

        let events = events.into_inner().unwrap();
        let increments = events
            .iter()
            .filter(|e| **e == Progress::TaskIncrement)
            .count();
        assert_eq!(increments, 4);
        assert_eq!(
            events.first(),
            Some(&Progress::PhaseStart {
                name: "Sublattice Analysis"
            })
        );
    }
}
