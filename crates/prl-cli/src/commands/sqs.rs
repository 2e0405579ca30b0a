use crate::cli::SqsArgs;
use crate::config::builder::build_sqs_config;
use crate::error::{CliError, Result};
use crate::utils::output::{relative_to, write_metadata, write_poscar};
use crate::utils::progress::CliProgressHandler;
use prlstructure::core::database::SqsDatabase;
use prlstructure::core::symmetry::analyzer::SymmetryAnalyzer;
use prlstructure::engine::progress::ProgressReporter;
use prlstructure::engine::sublattice::EspeiSublattice;
use prlstructure::workflows;
use serde::Serialize;
use std::fs;
use tracing::{info, warn};

#[derive(Serialize)]
struct SqsEntry {
    file: String,
    abstract_index: usize,
    sublattice_configuration: Vec<EspeiSublattice<String>>,
    sublattice_occupancies: Vec<EspeiSublattice<f64>>,
    sublattice_site_ratios: Vec<f64>,
}

#[derive(Serialize)]
struct AbstractEntry {
    index: usize,
    sublattice_names: Vec<String>,
    sublattice_site_ratios: Vec<Vec<f64>>,
    space_group_symbol: Option<String>,
    space_group_number: Option<i32>,
}

#[derive(Serialize)]
struct SqsManifest<'a> {
    prototype: &'a str,
    sublattice_model: &'a [Vec<String>],
    scale_volume: bool,
    abstract_sqs: Vec<AbstractEntry>,
    structures: Vec<SqsEntry>,
}

pub fn run(args: SqsArgs, quiet: bool) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let app_config = build_sqs_config(&args)?;
    let config = &app_config.core_config;

    info!("Loading SQS database from {:?}", &app_config.database_path);
    let database =
        SqsDatabase::load(&app_config.database_path).map_err(|e| CliError::FileParsing {
            path: app_config.database_path.clone(),
            source: e.into(),
        })?;
    info!("Database holds {} record(s).", database.len());

    let progress_handler = CliProgressHandler::new(quiet);
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Enumerating SQS of prototype '{}'...", config.prototype);
    let enumerations = workflows::sqs::run(&database, config, &reporter)?;

    if enumerations.is_empty() {
        warn!("No abstract SQS matched prototype '{}'.", config.prototype);
        println!(
            "Warning: no SQS in the database match prototype '{}' with site ratios {:?}.",
            config.prototype, config.site_ratios
        );
        return Ok(());
    }

    let output_dir = &app_config.output_dir;
    fs::create_dir_all(output_dir)?;
    let analyzer = SymmetryAnalyzer::default();

    let mut abstract_entries = Vec::with_capacity(enumerations.len());
    let mut entries = Vec::new();
    for (i, enumeration) in enumerations.iter().enumerate() {
        let sqs = &enumeration.abstract_sqs;
        let (space_group_symbol, space_group_number) =
            match sqs.get_endmember_space_group_info(&analyzer) {
                Ok((symbol, number)) => (Some(symbol), Some(number)),
                Err(e) => {
                    warn!(index = i, error = %e, "Could not find the endmember space group of an SQS");
                    (None, None)
                }
            };
        abstract_entries.push(AbstractEntry {
            index: i,
            sublattice_names: sqs.sublattice_names.clone(),
            sublattice_site_ratios: sqs.sublattice_site_ratios(),
            space_group_symbol,
            space_group_number,
        });

        for (j, concrete) in enumeration.structures.iter().enumerate() {
            let Some(model) = concrete.sublattice.as_ref() else {
                continue;
            };
            let name = format!("sqs_{:02}_{:03}", i, j);
            let path = write_poscar(output_dir, &name, &concrete.structure)?;
            progress_handler.structure_written(&path);
            entries.push(SqsEntry {
                file: relative_to(&path, output_dir),
                abstract_index: i,
                sublattice_configuration: model.espei_configuration(),
                sublattice_occupancies: model.espei_occupancies(),
                sublattice_site_ratios: model.site_ratios.clone(),
            });
        }
    }

    let manifest = SqsManifest {
        prototype: &config.prototype,
        sublattice_model: &config.sublattice_model,
        scale_volume: config.scale_volume,
        abstract_sqs: abstract_entries,
        structures: entries,
    };
    let metadata_path = write_metadata(output_dir, &manifest)?;
    progress_handler.finish();

    println!(
        "✓ {} SQS from {} database structure(s) written to: {}",
        manifest.structures.len(),
        enumerations.len(),
        output_dir.display()
    );
    println!("  Metadata written to: {}", metadata_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use tempfile::tempdir;

    fn l12_record() -> Value {
        json!({
            "prototype": "L12",
            "sublattice_model": [["a", "b"], ["a"]],
            "sublattice_names": ["a", "b"],
            "sublattice_site_ratios": [[1, 2], [1]],
            "lattice": {"matrix": [[3.6, 0.0, 0.0], [0.0, 3.6, 0.0], [0.0, 0.0, 3.6]]},
            "sites": [
                {"species": [{"element": "Xaa", "occu": 1}], "abc": [0.0, 0.0, 0.0]},
                {"species": [{"element": "Xab", "occu": 1}], "abc": [0.5, 0.5, 0.0]},
                {"species": [{"element": "Xab", "occu": 1}], "abc": [0.5, 0.0, 0.5]},
                {"species": [{"element": "Xba", "occu": 1}], "abc": [0.0, 0.5, 0.5]}
            ]
        })
    }

    fn sqs_args(dir: &std::path::Path, prototype: &str) -> SqsArgs {
        let database = dir.join("sqs.json");
        SqsDatabase::from_value(json!([l12_record()]))
            .unwrap()
            .save(&database)
            .unwrap();
        let config = dir.join("config.toml");
        fs::write(
            &config,
            format!(
                "[sqs]\nprototype = \"{prototype}\"\nsublattice-model = [[\"Al\", \"Ni\"], [\"Ni\"]]\nsite-ratios = [3, 1]\n"
            ),
        )
        .unwrap();
        SqsArgs {
            database,
            output: dir.join("out"),
            config,
            prototype: None,
            no_scale_volume: true,
            skip_on_failure: false,
            density_table: None,
            set_values: vec![],
        }
    }

    #[test]
    fn writes_every_distinct_sqs_and_metadata() {
        let dir = tempdir().unwrap();
        let args = sqs_args(dir.path(), "L12");
        let out = args.output.clone();

        run(args, true).unwrap();

        let metadata: Value =
            serde_json::from_str(&fs::read_to_string(out.join("metadata.json")).unwrap()).unwrap();
        assert_eq!(metadata["prototype"], "L12");
        assert_eq!(metadata["scale_volume"], false);
        assert_eq!(
            metadata["abstract_sqs"][0]["sublattice_site_ratios"],
            json!([[1.0, 2.0], [1.0]])
        );
        // The endmember of the L12 record is the Cu3Au structure.
        assert_eq!(metadata["abstract_sqs"][0]["space_group_number"], 221);
        let symbol = metadata["abstract_sqs"][0]["space_group_symbol"].as_str().unwrap();
        assert_eq!(symbol.replace(' ', ""), "Pm-3m");

        let structures = metadata["structures"].as_array().unwrap();
        assert_eq!(structures.len(), 4);
        for entry in structures {
            assert!(out.join(entry["file"].as_str().unwrap()).exists());
            assert_eq!(entry["sublattice_site_ratios"], json!([3.0, 1.0]));
        }
        assert_eq!(structures[0]["sublattice_configuration"], json!(["Al", "Ni"]));
    }

    #[test]
    fn unmatched_prototype_writes_nothing() {
        let dir = tempdir().unwrap();
        let args = sqs_args(dir.path(), "D019");
        let out = args.output.clone();

        run(args, true).unwrap();
        assert!(!out.exists());
    }
}
