use crate::cli::DiluteArgs;
use crate::commands::endmembers::{EndmemberEntry, write_endmembers};
use crate::config::builder::build_dilute_config;
use crate::error::Result;
use crate::utils::output::{read_structure, relative_to, structure_name, write_metadata, write_poscar};
use crate::utils::progress::CliProgressHandler;
use prlstructure::core::models::lattice::SupercellMatrix;
use prlstructure::engine::progress::ProgressReporter;
use prlstructure::engine::sublattice::EspeiSublattice;
use prlstructure::workflows;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use tracing::{info, warn};

#[derive(Serialize)]
struct DiluteEntry<'a> {
    file: String,
    configuration: &'a BTreeMap<String, EspeiSublattice<String>>,
}

#[derive(Serialize)]
struct DiluteManifest<'a> {
    phase_name: &'a str,
    supercell: Option<SupercellMatrix>,
    template: String,
    endmembers: Vec<EndmemberEntry<'a>>,
    dilutes: Vec<DiluteEntry<'a>>,
}

pub fn run(args: DiluteArgs, quiet: bool) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let app_config = build_dilute_config(&args)?;

    info!("Loading input structure from {:?}", &app_config.input_path);
    let structure = read_structure(&app_config.input_path)?;

    let progress_handler = CliProgressHandler::new(quiet);
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Generating endmembers and dilute substitutions...");
    let result = workflows::dilute::run(&structure, &app_config.core_config, &reporter)?;

    let output_dir = &app_config.output_dir;
    let (template, endmembers) =
        write_endmembers(
        &result.endmembers,
        &output_dir.join("endmembers"),
        output_dir,
        &progress_handler,
    )?;

    let dilute_dir = output_dir.join("dilute");
    fs::create_dir_all(&dilute_dir)?;
    let mut dilutes = Vec::with_capacity(result.dilutes.len());
    for (i, dilute) in result.dilutes.iter().enumerate() {
        let label: Vec<String> = dilute
            .structure
            .composition()
            .iter()
            .map(|(sp, n)| format!("{sp}{n}"))
            .collect();
        let path = write_poscar(&dilute_dir, &structure_name(i, &label), &dilute.structure)?;
        progress_handler.structure_written(&path);
        dilutes.push(DiluteEntry {
            file: relative_to(&path, output_dir),
            configuration: &dilute.configuration,
        });
    }
    if dilutes.is_empty() {
        warn!("No dilute structures were generated; every candidate was fixed or already present.");
    }

    let manifest = DiluteManifest {
        phase_name: &app_config.core_config.endmember.phase_name,
        supercell: app_config.core_config.supercell,
        template,
        endmembers,
        dilutes,
    };
    let metadata_path = write_metadata(output_dir, &manifest)?;
    let written = progress_handler.finish();

    println!(
        "✓ {} endmember(s) and {} dilute structure(s) written to: {} ({} file(s) in total)",
        result.endmembers.endmembers.len(),
        result.dilutes.len(),
        output_dir.display(),
        written
    );
    println!("  Metadata written to: {}", metadata_path.display());
    Ok(())
}
