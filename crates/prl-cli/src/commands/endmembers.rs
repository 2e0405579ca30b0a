use crate::cli::EndmembersArgs;
use crate::config::builder::build_endmember_config;
use crate::error::Result;
use crate::utils::output::{read_structure, relative_to, structure_name, write_metadata, write_poscar};
use crate::utils::progress::CliProgressHandler;
use prlstructure::engine::progress::ProgressReporter;
use prlstructure::engine::substitution::ConfigurationMetadata;
use prlstructure::workflows::{self, endmember::EndmemberResult, endmember::SublatticeInfo};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Serialize)]
pub(crate) struct EndmemberEntry<'a> {
    file: String,
    configuration: &'a [String],
    metadata: &'a ConfigurationMetadata,
}

#[derive(Serialize)]
struct EndmemberManifest<'a> {
    template: String,
    template_config: &'a [String],
    sublattices: &'a SublatticeInfo,
    endmembers: Vec<EndmemberEntry<'a>>,
}

/// Writes the template and every endmember of `result` into `dir`.
pub(crate) fn write_endmembers<'a>(
    result: &'a EndmemberResult,
    dir: &Path,
    base: &Path,
    progress: &CliProgressHandler,
) -> Result<(String, Vec<EndmemberEntry<'a>>)> {
    fs::create_dir_all(dir)?;
    let template_path = write_poscar(dir, "template", &result.template)?;
    progress.structure_written(&template_path);

    let mut entries = Vec::with_capacity(result.endmembers.len());
    for (i, endmember) in result.endmembers.iter().enumerate() {
        let name = structure_name(i, &endmember.configuration);
        let path = write_poscar(dir, &name, &endmember.structure)?;
        progress.structure_written(&path);
        info!("Wrote endmember {:?} to {:?}", endmember.configuration, &path);
        entries.push(EndmemberEntry {
            file: relative_to(&path, base),
            configuration: &endmember.configuration,
            metadata: &endmember.metadata,
        });
    }
    Ok((relative_to(&template_path, base), entries))
}

pub fn run(args: EndmembersArgs, quiet: bool) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let app_config = build_endmember_config(&args.common)?;

    info!("Loading input structure from {:?}", &app_config.input_path);
    let structure = read_structure(&app_config.input_path)?;

    let progress_handler = CliProgressHandler::new(quiet);
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Generating endmembers...");
    let result = workflows::endmember::run(&structure, &app_config.core_config, &reporter)?;

    let output_dir = &app_config.output_dir;
    let (template, endmembers) =
        write_endmembers(&result, output_dir, output_dir, &progress_handler)?;
    let manifest = EndmemberManifest {
        template,
        template_config: &result.template_config,
        sublattices: &result.info,
        endmembers,
    };
    let metadata_path = write_metadata(output_dir, &manifest)?;
    let written = progress_handler.finish();

    println!(
        "✓ {} endmember(s) of sublattices [{}] written to: {} ({} file(s) with the template)",
        result.endmembers.len(),
        result.info.sublattice_names.join(", "),
        output_dir.display(),
        written
    );
    println!("  Metadata written to: {}", metadata_path.display());
    Ok(())
}
