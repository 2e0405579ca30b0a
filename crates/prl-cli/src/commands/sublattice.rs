use crate::cli::SublatticeArgs;
use crate::error::{CliError, Result};
use crate::utils::output::read_structure;
use crate::utils::parser::parse_site_group;
use prlstructure::core::models::structure::Structure;
use prlstructure::engine::config::SymmetryConfig;
use prlstructure::engine::sublattice::{EspeiSublattice, SublatticeStructure};
use prlstructure::workflows::endmember::{SublatticeInfo, get_sublattice_information};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Serialize)]
struct SublatticeReport {
    sites: SublatticeInfo,
    species_sublattices: Vec<String>,
    sublattice_configuration: Vec<EspeiSublattice<String>>,
    sublattice_site_ratios: Vec<f64>,
}

pub fn run(args: SublatticeArgs) -> Result<()> {
    let structure = read_structure(&args.input)?;
    info!(
        "Loaded {} site(s) from {:?}",
        structure.num_sites(),
        &args.input
    );

    let report = build_report(&structure, &args)?;
    if args.json {
        let text = serde_json::to_string_pretty(&report).map_err(anyhow::Error::from)?;
        println!("{text}");
    } else {
        print_table(&structure, &report);
    }
    Ok(())
}

fn build_report(structure: &Structure, args: &SublatticeArgs) -> Result<SublatticeReport> {
    let merge = args
        .merge
        .iter()
        .map(|group| parse_site_group(group).map_err(|e| CliError::Argument(e.to_string())))
        .collect::<Result<Vec<_>>>()?;

    let mut symmetry = SymmetryConfig::default();
    if let Some(symprec) = args.symprec {
        symmetry.symprec = symprec;
    }
    let analyzer = symmetry.analyzer();

    let sites = get_sublattice_information(structure, args.use_equivalent_atom, &analyzer)?;
    let merge_groups = (!merge.is_empty()).then_some(merge.as_slice());
    let species_aware = SublatticeStructure::from_structure(structure, merge_groups, &analyzer)?;
    let (sublattice_configuration, sublattice_site_ratios) = match &species_aware.sublattice {
        Some(model) => (model.espei_configuration(), model.site_ratios.clone()),
        None => (Vec::new(), Vec::new()),
    };

    Ok(SublatticeReport {
        sites,
        species_sublattices: species_aware.sublattice_names.unwrap_or_default(),
        sublattice_configuration,
        sublattice_site_ratios,
    })
}

fn print_table(structure: &Structure, report: &SublatticeReport) {
    let sites = &report.sites;
    println!("{:<6} {:<8} {:<10}", "Site", "Species", "Sublattice");
    for (i, (site, label)) in structure.sites().iter().zip(&sites.site_labels).enumerate() {
        println!("{:<6} {:<8} {:<10}", i, site.species, label);
    }
    println!();
    println!("Sublattices:  {}", sites.sublattice_names.join(" "));
    println!(
        "Site ratios:  {}",
        sites
            .site_ratios
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    );
    println!();
    println!("Species-aware sublattice model:");
    for ((name, subl), ratio) in report
        .species_sublattices
        .iter()
        .zip(&report.sublattice_configuration)
        .zip(&report.sublattice_site_ratios)
    {
        let species = match subl {
            EspeiSublattice::Single(s) => s.clone(),
            EspeiSublattice::Mixed(v) => v.join(", "),
        };
        println!("  {:<10} {:<12} x{}", name, species, ratio);
    }
}
