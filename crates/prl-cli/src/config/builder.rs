use super::defaults::DefaultsConfig;
use super::file::FileConfig;
use super::models::{DiluteAppConfig, EndmemberAppConfig, SqsAppConfig};
use crate::cli::{DiluteArgs, GenerationArgs, SqsArgs};
use crate::error::{CliError, Result};
use crate::utils::parser;
use prlstructure::engine::config as core_config;
use std::path::PathBuf;

pub fn build_endmember_config(args: &GenerationArgs) -> Result<EndmemberAppConfig> {
    let defaults = DefaultsConfig::default();
    let file_config = FileConfig::from_file(&args.config)?;
    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    let core_config = build_core_endmember_config(args, &mut file_config, &defaults)?;

    Ok(EndmemberAppConfig {
        input_path: args.input.clone(),
        output_dir: args.output.clone(),
        core_config,
    })
}

pub fn build_dilute_config(args: &DiluteArgs) -> Result<DiluteAppConfig> {
    let defaults = DefaultsConfig::default();
    let file_config = FileConfig::from_file(&args.common.config)?;
    let mut file_config = apply_set_values(file_config, &args.common.set_values)?;

    let endmember = build_core_endmember_config(&args.common, &mut file_config, &defaults)?;

    let dilute_file = file_config.dilute.take().unwrap_or_default();
    let sublattice_dict = dilute_file.sublattice_dict.ok_or_else(|| {
        CliError::Config("Missing 'sublattice-dict' in the [dilute] section.".to_string())
    })?;

    let mut builder = core_config::DiluteConfigBuilder::new()
        .endmember(endmember)
        .sublattice_dict(sublattice_dict);
    if let Some(supercell) = args.supercell.or(dilute_file.supercell) {
        builder = builder.supercell(supercell);
    }
    let core_config = builder
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    Ok(DiluteAppConfig {
        input_path: args.common.input.clone(),
        output_dir: args.common.output.clone(),
        core_config,
    })
}

pub fn build_sqs_config(args: &SqsArgs) -> Result<SqsAppConfig> {
    let defaults = DefaultsConfig::default();
    let file_config = FileConfig::from_file(&args.config)?;
    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    let sqs_file = file_config.sqs.take().unwrap_or_default();
    let prototype = args
        .prototype
        .clone()
        .or(sqs_file.prototype)
        .ok_or_else(|| CliError::Config("Missing 'prototype' in the [sqs] section.".to_string()))?;
    let sublattice_model = sqs_file.sublattice_model.ok_or_else(|| {
        CliError::Config("Missing 'sublattice-model' in the [sqs] section.".to_string())
    })?;
    let site_ratios = sqs_file.site_ratios.ok_or_else(|| {
        CliError::Config("Missing 'site-ratios' in the [sqs] section.".to_string())
    })?;

    let scale_volume = if args.no_scale_volume {
        false
    } else {
        sqs_file.scale_volume.unwrap_or(defaults.scale_volume)
    };
    let skip_on_failure = args.skip_on_failure
        || sqs_file
            .skip_on_failure
            .unwrap_or(defaults.skip_on_failure);

    let mut builder = core_config::SqsConfigBuilder::new()
        .prototype(prototype)
        .sublattice_model(sublattice_model)
        .site_ratios(site_ratios)
        .scale_volume(scale_volume)
        .skip_on_failure(skip_on_failure);
    if let Some(path) = resolve_density_table(args.density_table.as_ref(), &mut file_config) {
        builder = builder.density_table_path(path);
    }
    let core_config = builder
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    Ok(SqsAppConfig {
        database_path: args.database.clone(),
        output_dir: args.output.clone(),
        core_config,
    })
}

fn build_core_endmember_config(
    args: &GenerationArgs,
    file_config: &mut FileConfig,
    defaults: &DefaultsConfig,
) -> Result<core_config::EndmemberConfig> {
    let symmetry_file = file_config.symmetry.take().unwrap_or_default();
    let endmember_file = file_config.endmembers.take().ok_or_else(|| {
        CliError::Config("Missing [endmembers] section in the configuration file.".to_string())
    })?;

    let phase_name = args
        .phase_name
        .clone()
        .or_else(|| file_config.phase_name.take())
        .ok_or_else(|| {
            CliError::Config("A phase name is required: set 'phase-name' or pass --phase-name.".to_string())
        })?;
    let sublattice_configuration = endmember_file.sublattice_configuration.ok_or_else(|| {
        CliError::Config(
            "Missing 'sublattice-configuration' in the [endmembers] section.".to_string(),
        )
    })?;
    let symprec = args
        .symprec
        .or(symmetry_file.symprec)
        .unwrap_or(defaults.symprec);
    let use_equivalent_atom = args.use_equivalent_atom
        || symmetry_file
            .use_equivalent_atom
            .unwrap_or(defaults.use_equivalent_atom);

    let mut builder = core_config::EndmemberConfigBuilder::new()
        .phase_name(phase_name)
        .symprec(symprec)
        .use_equivalent_atom(use_equivalent_atom)
        .sublattice_configuration(sublattice_configuration);
    if let Some(sites) = endmember_file.equivalent_sites {
        builder = builder.equivalent_sites(sites);
    }
    if let Some(path) = resolve_density_table(args.density_table.as_ref(), file_config) {
        builder = builder.density_table_path(path);
    }
    builder.build().map_err(|e| CliError::Config(e.to_string()))
}

fn resolve_density_table(cli: Option<&PathBuf>, file_config: &mut FileConfig) -> Option<PathBuf> {
    cli.cloned().or_else(|| file_config.density_table.take())
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    if set_values.is_empty() {
        return Ok(config);
    }
    for kv_pair in set_values {
        let parts: Vec<_> = kv_pair.splitn(2, '=').collect();
        if parts.len() != 2 {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        }
        let key = parts[0];
        let value_str = parts[1];

        match key {
            "phase-name" => {
                config.phase_name = Some(value_str.to_string());
            }
            "density-table" => {
                config.density_table = Some(PathBuf::from(value_str));
            }
            "symmetry.symprec" => {
                config
                    .symmetry
                    .get_or_insert_with(Default::default)
                    .symprec = Some(value_str.parse().map_err(|_| {
                    CliError::Config(format!("Invalid float value for {}: {}", key, value_str))
                })?);
            }
            "symmetry.use-equivalent-atom" => {
                config
                    .symmetry
                    .get_or_insert_with(Default::default)
                    .use_equivalent_atom = Some(value_str.parse().map_err(|_| {
                    CliError::Config(format!("Invalid boolean value for {}: {}", key, value_str))
                })?);
            }
            "dilute.supercell" => {
                config
                    .dilute
                    .get_or_insert_with(Default::default)
                    .supercell = Some(
                    parser::parse_supercell(value_str)
                        .map_err(|e| CliError::Config(format!("Invalid value for {}: {}", key, e)))?,
                );
            }
            "sqs.prototype" => {
                config.sqs.get_or_insert_with(Default::default).prototype =
                    Some(value_str.to_string());
            }
            "sqs.scale-volume" => {
                config.sqs.get_or_insert_with(Default::default).scale_volume =
                    Some(value_str.parse().map_err(|_| {
                        CliError::Config(format!(
                            "Invalid boolean value for {}: {}",
                            key, value_str
                        ))
                    })?);
            }
            "sqs.skip-on-failure" => {
                config.sqs.get_or_insert_with(Default::default).skip_on_failure =
                    Some(value_str.parse().map_err(|_| {
                        CliError::Config(format!(
                            "Invalid boolean value for {}: {}",
                            key, value_str
                        ))
                    })?);
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use prlstructure::core::models::lattice::SupercellMatrix;
    use std::fs;
    use std::path::Path;
    use tempfile::{TempDir, tempdir};

    const CONFIG: &str = r#"
phase-name = "PEROVSKITE"

[symmetry]
symprec = 0.001

[endmembers]
sublattice-configuration = [["Ga", "Al"], ["C"], ["Mn"]]

[dilute]
sublattice-dict = { a = ["Ga", "Al"], b = ["fix"], c = ["Fe"] }

[sqs]
prototype = "L12"
sublattice-model = [["Al", "Ni"], ["Ni"]]
site-ratios = [3, 1]
"#;

    fn write_config(content: &str) -> (TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    fn generation_args(config: &Path) -> GenerationArgs {
        GenerationArgs {
            input: PathBuf::from("POSCAR"),
            output: PathBuf::from("out"),
            config: config.to_path_buf(),
            phase_name: None,
            symprec: None,
            use_equivalent_atom: false,
            density_table: None,
            set_values: vec![],
        }
    }

    fn sqs_args(config: &Path) -> SqsArgs {
        SqsArgs {
            database: PathBuf::from("sqs.json"),
            output: PathBuf::from("out"),
            config: config.to_path_buf(),
            prototype: None,
            no_scale_volume: false,
            skip_on_failure: false,
            density_table: None,
            set_values: vec![],
        }
    }

    #[test]
    fn endmember_config_merges_file_and_defaults() {
        let (_dir, path) = write_config(CONFIG);
        let app = build_endmember_config(&generation_args(&path)).unwrap();

        assert_eq!(app.input_path, PathBuf::from("POSCAR"));
        assert_eq!(app.output_dir, PathBuf::from("out"));
        let core = app.core_config;
        assert_eq!(core.phase_name, "PEROVSKITE");
        assert_eq!(core.symmetry.symprec, 0.001);
        assert!(!core.use_equivalent_atom);
        assert_eq!(core.sublattice_configuration.len(), 3);
        assert!(core.equivalent_sites.is_none());
        assert!(core.density_table_path.is_none());
    }

    #[test]
    fn cli_arguments_override_file_values() {
        let (_dir, path) = write_config(CONFIG);
        let mut args = generation_args(&path);
        args.phase_name = Some("ANTIPEROVSKITE".to_string());
        args.symprec = Some(0.1);
        args.use_equivalent_atom = true;
        args.density_table = Some(PathBuf::from("rho.csv"));

        let core = build_endmember_config(&args).unwrap().core_config;
        assert_eq!(core.phase_name, "ANTIPEROVSKITE");
        assert_eq!(core.symmetry.symprec, 0.1);
        assert!(core.use_equivalent_atom);
        assert_eq!(core.density_table_path, Some(PathBuf::from("rho.csv")));
    }

    #[test]
    fn set_values_override_file_values() {
        let (_dir, path) = write_config(CONFIG);
        let mut args = generation_args(&path);
        args.set_values = vec![
            "phase-name=L12_FCC".to_string(),
            "symmetry.symprec=0.05".to_string(),
            "symmetry.use-equivalent-atom=true".to_string(),
        ];

        let core = build_endmember_config(&args).unwrap().core_config;
        assert_eq!(core.phase_name, "L12_FCC");
        assert_eq!(core.symmetry.symprec, 0.05);
        assert!(core.use_equivalent_atom);
    }

    #[test]
    fn missing_phase_name_is_a_config_error() {
        let (_dir, path) = write_config(
            "[endmembers]\nsublattice-configuration = [[\"Ni\"]]\n",
        );
        let result = build_endmember_config(&generation_args(&path));
        assert!(matches!(result, Err(CliError::Config(msg)) if msg.contains("phase name")));
    }

    #[test]
    fn missing_endmember_section_is_a_config_error() {
        let (_dir, path) = write_config("phase-name = \"FCC\"\n");
        let result = build_endmember_config(&generation_args(&path));
        assert!(matches!(result, Err(CliError::Config(msg)) if msg.contains("[endmembers]")));
    }

    #[test]
    fn dilute_config_takes_supercell_from_cli_first() {
        let (_dir, path) = write_config(CONFIG);
        let mut args = DiluteArgs {
            common: generation_args(&path),
            supercell: Some(SupercellMatrix::Diagonal([3, 3, 3])),
        };
        args.common.set_values = vec!["dilute.supercell=2x2x2".to_string()];

        let core = build_dilute_config(&args).unwrap().core_config;
        assert_eq!(core.supercell, Some(SupercellMatrix::Diagonal([3, 3, 3])));
        assert_eq!(core.sublattice_dict["c"], vec!["Fe"]);
        assert_eq!(core.endmember.phase_name, "PEROVSKITE");

        args.supercell = None;
        let core = build_dilute_config(&args).unwrap().core_config;
        assert_eq!(core.supercell, Some(SupercellMatrix::Diagonal([2, 2, 2])));
    }

    #[test]
    fn dilute_config_requires_sublattice_dict() {
        let (_dir, path) = write_config(
            "phase-name = \"FCC\"\n[endmembers]\nsublattice-configuration = [[\"Ni\"]]\n",
        );
        let args = DiluteArgs {
            common: generation_args(&path),
            supercell: None,
        };
        let result = build_dilute_config(&args);
        assert!(matches!(result, Err(CliError::Config(msg)) if msg.contains("sublattice-dict")));
    }

    #[test]
    fn sqs_config_uses_defaults_for_flags() {
        let (_dir, path) = write_config(CONFIG);
        let app = build_sqs_config(&sqs_args(&path)).unwrap();

        assert_eq!(app.database_path, PathBuf::from("sqs.json"));
        let core = app.core_config;
        assert_eq!(core.prototype, "L12");
        assert_eq!(core.site_ratios, vec![3.0, 1.0]);
        assert!(core.scale_volume);
        assert!(!core.skip_on_failure);
    }

    #[test]
    fn sqs_flags_override_file_values() {
        let (_dir, path) = write_config(CONFIG);
        let mut args = sqs_args(&path);
        args.prototype = Some("B2".to_string());
        args.no_scale_volume = true;
        args.set_values = vec!["sqs.skip-on-failure=true".to_string()];

        let core = build_sqs_config(&args).unwrap().core_config;
        assert_eq!(core.prototype, "B2");
        assert!(!core.scale_volume);
        assert!(core.skip_on_failure);
    }

    #[test]
    fn invalid_set_values_are_rejected() {
        let (_dir, path) = write_config(CONFIG);
        for (pair, fragment) in [
            ("symprec", "Expected KEY=VALUE"),
            ("symmetry.symprec=tight", "Invalid float value"),
            ("sqs.scale-volume=maybe", "Invalid boolean value"),
            ("dilute.supercell=2x2", "Invalid value for dilute.supercell"),
            ("optimization.num-solutions=5", "Unsupported configuration key"),
        ] {
            let mut args = generation_args(&path);
            args.set_values = vec![pair.to_string()];
            let result = build_endmember_config(&args);
            assert!(
                matches!(&result, Err(CliError::Config(msg)) if msg.contains(fragment)),
                "unexpected result for '{pair}'"
            );
        }
    }
}
