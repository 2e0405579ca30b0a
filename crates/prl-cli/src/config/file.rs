use crate::error::{CliError, Result};
use prlstructure::core::models::lattice::SupercellMatrix;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct FileSymmetryConfig {
    pub symprec: Option<f64>,
    #[serde(rename = "use-equivalent-atom")]
    pub use_equivalent_atom: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct FileEndmemberConfig {
    /// Candidate species of every sublattice, in sorted sublattice-name order.
    #[serde(rename = "sublattice-configuration")]
    pub sublattice_configuration: Option<Vec<Vec<String>>>,
    /// Sublattices to merge, mapping a sublattice onto the one that absorbs it.
    #[serde(rename = "equivalent-sites")]
    pub equivalent_sites: Option<BTreeMap<String, String>>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct FileDiluteConfig {
    #[serde(rename = "sublattice-dict")]
    pub sublattice_dict: Option<BTreeMap<String, Vec<String>>>,
    pub supercell: Option<SupercellMatrix>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct FileSqsConfig {
    pub prototype: Option<String>,
    #[serde(rename = "sublattice-model")]
    pub sublattice_model: Option<Vec<Vec<String>>>,
    #[serde(rename = "site-ratios")]
    pub site_ratios: Option<Vec<f64>>,
    #[serde(rename = "scale-volume")]
    pub scale_volume: Option<bool>,
    #[serde(rename = "skip-on-failure")]
    pub skip_on_failure: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(rename = "phase-name")]
    pub phase_name: Option<String>,
    #[serde(rename = "density-table")]
    pub density_table: Option<PathBuf>,
    pub symmetry: Option<FileSymmetryConfig>,
    pub endmembers: Option<FileEndmemberConfig>,
    pub dilute: Option<FileDiluteConfig>,
    pub sqs: Option<FileSqsConfig>,
}

impl FileConfig {
    /// Reads a TOML configuration file. A relative `density-table` is taken relative to the
    /// directory holding the file.
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;

        if let (Some(table), Some(dir)) = (config.density_table.as_mut(), path.parent()) {
            if table.is_relative() {
                *table = dir.join(&*table);
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn parses_every_section() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
phase-name = "PEROVSKITE"
density-table = "densities.csv"

[symmetry]
symprec = 0.001
use-equivalent-atom = true

[endmembers]
sublattice-configuration = [["Ga", "Al"], ["C"], ["Mn"]]
equivalent-sites = { b = "a" }

[dilute]
sublattice-dict = { a = ["Ga", "Al"], b = ["fix"], c = ["Fe"] }
supercell = [2, 2, 2]

[sqs]
prototype = "L12"
sublattice-model = [["Al", "Ni"], ["Ni"]]
site-ratios = [3, 1]
scale-volume = false
"#,
        )
        .unwrap();

        let config = FileConfig::from_file(&path).unwrap();
        assert_eq!(config.phase_name.as_deref(), Some("PEROVSKITE"));
        assert_eq!(config.density_table, Some(dir.path().join("densities.csv")));

        let symmetry = config.symmetry.unwrap();
        assert_eq!(symmetry.symprec, Some(0.001));
        assert_eq!(symmetry.use_equivalent_atom, Some(true));

        let endmembers = config.endmembers.unwrap();
        assert_eq!(endmembers.sublattice_configuration.unwrap().len(), 3);
        assert_eq!(endmembers.equivalent_sites.unwrap()["b"], "a");

        let dilute = config.dilute.unwrap();
        assert_eq!(dilute.supercell, Some(SupercellMatrix::Diagonal([2, 2, 2])));
        assert_eq!(dilute.sublattice_dict.unwrap()["b"], vec!["fix"]);

        let sqs = config.sqs.unwrap();
        assert_eq!(sqs.prototype.as_deref(), Some("L12"));
        assert_eq!(sqs.site_ratios, Some(vec![3.0, 1.0]));
        assert_eq!(sqs.scale_volume, Some(false));
        assert_eq!(sqs.skip_on_failure, None);
    }

    #[test]
    fn absolute_density_table_is_kept() {
        let dir = tempdir().unwrap();
        let table = dir.path().join("elsewhere").join("rho.csv");
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            format!("density-table = {:?}\n", table.to_string_lossy()),
        )
        .unwrap();

        let config = FileConfig::from_file(&path).unwrap();
        assert_eq!(config.density_table, Some(table));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[sqs]\nprotoype = \"L12\"\n").unwrap();

        let result = FileConfig::from_file(&path);
        assert!(matches!(result, Err(CliError::FileParsing { .. })));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempdir().unwrap();
        let result = FileConfig::from_file(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(CliError::Io(_))));
    }
}
