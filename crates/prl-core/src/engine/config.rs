use crate::core::models::lattice::SupercellMatrix;
use crate::core::symmetry::SymmetryAnalyzer;
use crate::core::symmetry::analyzer::DEFAULT_SYMPREC;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymmetryConfig {
    /// Cartesian distance tolerance in Å.
    pub symprec: f64,
}

impl Default for SymmetryConfig {
    fn default() -> Self {
        Self {
            symprec: DEFAULT_SYMPREC,
        }
    }
}

impl SymmetryConfig {
    pub fn analyzer(&self) -> SymmetryAnalyzer {
        SymmetryAnalyzer::new(self.symprec)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EndmemberConfig {
    pub phase_name: String,
    pub symmetry: SymmetryConfig,
    pub use_equivalent_atom: bool,
    /// Maps a sublattice name onto the one it should be merged into, e.g. `{b: a}`.
    pub equivalent_sites: Option<BTreeMap<String, String>>,
    /// Candidate species per template sublattice, in template order.
    pub sublattice_configuration: Vec<Vec<String>>,
    /// CSV file overriding built-in element densities.
    pub density_table_path: Option<PathBuf>,
}

#[derive(Default)]
pub struct EndmemberConfigBuilder {
    phase_name: Option<String>,
    symprec: Option<f64>,
    use_equivalent_atom: Option<bool>,
    equivalent_sites: Option<BTreeMap<String, String>>,
    sublattice_configuration: Option<Vec<Vec<String>>>,
    density_table_path: Option<PathBuf>,
}

impl EndmemberConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase_name(mut self, name: impl Into<String>) -> Self {
        self.phase_name = Some(name.into());
        self
    }
    pub fn symprec(mut self, symprec: f64) -> Self {
        self.symprec = Some(symprec);
        self
    }
    pub fn use_equivalent_atom(mut self, enabled: bool) -> Self {
        self.use_equivalent_atom = Some(enabled);
        self
    }
    pub fn equivalent_sites(mut self, sites: BTreeMap<String, String>) -> Self {
        self.equivalent_sites = Some(sites);
        self
    }
    pub fn sublattice_configuration(mut self, configuration: Vec<Vec<String>>) -> Self {
        self.sublattice_configuration = Some(configuration);
        self
    }
    pub fn density_table_path(mut self, path: PathBuf) -> Self {
        self.density_table_path = Some(path);
        self
    }

    pub fn build(self) -> Result<EndmemberConfig, ConfigError> {
        Ok(EndmemberConfig {
            phase_name: self
                .phase_name
                .ok_or(ConfigError::MissingParameter("phase_name"))?,
            symmetry: SymmetryConfig {
                symprec: self.symprec.unwrap_or(DEFAULT_SYMPREC),
            },
            use_equivalent_atom: self.use_equivalent_atom.unwrap_or(false),
            equivalent_sites: self.equivalent_sites,
            sublattice_configuration: self
                .sublattice_configuration
                .ok_or(ConfigError::MissingParameter("sublattice_configuration"))?,
            density_table_path: self.density_table_path,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiluteConfig {
    pub endmember: EndmemberConfig,
    /// Candidate dopants per sublattice label. The literal `fix` marks a sublattice that is never
    /// substituted.
    pub sublattice_dict: BTreeMap<String, Vec<String>>,
    pub supercell: Option<SupercellMatrix>,
}

#[derive(Default)]
pub struct DiluteConfigBuilder {
    endmember: Option<EndmemberConfig>,
    sublattice_dict: Option<BTreeMap<String, Vec<String>>>,
    supercell: Option<SupercellMatrix>,
}

impl DiluteConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn endmember(mut self, config: EndmemberConfig) -> Self {
        self.endmember = Some(config);
        self
    }
    pub fn sublattice_dict(mut self, dict: BTreeMap<String, Vec<String>>) -> Self {
        self.sublattice_dict = Some(dict);
        self
    }
    pub fn supercell(mut self, matrix: SupercellMatrix) -> Self {
        self.supercell = Some(matrix);
        self
    }

    pub fn build(self) -> Result<DiluteConfig, ConfigError> {
        Ok(DiluteConfig {
            endmember: self
                .endmember
                .ok_or(ConfigError::MissingParameter("endmember"))?,
            sublattice_dict: self
                .sublattice_dict
                .ok_or(ConfigError::MissingParameter("sublattice_dict"))?,
            supercell: self.supercell,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqsConfig {
    pub prototype: String,
    /// Concrete species per sublattice, e.g. `[["Al", "Ni"], ["Ni"]]`.
    pub sublattice_model: Vec<Vec<String>>,
    /// Site ratios the database records must be a multiple of.
    pub site_ratios: Vec<f64>,
    pub scale_volume: bool,
    pub skip_on_failure: bool,
    pub density_table_path: Option<PathBuf>,
}

#[derive(Default)]
pub struct SqsConfigBuilder {
    prototype: Option<String>,
    sublattice_model: Option<Vec<Vec<String>>>,
    site_ratios: Option<Vec<f64>>,
    scale_volume: Option<bool>,
    skip_on_failure: Option<bool>,
    density_table_path: Option<PathBuf>,
}

impl SqsConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prototype(mut self, prototype: impl Into<String>) -> Self {
        self.prototype = Some(prototype.into());
        self
    }
    pub fn sublattice_model(mut self, model: Vec<Vec<String>>) -> Self {
        self.sublattice_model = Some(model);
        self
    }
    pub fn site_ratios(mut self, ratios: Vec<f64>) -> Self {
        self.site_ratios = Some(ratios);
        self
    }
    pub fn scale_volume(mut self, enabled: bool) -> Self {
        self.scale_volume = Some(enabled);
        self
    }
    pub fn skip_on_failure(mut self, enabled: bool) -> Self {
        self.skip_on_failure = Some(enabled);
        self
    }
    pub fn density_table_path(mut self, path: PathBuf) -> Self {
        self.density_table_path = Some(path);
        self
    }

    pub fn build(self) -> Result<SqsConfig, ConfigError> {
        Ok(SqsConfig {
            prototype: self
                .prototype
                .ok_or(ConfigError::MissingParameter("prototype"))?,
            sublattice_model: self
                .sublattice_model
                .ok_or(ConfigError::MissingParameter("sublattice_model"))?,
            site_ratios: self
                .site_ratios
                .ok_or(ConfigError::MissingParameter("site_ratios"))?,
            scale_volume: self.scale_volume.unwrap_or(true),
            skip_on_failure: self.skip_on_failure.unwrap_or(false),
            density_table_path: self.density_table_path,
        })
    }
}
