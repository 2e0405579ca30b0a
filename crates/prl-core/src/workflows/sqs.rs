use crate::core::database::{SqsDatabase, SqsRecord};
use crate::core::io::json::{JsonError, StructureDocument};
use crate::core::models::element::Element;
use crate::core::models::structure::Structure;
use crate::core::symmetry::{SpaceGroupInfo, SymmetryAnalyzer};
use crate::engine::config::SqsConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::sublattice::{SublatticeModel, SublatticeStructure};
use crate::engine::substitution::{DensityTable, check_len, scale_struct};
use crate::engine::utils::combinatorics::{cartesian_product, product_repeat};
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, instrument, warn};

/// Name of an abstract species: `X`, the sublattice name, then the species label.
pub fn abstract_species(sublattice_name: &str, species: &str) -> String {
    format!("X{}{}", sublattice_name, species)
}

/// A special quasirandom structure over abstract species.
///
/// Sublattice `i` is named `sublattice_names[i]` and hosts the abstract species
/// `sublattice_model[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AbstractSqs {
    pub structure: Structure,
    pub sublattice_model: Vec<Vec<String>>,
    pub sublattice_names: Vec<String>,
    pub prototype: Option<String>,
}

impl AbstractSqs {
    pub fn new(
        structure: Structure,
        sublattice_model: Vec<Vec<String>>,
        sublattice_names: Vec<String>,
    ) -> Result<Self, EngineError> {
        check_len(
            "sublattice names",
            sublattice_model.len(),
            sublattice_names.len(),
        )?;
        Ok(Self {
            structure,
            sublattice_model,
            sublattice_names,
            prototype: None,
        })
    }

    pub fn with_prototype(mut self, prototype: impl Into<String>) -> Self {
        self.prototype = Some(prototype.into());
        self
    }

    fn abstract_species_per_sublattice(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        self.sublattice_names
            .iter()
            .zip(&self.sublattice_model)
            .map(|(name, species)| species.iter().map(|sp| abstract_species(name, sp)).collect())
    }

    /// Fraction of all sites held by each abstract species.
    pub fn normalized_sublattice_site_ratios(&self) -> Vec<Vec<f64>> {
        let composition = self.structure.composition();
        let num_sites = self.structure.num_sites() as f64;
        self.abstract_species_per_sublattice()
            .map(|subl| {
                subl.iter()
                    .map(|sp| composition.get(sp) / num_sites)
                    .collect()
            })
            .collect()
    }

    /// Site counts of each abstract species in the reduced composition.
    pub fn sublattice_site_ratios(&self) -> Vec<Vec<f64>> {
        let reduced = self.structure.composition().reduced();
        self.abstract_species_per_sublattice()
            .map(|subl| subl.iter().map(|sp| reduced.get(sp)).collect())
            .collect()
    }

    /// Renames the abstract species to the species of `subl_model`, optionally rescaling the
    /// volume to the weighted element density.
    pub fn get_concrete_sqs(
        &self,
        subl_model: &[Vec<String>],
        scale_volume: bool,
        table: &DensityTable,
    ) -> Result<SublatticeStructure, EngineError> {
        check_len(
            "concrete sublattice model",
            self.sublattice_model.len(),
            subl_model.len(),
        )?;

        let site_ratios = self.sublattice_site_ratios();
        let mut mapping = BTreeMap::new();
        let mut configuration = Vec::with_capacity(subl_model.len());
        let mut occupancies = Vec::with_capacity(subl_model.len());
        let mut totals = Vec::with_capacity(subl_model.len());

        for ((abstract_subl, concrete_subl), ratios) in self
            .abstract_species_per_sublattice()
            .zip(subl_model)
            .zip(&site_ratios)
        {
            check_len(
                "concrete sublattice species",
                abstract_subl.len(),
                concrete_subl.len(),
            )?;
            let total: f64 = ratios.iter().sum();
            let mut occupancy: BTreeMap<&str, f64> = BTreeMap::new();
            for ((abstract_sp, concrete_sp), ratio) in
                abstract_subl.into_iter().zip(concrete_subl).zip(ratios)
            {
                let fraction = if total > 0.0 { ratio / total } else { 0.0 };
                *occupancy.entry(concrete_sp.as_str()).or_insert(0.0) += fraction;
                mapping.insert(abstract_sp, concrete_sp.clone());
            }
            configuration.push(occupancy.keys().map(|s| s.to_string()).collect());
            occupancies.push(occupancy.values().copied().collect());
            totals.push(total);
        }

        let present: BTreeSet<&str> = self.structure.species().into_iter().collect();
        let (mapping, missing): (BTreeMap<_, _>, BTreeMap<_, _>) = mapping
            .into_iter()
            .partition(|(abstract_sp, _)| present.contains(abstract_sp.as_str()));
        if !missing.is_empty() {
            warn!(
                missing = ?missing.keys().collect::<Vec<_>>(),
                "Abstract species of the sublattice model do not occur in the SQS"
            );
        }

        let mut structure = self.structure.clone();
        structure.replace_species(&mapping)?;
        if scale_volume {
            scale_struct(&mut structure, table)?;
        }
        Ok(SublatticeStructure::with_model(
            structure,
            SublatticeModel::new(configuration, occupancies, totals)?,
        ))
    }

    /// The structure with sublattice `i` filled by the element of atomic number `i + 1`.
    pub fn endmember_structure(&self) -> Result<SublatticeStructure, EngineError> {
        let model = self
            .sublattice_model
            .iter()
            .enumerate()
            .map(|(i, subl)| {
                let z = u8::try_from(i + 1).unwrap_or(u8::MAX);
                Ok(vec![Element::from_z(z)?.symbol().to_string(); subl.len()])
            })
            .collect::<Result<Vec<_>, EngineError>>()?;
        self.get_concrete_sqs(&model, false, &DensityTable::new())
    }

    /// Space-group symbol and number of the endmember structure.
    pub fn get_endmember_space_group_info(
        &self,
        analyzer: &SymmetryAnalyzer,
    ) -> Result<(String, i32), EngineError> {
        let endmember = self.endmember_structure()?;
        let SpaceGroupInfo { symbol, number } = analyzer.space_group(&endmember.structure)?;
        Ok((symbol, number))
    }

    /// The database record of this SQS, including the space group of its endmember under the
    /// `symmetry` key.
    pub fn to_record_with_symmetry(
        &self,
        analyzer: &SymmetryAnalyzer,
    ) -> Result<SqsRecord, EngineError> {
        let (symbol, number) = self.get_endmember_space_group_info(analyzer)?;
        let mut record = SqsRecord::from(self);
        record.extra.insert(
            "symmetry".to_string(),
            json!({ "symbol": symbol, "number": number }),
        );
        Ok(record)
    }
}

impl From<&AbstractSqs> for SqsRecord {
    fn from(sqs: &AbstractSqs) -> Self {
        Self {
            prototype: sqs.prototype.clone(),
            sublattice_model: sqs.sublattice_model.clone(),
            sublattice_names: sqs.sublattice_names.clone(),
            sublattice_site_ratios: sqs.sublattice_site_ratios(),
            structure: StructureDocument::from(&sqs.structure),
            extra: Map::new(),
        }
    }
}

impl TryFrom<SqsRecord> for AbstractSqs {
    type Error = EngineError;

    fn try_from(record: SqsRecord) -> Result<Self, Self::Error> {
        let structure = Structure::try_from(record.structure)?;
        let sqs = Self::new(structure, record.sublattice_model, record.sublattice_names)?;
        Ok(match record.prototype {
            Some(p) => sqs.with_prototype(p),
            None => sqs,
        })
    }
}

impl AbstractSqs {
    /// The record as JSON, with the endmember space group found at the default tolerances.
    pub fn as_dict(&self) -> Result<Value, EngineError> {
        let record = self.to_record_with_symmetry(&SymmetryAnalyzer::default())?;
        serde_json::to_value(record).map_err(|e| EngineError::from(JsonError::from(e)))
    }

    pub fn from_dict(value: Value) -> Result<Self, EngineError> {
        let record: SqsRecord = serde_json::from_value(value)
            .map_err(|e| EngineError::from(JsonError::from(e)))?;
        Self::try_from(record)
    }
}

/// Every distinct concrete SQS obtainable by decorating `abstract_sqs` with the species of
/// `subl_model`.
///
/// Each sublattice is filled with every sequence of its candidate species, and structures with
/// the same configuration and occupancies as an earlier one are dropped.
pub fn enumerate_sqs(
    abstract_sqs: &AbstractSqs,
    subl_model: &[Vec<String>],
    scale_volume: bool,
    skip_on_failure: bool,
    table: &DensityTable,
) -> Result<Vec<SublatticeStructure>, EngineError> {
    check_len(
        "concrete sublattice model",
        abstract_sqs.sublattice_model.len(),
        subl_model.len(),
    )?;

    let per_sublattice: Vec<Vec<Vec<String>>> = abstract_sqs
        .sublattice_model
        .iter()
        .zip(subl_model)
        .map(|(abstract_subl, concrete)| product_repeat(concrete, abstract_subl.len()))
        .collect();
    let candidates = cartesian_product(&per_sublattice);
    debug!(count = candidates.len(), "Enumerating concrete SQS candidates");

    let mut seen: Vec<SublatticeModel> = Vec::new();
    let mut structures = Vec::new();
    for model in candidates {
        let concrete = match abstract_sqs.get_concrete_sqs(&model, scale_volume, table) {
            Ok(c) => c,
            Err(e) if skip_on_failure => {
                warn!(model = ?model, error = %e, "Skipping SQS that could not be made concrete");
                continue;
            }
            Err(e) => return Err(e),
        };
        let Some(sublattice) = concrete.sublattice.as_ref() else {
            continue;
        };
        let duplicate = seen.iter().any(|s| {
            s.configuration == sublattice.configuration && s.occupancies == sublattice.occupancies
        });
        if !duplicate {
            seen.push(sublattice.clone());
            structures.push(concrete);
        }
    }
    Ok(structures)
}

/// Abstract SQS of `prototype` whose sublattice site ratios are a multiple of
/// `subl_site_ratios`.
pub fn get_structures_from_database(
    db: &SqsDatabase,
    prototype: &str,
    subl_model: &[Vec<String>],
    subl_site_ratios: &[f64],
) -> Result<Vec<AbstractSqs>, EngineError> {
    debug!(prototype, subl_model = ?subl_model, subl_site_ratios = ?subl_site_ratios, "Querying SQS database");
    db.search(prototype, subl_site_ratios)
        .into_iter()
        .map(|record| AbstractSqs::try_from(record.clone()))
        .collect()
}

#[derive(Debug, Clone)]
pub struct SqsEnumeration {
    pub abstract_sqs: AbstractSqs,
    pub structures: Vec<SublatticeStructure>,
}

#[instrument(skip_all, name = "sqs_workflow")]
pub fn run(
    database: &SqsDatabase,
    config: &SqsConfig,
    reporter: &ProgressReporter,
) -> Result<Vec<SqsEnumeration>, EngineError> {
    // === Phase 1: Database query ===
    reporter.report(Progress::PhaseStart {
        name: "Database Query",
    });
    let table = DensityTable::load_or_default(config.density_table_path.as_deref())?;
    let matches = get_structures_from_database(
        database,
        &config.prototype,
        &config.sublattice_model,
        &config.site_ratios,
    )?;
    info!(
        "Found {} abstract SQS of prototype '{}'.",
        matches.len(),
        config.prototype
    );
    reporter.report(Progress::PhaseFinish);

    // === Phase 2: Enumeration ===
    reporter.report(Progress::PhaseStart {
        name: "SQS Enumeration",
    });
    reporter.report(Progress::TaskStart {
        total_steps: matches.len() as u64,
    });
    let mut results = Vec::with_capacity(matches.len());
    for abstract_sqs in matches {
        let structures = enumerate_sqs(
            &abstract_sqs,
            &config.sublattice_model,
            config.scale_volume,
            config.skip_on_failure,
            &table,
        )?;
        results.push(SqsEnumeration {
            abstract_sqs,
            structures,
        });
        reporter.report(Progress::TaskIncrement);
    }
    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    info!(
        "Generated {} concrete SQS.",
        results.iter().map(|r| r.structures.len()).sum::<usize>()
    );
    Ok(results)
}
