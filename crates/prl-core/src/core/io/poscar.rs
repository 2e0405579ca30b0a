use crate::core::io::traits::StructureFile;
use crate::core::models::lattice::{Lattice, LatticeError};
use crate::core::models::structure::{Site, Structure};
use nalgebra::Vector3;
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoscarMetadata {
    /// The first line of the file.
    pub comment: String,
}

#[derive(Debug, Error)]
pub enum PoscarError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: PoscarParseErrorKind,
    },
    #[error("Unexpected end of file while reading {expected}")]
    UnexpectedEof { expected: &'static str },
    #[error("Invalid lattice: {0}")]
    Lattice(#[from] LatticeError),
}

#[derive(Debug, Error)]
pub enum PoscarParseErrorKind {
    #[error("Invalid float (value: '{value}')")]
    InvalidFloat { value: String },
    #[error("Invalid atom count (value: '{value}')")]
    InvalidCount { value: String },
    #[error("Expected {expected} values, found {found}")]
    TooFewColumns { expected: usize, found: usize },
    #[error("Species line is required (VASP 5 format); found counts instead")]
    MissingSpeciesLine,
    #[error("{species} species names but {counts} atom counts")]
    CountMismatch { species: usize, counts: usize },
    #[error("Scale factor must be non-zero")]
    ZeroScale,
}

enum CoordinateMode {
    Direct,
    Cartesian,
}

/// VASP 5 POSCAR files.
pub struct PoscarFile;

struct LineReader<'a, R: BufRead> {
    lines: io::Lines<&'a mut R>,
    line_num: usize,
}

impl<'a, R: BufRead> LineReader<'a, R> {
    fn new(reader: &'a mut R) -> Self {
        Self {
            lines: reader.lines(),
            line_num: 0,
        }
    }

    fn next(&mut self, expected: &'static str) -> Result<String, PoscarError> {
        self.line_num += 1;
        match self.lines.next() {
            Some(line) => Ok(line?),
            None => Err(PoscarError::UnexpectedEof { expected }),
        }
    }

    fn parse_error(&self, kind: PoscarParseErrorKind) -> PoscarError {
        PoscarError::Parse {
            line: self.line_num,
            kind,
        }
    }

    fn floats(&self, line: &str, n: usize) -> Result<Vec<f64>, PoscarError> {
        let tokens: Vec<&str> = line.split_whitespace().take(n).collect();
        if tokens.len() < n {
            return Err(self.parse_error(PoscarParseErrorKind::TooFewColumns {
                expected: n,
                found: tokens.len(),
            }));
        }
        tokens
            .into_iter()
            .map(|t| {
                t.parse::<f64>().map_err(|_| {
                    self.parse_error(PoscarParseErrorKind::InvalidFloat { value: t.into() })
                })
            })
            .collect()
    }
}

/// `Fe_pv` and `Fe/1a2b3c` style POTCAR labels reduce to `Fe`.
fn clean_species(token: &str) -> &str {
    let token = token.split('/').next().unwrap_or(token);
    token.split('_').next().unwrap_or(token)
}

impl StructureFile for PoscarFile {
    type Metadata = PoscarMetadata;
    type Error = PoscarError;

    fn read_from(reader: &mut impl BufRead) -> Result<(Structure, Self::Metadata), Self::Error> {
        let mut lines = LineReader::new(reader);

        let comment = lines.next("comment line")?.trim().to_string();

        let scale_line = lines.next("scale factor")?;
        let scale = lines.floats(&scale_line, 1)?[0];
        if scale == 0.0 {
            return Err(lines.parse_error(PoscarParseErrorKind::ZeroScale));
        }

        let mut rows = [[0.0; 3]; 3];
        for row in rows.iter_mut() {
            let line = lines.next("lattice vectors")?;
            let v = lines.floats(&line, 3)?;
            *row = [v[0], v[1], v[2]];
        }
        let unscaled = Lattice::from_rows(rows)?;
        // A negative scale factor gives the target cell volume.
        let factor = if scale < 0.0 {
            (-scale / unscaled.volume()).cbrt()
        } else {
            scale
        };
        let lattice = Lattice::new(*unscaled.matrix() * factor)?;

        let species_line = lines.next("species names")?;
        let species: Vec<String> = species_line
            .split_whitespace()
            .map(|s| clean_species(s).to_string())
            .collect();
        if species.is_empty() || species.iter().all(|s| s.parse::<usize>().is_ok()) {
            return Err(lines.parse_error(PoscarParseErrorKind::MissingSpeciesLine));
        }

        let counts_line = lines.next("atom counts")?;
        let counts: Vec<usize> = counts_line
            .split_whitespace()
            .map(|t| {
                t.parse::<usize>().map_err(|_| {
                    lines.parse_error(PoscarParseErrorKind::InvalidCount { value: t.into() })
                })
            })
            .collect::<Result<_, _>>()?;
        if counts.len() != species.len() {
            return Err(lines.parse_error(PoscarParseErrorKind::CountMismatch {
                species: species.len(),
                counts: counts.len(),
            }));
        }

        let mut mode_line = lines.next("coordinate mode")?;
        if mode_line.trim_start().starts_with(['s', 'S']) {
            mode_line = lines.next("coordinate mode")?;
        }
        let mode = match mode_line.trim_start().chars().next() {
            Some('c' | 'C' | 'k' | 'K') => CoordinateMode::Cartesian,
            _ => CoordinateMode::Direct,
        };

        let mut sites = Vec::with_capacity(counts.iter().sum());
        for (sp, &count) in species.iter().zip(&counts) {
            for _ in 0..count {
                let line = lines.next("atomic positions")?;
                let v = lines.floats(&line, 3)?;
                let raw = Vector3::new(v[0], v[1], v[2]);
                let frac = match mode {
                    CoordinateMode::Direct => raw,
                    CoordinateMode::Cartesian => lattice.to_fractional(&(raw * factor)),
                };
                sites.push(Site::new(sp.clone(), frac));
            }
        }

        Ok((Structure::new(lattice, sites), PoscarMetadata { comment }))
    }

    fn write_to(
        structure: &Structure,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        writeln!(writer, "{}", metadata.comment)?;
        writeln!(writer, "1.0")?;
        for row in structure.lattice().to_rows() {
            writeln!(
                writer,
                "  {:>20.12} {:>20.12} {:>20.12}",
                row[0], row[1], row[2]
            )?;
        }

        // Consecutive runs keep the site order intact.
        let mut runs: Vec<(&str, usize)> = Vec::new();
        for sp in structure.species() {
            match runs.last_mut() {
                Some((last, n)) if *last == sp => *n += 1,
                _ => runs.push((sp, 1)),
            }
        }
        let names: Vec<&str> = runs.iter().map(|(s, _)| *s).collect();
        let counts: Vec<String> = runs.iter().map(|(_, n)| n.to_string()).collect();
        writeln!(writer, "{}", names.join(" "))?;
        writeln!(writer, "{}", counts.join(" "))?;

        writeln!(writer, "direct")?;
        for site in structure.sites() {
            let f = &site.frac_coords;
            writeln!(
                writer,
                "  {:>16.12} {:>16.12} {:>16.12} {}",
                f[0], f[1], f[2], site.species
            )?;
        }
        Ok(())
    }

    fn write_structure_to(
        structure: &Structure,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        let metadata = PoscarMetadata {
            comment: formula(structure),
        };
        Self::write_to(structure, &metadata, writer)
    }
}

/// A formula such as `Al1 Ni3`, in order of first appearance.
pub fn formula(structure: &Structure) -> String {
    structure
        .composition()
        .iter()
        .map(|(sp, n)| format!("{}{}", sp, n))
        .collect::<Vec<_>>()
        .join(" ")
}
