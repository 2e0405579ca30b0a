use phf::{Map, phf_map};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Static per-element reference data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementData {
    /// The chemical symbol (e.g., "Fe").
    pub symbol: &'static str,
    /// The atomic number Z.
    pub atomic_number: u8,
    /// The standard atomic mass in amu.
    pub atomic_mass: f64,
    /// The density of the elemental solid in g/cm³, if known.
    pub density_of_solid: Option<f64>,
}

impl ElementData {
    const fn new(
        symbol: &'static str,
        atomic_number: u8,
        atomic_mass: f64,
        density_of_solid: Option<f64>,
    ) -> Self {
        Self {
            symbol,
            atomic_number,
            atomic_mass,
            density_of_solid,
        }
    }
}

pub const MAX_ATOMIC_NUMBER: u8 = 103;

#[rustfmt::skip]
static ELEMENTS: [ElementData; MAX_ATOMIC_NUMBER as usize] = [
    ElementData::new("H", 1, 1.008, Some(0.088)),
    ElementData::new("He", 2, 4.0026, Some(0.214)),
    ElementData::new("Li", 3, 6.94, Some(0.535)),
    ElementData::new("Be", 4, 9.0122, Some(1.848)),
    ElementData::new("B", 5, 10.81, Some(2.46)),
    ElementData::new("C", 6, 12.011, Some(2.267)),
    ElementData::new("N", 7, 14.007, Some(1.026)),
    ElementData::new("O", 8, 15.999, Some(1.495)),
    ElementData::new("F", 9, 18.998, Some(1.7)),
    ElementData::new("Ne", 10, 20.180, Some(1.444)),
    ElementData::new("Na", 11, 22.990, Some(0.968)),
    ElementData::new("Mg", 12, 24.305, Some(1.738)),
    ElementData::new("Al", 13, 26.982, Some(2.7)),
    ElementData::new("Si", 14, 28.085, Some(2.33)),
    ElementData::new("P", 15, 30.974, Some(1.823)),
    ElementData::new("S", 16, 32.06, Some(1.96)),
    ElementData::new("Cl", 17, 35.45, Some(2.03)),
    ElementData::new("Ar", 18, 39.948, Some(1.616)),
    ElementData::new("K", 19, 39.098, Some(0.856)),
    ElementData::new("Ca", 20, 40.078, Some(1.55)),
    ElementData::new("Sc", 21, 44.956, Some(2.985)),
    ElementData::new("Ti", 22, 47.867, Some(4.507)),
    ElementData::new("V", 23, 50.942, Some(6.11)),
    ElementData::new("Cr", 24, 51.996, Some(7.14)),
    ElementData::new("Mn", 25, 54.938, Some(7.47)),
    ElementData::new("Fe", 26, 55.845, Some(7.874)),
    ElementData::new("Co", 27, 58.933, Some(8.9)),
    ElementData::new("Ni", 28, 58.693, Some(8.908)),
    ElementData::new("Cu", 29, 63.546, Some(8.92)),
    ElementData::new("Zn", 30, 65.38, Some(7.14)),
    ElementData::new("Ga", 31, 69.723, Some(5.904)),
    ElementData::new("Ge", 32, 72.630, Some(5.323)),
    ElementData::new("As", 33, 74.922, Some(5.727)),
    ElementData::new("Se", 34, 78.971, Some(4.819)),
    ElementData::new("Br", 35, 79.904, Some(4.05)),
    ElementData::new("Kr", 36, 83.798, Some(2.155)),
    ElementData::new("Rb", 37, 85.468, Some(1.532)),
    ElementData::new("Sr", 38, 87.62, Some(2.63)),
    ElementData::new("Y", 39, 88.906, Some(4.472)),
    ElementData::new("Zr", 40, 91.224, Some(6.511)),
    ElementData::new("Nb", 41, 92.906, Some(8.57)),
    ElementData::new("Mo", 42, 95.95, Some(10.28)),
    ElementData::new("Tc", 43, 98.0, Some(11.5)),
    ElementData::new("Ru", 44, 101.07, Some(12.37)),
    ElementData::new("Rh", 45, 102.91, Some(12.45)),
    ElementData::new("Pd", 46, 106.42, Some(12.023)),
    ElementData::new("Ag", 47, 107.87, Some(10.49)),
    ElementData::new("Cd", 48, 112.41, Some(8.65)),
    ElementData::new("In", 49, 114.82, Some(7.31)),
    ElementData::new("Sn", 50, 118.71, Some(7.31)),
    ElementData::new("Sb", 51, 121.76, Some(6.697)),
    ElementData::new("Te", 52, 127.60, Some(6.24)),
    ElementData::new("I", 53, 126.90, Some(4.94)),
    ElementData::new("Xe", 54, 131.29, Some(3.64)),
    ElementData::new("Cs", 55, 132.91, Some(1.879)),
    ElementData::new("Ba", 56, 137.33, Some(3.51)),
    ElementData::new("La", 57, 138.91, Some(6.146)),
    ElementData::new("Ce", 58, 140.12, Some(6.689)),
    ElementData::new("Pr", 59, 140.91, Some(6.64)),
    ElementData::new("Nd", 60, 144.24, Some(7.01)),
    ElementData::new("Pm", 61, 145.0, Some(7.264)),
    ElementData::new("Sm", 62, 150.36, Some(7.353)),
    ElementData::new("Eu", 63, 151.96, Some(5.244)),
    ElementData::new("Gd", 64, 157.25, Some(7.901)),
    ElementData::new("Tb", 65, 158.93, Some(8.219)),
    ElementData::new("Dy", 66, 162.50, Some(8.551)),
    ElementData::new("Ho", 67, 164.93, Some(8.795)),
    ElementData::new("Er", 68, 167.26, Some(9.066)),
    ElementData::new("Tm", 69, 168.93, Some(9.321)),
    ElementData::new("Yb", 70, 173.05, Some(6.57)),
    ElementData::new("Lu", 71, 174.97, Some(9.841)),
    ElementData::new("Hf", 72, 178.49, Some(13.31)),
    ElementData::new("Ta", 73, 180.95, Some(16.65)),
    ElementData::new("W", 74, 183.84, Some(19.25)),
    ElementData::new("Re", 75, 186.21, Some(21.02)),
    ElementData::new("Os", 76, 190.23, Some(22.61)),
    ElementData::new("Ir", 77, 192.22, Some(22.65)),
    ElementData::new("Pt", 78, 195.08, Some(21.09)),
    ElementData::new("Au", 79, 196.97, Some(19.3)),
    ElementData::new("Hg", 80, 200.59, Some(14.19)),
    ElementData::new("Tl", 81, 204.38, Some(11.85)),
    ElementData::new("Pb", 82, 207.2, Some(11.34)),
    ElementData::new("Bi", 83, 208.98, Some(9.78)),
    ElementData::new("Po", 84, 209.0, Some(9.196)),
    ElementData::new("At", 85, 210.0, None),
    ElementData::new("Rn", 86, 222.0, Some(4.4)),
    ElementData::new("Fr", 87, 223.0, None),
    ElementData::new("Ra", 88, 226.0, Some(5.0)),
    ElementData::new("Ac", 89, 227.0, Some(10.07)),
    ElementData::new("Th", 90, 232.04, Some(11.724)),
    ElementData::new("Pa", 91, 231.04, Some(15.37)),
    ElementData::new("U", 92, 238.03, Some(19.05)),
    ElementData::new("Np", 93, 237.0, Some(20.45)),
    ElementData::new("Pu", 94, 244.0, Some(19.816)),
    ElementData::new("Am", 95, 243.0, Some(12.0)),
    ElementData::new("Cm", 96, 247.0, Some(13.51)),
    ElementData::new("Bk", 97, 247.0, Some(14.78)),
    ElementData::new("Cf", 98, 251.0, Some(15.1)),
    ElementData::new("Es", 99, 252.0, None),
    ElementData::new("Fm", 100, 257.0, None),
    ElementData::new("Md", 101, 258.0, None),
    ElementData::new("No", 102, 259.0, None),
    ElementData::new("Lr", 103, 266.0, None),
];

#[rustfmt::skip]
static SYMBOL_TO_Z: Map<&'static str, u8> = phf_map! {
    "H" => 1, "He" => 2, "Li" => 3, "Be" => 4, "B" => 5, "C" => 6, "N" => 7, "O" => 8,
    "F" => 9, "Ne" => 10, "Na" => 11, "Mg" => 12, "Al" => 13, "Si" => 14, "P" => 15, "S" => 16,
    "Cl" => 17, "Ar" => 18, "K" => 19, "Ca" => 20, "Sc" => 21, "Ti" => 22, "V" => 23, "Cr" => 24,
    "Mn" => 25, "Fe" => 26, "Co" => 27, "Ni" => 28, "Cu" => 29, "Zn" => 30, "Ga" => 31, "Ge" => 32,
    "As" => 33, "Se" => 34, "Br" => 35, "Kr" => 36, "Rb" => 37, "Sr" => 38, "Y" => 39, "Zr" => 40,
    "Nb" => 41, "Mo" => 42, "Tc" => 43, "Ru" => 44, "Rh" => 45, "Pd" => 46, "Ag" => 47, "Cd" => 48,
    "In" => 49, "Sn" => 50, "Sb" => 51, "Te" => 52, "I" => 53, "Xe" => 54, "Cs" => 55, "Ba" => 56,
    "La" => 57, "Ce" => 58, "Pr" => 59, "Nd" => 60, "Pm" => 61, "Sm" => 62, "Eu" => 63, "Gd" => 64,
    "Tb" => 65, "Dy" => 66, "Ho" => 67, "Er" => 68, "Tm" => 69, "Yb" => 70, "Lu" => 71, "Hf" => 72,
    "Ta" => 73, "W" => 74, "Re" => 75, "Os" => 76, "Ir" => 77, "Pt" => 78, "Au" => 79, "Hg" => 80,
    "Tl" => 81, "Pb" => 82, "Bi" => 83, "Po" => 84, "At" => 85, "Rn" => 86, "Fr" => 87, "Ra" => 88,
    "Ac" => 89, "Th" => 90, "Pa" => 91, "U" => 92, "Np" => 93, "Pu" => 94, "Am" => 95, "Cm" => 96,
    "Bk" => 97, "Cf" => 98, "Es" => 99, "Fm" => 100, "Md" => 101, "No" => 102, "Lr" => 103,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ElementError {
    #[error("Unknown element symbol: '{0}'")]
    UnknownSymbol(String),
    #[error("Atomic number {0} is outside of the supported range 1-{max}", max = MAX_ATOMIC_NUMBER)]
    InvalidAtomicNumber(u8),
    #[error("No solid density is tabulated for element {0}")]
    MissingDensity(&'static str),
}

/// A chemical element, identified by its atomic number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Element(u8);

impl Element {
    /// Looks up an element by atomic number.
    ///
    /// Templates use this to hand out placeholder species: Z = 1 is `H`, Z = 2 is `He`, and so on.
    pub fn from_z(z: u8) -> Result<Self, ElementError> {
        if (1..=MAX_ATOMIC_NUMBER).contains(&z) {
            Ok(Self(z))
        } else {
            Err(ElementError::InvalidAtomicNumber(z))
        }
    }

    /// Looks up an element by symbol.
    ///
    /// Trailing oxidation-state decorations such as `Fe2+` or `O2-` are ignored, so species labels
    /// written by other tools resolve to their element.
    pub fn from_symbol(symbol: &str) -> Result<Self, ElementError> {
        let stem: String = symbol
            .trim()
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .collect();
        SYMBOL_TO_Z
            .get(stem.as_str())
            .map(|&z| Self(z))
            .ok_or_else(|| ElementError::UnknownSymbol(symbol.to_string()))
    }

    fn data(self) -> &'static ElementData {
        &ELEMENTS[(self.0 - 1) as usize]
    }

    pub fn atomic_number(self) -> u8 {
        self.0
    }

    pub fn symbol(self) -> &'static str {
        self.data().symbol
    }

    /// Atomic mass in amu.
    pub fn atomic_mass(self) -> f64 {
        self.data().atomic_mass
    }

    /// Density of the elemental solid in g/cm³.
    pub fn density_of_solid(self) -> Option<f64> {
        self.data().density_of_solid
    }

    /// Like [`Element::density_of_solid`], but a missing value is an error.
    pub fn try_density_of_solid(self) -> Result<f64, ElementError> {
        self.density_of_solid()
            .ok_or(ElementError::MissingDensity(self.symbol()))
    }
}

impl FromStr for Element {
    type Err = ElementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_symbol(s)
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
