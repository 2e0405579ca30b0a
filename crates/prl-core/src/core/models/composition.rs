use std::collections::BTreeMap;

/// Amount tolerance used when deciding whether a composition is integral.
const INTEGRAL_TOLERANCE: f64 = 1e-8;

/// Species amounts of a structure, ordered by first appearance.
///
/// Species are plain labels, so abstract species such as `Xab` are counted the same way as real
/// elements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Composition {
    amounts: Vec<(String, f64)>,
}

impl Composition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one atom per species label.
    pub fn from_species<'a, I>(species: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut composition = Self::new();
        for sp in species {
            composition.add(sp, 1.0);
        }
        composition
    }

    pub fn add(&mut self, species: &str, amount: f64) {
        match self.amounts.iter_mut().find(|(s, _)| s == species) {
            Some((_, existing)) => *existing += amount,
            None => self.amounts.push((species.to_string(), amount)),
        }
    }

    /// The amount of a species, zero when absent.
    pub fn get(&self, species: &str) -> f64 {
        self.amounts
            .iter()
            .find(|(s, _)| s == species)
            .map_or(0.0, |(_, a)| *a)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.amounts.iter().map(|(s, a)| (s.as_str(), *a))
    }

    pub fn species(&self) -> impl Iterator<Item = &str> {
        self.amounts.iter().map(|(s, _)| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.amounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.amounts.is_empty()
    }

    pub fn num_atoms(&self) -> f64 {
        self.amounts.iter().map(|(_, a)| a).sum()
    }

    /// Species to amount, keyed alphabetically.
    pub fn el_amt_dict(&self) -> BTreeMap<String, f64> {
        self.amounts.iter().cloned().collect()
    }

    /// Amounts divided by the total number of atoms.
    pub fn fractional(&self) -> Self {
        let total = self.num_atoms();
        if total == 0.0 {
            return self.clone();
        }
        Self {
            amounts: self
                .amounts
                .iter()
                .map(|(s, a)| (s.clone(), a / total))
                .collect(),
        }
    }

    /// Amounts divided by their greatest common divisor.
    ///
    /// Non-integral compositions are returned unchanged.
    pub fn reduced(&self) -> Self {
        let integral: Option<Vec<u64>> = self
            .amounts
            .iter()
            .map(|(_, a)| {
                let rounded = a.round();
                ((a - rounded).abs() < INTEGRAL_TOLERANCE && rounded > 0.0)
                    .then_some(rounded as u64)
            })
            .collect();

        let Some(counts) = integral else {
            return self.clone();
        };
        let divisor = counts.iter().copied().fold(0, gcd);
        if divisor <= 1 {
            return self.clone();
        }

        Self {
            amounts: self
                .amounts
                .iter()
                .zip(counts)
                .map(|((s, _), c)| (s.clone(), (c / divisor) as f64))
                .collect(),
        }
    }
}

pub(crate) fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 { a } else { gcd(b, a % b) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_species_in_first_appearance_order() {
        let comp = Composition::from_species(["Ni", "Al", "Ni", "Ni"]);
        let species: Vec<_> = comp.species().collect();
        assert_eq!(species, vec!["Ni", "Al"]);
        assert_eq!(comp.get("Ni"), 3.0);
        assert_eq!(comp.get("Al"), 1.0);
        assert_eq!(comp.get("Fe"), 0.0);
        assert_eq!(comp.num_atoms(), 4.0);
    }

    #[test]
    fn el_amt_dict_is_sorted_by_species() {
        let comp = Composition::from_species(["Ti", "Nb", "Nb"]);
        let keys: Vec<_> = comp.el_amt_dict().into_keys().collect();
        assert_eq!(keys, vec!["Nb".to_string(), "Ti".to_string()]);
    }

    #[test]
    fn fractional_amounts_sum_to_one() {
        let comp = Composition::from_species(["Ni", "Al", "Ni", "Ni"]).fractional();
        assert!((comp.get("Ni") - 0.75).abs() < 1e-12);
        assert!((comp.num_atoms() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn reduced_divides_by_gcd() {
        let species = ["Xaa"; 12].into_iter().chain(["Xab"; 4]).chain(["Xba"; 16]);
        let comp = Composition::from_species(species).reduced();
        assert_eq!(comp.get("Xaa"), 3.0);
        assert_eq!(comp.get("Xab"), 1.0);
        assert_eq!(comp.get("Xba"), 4.0);
    }

    #[test]
    fn reduced_keeps_non_integral_amounts() {
        let mut comp = Composition::new();
        comp.add("Fe", 0.5);
        comp.add("Ni", 1.5);
        assert_eq!(comp.reduced(), comp);
    }

    #[test]
    fn gcd_handles_zero() {
        assert_eq!(gcd(0, 6), 6);
        assert_eq!(gcd(12, 18), 6);
    }
}
