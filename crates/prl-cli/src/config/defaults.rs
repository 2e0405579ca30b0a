pub struct DefaultsConfig {
    pub symprec: f64,
    pub use_equivalent_atom: bool,
    pub scale_volume: bool,
    pub skip_on_failure: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            symprec: 0.01,
            use_equivalent_atom: false,
            scale_volume: true,
            skip_on_failure: false,
        }
    }
}
