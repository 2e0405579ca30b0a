use prlstructure::core::models::lattice::SupercellMatrix;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid supercell '{0}'. Expected three positive integers such as '2x2x2' or '2,2,1'.")]
    InvalidSupercell(String),

    #[error("Invalid sublattice group '{0}'. Expected comma-separated labels such as 'a,b'.")]
    InvalidSiteGroup(String),
}

/// Parses a diagonal supercell written as `AxBxC` or `A,B,C`.
pub fn parse_supercell(s: &str) -> Result<SupercellMatrix, ParseError> {
    let invalid = || ParseError::InvalidSupercell(s.to_string());
    let parts: Vec<&str> = s.split(['x', 'X', ',']).map(str::trim).collect();
    if parts.len() != 3 {
        return Err(invalid());
    }
    let mut diagonal = [0i32; 3];
    for (slot, part) in diagonal.iter_mut().zip(&parts) {
        let value: i32 = part.parse().map_err(|_| invalid())?;
        if value <= 0 {
            return Err(invalid());
        }
        *slot = value;
    }
    Ok(SupercellMatrix::Diagonal(diagonal))
}

/// Parses a comma-separated group of sublattice labels.
pub fn parse_site_group(s: &str) -> Result<Vec<String>, ParseError> {
    let labels: Vec<String> = s.split(',').map(|l| l.trim().to_string()).collect();
    if labels.len() < 2 || labels.iter().any(String::is_empty) {
        return Err(ParseError::InvalidSiteGroup(s.to_string()));
    }
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supercell_in_both_notations() {
        assert_eq!(
            parse_supercell("2x2x1").unwrap(),
            SupercellMatrix::Diagonal([2, 2, 1])
        );
        assert_eq!(
            parse_supercell("3, 3, 3").unwrap(),
            SupercellMatrix::Diagonal([3, 3, 3])
        );
    }

    #[test]
    fn rejects_malformed_supercells() {
        for bad in ["2x2", "2x2x2x2", "0x1x1", "ax1x1", "-1,1,1"] {
            assert_eq!(
                parse_supercell(bad),
                Err(ParseError::InvalidSupercell(bad.to_string())),
                "expected '{bad}' to be rejected"
            );
        }
    }

    #[test]
    fn parses_site_groups() {
        assert_eq!(parse_site_group("a, b").unwrap(), vec!["a", "b"]);
        assert_eq!(
            parse_site_group("a"),
            Err(ParseError::InvalidSiteGroup("a".to_string()))
        );
        assert_eq!(
            parse_site_group("a,,b"),
            Err(ParseError::InvalidSiteGroup("a,,b".to_string()))
        );
    }
}
