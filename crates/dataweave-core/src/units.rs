//! SI unit recognition and prefix scaling.
//!
//! Supported are atomic units made of an optional SI prefix, a base unit and
//! an optional integer exponent (`mV`, `ms^-1`, `kHz`), and compound units
//! built from atomic units joined by `*` or `/` (`mV*cm^-2`, `m/s`).

use log::trace;

use crate::error::{Error, Result};

const PREFIXES: &[(&str, f64)] = &[
    ("da", 1.0e1),
    ("Y", 1.0e24),
    ("Z", 1.0e21),
    ("E", 1.0e18),
    ("P", 1.0e15),
    ("T", 1.0e12),
    ("G", 1.0e9),
    ("M", 1.0e6),
    ("k", 1.0e3),
    ("h", 1.0e2),
    ("d", 1.0e-1),
    ("c", 1.0e-2),
    ("m", 1.0e-3),
    ("u", 1.0e-6),
    ("n", 1.0e-9),
    ("p", 1.0e-12),
    ("f", 1.0e-15),
    ("a", 1.0e-18),
    ("z", 1.0e-21),
    ("y", 1.0e-24),
];

const BASE_UNITS: &[&str] = &[
    "m", "g", "s", "A", "K", "mol", "cd", "Hz", "N", "Pa", "J", "W", "C", "V", "F", "S", "Wb",
    "T", "H", "lm", "lx", "Bq", "Gy", "Sv", "kat", "l", "L", "Ohm", "%",
];

/// Decomposition of an atomic SI unit.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomicUnit {
    prefix: Option<&'static str>,
    base: &'static str,
    exponent: i32,
}

impl AtomicUnit {
    /// Parses an atomic unit such as `mV` or `cm^2`.
    pub fn parse(unit: &str) -> Option<Self> {
        let (body, exponent) = match unit.split_once('^') {
            Some((body, exp)) => (body, exp.parse::<i32>().ok()?),
            None => (unit, 1),
        };

        if let Some(base) = find_base(body) {
            return Some(Self {
                prefix: None,
                base,
                exponent,
            });
        }

        PREFIXES.iter().find_map(|(prefix, _)| {
            let rest = body.strip_prefix(*prefix)?;
            find_base(rest).map(|base| Self {
                prefix: Some(*prefix),
                base,
                exponent,
            })
        })
    }

    pub fn prefix(&self) -> Option<&'static str> {
        self.prefix
    }

    pub fn base(&self) -> &'static str {
        self.base
    }

    pub fn exponent(&self) -> i32 {
        self.exponent
    }

    /// Multiplier of the prefix, `1.0` without prefix.
    fn prefix_factor(&self) -> f64 {
        self.prefix
            .and_then(|p| PREFIXES.iter().find(|(name, _)| *name == p))
            .map_or(1.0, |(_, factor)| *factor)
    }
}

fn find_base(candidate: &str) -> Option<&'static str> {
    BASE_UNITS.iter().copied().find(|base| *base == candidate)
}

/// Normalises the spelling of a unit string.
///
/// Whitespace is removed and the micro sign is replaced by `u`.
pub fn sanitize_unit(unit: &str) -> String {
    unit.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == 'µ' || c == 'μ' { 'u' } else { c })
        .collect()
}

/// Returns `true` if `unit` is a single SI unit with optional prefix and exponent.
pub fn is_atomic_si_unit(unit: &str) -> bool {
    AtomicUnit::parse(unit).is_some()
}

/// Returns `true` if `unit` is made of atomic SI units joined by `*` or `/`.
pub fn is_compound_si_unit(unit: &str) -> bool {
    unit.contains(['*', '/']) && unit.split(['*', '/']).all(is_atomic_si_unit)
}

/// Returns `true` if `unit` is an atomic or compound SI unit.
pub fn is_si_unit(unit: &str) -> bool {
    is_atomic_si_unit(unit) || is_compound_si_unit(unit)
}

/// Returns `true` for the placeholders meaning "no unit".
pub fn is_unitless(unit: &str) -> bool {
    unit.is_empty() || unit == "none"
}

/// Checks that `unit` is a valid SI unit.
///
/// # Errors
///
/// Returns [`Error::EmptyString`] for an empty unit and [`Error::InvalidUnit`]
/// for anything that is not an SI unit.
pub fn check_unit(unit: &str) -> Result<()> {
    if unit.is_empty() {
        return Err(Error::empty_string("unit must not be empty"));
    }
    if !is_si_unit(unit) {
        return Err(Error::invalid_unit(format!(
            "`{unit}` is not an SI unit; only atomic and compound SI units are supported"
        )));
    }
    Ok(())
}

/// Returns the factor converting a value in `from` into a value in `to`.
///
/// Both units must be atomic, share the base unit and the exponent.
///
/// ```
/// # use dataweave_core::units::scaling;
/// # use float_cmp::approx_eq;
/// assert!(approx_eq!(f64, scaling("ms", "s").unwrap(), 1.0e-3, ulps = 4));
/// assert!(approx_eq!(f64, scaling("s", "ms").unwrap(), 1.0e3, ulps = 4));
/// assert!(scaling("mV", "s").is_err());
/// ```
///
/// # Errors
///
/// Returns [`Error::IncompatibleDimensions`] if the units cannot be scaled
/// into each other.
pub fn scaling(from: &str, to: &str) -> Result<f64> {
    let (Some(origin), Some(destination)) = (AtomicUnit::parse(from), AtomicUnit::parse(to)) else {
        return Err(Error::incompatible_dimensions(format!(
            "units `{from}` and `{to}` cannot be scaled"
        )));
    };
    if origin.base != destination.base || origin.exponent != destination.exponent {
        return Err(Error::incompatible_dimensions(format!(
            "units `{from}` and `{to}` do not share a base unit"
        )));
    }

    let factor = (origin.prefix_factor() / destination.prefix_factor()).powi(origin.exponent);
    trace!(from, to, factor; "Computed unit scaling");
    Ok(factor)
}
