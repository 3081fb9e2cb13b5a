//! # Elementary Reaction
//!
//! Leaf data entity of the crate: one irreversible transformation of a multiset of reactants
//! into a multiset of products governed by a single rate constant.
//!
//! ## Main Structures
//! - [`ElementaryReaction`]: reactants, products, rate constant value and key, optional name and scaling group
//! - [`ExpressionStyle`]: formatting options for the human-readable `reactants ==[k]==> products` string
//! - [`ReactionError`]: formatting and file I/O errors
//!
//! ## Non-Obvious Features
//! - Stoichiometric multiplicity is expressed by repetition: `2A + B` is `["A", "A", "B"]`
//! - The reaction order is simply the number of reactant identifiers
//! - Reverse reactions are independent reactions with synthesized keys and names (`k_rev`, `name_rev`)
//! - Reactions are persisted as flat JSON records with the same keys as the struct fields
//!
//! ## Example
//! ```
//! use KiNet::Kinetics::elementary_reaction::ElementaryReaction;
//! let forward = ElementaryReaction::new(vec!["A".to_string()], vec!["B".to_string()], 2.0)
//!     .with_key("k1");
//! let reverse = forward.create_reverse_reaction(0.5, None, None);
//! assert_eq!(reverse.rate_const_key, "k1_rev");
//! assert_eq!(forward.to_string(), "A ==[k1]==> B");
//! ```
use log::info;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

/// default rate constant key of a freshly constructed reaction
pub const DEFAULT_RATE_CONST_KEY: &str = "k";
/// default suffix appended to keys and names of derived reverse reactions
pub const DEFAULT_REVERSE_SUFFIX: &str = "rev";
const NAME_SEPARATOR: &str = "_";

// "->", "=>" or "=" with surrounding whitespace
static ARROW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*(?:->|=>|=)\s*").expect("valid arrow regex"));
// optional integer multiplicity followed by the species identifier
static TERM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)?\s*(\S+)$").expect("valid term regex"));

/// errors of reaction formatting and persistence
#[derive(Debug, Error)]
pub enum ReactionError {
    #[error("Invalid expression style: {0}")]
    InvalidStyle(String),
    #[error("Reaction file '{0}' does not exist")]
    FileNotFound(PathBuf),
    #[error("Reaction files must have a '.json' extension, got '{0}'")]
    InvalidExtension(PathBuf),
    #[error("Failed to parse reaction equation '{0}'")]
    InvalidEquation(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Reaction record is malformed: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Formatting options of [`ElementaryReaction::reaction_expression`]
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionStyle {
    /// number of spaces around separators and the arrow (must be > 0)
    pub spacing_width: usize,
    pub species_sep: String,
    pub arrow_stem: String,
    pub arrow_head: String,
    /// number of stem repetitions on each side of the rate key (must be > 0)
    pub arrow_seg_len: usize,
}

impl Default for ExpressionStyle {
    fn default() -> Self {
        Self {
            spacing_width: 1,
            species_sep: "+".to_string(),
            arrow_stem: "=".to_string(),
            arrow_head: ">".to_string(),
            arrow_seg_len: 2,
        }
    }
}

impl ExpressionStyle {
    pub fn validate(&self) -> Result<(), ReactionError> {
        if self.spacing_width == 0 {
            return Err(ReactionError::InvalidStyle(
                "spacing_width must be positive".to_string(),
            ));
        }
        if self.arrow_seg_len == 0 {
            return Err(ReactionError::InvalidStyle(
                "arrow_seg_len must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_rate_const_key() -> String {
    DEFAULT_RATE_CONST_KEY.to_string()
}

/// A single reactant -> product change in a human-readable format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElementaryReaction {
    /// reactant species, repeated once per stoichiometric occurrence
    pub reactants: Vec<String>,
    /// product species, repeated once per stoichiometric occurrence
    pub products: Vec<String>,
    pub rate_const_value: f64,
    /// symbolic name of the rate constant, unique within a compiled network
    #[serde(default = "default_rate_const_key")]
    pub rate_const_key: String,
    #[serde(default)]
    pub name: String,
    /// reactions sharing a group id share one externally adjustable scale factor
    #[serde(default)]
    pub scaling_group_id: Option<i32>,
}

impl ElementaryReaction {
    pub fn new(reactants: Vec<String>, products: Vec<String>, rate_const_value: f64) -> Self {
        Self {
            reactants,
            products,
            rate_const_value,
            rate_const_key: default_rate_const_key(),
            name: String::new(),
            scaling_group_id: None,
        }
    }

    pub fn with_key(mut self, rate_const_key: &str) -> Self {
        self.rate_const_key = rate_const_key.to_string();
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_scaling_group(mut self, scaling_group_id: i32) -> Self {
        self.scaling_group_id = Some(scaling_group_id);
        self
    }

    /// Parses equations like `"A + 2 B -> C"`. Accepted arrows are `->`, `=>` and `=`;
    /// an integer prefix repeats the species identifier. Either side may be empty.
    pub fn from_equation(
        equation: &str,
        rate_const_value: f64,
        rate_const_key: &str,
    ) -> Result<Self, ReactionError> {
        let sides: Vec<&str> = ARROW_RE.split(equation.trim()).collect();
        if sides.len() != 2 {
            return Err(ReactionError::InvalidEquation(equation.to_string()));
        }
        let reactants = parse_side(sides[0])
            .ok_or_else(|| ReactionError::InvalidEquation(equation.to_string()))?;
        let products = parse_side(sides[1])
            .ok_or_else(|| ReactionError::InvalidEquation(equation.to_string()))?;
        Ok(Self::new(reactants, products, rate_const_value).with_key(rate_const_key))
    }

    /////////////////////////////////REVERSE REACTIONS///////////////////////////////////////////
    /// Generates the corresponding reverse reaction given a reverse rate constant.
    /// Unless overridden, the key and name get the default suffix: `k` -> `k_rev`, `""` -> `rev`.
    pub fn create_reverse_reaction(
        &self,
        k_rev_value: f64,
        k_rev_key: Option<&str>,
        rev_name: Option<&str>,
    ) -> Self {
        self.create_reverse_reaction_with_suffix(
            k_rev_value,
            k_rev_key,
            rev_name,
            DEFAULT_REVERSE_SUFFIX,
        )
    }

    pub fn create_reverse_reaction_with_suffix(
        &self,
        k_rev_value: f64,
        k_rev_key: Option<&str>,
        rev_name: Option<&str>,
        default_suffix: &str,
    ) -> Self {
        let rate_const_key = match k_rev_key {
            Some(key) => key.to_string(),
            None => suffixed(&self.rate_const_key, default_suffix),
        };
        let name = match rev_name {
            Some(name) => name.to_string(),
            None => suffixed(&self.name, default_suffix),
        };
        Self {
            reactants: self.products.clone(),
            products: self.reactants.clone(),
            rate_const_value: k_rev_value,
            rate_const_key,
            name,
            scaling_group_id: None,
        }
    }

    ///////////////////////////REPRESENTATION AND EXPRESSION STRINGS////////////////////////////////
    pub fn order(&self) -> usize {
        self.reactants.len()
    }

    /// algebraic rate law of the step, e.g. `k*A*A*B` for 2A + B
    pub fn rate_expression(&self) -> String {
        std::iter::once(self.rate_const_key.as_str())
            .chain(self.reactants.iter().map(String::as_str))
            .collect::<Vec<&str>>()
            .join("*")
    }

    /// symbolic representation of the reaction, e.g. `A + B ==[k]==> C`
    pub fn reaction_expression(&self, style: &ExpressionStyle) -> Result<String, ReactionError> {
        style.validate()?;
        Ok(self.format_expression(style))
    }

    fn format_expression(&self, style: &ExpressionStyle) -> String {
        let space = " ".repeat(style.spacing_width);
        let species_sep_spaced = format!("{space}{}{space}", style.species_sep);
        let reactant_str = self.reactants.join(&species_sep_spaced);
        let product_str = self.products.join(&species_sep_spaced);
        let stem = style.arrow_stem.repeat(style.arrow_seg_len);
        let arrow = format!("{stem}[{}]{stem}{}", self.rate_const_key, style.arrow_head);
        format!("{reactant_str}{space}{arrow}{space}{product_str}")
    }

    ///////////////////////////INPUT/OUTPUT/////////////////////////////////////////////////////////
    /// Saves the reaction as a JSON record; only `.json` paths are allowed
    pub fn to_file<P: AsRef<Path>>(&self, save_path: P, indent: usize) -> Result<(), ReactionError> {
        let save_path = save_path.as_ref();
        if save_path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            return Err(ReactionError::InvalidExtension(save_path.to_path_buf()));
        }
        let indent_str = " ".repeat(indent);
        let formatter = serde_json::ser::PrettyFormatter::with_indent(indent_str.as_bytes());
        let mut buffer = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        self.serialize(&mut serializer)?;

        let mut file = File::create(save_path)?;
        file.write_all(&buffer)?;
        info!("reaction '{}' saved to {}", self, save_path.display());
        Ok(())
    }

    /// Loads a reaction from a JSON record saved by [`ElementaryReaction::to_file`]
    pub fn from_file<P: AsRef<Path>>(load_path: P) -> Result<Self, ReactionError> {
        let load_path = load_path.as_ref();
        if !load_path.exists() {
            return Err(ReactionError::FileNotFound(load_path.to_path_buf()));
        }
        let reader = BufReader::new(File::open(load_path)?);
        let reaction: Self = serde_json::from_reader(reader)?;
        Ok(reaction)
    }
}

impl fmt::Display for ElementaryReaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_expression(&ExpressionStyle::default()))
    }
}

fn suffixed(base: &str, suffix: &str) -> String {
    if base.is_empty() {
        suffix.to_string()
    } else {
        format!("{base}{NAME_SEPARATOR}{suffix}")
    }
}

// "2 A + B" -> ["A", "A", "B"]; an empty side is a valid empty list, a zero multiplicity is not
fn parse_side(side: &str) -> Option<Vec<String>> {
    let side = side.trim();
    if side.is_empty() {
        return Some(Vec::new());
    }
    let mut species = Vec::new();
    for raw_term in side.split('+') {
        let caps = TERM_RE.captures(raw_term.trim())?;
        let multiplicity: usize = match caps.get(1) {
            Some(m) => m.as_str().parse().ok().filter(|n| *n > 0)?,
            None => 1,
        };
        let name = caps.get(2)?.as_str();
        species.extend(std::iter::repeat(name.to_string()).take(multiplicity));
    }
    Some(species)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::fs;
    use tempfile::tempdir;

    fn species(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_order_is_number_of_reactants() {
        let rxn = ElementaryReaction::new(species(&["A", "A", "B"]), species(&["C"]), 1.0);
        assert_eq!(rxn.order(), 3);
        let rxn = ElementaryReaction::new(species(&["A"]), species(&["B", "C"]), 1.0);
        assert_eq!(rxn.order(), 1);
    }

    #[test]
    fn test_reverse_reaction_keys_and_names() {
        let rxn = ElementaryReaction::new(species(&["A", "B"]), species(&["C"]), 3.0)
            .with_key("k1")
            .with_name("dimerization")
            .with_scaling_group(2);
        let rev = rxn.create_reverse_reaction(0.1, None, None);
        assert_eq!(rev.reactants, species(&["C"]));
        assert_eq!(rev.products, species(&["A", "B"]));
        assert_eq!(rev.rate_const_key, "k1_rev");
        assert_eq!(rev.name, "dimerization_rev");
        assert_eq!(rev.scaling_group_id, None);
        assert_relative_eq!(rev.rate_const_value, 0.1);
        // forward reaction untouched
        assert_eq!(rxn.rate_const_key, "k1");
        assert_eq!(rxn.scaling_group_id, Some(2));
    }

    #[test]
    fn test_reverse_reaction_empty_base_has_no_leading_separator() {
        let rxn = ElementaryReaction::new(species(&["A"]), species(&["B"]), 1.0).with_key("");
        let rev = rxn.create_reverse_reaction(1.0, None, None);
        assert_eq!(rev.rate_const_key, "rev");
        assert_eq!(rev.name, "rev");
        let rev = rxn.create_reverse_reaction_with_suffix(1.0, None, Some("back"), "b");
        assert_eq!(rev.rate_const_key, "b");
        assert_eq!(rev.name, "back");
    }

    #[test]
    fn test_reverse_of_reverse_restores_species() {
        let rxn = ElementaryReaction::new(species(&["A", "A"]), species(&["B", "C"]), 1.0);
        let back = rxn
            .create_reverse_reaction(2.0, None, None)
            .create_reverse_reaction(3.0, None, None);
        assert_eq!(back.reactants, rxn.reactants);
        assert_eq!(back.products, rxn.products);
        assert_eq!(back.rate_const_key, "k_rev_rev");
    }

    #[test]
    fn test_rate_expression() {
        let rxn = ElementaryReaction::new(species(&["A", "A", "B"]), species(&["C"]), 1.0)
            .with_key("k2");
        assert_eq!(rxn.rate_expression(), "k2*A*A*B");
        let source = ElementaryReaction::new(vec![], species(&["A"]), 1.0);
        assert_eq!(source.rate_expression(), "k");
    }

    #[test]
    fn test_reaction_expression_styles() {
        let rxn = ElementaryReaction::new(species(&["A", "B"]), species(&["C"]), 1.0)
            .with_key("k1");
        assert_eq!(rxn.to_string(), "A + B ==[k1]==> C");
        let style = ExpressionStyle {
            spacing_width: 2,
            species_sep: "&".to_string(),
            arrow_stem: "-".to_string(),
            arrow_head: ">".to_string(),
            arrow_seg_len: 1,
        };
        assert_eq!(
            rxn.reaction_expression(&style).unwrap(),
            "A  &  B  -[k1]->  C"
        );
    }

    #[test]
    fn test_reaction_expression_rejects_zero_spacing() {
        let rxn = ElementaryReaction::new(species(&["A"]), species(&["B"]), 1.0);
        let style = ExpressionStyle {
            spacing_width: 0,
            ..ExpressionStyle::default()
        };
        assert!(matches!(
            rxn.reaction_expression(&style),
            Err(ReactionError::InvalidStyle(_))
        ));
        let style = ExpressionStyle {
            arrow_seg_len: 0,
            ..ExpressionStyle::default()
        };
        assert!(rxn.reaction_expression(&style).is_err());
    }

    #[test]
    fn test_from_equation() {
        let rxn = ElementaryReaction::from_equation("2A + B -> C", 4.0, "kf").unwrap();
        assert_eq!(rxn.reactants, species(&["A", "A", "B"]));
        assert_eq!(rxn.products, species(&["C"]));
        assert_eq!(rxn.rate_const_key, "kf");

        let rxn = ElementaryReaction::from_equation("H2O2 => 2 OH", 1.0, "k").unwrap();
        assert_eq!(rxn.products, species(&["OH", "OH"]));

        let sink = ElementaryReaction::from_equation("A -> ", 1.0, "k_out").unwrap();
        assert!(sink.products.is_empty());

        assert!(ElementaryReaction::from_equation("A + B", 1.0, "k").is_err());
        assert!(ElementaryReaction::from_equation("A + + B -> C", 1.0, "k").is_err());
    }

    #[test]
    fn test_from_equation_rejects_zero_multiplicity() {
        for eq in ["0 A -> B", "0A -> B", "A -> 0 B", "A + 0 C -> B"] {
            assert!(
                matches!(
                    ElementaryReaction::from_equation(eq, 1.0, "k"),
                    Err(ReactionError::InvalidEquation(_))
                ),
                "{}",
                eq
            );
        }
        let rxn = ElementaryReaction::from_equation("10 A -> B", 1.0, "k").unwrap();
        assert_eq!(rxn.order(), 10);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reaction.json");
        let rxn = ElementaryReaction::new(species(&["A"]), species(&["B"]), 2.5)
            .with_key("k7")
            .with_name("isomerization")
            .with_scaling_group(1);
        rxn.to_file(&path, 4).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"rate_const_key\": \"k7\""));
        let loaded = ElementaryReaction::from_file(&path).unwrap();
        assert_eq!(loaded, rxn);
    }

    #[test]
    fn test_to_file_requires_json_extension() {
        let dir = tempdir().unwrap();
        let rxn = ElementaryReaction::new(species(&["A"]), species(&["B"]), 1.0);
        let result = rxn.to_file(dir.path().join("reaction.txt"), 4);
        assert!(matches!(result, Err(ReactionError::InvalidExtension(_))));
    }

    #[test]
    fn test_from_file_missing_and_malformed() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nothing.json");
        assert!(matches!(
            ElementaryReaction::from_file(&missing),
            Err(ReactionError::FileNotFound(_))
        ));

        let malformed = dir.path().join("bad.json");
        fs::write(&malformed, r#"{"reactants": ["A"], "products": ["B"], "rate": 1.0}"#).unwrap();
        assert!(matches!(
            ElementaryReaction::from_file(&malformed),
            Err(ReactionError::Serde(_))
        ));
    }

    #[test]
    fn test_from_file_applies_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("minimal.json");
        fs::write(
            &path,
            r#"{"reactants": ["A"], "products": ["B"], "rate_const_value": 1.5}"#,
        )
        .unwrap();
        let rxn = ElementaryReaction::from_file(&path).unwrap();
        assert_eq!(rxn.rate_const_key, "k");
        assert_eq!(rxn.name, "");
        assert_eq!(rxn.scaling_group_id, None);
    }
}
