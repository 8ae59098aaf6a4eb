//! Phrase matcher turning a free-text filter into a single criterion.

use std::fmt;

use remote::wire::RawBuilding;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Attribute {
    Height,
    RooftopElevation,
    GroundElevationMin,
    GroundElevationMax,
    LandUse,
}

impl Attribute {
    pub fn name(self) -> &'static str {
        match self {
            Attribute::Height => "height",
            Attribute::RooftopElevation => "rooftop_elev_z",
            Attribute::GroundElevationMin => "grd_elev_min_z",
            Attribute::GroundElevationMax => "grd_elev_max_z",
            Attribute::LandUse => "land_use",
        }
    }

    fn numeric_value(self, building: &RawBuilding) -> Option<f64> {
        match self {
            Attribute::Height => building.height(),
            Attribute::RooftopElevation => building.rooftop_elev_z,
            Attribute::GroundElevationMin => building.grd_elev_min_z,
            Attribute::GroundElevationMax => building.grd_elev_max_z,
            Attribute::LandUse => None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Operator {
    Greater,
    Less,
    Equal,
}

impl Operator {
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Greater => ">",
            Operator::Less => "<",
            Operator::Equal => "==",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Criterion {
    pub attribute: Attribute,
    pub operator: Operator,
    pub value: Value,
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match &self.value {
            Value::Number(n) => n.to_string(),
            Value::Text(t) => format!("{t:?}"),
        };
        write!(f, "{} {} {}", self.attribute.name(), self.operator.symbol(), value)
    }
}

const GREATER_WORDS: &[&str] = &[
    "above", "over", "greater", "taller", "higher", "bigger", "larger", "more", ">",
];
const LESS_WORDS: &[&str] = &[
    "below", "under", "less", "shorter", "lower", "smaller", "fewer", "<",
];
const EQUAL_WORDS: &[&str] = &["is", "equals", "equal", "==", "="];
const LAND_USE_WORDS: &[&str] = &["zoned", "zoning", "zone", "district"];
const FILLER_WORDS: &[&str] = &[
    "buildings", "building", "structures", "structure", "with", "that", "are", "the", "a", "to",
    "than", "land", "use", "code", "type", "of", "in",
];

fn tokenize(text: &str) -> Vec<String> {
    let spaced = text
        .to_lowercase()
        .replace("==", " == ")
        .replace('>', " > ")
        .replace('<', " < ");
    spaced
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Leading number of a token, tolerating unit suffixes (`50m`, `12.5meters`).
fn number_in(token: &str) -> Option<f64> {
    let end = token
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || *c == '.' || *c == '-'))
        .map(|(i, _)| i)
        .unwrap_or(token.len());
    let digits = &token[..end];
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Comparison words win over "is" ("height is above 30" means `>`).
fn operator_in(tokens: &[String]) -> Option<Operator> {
    let comparison = tokens.iter().find_map(|t| {
        let t = t.as_str();
        if GREATER_WORDS.contains(&t) {
            Some(Operator::Greater)
        } else if LESS_WORDS.contains(&t) {
            Some(Operator::Less)
        } else {
            None
        }
    });
    comparison.or_else(|| {
        tokens
            .iter()
            .any(|t| EQUAL_WORDS.contains(&t.as_str()))
            .then_some(Operator::Equal)
    })
}

fn numeric_attribute(text: &str) -> Attribute {
    let ground = text.contains("ground") || text.contains("base");
    if text.contains("roof") {
        Attribute::RooftopElevation
    } else if ground && (text.contains("max") || text.contains("highest")) {
        Attribute::GroundElevationMax
    } else if ground {
        Attribute::GroundElevationMin
    } else {
        Attribute::Height
    }
}

/// Interprets one filter phrase.
pub fn parse_query(query: &str) -> Result<Criterion, String> {
    let text = query.trim().to_lowercase();
    if text.is_empty() {
        return Err("empty query".to_string());
    }
    let tokens = tokenize(&text);

    let is_land_use = text.contains("land use")
        || text.contains("land_use")
        || text.contains("land code")
        || tokens.iter().any(|t| LAND_USE_WORDS.contains(&t.as_str()));
    if is_land_use {
        let value: Vec<&str> = tokens
            .iter()
            .map(String::as_str)
            .filter(|t| {
                !FILLER_WORDS.contains(t)
                    && !LAND_USE_WORDS.contains(t)
                    && !EQUAL_WORDS.contains(t)
                    && *t != "land_use"
            })
            .collect();
        if value.is_empty() {
            return Err(format!("no land use given in {query:?}"));
        }
        return Ok(Criterion {
            attribute: Attribute::LandUse,
            operator: Operator::Equal,
            value: Value::Text(value.join(" ")),
        });
    }

    let number = tokens
        .iter()
        .find_map(|t| number_in(t))
        .ok_or_else(|| format!("could not interpret {query:?}: no number found"))?;
    // A bare "50 meters" means taller than 50.
    let operator = operator_in(&tokens).unwrap_or(Operator::Greater);
    Ok(Criterion {
        attribute: numeric_attribute(&text),
        operator,
        value: Value::Number(number),
    })
}

impl Criterion {
    pub fn matches(&self, building: &RawBuilding) -> bool {
        match (&self.value, self.attribute) {
            (Value::Text(needle), Attribute::LandUse) => building
                .land_use
                .as_ref()
                .is_some_and(|lu| lu.matches_text(needle)),
            (Value::Number(threshold), attribute) => {
                let Some(actual) = attribute.numeric_value(building) else {
                    return false;
                };
                match self.operator {
                    Operator::Greater => actual > *threshold,
                    Operator::Less => actual < *threshold,
                    Operator::Equal => (actual - threshold).abs() < 1e-6,
                }
            }
            (Value::Text(_), _) => false,
        }
    }
}
