//! Parameter dimensions: raw range specs and their validated form.

use serde::{de, Deserialize, Deserializer, Serialize};

use crate::errors::{DimensionError, RangeField};
use crate::precision::{decimal_places, round_to};

/// Fallback increment used when sweeping a pinned (zero-step) dimension.
pub const PINNED_SWEEP_STEP: f64 = 0.1;

/// A range as entered by the user. Fields may be JSON strings or numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeSpec {
    #[serde(deserialize_with = "text_or_number")]
    pub start: String,
    #[serde(deserialize_with = "text_or_number")]
    pub end: String,
    #[serde(deserialize_with = "text_or_number", alias = "stepSize", alias = "step_size")]
    pub step: String,
}

impl RangeSpec {
    pub fn new(start: impl ToString, end: impl ToString, step: impl ToString) -> Self {
        Self {
            start: start.to_string(),
            end: end.to_string(),
            step: step.to_string(),
        }
    }
}

fn text_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "expected a number or numeric string, got {other}"
        ))),
    }
}

/// One tunable parameter's bounded, stepped range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub start: f64,
    pub end: f64,
    /// Zero pins the dimension to `start`.
    pub step: f64,
    pub decimal_places: u32,
}

impl Dimension {
    /// Build a dimension from already-numeric bounds.
    pub fn new(start: f64, end: f64, step: f64) -> Self {
        Self {
            start,
            end,
            step,
            decimal_places: decimal_places(step),
        }
    }

    /// Parse and validate the raw spec at position `index`.
    pub fn parse(index: usize, spec: &RangeSpec) -> Result<Self, DimensionError> {
        let start = parse_field(index, RangeField::Start, &spec.start)?;
        let end = parse_field(index, RangeField::End, &spec.end)?;
        let step = parse_field(index, RangeField::Step, &spec.step)?;

        if step < 0.0 {
            return Err(DimensionError::NegativeStep { index, step });
        }
        if start > end {
            return Err(DimensionError::InvertedRange { index, start, end });
        }
        Ok(Self::new(start, end, step))
    }

    /// Stricter check used by grid-stepped strategies: a positive step needs
    /// a non-empty span.
    pub fn require_stepped_span(&self, index: usize) -> Result<(), DimensionError> {
        if self.step > 0.0 && self.start >= self.end {
            return Err(DimensionError::EmptySteppedRange {
                index,
                start: self.start,
                end: self.end,
                step: self.step,
            });
        }
        Ok(())
    }

    pub fn span(&self) -> f64 {
        self.end - self.start
    }

    pub fn is_pinned(&self) -> bool {
        self.step == 0.0
    }

    /// Number of grid points, `round((end - start) / step, 2) + 1`, or 1 when
    /// pinned.
    pub fn combinations(&self) -> f64 {
        if self.step > 0.0 {
            round_to(self.span() / self.step, 2) + 1.0
        } else {
            1.0
        }
    }

    /// Increment used when sweeping this dimension.
    pub fn sweep_step(&self) -> f64 {
        if self.is_pinned() {
            PINNED_SWEEP_STEP
        } else {
            self.step
        }
    }

    /// Round to this dimension's precision.
    pub fn round(&self, value: f64) -> f64 {
        round_to(value, self.decimal_places)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.start && value <= self.end
    }

    /// Map a unit-interval draw onto the range, rounded to precision. Bounds
    /// off the step grid win over rounding.
    pub fn scale_unit(&self, unit: f64) -> f64 {
        self.round(self.start + unit * self.span())
            .clamp(self.start, self.end)
    }
}

fn parse_field(index: usize, field: RangeField, raw: &str) -> Result<f64, DimensionError> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| DimensionError::NotANumber {
            index,
            field,
            raw: raw.to_string(),
        })?;
    if !value.is_finite() {
        return Err(DimensionError::NonFinite { index, field });
    }
    Ok(value)
}

/// Parse every spec in order. An empty list is rejected.
pub fn parse_dimensions(specs: &[RangeSpec]) -> Result<Vec<Dimension>, DimensionError> {
    if specs.is_empty() {
        return Err(DimensionError::Empty);
    }
    specs
        .iter()
        .enumerate()
        .map(|(index, spec)| Dimension::parse(index, spec))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numeric_text() {
        let dim = Dimension::parse(0, &RangeSpec::new("1", "3.5", "0.25")).unwrap();
        assert_eq!(dim.start, 1.0);
        assert_eq!(dim.end, 3.5);
        assert_eq!(dim.step, 0.25);
        assert_eq!(dim.decimal_places, 2);
    }

    #[test]
    fn trailing_zeros_do_not_add_places() {
        let dim = Dimension::parse(0, &RangeSpec::new("0", "1", "0.50")).unwrap();
        assert_eq!(dim.decimal_places, 1);
    }

    #[test]
    fn rejects_garbage() {
        let err = Dimension::parse(1, &RangeSpec::new("0", "ten", "1")).unwrap_err();
        assert_eq!(
            err,
            DimensionError::NotANumber {
                index: 1,
                field: RangeField::End,
                raw: "ten".into()
            }
        );
        assert!(matches!(
            Dimension::parse(0, &RangeSpec::new("inf", "1", "1")),
            Err(DimensionError::NonFinite { .. })
        ));
    }

    #[test]
    fn rejects_inverted_and_negative() {
        assert!(matches!(
            Dimension::parse(0, &RangeSpec::new(5, 1, 1)),
            Err(DimensionError::InvertedRange { .. })
        ));
        assert!(matches!(
            Dimension::parse(0, &RangeSpec::new(0, 1, -1)),
            Err(DimensionError::NegativeStep { .. })
        ));
    }

    #[test]
    fn stepped_span_check() {
        let degenerate = Dimension::new(5.0, 5.0, 1.0);
        assert!(degenerate.require_stepped_span(0).is_err());
        let pinned = Dimension::new(5.0, 5.0, 0.0);
        assert!(pinned.require_stepped_span(0).is_ok());
    }

    #[test]
    fn combination_counts() {
        assert_eq!(Dimension::new(0.0, 2.0, 1.0).combinations(), 3.0);
        assert_eq!(Dimension::new(0.0, 1.0, 0.1).combinations(), 11.0);
        assert_eq!(Dimension::new(5.0, 5.0, 0.0).combinations(), 1.0);
        assert_eq!(Dimension::new(0.0, 10.0, 0.0).combinations(), 1.0);
    }

    #[test]
    fn empty_spec_list_is_rejected() {
        assert_eq!(parse_dimensions(&[]), Err(DimensionError::Empty));
    }

    #[test]
    fn deserializes_numbers_and_strings() {
        let json = r#"[{"start": 1, "end": "4", "stepSize": 0.5}, {"start": "0", "end": 2, "step": "1"}]"#;
        let specs: Vec<RangeSpec> = serde_json::from_str(json).unwrap();
        let dims = parse_dimensions(&specs).unwrap();
        assert_eq!(dims.len(), 2);
        assert_eq!(dims[0].decimal_places, 1);
        assert_eq!(dims[1].end, 2.0);
    }

    #[test]
    fn scale_unit_stays_in_range() {
        let dim = Dimension::new(-1.0, 1.0, 0.01);
        assert_eq!(dim.scale_unit(0.0), -1.0);
        assert_eq!(dim.scale_unit(1.0), 1.0);
        assert_eq!(dim.scale_unit(0.123_456), -0.75);
    }

    #[test]
    fn scale_unit_clamps_off_grid_bounds() {
        let dim = Dimension::new(0.4, 2.5, 1.0);
        assert_eq!(dim.scale_unit(0.0), 0.4);
        assert_eq!(dim.scale_unit(0.01), 0.4);
        assert_eq!(dim.scale_unit(0.5), 1.0);
        assert_eq!(dim.scale_unit(1.0), 2.5);
        for step in 0..=1000 {
            let value = dim.scale_unit(step as f64 / 1000.0);
            assert!(dim.contains(value), "{value} outside {dim:?}");
        }
    }
}
