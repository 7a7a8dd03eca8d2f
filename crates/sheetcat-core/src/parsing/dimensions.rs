use crate::model::Dimensions;
use regex::{Captures, Regex};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::LazyLock;

const NUM: &str = r"(\d+(?:[.,]\d+)?)";

static UNIT_AFTER_DIGIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d)\s*(mm|cm|cent[ií]metros?|mts?|metros?|m)\b").expect("valid unit regex")
});
static UNIT_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(mm|cm|cent[ií]metros?|mts|metros?)\b").expect("valid unit word regex")
});
static FULL_TRIPLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^\s*{NUM}\s*x\s*{NUM}(?:\s*x\s*{NUM})?\s*$")).expect("valid triple regex")
});
static SHORT_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\b([lap])\s*[:=]?\s*{NUM}")).expect("valid short label regex")
});
static LONG_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\b(largura|altura|profundidade|comprimento|width|height|depth|length|larg|alt|prof|comp)\.?\s*[:=]?\s*{NUM}"
    ))
    .expect("valid long label regex")
});
static ANNOTATED_TRIPLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\(?\s*{NUM}\s*x\s*{NUM}(?:\s*x\s*{NUM})?\s*\)?")).expect("valid annotated regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Millimetres,
    Centimetres,
    Metres,
}

#[derive(Debug, Clone, Copy)]
enum Axis {
    Width,
    Height,
    Depth,
}

/// Parse a dimension label into width/height/depth in centimetres.
///
/// Pattern families, first match wins:
/// 1. `120x75x40cm`, `1,20 x 0,75 x 0,40` (the whole string)
/// 2. `L: 120 A: 75 P: 40`
/// 3. `Largura 120 Altura 75 Profundidade 40`
/// 4. `Mesa (120 x 75 x 40)` (anywhere in the text)
///
/// Without an explicit unit, a value below 10 or written with a decimal
/// separator is read as metres.
pub fn parse_dimensions(s: &str) -> Option<Dimensions> {
    let label = s.trim();
    if label.is_empty() {
        return None;
    }

    let lower = label.to_lowercase().replace(['×', '*'], "x");
    let unit = detect_unit(&lower);
    let stripped = UNIT_AFTER_DIGIT.replace_all(&lower, "$1 ");
    let normalized = UNIT_WORD.replace_all(&stripped, " ").to_string();

    let axes = match_full_triple(&normalized)
        .or_else(|| match_labels(&SHORT_LABEL, &normalized, 2, short_axis))
        .or_else(|| match_labels(&LONG_LABEL, &normalized, 1, long_axis))
        .or_else(|| match_annotated(&normalized))?;

    let mut dims = Dimensions {
        width: None,
        height: None,
        depth: None,
        label: label.to_string(),
    };
    for (axis, token) in axes {
        let Some(value) = to_centimetres(token, unit) else {
            continue;
        };
        let slot = match axis {
            Axis::Width => &mut dims.width,
            Axis::Height => &mut dims.height,
            Axis::Depth => &mut dims.depth,
        };
        if slot.is_none() {
            *slot = Some(value);
        }
    }

    if dims.width.is_none() && dims.height.is_none() && dims.depth.is_none() {
        return None;
    }
    Some(dims)
}

fn detect_unit(lower: &str) -> Option<Unit> {
    let token = UNIT_AFTER_DIGIT
        .captures(lower)
        .and_then(|c| c.get(2))
        .or_else(|| UNIT_WORD.captures(lower).and_then(|c| c.get(1)))?
        .as_str();
    Some(match token {
        "mm" => Unit::Millimetres,
        t if t == "cm" || t.starts_with("cent") => Unit::Centimetres,
        _ => Unit::Metres,
    })
}

fn positional(caps: &Captures<'_>) -> Vec<(Axis, String)> {
    [Axis::Width, Axis::Height, Axis::Depth]
        .into_iter()
        .zip(1..=3)
        .filter_map(|(axis, i)| caps.get(i).map(|m| (axis, m.as_str().to_string())))
        .collect()
}

fn match_full_triple(s: &str) -> Option<Vec<(Axis, String)>> {
    FULL_TRIPLE.captures(s).map(|c| positional(&c))
}

fn match_annotated(s: &str) -> Option<Vec<(Axis, String)>> {
    ANNOTATED_TRIPLE.captures(s).map(|c| positional(&c))
}

fn match_labels(
    re: &Regex,
    s: &str,
    min_labels: usize,
    axis_of: fn(&str) -> Option<Axis>,
) -> Option<Vec<(Axis, String)>> {
    let found: Vec<(Axis, String)> = re
        .captures_iter(s)
        .filter_map(|c| Some((axis_of(c.get(1)?.as_str())?, c.get(2)?.as_str().to_string())))
        .collect();
    if found.len() >= min_labels {
        Some(found)
    } else {
        None
    }
}

fn short_axis(label: &str) -> Option<Axis> {
    match label {
        "l" => Some(Axis::Width),
        "a" => Some(Axis::Height),
        "p" => Some(Axis::Depth),
        _ => None,
    }
}

fn long_axis(label: &str) -> Option<Axis> {
    match label {
        "largura" | "larg" | "width" | "comprimento" | "comp" | "length" => Some(Axis::Width),
        "altura" | "alt" | "height" => Some(Axis::Height),
        "profundidade" | "prof" | "depth" => Some(Axis::Depth),
        _ => None,
    }
}

fn to_centimetres(token: String, unit: Option<Unit>) -> Option<Decimal> {
    let has_separator = token.contains([',', '.']);
    let value = Decimal::from_str(&token.replace(',', ".")).ok()?;
    let cm = match unit {
        Some(Unit::Millimetres) => value / Decimal::TEN,
        Some(Unit::Centimetres) => value,
        Some(Unit::Metres) => value.checked_mul(Decimal::ONE_HUNDRED)?,
        None if value < Decimal::TEN || has_separator => value.checked_mul(Decimal::ONE_HUNDRED)?,
        None => value,
    };
    Some(cm.normalize())
}
