use crate::error::SheetcatError;
use crate::model::{ColumnId, RawRow, Role};
use crate::parsing::shapes::matches_shape;
use crate::rules::Rules;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

/// Keyword hit inside the header zone.
const HEADER_HIT_POINTS: u32 = 1000;
/// Keyword hit found deeper in the data.
const DEEP_HIT_POINTS: u32 = 300;
/// Points for a column whose every value matches the role's shape.
const FULL_SHAPE_POINTS: u32 = 600;

/// Which column plays which role on one sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRoleMap {
    roles: BTreeMap<Role, ColumnId>,
    /// Sheet row (1-based) recognised as the header, if any.
    header_row: Option<u32>,
}

impl ColumnRoleMap {
    pub fn get(&self, role: Role) -> Option<ColumnId> {
        self.roles.get(&role).copied()
    }

    pub fn header_row(&self) -> Option<u32> {
        self.header_row
    }

    pub fn iter(&self) -> impl Iterator<Item = (Role, ColumnId)> + '_ {
        self.roles.iter().map(|(r, c)| (*r, *c))
    }

    /// Build a map by hand; a column already taken by an earlier entry is ignored.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Role, u32)>) -> Self {
        let mut map = ColumnRoleMap::default();
        for (role, column) in pairs {
            map.assign(role, ColumnId(column));
        }
        map
    }

    fn is_claimed(&self, column: ColumnId) -> bool {
        self.roles.values().any(|c| *c == column)
    }

    fn assign(&mut self, role: Role, column: ColumnId) -> bool {
        if self.roles.contains_key(&role) || self.is_claimed(column) {
            return false;
        }
        self.roles.insert(role, column);
        true
    }
}

#[derive(Debug, Default)]
struct ColumnScores {
    non_empty: usize,
    /// Non-empty values that are not header/structural words.
    data_values: usize,
    points: BTreeMap<Role, u32>,
}

impl ColumnScores {
    fn points(&self, role: Role) -> u32 {
        self.points.get(&role).copied().unwrap_or(0)
    }
}

/// Assign columns to roles from the first rows of a sheet.
///
/// Each column gets a score per role from keyword hits (weighted higher in
/// the first `header_zone` rows) and from how many of its values have the
/// role's shape. Roles are then filled in priority order, each taking the
/// best unclaimed column. Name and code fall back to known positions; the
/// sheet fails only when neither can be placed.
pub fn infer_roles(
    sheet: &str,
    sample: &[RawRow],
    rules: &Rules,
    header_zone: usize,
) -> Result<ColumnRoleMap, SheetcatError> {
    let header_index = find_header_index(sample, rules, header_zone);
    let scores = score_columns(sample, rules, header_zone, header_index);

    let mut map = ColumnRoleMap {
        roles: BTreeMap::new(),
        header_row: header_index.map(|i| sample[i].row),
    };

    for role in Role::PRIORITY {
        let best = scores
            .iter()
            .filter(|(column, s)| !map.is_claimed(**column) && s.points(role) > 0)
            .max_by_key(|(column, s)| (s.points(role), s.non_empty, Reverse(**column)));
        if let Some((column, s)) = best {
            tracing::debug!("{sheet}: {role} -> {column} ({} points)", s.points(role));
            map.assign(role, *column);
        }
    }

    let fallbacks = &rules.table().positional_fallbacks;
    for (role, positions) in [(Role::Name, &fallbacks.name), (Role::Code, &fallbacks.code)] {
        if map.get(role).is_some() {
            continue;
        }
        let fallback = positions.iter().map(|p| ColumnId(*p)).find(|column| {
            !map.is_claimed(*column)
                && scores.get(column).map(|s| s.data_values > 0).unwrap_or(false)
        });
        if let Some(column) = fallback {
            tracing::debug!("{sheet}: {role} -> {column} (positional fallback)");
            map.assign(role, column);
        }
    }

    if map.get(Role::Name).is_none() && map.get(Role::Code).is_none() {
        return Err(SheetcatError::RolesUndetectable {
            sheet: sheet.to_string(),
        });
    }

    Ok(map)
}

/// Index of the sample row with the most keyword cells inside the header
/// zone; at least two hits are required.
fn find_header_index(sample: &[RawRow], rules: &Rules, header_zone: usize) -> Option<usize> {
    sample
        .iter()
        .take(header_zone)
        .enumerate()
        .map(|(i, row)| {
            let hits = row
                .cells
                .values()
                .filter(|v| !rules.roles_for_keyword(&v.as_text()).is_empty())
                .count();
            (i, hits)
        })
        .filter(|(_, hits)| *hits >= 2)
        .max_by_key(|(i, hits)| (*hits, Reverse(*i)))
        .map(|(i, _)| i)
}

fn score_columns(
    sample: &[RawRow],
    rules: &Rules,
    header_zone: usize,
    header_index: Option<usize>,
) -> BTreeMap<ColumnId, ColumnScores> {
    let columns: BTreeSet<ColumnId> = sample.iter().flat_map(|r| r.cells.keys().copied()).collect();
    let mut scores: BTreeMap<ColumnId, ColumnScores> = BTreeMap::new();

    for column in columns {
        let mut s = ColumnScores::default();
        let mut shape_hits: BTreeMap<Role, usize> = BTreeMap::new();

        for (i, row) in sample.iter().enumerate() {
            let Some(cell) = row.get(column) else {
                continue;
            };
            s.non_empty += 1;
            let text = cell.as_text();

            let weight = if i < header_zone {
                HEADER_HIT_POINTS
            } else {
                DEEP_HIT_POINTS
            };
            for role in rules.roles_for_keyword(&text) {
                let entry = s.points.entry(*role).or_insert(0);
                *entry = (*entry).max(weight);
            }

            let in_header = header_index.map(|h| i <= h).unwrap_or(false);
            if in_header || rules.is_header_like(&text) {
                continue;
            }
            s.data_values += 1;
            for role in Role::PRIORITY {
                if matches_shape(role, cell) {
                    *shape_hits.entry(role).or_insert(0) += 1;
                }
            }
        }

        // A header keyword declares the column: shape-only roles are dropped.
        let declared = s.points.values().any(|p| *p >= HEADER_HIT_POINTS);
        if s.data_values > 0 {
            for (role, hits) in shape_hits {
                if declared && !s.points.contains_key(&role) {
                    continue;
                }
                let shape_points = FULL_SHAPE_POINTS * hits as u32 / s.data_values as u32;
                *s.points.entry(role).or_insert(0) += shape_points;
            }
        }
        scores.insert(column, s);
    }

    scores
}
