//! Responsive grid placement for dashboard charts.
//!
//! Charts are row-packed left to right on a 12-unit grid in the order the
//! backend returned them. `lg` and `md` share the packed layout; `sm` stacks
//! every chart full width, one below the other.

pub mod size_class;

use crate::models::ChartDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub use size_class::{classify, SizeClass};

pub const GRID_COLUMNS: u32 = 12;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Breakpoint {
    Lg,
    Md,
    Sm,
}

impl Breakpoint {
    pub const ALL: [Breakpoint; 3] = [Breakpoint::Lg, Breakpoint::Md, Breakpoint::Sm];

    /// Minimum container width in pixels for this tier.
    pub fn min_width(self) -> u32 {
        match self {
            Breakpoint::Lg => 1200,
            Breakpoint::Md => 996,
            Breakpoint::Sm => 0,
        }
    }

    pub fn for_width(px: u32) -> Self {
        Self::ALL
            .into_iter()
            .find(|bp| px >= bp.min_width())
            .unwrap_or(Breakpoint::Sm)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Breakpoint::Lg => "lg",
            Breakpoint::Md => "md",
            Breakpoint::Sm => "sm",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LayoutItem {
    pub key: String,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    pub min_w: u32,
    pub min_h: u32,
}

impl LayoutItem {
    pub fn overlaps(&self, other: &LayoutItem) -> bool {
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct LayoutSet {
    #[serde(default)]
    pub lg: Vec<LayoutItem>,
    #[serde(default)]
    pub md: Vec<LayoutItem>,
    #[serde(default)]
    pub sm: Vec<LayoutItem>,
}

impl LayoutSet {
    pub fn get(&self, bp: Breakpoint) -> &[LayoutItem] {
        match bp {
            Breakpoint::Lg => &self.lg,
            Breakpoint::Md => &self.md,
            Breakpoint::Sm => &self.sm,
        }
    }

    fn get_mut(&mut self, bp: Breakpoint) -> &mut Vec<LayoutItem> {
        match bp {
            Breakpoint::Lg => &mut self.lg,
            Breakpoint::Md => &mut self.md,
            Breakpoint::Sm => &mut self.sm,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lg.is_empty() && self.md.is_empty() && self.sm.is_empty()
    }

    /// Store positions reported by the host grid for one breakpoint.
    ///
    /// Reported items replace the stored item with the same key as-is. Items
    /// whose key is not in `live_keys` are dropped; live charts the host did
    /// not report keep their previous placement. Returns how many items were
    /// taken over.
    pub fn apply_change(
        &mut self,
        bp: Breakpoint,
        reported: Vec<LayoutItem>,
        live_keys: &HashSet<String>,
    ) -> usize {
        let items = self.get_mut(bp);
        let mut applied = 0;
        for item in reported {
            if !live_keys.contains(&item.key) {
                tracing::debug!(key = %item.key, breakpoint = bp.as_str(), "ignoring layout item for unknown chart");
                continue;
            }
            match items.iter_mut().find(|existing| existing.key == item.key) {
                Some(existing) => *existing = item,
                None => items.push(item),
            }
            applied += 1;
        }
        applied
    }
}

/// Pack `charts` into a layout for every breakpoint.
pub fn synthesize(charts: &[ChartDescriptor]) -> LayoutSet {
    let lg = pack(charts);
    let sm = stack(&lg);

    LayoutSet {
        md: lg.clone(),
        lg,
        sm,
    }
}

/// One full-width column, top to bottom in packing order.
fn stack(items: &[LayoutItem]) -> Vec<LayoutItem> {
    let mut y = 0;
    items
        .iter()
        .map(|item| {
            let stacked = LayoutItem {
                x: 0,
                y,
                w: GRID_COLUMNS,
                ..item.clone()
            };
            y += item.h;
            stacked
        })
        .collect()
}

fn pack(charts: &[ChartDescriptor]) -> Vec<LayoutItem> {
    let mut items = Vec::with_capacity(charts.len());
    let mut cur_x = 0;
    let mut cur_y = 0;
    // Tallest item in the current row; a wrap moves below all of it.
    let mut row_h = 0;

    for chart in charts {
        let size = classify(chart.chart_type);

        if cur_x + size.w > GRID_COLUMNS {
            cur_x = 0;
            cur_y += row_h;
            row_h = 0;
        }

        items.push(LayoutItem {
            key: chart.layout_key(),
            x: cur_x,
            y: cur_y,
            w: size.w,
            h: size.h,
            min_w: size.min_w,
            min_h: size.min_h,
        });

        row_h = row_h.max(size.h);
        cur_x += size.w;
        if cur_x >= GRID_COLUMNS {
            cur_x = 0;
            cur_y += row_h;
            row_h = 0;
        }
    }

    items
}
