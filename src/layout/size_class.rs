use crate::models::ChartType;

pub const MIN_W: u32 = 3;
pub const MIN_H: u32 = 3;

/// Footprint of one widget on the 12-unit grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeClass {
    pub w: u32,
    pub h: u32,
    pub min_w: u32,
    pub min_h: u32,
}

impl SizeClass {
    const fn new(w: u32, h: u32) -> Self {
        Self {
            w,
            h,
            min_w: MIN_W,
            min_h: MIN_H,
        }
    }
}

pub fn classify(chart_type: ChartType) -> SizeClass {
    match chart_type {
        ChartType::Pie | ChartType::Gauge | ChartType::Funnel => SizeClass::new(4, 5),
        ChartType::Heatmap | ChartType::Radar | ChartType::Boxplot => SizeClass::new(6, 6),
        ChartType::Histogram => SizeClass::new(6, 5),
        ChartType::Forecast => SizeClass::new(8, 6),
        ChartType::Treemap
        | ChartType::Scatter
        | ChartType::Bar
        | ChartType::Line
        | ChartType::Area
        | ChartType::Other => SizeClass::new(6, 5),
    }
}
