use serde_json::{json, Map, Value};

pub const PALETTE: [&str; 12] = [
    "#6366f1", "#f43f5e", "#06b6d4", "#10b981", "#f97316", "#8b5cf6", "#ec4899", "#14b8a6",
    "#e11d48", "#0ea5e9", "#a855f7", "#22c55e",
];

const TEXT_COLOR: &str = "#1f2937";
const MUTED_COLOR: &str = "#6b7280";
const GRID_COLOR: &str = "#e5e7eb";
const FONT_FAMILY: &str = "Inter, system-ui, sans-serif";

fn title_style() -> Value {
    json!({
        "left": "center",
        "textStyle": {"fontSize": 14, "fontWeight": 600, "color": TEXT_COLOR}
    })
}

fn axis_style() -> Value {
    json!({
        "axisLine": {"lineStyle": {"color": GRID_COLOR}},
        "axisLabel": {"color": MUTED_COLOR, "fontSize": 11},
        "splitLine": {"lineStyle": {"color": GRID_COLOR, "type": "dashed"}}
    })
}

fn tooltip_style() -> Value {
    json!({
        "backgroundColor": "rgba(255, 255, 255, 0.96)",
        "borderColor": GRID_COLOR,
        "textStyle": {"color": TEXT_COLOR, "fontSize": 12}
    })
}

/// Layer the dashboard theme over a chart's own options.
///
/// Returns a new value; `config` is not modified. Style keys from the theme
/// win, content keys (title text, axis data, series) are kept. A palette is
/// only supplied when the chart has none.
pub fn apply_theme(config: &Value) -> Value {
    let mut themed = match config {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };

    if themed.contains_key("title") {
        overlay_key(&mut themed, "title", &title_style());
    }
    for axis in ["xAxis", "yAxis"] {
        if themed.contains_key(axis) {
            overlay_key(&mut themed, axis, &axis_style());
        }
    }
    overlay_key(&mut themed, "tooltip", &tooltip_style());
    if themed.contains_key("legend") {
        overlay_key(
            &mut themed,
            "legend",
            &json!({"textStyle": {"color": MUTED_COLOR, "fontSize": 11}}),
        );
    }

    themed
        .entry("color")
        .or_insert_with(|| json!(PALETTE));
    overlay_key(
        &mut themed,
        "textStyle",
        &json!({"fontFamily": FONT_FAMILY}),
    );

    Value::Object(themed)
}

/// Merge `style` into `map[key]`; arrays get the style on every element.
fn overlay_key(map: &mut Map<String, Value>, key: &str, style: &Value) {
    let slot = map
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    match slot {
        Value::Array(items) => {
            for item in items.iter_mut() {
                merge(item, style);
            }
        }
        other => merge(other, style),
    }
}

fn merge(target: &mut Value, style: &Value) {
    match (target, style) {
        (Value::Object(target_map), Value::Object(style_map)) => {
            for (k, v) in style_map {
                match target_map.get_mut(k) {
                    Some(existing) if existing.is_object() && v.is_object() => merge(existing, v),
                    _ => {
                        target_map.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (target, style) => *target = style.clone(),
    }
}
