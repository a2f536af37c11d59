//! Display helpers. Every formatter renders None as "N/A" so a report never
//! shows a fabricated zero.

pub fn currency(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("${:.2}", v),
        None => "N/A".to_string(),
    }
}

pub fn ratio(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "N/A".to_string(),
    }
}

/// Decimal fraction rendered as a percentage (0.15 -> "15.00%").
pub fn percent(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}%", v * 100.0),
        None => "N/A".to_string(),
    }
}

/// Value already expressed in percent points (42.5 -> "42.50%").
pub fn percent_points(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}%", v),
        None => "N/A".to_string(),
    }
}

/// Unitless count abbreviated with B/M/K suffixes, for share volumes.
pub fn quantity(value: Option<f64>) -> String {
    let v = match value {
        Some(v) => v,
        None => return "N/A".to_string(),
    };
    let abs = v.abs();
    if abs >= 1e9 {
        format!("{:.2}B", v / 1e9)
    } else if abs >= 1e6 {
        format!("{:.2}M", v / 1e6)
    } else if abs >= 1e3 {
        format!("{:.2}K", v / 1e3)
    } else {
        format!("{:.0}", v)
    }
}

/// Abbreviate with T/B/M/K suffixes for large magnitudes.
pub fn large_number(value: Option<f64>) -> String {
    let v = match value {
        Some(v) => v,
        None => return "N/A".to_string(),
    };
    let abs = v.abs();
    if abs >= 1e12 {
        format!("${:.2}T", v / 1e12)
    } else if abs >= 1e9 {
        format!("${:.2}B", v / 1e9)
    } else if abs >= 1e6 {
        format!("${:.2}M", v / 1e6)
    } else if abs >= 1e3 {
        format!("${:.2}K", v / 1e3)
    } else {
        format!("${:.2}", v)
    }
}
