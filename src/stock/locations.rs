use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("Multi-location mode requires at least one location with a name. Add a location or turn off multi-location mode.")]
    NoLocations,
    #[error("Total quantity is out of range")]
    QtyOverflow,
}

/// Location row as the form submits it. Numbers may arrive as strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationInput {
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub qty: Option<Value>,
    #[serde(default)]
    pub pos: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLocation {
    pub location: String,
    pub qty: i64,
    pub pos: i64,
}

/// Multi-location part of a stock adjustment submission.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdjustmentLocations {
    #[serde(default)]
    pub locations: Vec<LocationInput>,
    /// Aggregate location used when `locations` is empty.
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub qty: Option<Value>,
}

fn finite(value: Option<&Value>) -> Option<i64> {
    let f = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    f.is_finite().then(|| f.round() as i64)
}

/// Drop unnamed entries, default bad `qty` to 0 and bad `pos` to the entry's
/// index, then order by `pos` and `location`.
pub fn normalize_locations(list: &[LocationInput]) -> Vec<StockLocation> {
    let mut out: Vec<StockLocation> = list
        .iter()
        .enumerate()
        .filter_map(|(index, input)| {
            let location = input.location.as_deref().map(str::trim).filter(|l| !l.is_empty())?;
            Some(StockLocation {
                location: location.to_string(),
                qty: finite(input.qty.as_ref()).unwrap_or(0),
                pos: finite(input.pos.as_ref()).unwrap_or(index as i64),
            })
        })
        .collect();
    out.sort_by(|a, b| a.pos.cmp(&b.pos).then_with(|| a.location.cmp(&b.location)));
    out
}

/// Order-independent sha256 of the normalised `location:qty` entries.
pub fn fingerprint_locations(list: &[LocationInput]) -> String {
    let mut entries: Vec<(String, i64)> = normalize_locations(list).into_iter().map(|l| (l.location, l.qty)).collect();
    entries.sort();
    let canonical = entries.iter().map(|(l, q)| format!("{}:{}", l, q)).collect::<Vec<_>>().join("|");
    hex(&Sha256::digest(canonical.as_bytes()))
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Locations ready to insert, with `pos` renumbered from 0.
pub fn prepare_locations_for_submit(input: &AdjustmentLocations) -> Result<Vec<StockLocation>, LocationError> {
    let mut list = input.locations.clone();
    if list.is_empty() {
        list.push(LocationInput { location: input.location.clone(), qty: input.qty.clone(), pos: Some(Value::from(0)) });
    }
    let mut locations = normalize_locations(&list);
    if locations.is_empty() {
        return Err(LocationError::NoLocations);
    }
    for (i, loc) in locations.iter_mut().enumerate() {
        loc.pos = i as i64;
    }
    Ok(locations)
}

pub fn total_qty(locations: &[StockLocation]) -> Result<i64, LocationError> {
    locations
        .iter()
        .try_fold(0i64, |total, l| total.checked_add(l.qty))
        .ok_or(LocationError::QtyOverflow)
}
