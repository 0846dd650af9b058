pub mod locations;

pub use locations::{
    fingerprint_locations, normalize_locations, prepare_locations_for_submit, total_qty, AdjustmentLocations,
    LocationError, LocationInput, StockLocation,
};
