//! Mileage calculation from GPS tracks and reimbursement amounts.
//!
//! The mobile client uploads the raw track it recorded during a trip. Fixes
//! with poor accuracy and sub-threshold hops (stationary jitter) are
//! discarded before the haversine distances are summed.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Cents;

/// Mean Earth radius in miles.
pub const EARTH_RADIUS_MILES: f64 = 3958.8;

/// Fixes reported with a worse horizontal accuracy are ignored.
pub const MAX_ACCURACY_METERS: f64 = 50.0;

/// Hops shorter than this are treated as jitter.
pub const MIN_SEGMENT_METERS: f64 = 10.0;

/// Upper bound for a single mileage entry.
pub const MAX_TRIP_MILES: f64 = 1_000.0;

const METERS_PER_MILE: f64 = 1609.344;

/// A single GPS fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy radius in meters, if the device reported one.
    #[serde(default)]
    pub accuracy_m: Option<f64>,
}

impl GpsPoint {
    fn validate(&self) -> Result<(), CoreError> {
        if !(-90.0..=90.0).contains(&self.latitude) || !(-180.0..=180.0).contains(&self.longitude)
        {
            return Err(CoreError::Validation(format!(
                "GPS coordinate ({}, {}) is out of range",
                self.latitude, self.longitude
            )));
        }
        Ok(())
    }

    fn is_accurate(&self) -> bool {
        self.accuracy_m.is_none_or(|a| a <= MAX_ACCURACY_METERS)
    }
}

/// Great-circle distance between two fixes, in miles.
pub fn haversine_miles(a: &GpsPoint, b: &GpsPoint) -> f64 {
    let (lat1, lat2) = (a.latitude.to_radians(), b.latitude.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_MILES * h.sqrt().asin()
}

/// Total distance of a recorded track, rounded to a tenth of a mile.
pub fn track_distance_miles(points: &[GpsPoint]) -> Result<f64, CoreError> {
    for p in points {
        p.validate()?;
    }

    let mut total = 0.0;
    let mut last: Option<&GpsPoint> = None;
    for p in points.iter().filter(|p| p.is_accurate()) {
        match last {
            None => last = Some(p),
            Some(prev) => {
                let hop = haversine_miles(prev, p);
                if hop * METERS_PER_MILE >= MIN_SEGMENT_METERS {
                    total += hop;
                    last = Some(p);
                }
            }
        }
    }

    Ok(round_tenth(total))
}

/// Round to one decimal place.
pub fn round_tenth(miles: f64) -> f64 {
    (miles * 10.0).round() / 10.0
}

/// Validate an explicitly entered mileage value.
pub fn validate_miles(miles: f64) -> Result<(), CoreError> {
    if !miles.is_finite() || miles <= 0.0 {
        return Err(CoreError::Validation(
            "Miles must be greater than zero".to_string(),
        ));
    }
    if miles > MAX_TRIP_MILES {
        return Err(CoreError::Validation(format!(
            "Miles must not exceed {MAX_TRIP_MILES}"
        )));
    }
    Ok(())
}

/// Reimbursement for `miles` at `rate_cents` per mile, rounded to the cent.
pub fn reimbursement_cents(miles: f64, rate_cents: Cents) -> Cents {
    (miles * rate_cents as f64).round() as Cents
}
