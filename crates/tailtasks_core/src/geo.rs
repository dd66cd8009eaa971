//! Geolocation: last known device fix and distance helpers.
//!
//! # Responsibility
//! - Hold the latest coordinates reported by the platform location provider.
//! - Compute great-circle distances and their display strings.
//!
//! # Invariants
//! - Coordinates are unavailable until the service is attached and a fix is
//!   reported; detaching clears them.
//! - `calculate_distance` and `format_distance` are pure.

use chrono::DateTime;
use log::info;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

/// Mean earth radius in meters (IUGG).
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

const METERS_PER_KILOMETER: f32 = 1000.0;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// True when both components are finite and within WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Distance to `other` in meters.
    pub fn distance_to(&self, other: &Coordinates) -> f32 {
        calculate_distance(
            self.latitude,
            self.longitude,
            other.latitude,
            other.longitude,
        )
    }
}

/// Source of the device's last known position.
pub trait LocationProvider: Send + Sync {
    /// Last reported fix, `None` while location is unavailable.
    fn last_known(&self) -> Option<Coordinates>;

    /// True iff a fix is present and within valid coordinate ranges.
    fn valid(&self) -> bool {
        self.last_known().is_some_and(|fix| fix.is_valid())
    }
}

/// Location state fed by the platform's permission/fix callbacks.
///
/// Created once at app start and shared with view-models that need distances.
#[derive(Debug)]
pub struct GeoLocationService {
    attached: AtomicBool,
    fix: watch::Sender<Option<Coordinates>>,
}

impl Default for GeoLocationService {
    fn default() -> Self {
        Self::new()
    }
}

impl GeoLocationService {
    pub fn new() -> Self {
        let (fix, _) = watch::channel(None);
        Self {
            attached: AtomicBool::new(false),
            fix,
        }
    }

    /// Starts accepting fixes (app start, location permission granted).
    pub fn attach(&self) {
        self.attached.store(true, Ordering::SeqCst);
        info!("event=location_attach module=geo status=ok");
    }

    /// Stops accepting fixes and forgets the last one (app teardown).
    pub fn detach(&self) {
        self.attached.store(false, Ordering::SeqCst);
        self.fix.send_replace(None);
        info!("event=location_detach module=geo status=ok");
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    /// Records a new fix. Ignored while detached.
    ///
    /// Returns whether the fix was accepted.
    pub fn update_fix(&self, latitude: f64, longitude: f64) -> bool {
        if !self.is_attached() {
            return false;
        }
        self.fix
            .send_replace(Some(Coordinates::new(latitude, longitude)));
        true
    }

    /// Forgets the current fix, e.g. after permission is revoked.
    pub fn clear_fix(&self) {
        self.fix.send_replace(None);
    }

    pub fn latitude(&self) -> Option<f64> {
        self.last_known().map(|fix| fix.latitude)
    }

    pub fn longitude(&self) -> Option<f64> {
        self.last_known().map(|fix| fix.longitude)
    }
}

impl LocationProvider for GeoLocationService {
    fn last_known(&self) -> Option<Coordinates> {
        *self.fix.borrow()
    }
}

/// Great-circle (haversine) distance in meters between two coordinates.
pub fn calculate_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f32 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_phi = (lat2 - lat1).to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).max(0.0).sqrt());

    (EARTH_RADIUS_METERS * c) as f32
}

/// Display string for a distance: whole meters below 1 km, otherwise
/// kilometers with two decimals.
pub fn format_distance(distance: f32) -> String {
    if distance < METERS_PER_KILOMETER {
        // Truncates toward zero.
        format!("{} meters", distance as i64)
    } else {
        format!("{:.2} kilometers", distance / METERS_PER_KILOMETER)
    }
}

/// Formats a Unix epoch milliseconds instant as `yyyy-MM-dd` (UTC).
///
/// Returns `None` for instants chrono cannot represent.
pub fn format_date(epoch_ms: i64) -> Option<String> {
    DateTime::from_timestamp_millis(epoch_ms).map(|instant| instant.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::{
        calculate_distance, format_date, format_distance, Coordinates, GeoLocationService,
        LocationProvider,
    };

    #[test]
    fn distance_between_identical_points_is_zero() {
        assert_eq!(calculate_distance(51.5007, -0.1246, 51.5007, -0.1246), 0.0);
        assert_eq!(calculate_distance(-33.86, 151.21, -33.86, 151.21), 0.0);
    }

    #[test]
    fn distance_matches_known_city_pair() {
        // London (Big Ben) to Paris (Eiffel Tower) is about 340.6 km.
        let meters = calculate_distance(51.5007, -0.1246, 48.8584, 2.2945);
        assert!((meters - 340_600.0).abs() < 1_500.0, "got {meters}");
    }

    #[test]
    fn distance_is_symmetric() {
        let forward = calculate_distance(40.7128, -74.0060, 34.0522, -118.2437);
        let backward = calculate_distance(34.0522, -118.2437, 40.7128, -74.0060);
        assert_eq!(forward, backward);
    }

    #[test]
    fn format_distance_switches_units_at_one_kilometer() {
        assert_eq!(format_distance(999.0), "999 meters");
        assert_eq!(format_distance(999.9), "999 meters");
        assert_eq!(format_distance(0.0), "0 meters");
        assert_eq!(format_distance(1000.0), "1.00 kilometers");
        assert_eq!(format_distance(1500.0), "1.50 kilometers");
        assert_eq!(format_distance(12_345.0), "12.35 kilometers");
    }

    #[test]
    fn format_date_uses_iso_day() {
        assert_eq!(format_date(0).as_deref(), Some("1970-01-01"));
        assert_eq!(format_date(1_700_000_000_000).as_deref(), Some("2023-11-14"));
    }

    #[test]
    fn service_reports_fix_only_while_attached() {
        let service = GeoLocationService::new();
        assert!(!service.update_fix(10.0, 20.0));
        assert!(!service.valid());
        assert_eq!(service.latitude(), None);

        service.attach();
        assert!(service.update_fix(10.0, 20.0));
        assert!(service.valid());
        assert_eq!(service.latitude(), Some(10.0));
        assert_eq!(service.longitude(), Some(20.0));

        service.detach();
        assert_eq!(service.last_known(), None);
        assert!(!service.valid());
    }

    #[test]
    fn out_of_range_fix_is_not_valid() {
        let service = GeoLocationService::new();
        service.attach();
        service.update_fix(95.0, 20.0);
        assert!(!service.valid());
        assert!(!Coordinates::new(10.0, 181.0).is_valid());
        assert!(!Coordinates::new(f64::NAN, 0.0).is_valid());
    }
}
