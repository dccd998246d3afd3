//! Solar position calculations.
//!
//! The elevation of the sun at an arbitrary instant drives elevation-based
//! scheduling; it is computed from the NOAA solar position equations (the
//! same series used by the NOAA solar calculator spreadsheet). Sunrise and
//! sunset times for status output come from the `sunrise` crate.

use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate, Utc};
use sunrise::{Coordinates, DawnType, SolarDay, SolarEvent};

const JULIAN_UNIX_EPOCH: f64 = 2440587.5;
const JULIAN_J2000: f64 = 2451545.0;
const SECONDS_PER_DAY: f64 = 86400.0;

/// Julian centuries since J2000.0 for a Unix timestamp in seconds.
fn julian_century(unix_seconds: f64) -> f64 {
    let julian_day = unix_seconds / SECONDS_PER_DAY + JULIAN_UNIX_EPOCH;
    (julian_day - JULIAN_J2000) / 36525.0
}

/// Geometric mean longitude of the sun, degrees in [0, 360).
fn sun_geom_mean_lon(t: f64) -> f64 {
    (280.46646 + t * (36000.76983 + t * 0.0003032)).rem_euclid(360.0)
}

/// Geometric mean anomaly of the sun, degrees.
fn sun_geom_mean_anomaly(t: f64) -> f64 {
    357.52911 + t * (35999.05029 - t * 0.0001537)
}

fn earth_orbit_eccentricity(t: f64) -> f64 {
    0.016708634 - t * (0.000042037 + t * 0.0000001267)
}

fn sun_equation_of_center(t: f64) -> f64 {
    let m = sun_geom_mean_anomaly(t).to_radians();
    m.sin() * (1.914602 - t * (0.004817 + 0.000014 * t))
        + (2.0 * m).sin() * (0.019993 - 0.000101 * t)
        + (3.0 * m).sin() * 0.000289
}

/// Apparent longitude of the sun, degrees.
fn sun_apparent_lon(t: f64) -> f64 {
    let true_lon = sun_geom_mean_lon(t) + sun_equation_of_center(t);
    let omega = (125.04 - 1934.136 * t).to_radians();
    true_lon - 0.00569 - 0.00478 * omega.sin()
}

/// Corrected obliquity of the ecliptic, degrees.
fn obliquity_corr(t: f64) -> f64 {
    let seconds = 21.448 - t * (46.815 + t * (0.00059 - t * 0.001813));
    let mean = 23.0 + (26.0 + seconds / 60.0) / 60.0;
    let omega = (125.04 - 1934.136 * t).to_radians();
    mean + 0.00256 * omega.cos()
}

/// Declination of the sun, radians.
fn sun_declination(t: f64) -> f64 {
    let e = obliquity_corr(t).to_radians();
    let lambda = sun_apparent_lon(t).to_radians();
    (e.sin() * lambda.sin()).asin()
}

/// Equation of time in minutes.
fn equation_of_time(t: f64) -> f64 {
    let epsilon = obliquity_corr(t).to_radians();
    let l0 = sun_geom_mean_lon(t).to_radians();
    let e = earth_orbit_eccentricity(t);
    let m = sun_geom_mean_anomaly(t).to_radians();
    let y = (epsilon / 2.0).tan().powi(2);

    let eq = y * (2.0 * l0).sin() - 2.0 * e * m.sin() + 4.0 * e * y * m.sin() * (2.0 * l0).cos()
        - 0.5 * y * y * (4.0 * l0).sin()
        - 1.25 * e * e * (2.0 * m).sin();
    4.0 * eq.to_degrees()
}

/// Angular elevation of the sun above the horizon in degrees.
///
/// No atmospheric refraction correction is applied.
///
/// # Arguments
/// * `time` - Instant to evaluate
/// * `latitude` - Degrees north, -90 to 90
/// * `longitude` - Degrees east, -180 to 180
pub fn solar_elevation(time: DateTime<Utc>, latitude: f64, longitude: f64) -> f64 {
    let unix_seconds = time.timestamp() as f64 + time.timestamp_subsec_millis() as f64 / 1000.0;
    let t = julian_century(unix_seconds);

    let utc_minutes = unix_seconds.rem_euclid(SECONDS_PER_DAY) / 60.0;
    let true_solar_minutes = (utc_minutes + equation_of_time(t) + 4.0 * longitude).rem_euclid(1440.0);
    let hour_angle = (true_solar_minutes / 4.0 - 180.0).to_radians();

    let lat = latitude.to_radians();
    let decl = sun_declination(t);
    let cos_zenith = lat.sin() * decl.sin() + lat.cos() * decl.cos() * hour_angle.cos();
    let zenith = cos_zenith.clamp(-1.0, 1.0).acos();

    90.0 - zenith.to_degrees()
}

/// Sunrise, sunset and civil dusk for a location on a given date, in local time.
pub struct SunTimes {
    pub sunrise: DateTime<Local>,
    pub sunset: DateTime<Local>,
    pub civil_dusk: DateTime<Local>,
}

/// Calculate the day's sun events with the `sunrise` crate.
pub fn sun_times(latitude: f64, longitude: f64, date: NaiveDate) -> Result<SunTimes> {
    let coord = Coordinates::new(latitude, longitude)
        .ok_or_else(|| anyhow::anyhow!("Invalid coordinates: {}, {}", latitude, longitude))?;
    let solar_day = SolarDay::new(coord, date);

    Ok(SunTimes {
        sunrise: solar_day.event_time(SolarEvent::Sunrise).with_timezone(&Local),
        sunset: solar_day.event_time(SolarEvent::Sunset).with_timezone(&Local),
        civil_dusk: solar_day
            .event_time(SolarEvent::Dusk(DawnType::Civil))
            .with_timezone(&Local),
    })
}
