use std::f64::consts::FRAC_PI_2;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Rough length of one degree of latitude, used only for the prefilter box.
const KM_PER_DEGREE: f64 = 111.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

impl Coord {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Anything the geo search can rank. Implementors must only hand out
/// coordinates that passed [`Coord::is_valid`].
pub trait Located {
    fn coord(&self) -> Coord;
}

/// Parse a `"lat, lon"` string. Anything other than exactly two finite,
/// in-range decimal numbers is rejected.
pub fn parse_coordinates(s: &str) -> Option<Coord> {
    let parts: Vec<&str> = s.trim().split(',').map(str::trim).collect();
    if parts.len() != 2 {
        return None;
    }
    let lat: f64 = parts[0].parse().ok()?;
    let lon: f64 = parts[1].parse().ok()?;
    let coord = Coord::new(lat, lon);
    coord.is_valid().then_some(coord)
}

/// Great-circle distance in kilometers.
pub fn haversine_km(a: Coord, b: Coord) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Coordinate-range prefilter around a search circle. Always a superset of
/// the circle, so it can reject entries before the exact distance is taken.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    center: Coord,
    lat_delta: f64,
    /// `None` when the circle reaches a pole and every longitude is in play.
    lon_delta: Option<f64>,
}

impl BoundingBox {
    pub fn around(center: Coord, radius_km: f64) -> Self {
        let lat_delta = radius_km / KM_PER_DEGREE;
        let angular = radius_km / EARTH_RADIUS_KM;
        let cos_lat = center.lat.to_radians().cos();

        let lon_delta = if center.lat.abs() + lat_delta >= 90.0 || angular >= FRAC_PI_2 {
            None
        } else {
            let sin_ratio = angular.sin() / cos_lat;
            if sin_ratio >= 1.0 {
                None
            } else {
                let approx = radius_km / (KM_PER_DEGREE * cos_lat);
                // The flat approximation undershoots the true cap width at high latitudes.
                let exact = sin_ratio.asin().to_degrees() + 1e-9;
                let delta = approx.max(exact);
                (delta < 180.0).then_some(delta)
            }
        };

        Self {
            center,
            lat_delta,
            lon_delta,
        }
    }

    pub fn contains(&self, p: Coord) -> bool {
        if (p.lat - self.center.lat).abs() > self.lat_delta {
            return false;
        }
        match self.lon_delta {
            None => true,
            Some(delta) => lon_diff(p.lon, self.center.lon).abs() <= delta,
        }
    }
}

/// Signed longitude difference wrapped into [-180, 180].
fn lon_diff(a: f64, b: f64) -> f64 {
    let d = (a - b) % 360.0;
    if d > 180.0 {
        d - 360.0
    } else if d < -180.0 {
        d + 360.0
    } else {
        d
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceResult<'a, T> {
    pub entry: &'a T,
    pub distance_km: f64,
}

/// Every entry within `radius_km` of `target`, nearest first. Equal
/// distances keep collection order.
pub fn find_within_radius<'a, T: Located>(
    target: Coord,
    entries: &'a [T],
    radius_km: f64,
) -> Vec<DistanceResult<'a, T>> {
    let bbox = BoundingBox::around(target, radius_km);
    let mut out: Vec<DistanceResult<'a, T>> = entries
        .iter()
        .filter(|e| bbox.contains(e.coord()))
        .filter_map(|entry| {
            let distance_km = haversine_km(target, entry.coord());
            (distance_km <= radius_km).then_some(DistanceResult { entry, distance_km })
        })
        .collect();
    out.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    out
}

/// The `top_n` nearest entries within `radius_km`.
pub fn find_nearest<'a, T: Located>(
    target: Coord,
    entries: &'a [T],
    radius_km: f64,
    top_n: usize,
) -> Vec<DistanceResult<'a, T>> {
    let mut out = find_within_radius(target, entries, radius_km);
    out.truncate(top_n);
    out
}

/// Presentation rounding to two decimals.
pub fn round_km(km: f64) -> f64 {
    (km * 100.0).round() / 100.0
}
