//! Lookup operations shared by the HTTP handlers and the one-shot CLI
//! commands. Every response carries a `status` field.

use serde::Serialize;

use crate::dataset::hospitals::{HospitalDirectory, HospitalEntry};
use crate::dataset::medicines::MedicineCatalog;
use crate::error::LookupError;
use crate::explain::Explainer;
use crate::geo::{self, Coord, DistanceResult};
use crate::matcher::{self, MatchResult, Stage};

pub const NOT_AVAILABLE: &str = "Not available";
pub const NO_MATCH_MESSAGE: &str = "No close enough match found";
pub const DEFAULT_RADIUS_KM: f64 = 10.0;
pub const DEFAULT_NEAREST_RADIUS_KM: f64 = 25.0;
pub const DEFAULT_NEAREST_LIMIT: usize = 5;
pub const MAX_NEAREST_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    NoMatch,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MedicineDetails {
    pub status: Status,
    pub medicine_name: String,
    pub match_score: u8,
    pub match_stage: Stage,
    pub uses: Option<String>,
    pub composition: String,
    pub side_effects: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoMatch {
    pub status: Status,
    pub message: &'static str,
    pub match_score: u8,
}

impl NoMatch {
    fn from_match(m: &MatchResult) -> Self {
        Self {
            status: Status::NoMatch,
            message: NO_MATCH_MESSAGE,
            match_score: m.score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MedicineResponse {
    Found(MedicineDetails),
    NoMatch(NoMatch),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    pub medicine: String,
    pub composition: String,
    pub analysis: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplainedMedicine {
    pub status: Status,
    pub data: Explanation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExplainResponse {
    Found(ExplainedMedicine),
    NoMatch(NoMatch),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HospitalView {
    #[serde(rename = "Hospital Name")]
    pub name: String,
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "Mobile Number")]
    pub mobile: String,
    #[serde(rename = "Distance (km)")]
    pub distance_km: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HospitalsResponse {
    pub status: Status,
    pub count: usize,
    pub data: Vec<HospitalView>,
}

/// Error envelope. `error` and `message` carry the same text so clients of
/// either older response shape keep working.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub status: Status,
    pub error: String,
    pub message: String,
}

impl ErrorBody {
    pub fn new(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        Self {
            status: Status::Error,
            error: msg.clone(),
            message: msg,
        }
    }
}

impl From<&LookupError> for ErrorBody {
    fn from(e: &LookupError) -> Self {
        Self::new(e.to_string())
    }
}

/// Run the resolver over the catalog. CPU-bound on a fuzzy miss; the server
/// calls this off the async workers.
pub fn resolve_medicine(catalog: &MedicineCatalog, query: &str, threshold: u8) -> MatchResult {
    let m = matcher::resolve_in(query, catalog.candidates(), threshold);
    tracing::debug!(
        "Medicine query {:?} resolved to {:?} (stage {:?}, score {})",
        m.query,
        m.matched_name,
        m.stage,
        m.score
    );
    m
}

pub fn lookup_medicine(catalog: &MedicineCatalog, query: &str, threshold: u8) -> MedicineResponse {
    medicine_response(catalog, &resolve_medicine(catalog, query, threshold))
}

pub fn medicine_response(catalog: &MedicineCatalog, m: &MatchResult) -> MedicineResponse {
    let Some(entry) = m.matched_name.as_deref().and_then(|name| catalog.get(name)) else {
        return MedicineResponse::NoMatch(NoMatch::from_match(m));
    };
    MedicineResponse::Found(MedicineDetails {
        status: Status::Success,
        medicine_name: entry.name.clone(),
        match_score: m.score,
        match_stage: m.stage,
        uses: entry.uses.clone(),
        composition: entry.composition.clone(),
        side_effects: entry.side_effects.clone(),
    })
}

/// Match like [`lookup_medicine`], then ask the text-generation service to
/// explain the hit. A failed explanation still yields a success response
/// with the error text in `analysis`.
pub async fn explain_medicine(
    catalog: &MedicineCatalog,
    explainer: &Explainer,
    query: &str,
    threshold: u8,
) -> ExplainResponse {
    let m = resolve_medicine(catalog, query, threshold);
    explain_match(catalog, explainer, &m).await
}

pub async fn explain_match(
    catalog: &MedicineCatalog,
    explainer: &Explainer,
    m: &MatchResult,
) -> ExplainResponse {
    let Some(entry) = m.matched_name.as_deref().and_then(|name| catalog.get(name)) else {
        return ExplainResponse::NoMatch(NoMatch::from_match(m));
    };
    let analysis = explainer
        .explain_or_error(&entry.name, &entry.composition)
        .await;
    ExplainResponse::Found(ExplainedMedicine {
        status: Status::Success,
        data: Explanation {
            medicine: entry.name.clone(),
            composition: entry.composition.clone(),
            analysis,
        },
    })
}

pub fn hospitals_within(
    directory: &HospitalDirectory,
    lat: f64,
    lon: f64,
    radius_km: f64,
) -> Result<HospitalsResponse, LookupError> {
    let target = validate_target(lat, lon)?;
    validate_radius(radius_km)?;
    let hits = geo::find_within_radius(target, directory.entries(), radius_km);
    Ok(project_hospitals(&hits))
}

pub fn nearest_hospitals(
    directory: &HospitalDirectory,
    lat: f64,
    lon: f64,
    radius_km: f64,
    limit: usize,
) -> Result<HospitalsResponse, LookupError> {
    let target = validate_target(lat, lon)?;
    validate_radius(radius_km)?;
    let limit = limit.clamp(1, MAX_NEAREST_LIMIT);
    let hits = geo::find_nearest(target, directory.entries(), radius_km, limit);
    Ok(project_hospitals(&hits))
}

fn validate_target(lat: f64, lon: f64) -> Result<Coord, LookupError> {
    let target = Coord::new(lat, lon);
    if !target.is_valid() {
        return Err(LookupError::InvalidQuery(format!(
            "Invalid coordinates ({lat}, {lon}): latitude must be within [-90, 90] and longitude within [-180, 180]"
        )));
    }
    Ok(target)
}

fn validate_radius(radius_km: f64) -> Result<(), LookupError> {
    if !radius_km.is_finite() || radius_km < 0.0 {
        return Err(LookupError::InvalidQuery(format!(
            "Invalid radius {radius_km}: must be a non-negative number of kilometers"
        )));
    }
    Ok(())
}

fn project_hospitals(hits: &[DistanceResult<'_, HospitalEntry>]) -> HospitalsResponse {
    let data: Vec<HospitalView> = hits.iter().map(project_hospital).collect();
    HospitalsResponse {
        status: Status::Success,
        count: data.len(),
        data,
    }
}

pub fn project_hospital(hit: &DistanceResult<'_, HospitalEntry>) -> HospitalView {
    let h = hit.entry;
    HospitalView {
        name: usable_text(Some(h.name.as_str())).unwrap_or(NOT_AVAILABLE).to_string(),
        location: location_display(h),
        mobile: contact_display(h),
        distance_km: finite_or_none(geo::round_km(hit.distance_km)),
    }
}

fn location_display(h: &HospitalEntry) -> String {
    let parts: Vec<&str> = [&h.address, &h.district, &h.state, &h.pincode]
        .into_iter()
        .filter_map(|v| usable_text(v.as_deref()))
        .collect();
    if parts.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        parts.join(", ")
    }
}

/// Mobile number when usable, else the landline, else "Not available".
pub fn contact_display(h: &HospitalEntry) -> String {
    usable_contact(h.mobile.as_deref())
        .or_else(|| usable_contact(h.phone.as_deref()))
        .unwrap_or(NOT_AVAILABLE)
        .to_string()
}

fn usable_text(v: Option<&str>) -> Option<&str> {
    let v = v?.trim();
    if v.is_empty() || v.eq_ignore_ascii_case("nan") {
        None
    } else {
        Some(v)
    }
}

/// Contact cells hold placeholders like `0`, `0.0` or `nan` for "unknown".
fn usable_contact(v: Option<&str>) -> Option<&str> {
    let v = usable_text(v)?;
    if v.parse::<f64>().is_ok_and(|n| n == 0.0) {
        None
    } else {
        Some(v)
    }
}

pub fn finite_or_none(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}
