use std::path::Path;

use super::{Dataset, field_at, for_each_record, header_index, open_csv, require_column};
use crate::error::LookupError;
use crate::geo::{Coord, Located, parse_coordinates};

pub const COL_NAME: &str = "Hospital_Name";
pub const COL_COORDINATES: &str = "Location_Coordinates";
pub const COL_ADDRESS: &str = "Address_Original_First_Line";
pub const COL_STATE: &str = "State";
pub const COL_DISTRICT: &str = "District";
pub const COL_PINCODE: &str = "Pincode";
pub const COL_PHONE: &str = "Telephone";
pub const COL_MOBILE: &str = "Mobile_Number";

#[derive(Debug, Clone, PartialEq)]
pub struct HospitalEntry {
    /// Empty when the directory row has no name.
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub state: Option<String>,
    pub district: Option<String>,
    pub pincode: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,
}

impl Located for HospitalEntry {
    fn coord(&self) -> Coord {
        Coord::new(self.latitude, self.longitude)
    }
}

/// Hospitals with usable coordinates. Rows with a missing or malformed
/// coordinate pair never make it in; a missing name does not drop the row.
#[derive(Debug, Clone)]
pub struct HospitalDirectory {
    data: Dataset<HospitalEntry>,
}

impl HospitalDirectory {
    pub fn open(path: &Path) -> Result<Self, LookupError> {
        let (mut reader, headers) = open_csv(path)?;
        let name_idx = require_column(path, &headers, COL_NAME)?;
        let coord_idx = require_column(path, &headers, COL_COORDINATES)?;
        let address_idx = header_index(&headers, COL_ADDRESS);
        let state_idx = header_index(&headers, COL_STATE);
        let district_idx = header_index(&headers, COL_DISTRICT);
        let pincode_idx = header_index(&headers, COL_PINCODE);
        let phone_idx = header_index(&headers, COL_PHONE);
        let mobile_idx = header_index(&headers, COL_MOBILE);

        let mut entries = Vec::new();
        let skipped = for_each_record(path, &mut reader, |record| {
            let Some(coord) = field_at(record, Some(coord_idx)).and_then(|s| parse_coordinates(&s))
            else {
                return false;
            };
            entries.push(HospitalEntry {
                name: field_at(record, Some(name_idx)).unwrap_or_default(),
                latitude: coord.lat,
                longitude: coord.lon,
                address: field_at(record, address_idx),
                state: field_at(record, state_idx),
                district: field_at(record, district_idx),
                pincode: field_at(record, pincode_idx),
                phone: field_at(record, phone_idx),
                mobile: field_at(record, mobile_idx),
            });
            true
        })?;

        let directory = Self {
            data: Dataset::new(path, entries, skipped),
        };
        directory.data.log_loaded("hospitals");
        Ok(directory)
    }

    /// Entries are assumed valid; callers building in-memory directories
    /// must filter with [`Coord::is_valid`] themselves.
    pub fn from_entries(entries: Vec<HospitalEntry>) -> Self {
        Self {
            data: Dataset::new("<memory>", entries, 0),
        }
    }

    pub fn entries(&self) -> &[HospitalEntry] {
        self.data.entries()
    }

    pub fn dataset(&self) -> &Dataset<HospitalEntry> {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "Sr_No,Hospital_Name,Location_Coordinates,Address_Original_First_Line,State,District,Pincode,Telephone,Mobile_Number\n";

    fn write_csv(rows: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(HEADER.as_bytes()).unwrap();
        f.write_all(rows.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn malformed_coordinates_are_dropped_but_nameless_rows_kept() {
        let f = write_csv(
            "1,City Hospital,\"19.867141, 75.335294\",Station Road,Maharashtra,Aurangabad,431001,0240-2331,9876543210\n\
             2,Broken Coords,Error,Main St,Maharashtra,Pune,411001,,\n\
             3,No Coords,,Main St,Maharashtra,Pune,411001,,\n\
             4,Half Coords,19.86,Main St,Maharashtra,Pune,411001,,\n\
             5,,\"18.52, 73.85\",Nameless,Maharashtra,Pune,411001,,\n\
             6,Rural PHC,\"18.5204,73.8567\",,Maharashtra,Pune,,nan,0\n",
        );
        let dir = HospitalDirectory::open(f.path()).unwrap();
        let names: Vec<&str> = dir.entries().iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["City Hospital", "", "Rural PHC"]);
        assert_eq!(dir.dataset().skipped(), 3);

        let city = &dir.entries()[0];
        assert_eq!(city.latitude, 19.867141);
        assert_eq!(city.longitude, 75.335294);
        assert_eq!(city.pincode.as_deref(), Some("431001"));

        let nameless = &dir.entries()[1];
        assert_eq!(nameless.latitude, 18.52);
        assert_eq!(nameless.address.as_deref(), Some("Nameless"));

        let phc = &dir.entries()[2];
        assert_eq!(phc.address, None);
        assert_eq!(phc.mobile.as_deref(), Some("0"));
    }

    #[test]
    fn missing_coordinates_column_is_a_load_error() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"Hospital_Name,State\nCity Hospital,Goa\n").unwrap();
        f.flush().unwrap();
        let err = HospitalDirectory::open(f.path()).unwrap_err();
        assert_eq!(err.to_string(), "Missing required column: Location_Coordinates");
    }
}
