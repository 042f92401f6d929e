use std::collections::HashMap;
use std::path::Path;

use super::{Dataset, field_at, for_each_record, header_index, open_csv, require_column};
use crate::error::LookupError;
use crate::matcher::Candidates;

pub const COL_NAME: &str = "Medicine Name";
pub const COL_COMPOSITION: &str = "Composition";
pub const COL_USES: &str = "Uses";
pub const COL_SIDE_EFFECTS: &str = "Side_effects";

const AZ_COL_NAME: &str = "name";
const AZ_COL_COMPOSITION: &str = "short_composition1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MedicineEntry {
    pub name: String,
    pub composition: String,
    pub uses: Option<String>,
    pub side_effects: Option<String>,
}

/// Column layout of a catalog file, detected from its header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// `Medicine Name, Composition, Uses, Side_effects`
    Details,
    /// `name, short_composition1` (no uses or side effects)
    AToZ,
}

#[derive(Debug, Clone, Copy)]
struct Columns {
    name: usize,
    composition: usize,
    uses: Option<usize>,
    side_effects: Option<usize>,
}

fn detect_columns(path: &Path, headers: &csv::StringRecord) -> Result<(Layout, Columns), LookupError> {
    if header_index(headers, COL_NAME).is_none() {
        if let (Some(name), Some(composition)) = (
            header_index(headers, AZ_COL_NAME),
            header_index(headers, AZ_COL_COMPOSITION),
        ) {
            let cols = Columns {
                name,
                composition,
                uses: None,
                side_effects: None,
            };
            return Ok((Layout::AToZ, cols));
        }
    }

    let cols = Columns {
        name: require_column(path, headers, COL_NAME)?,
        composition: require_column(path, headers, COL_COMPOSITION)?,
        uses: Some(require_column(path, headers, COL_USES)?),
        side_effects: Some(require_column(path, headers, COL_SIDE_EFFECTS)?),
    };
    Ok((Layout::Details, cols))
}

/// Medicine catalog keyed by name. Duplicate names keep the first row.
#[derive(Debug, Clone)]
pub struct MedicineCatalog {
    data: Dataset<MedicineEntry>,
    layout: Layout,
    candidates: Candidates,
    by_name: HashMap<String, usize>,
}

impl MedicineCatalog {
    pub fn open(path: &Path) -> Result<Self, LookupError> {
        let (mut reader, headers) = open_csv(path)?;
        let (layout, cols) = detect_columns(path, &headers)?;

        let mut entries = Vec::new();
        let skipped = for_each_record(path, &mut reader, |record| {
            let Some(name) = field_at(record, Some(cols.name)) else {
                return false;
            };
            entries.push(MedicineEntry {
                name,
                composition: field_at(record, Some(cols.composition)).unwrap_or_default(),
                uses: field_at(record, cols.uses),
                side_effects: field_at(record, cols.side_effects),
            });
            true
        })?;

        let catalog = Self::from_dataset(Dataset::new(path, entries, skipped), layout);
        catalog.data.log_loaded("medicines");
        Ok(catalog)
    }

    pub fn from_entries(entries: Vec<MedicineEntry>) -> Self {
        Self::from_dataset(Dataset::new("<memory>", entries, 0), Layout::Details)
    }

    fn from_dataset(data: Dataset<MedicineEntry>, layout: Layout) -> Self {
        let mut names = Vec::with_capacity(data.len());
        let mut by_name = HashMap::with_capacity(data.len());
        for (idx, entry) in data.entries().iter().enumerate() {
            if !by_name.contains_key(&entry.name) {
                by_name.insert(entry.name.clone(), idx);
                names.push(entry.name.clone());
            }
        }
        Self {
            data,
            layout,
            candidates: Candidates::from_names(names),
            by_name,
        }
    }

    /// Unique names in file order.
    pub fn names(&self) -> &[String] {
        self.candidates.names()
    }

    /// The resolver's view of [`Self::names`], normalised once at load.
    pub fn candidates(&self) -> &Candidates {
        &self.candidates
    }

    pub fn get(&self, name: &str) -> Option<&MedicineEntry> {
        self.by_name
            .get(name)
            .and_then(|&idx| self.data.entries().get(idx))
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn dataset(&self) -> &Dataset<MedicineEntry> {
        &self.data
    }
}
