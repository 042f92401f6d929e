use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct StoragePaths {
    pub data_dir: PathBuf,
    pub medicines_csv: PathBuf,
    pub hospitals_csv: PathBuf,
}

impl StoragePaths {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir: PathBuf = data_dir.into();
        let medicines_csv = data_dir.join("Medicine_Details.csv");
        let hospitals_csv = data_dir.join("hospital_directory.csv");

        Self {
            data_dir,
            medicines_csv,
            hospitals_csv,
        }
    }

    /// Explicit file paths override the defaults under `data_dir`.
    pub fn with_overrides(mut self, medicines: Option<&str>, hospitals: Option<&str>) -> Self {
        if let Some(p) = medicines {
            self.medicines_csv = PathBuf::from(p);
        }
        if let Some(p) = hospitals {
            self.hospitals_csv = PathBuf::from(p);
        }
        self
    }
}

pub fn file_present_nonempty(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(m) => m.is_file() && m.len() > 0,
        Err(_) => false,
    }
}
