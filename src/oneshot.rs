use std::process::ExitCode;

use anyhow::Context;
use serde::Serialize;

use crate::cli::{HospitalArgs, MedicineArgs};
use crate::dataset::hospitals::HospitalDirectory;
use crate::dataset::medicines::MedicineCatalog;
use crate::error::LookupError;
use crate::explain::Explainer;
use crate::service::{self, ErrorBody};

pub async fn run_medicine(args: MedicineArgs) -> anyhow::Result<ExitCode> {
    let paths = args.data.paths();
    let catalog = match MedicineCatalog::open(&paths.medicines_csv) {
        Ok(c) => c,
        Err(e) => return report_error(&e),
    };

    if args.explain {
        let explainer = Explainer::new(args.explain_opts.to_config())?;
        let resp =
            service::explain_medicine(&catalog, &explainer, &args.query, args.threshold).await;
        print_json(&resp)?;
    } else {
        print_json(&service::lookup_medicine(&catalog, &args.query, args.threshold))?;
    }
    Ok(ExitCode::SUCCESS)
}

pub fn run_hospitals(args: HospitalArgs) -> anyhow::Result<ExitCode> {
    let paths = args.data.paths();
    let directory = match HospitalDirectory::open(&paths.hospitals_csv) {
        Ok(d) => d,
        Err(e) => return report_error(&e),
    };

    let result = match args.limit {
        Some(limit) => service::nearest_hospitals(
            &directory,
            args.lat,
            args.lon,
            args.radius.unwrap_or(service::DEFAULT_NEAREST_RADIUS_KM),
            limit,
        ),
        None => service::hospitals_within(
            &directory,
            args.lat,
            args.lon,
            args.radius.unwrap_or(service::DEFAULT_RADIUS_KM),
        ),
    };

    match result {
        Ok(resp) => {
            print_json(&resp)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => report_error(&e),
    }
}

fn report_error(e: &LookupError) -> anyhow::Result<ExitCode> {
    match e.path() {
        Some(path) => tracing::error!("{} ({})", e, path.display()),
        None => tracing::error!("{}", e),
    }
    print_json(&ErrorBody::from(e))?;
    Ok(ExitCode::FAILURE)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(value).context("serialize response")?;
    println!("{text}");
    Ok(())
}
