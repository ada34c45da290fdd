//! `cepage score` — recompute accuracy from a saved results file.

use std::path::Path;

use anyhow::Result;

use crate::config::expand_path;
use crate::records::{accuracy, read_results};

pub fn run(results_path: &Path) -> Result<()> {
    let records = read_results(&expand_path(results_path))?;

    let total = records.len();
    let failed = records.iter().filter(|r| r.error.is_some()).count();

    println!("Records:    {total}");
    println!("Failed:     {failed}");
    match accuracy(&records) {
        Some(acc) => {
            let scored = records.iter().filter(|r| r.truth.is_some()).count();
            println!("Accuracy:   {:.1}% (over {scored} labelled records)", acc * 100.0);
        }
        None => println!("Accuracy:   n/a (no ground-truth labels in file)"),
    }

    Ok(())
}
