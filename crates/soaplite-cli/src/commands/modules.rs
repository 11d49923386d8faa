use crate::cli::ModulesArgs;
use crate::config::{LIBRARY_DIR_ENV, resolve_library_dir};
use crate::error::Result;
use soaplite::engine::native::{ModuleKey, NativeModule, locate_module};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
enum ModuleStatus {
    Found(PathBuf),
    Loaded(PathBuf),
    LoadFailed(PathBuf, String),
    Missing,
}

/// Status of each distinct module file, in `ModuleKey::all` order.
fn survey(dir: &Path, load: bool) -> Vec<(String, ModuleStatus)> {
    let mut report: Vec<(String, ModuleStatus)> = Vec::new();
    for key in ModuleKey::all() {
        let stem = key.stem();
        if report.iter().any(|(seen, _)| *seen == stem) {
            continue;
        }
        let status = match locate_module(dir, key) {
            Err(_) => ModuleStatus::Missing,
            Ok(path) if !load => ModuleStatus::Found(path),
            Ok(path) => match NativeModule::load(&path, key) {
                Ok(_) => ModuleStatus::Loaded(path),
                Err(e) => ModuleStatus::LoadFailed(path, e.to_string()),
            },
        };
        report.push((stem, status));
    }
    report
}

pub fn run(args: ModulesArgs) -> Result<()> {
    let dir = resolve_library_dir(args.library_dir, None, std::env::var_os(LIBRARY_DIR_ENV))?;
    info!("Surveying native modules in {:?}", dir);
    println!("Native module directory: {}", dir.display());

    let report = survey(&dir, args.load);
    for (stem, status) in &report {
        let line = match status {
            ModuleStatus::Found(path) => format!("found   {}", path.display()),
            ModuleStatus::Loaded(path) => format!("loaded  {}", path.display()),
            ModuleStatus::LoadFailed(path, reason) => {
                format!("broken  {} ({})", path.display(), reason)
            }
            ModuleStatus::Missing => "missing".to_string(),
        };
        println!("  lib{:<9} {}", stem, line);
    }

    let missing = report
        .iter()
        .filter(|(_, s)| *s == ModuleStatus::Missing)
        .count();
    if missing > 0 {
        println!(
            "{} of {} module(s) missing; set --library-dir or {}.",
            missing,
            report.len(),
            LIBRARY_DIR_ENV
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn survey_lists_each_module_file_once() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("libsoapPy.so"), b"").unwrap();
        fs::write(dir.path().join("libsoapPy3.so"), b"").unwrap();

        let report = survey(dir.path(), false);
        let stems: Vec<&str> = report.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(
            stems,
            vec!["soapPy", "soapPy2", "soapPy3", "soapPy4", "soapPy5", "soapPy6"]
        );
        assert_eq!(
            report[0].1,
            ModuleStatus::Found(dir.path().join("libsoapPy.so"))
        );
        assert_eq!(report[1].1, ModuleStatus::Missing);
        assert!(matches!(report[2].1, ModuleStatus::Found(_)));
    }

    #[test]
    fn loading_a_non_library_file_is_reported() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("libsoapPy2.so"), b"garbage").unwrap();

        let report = survey(dir.path(), true);
        assert!(matches!(report[1].1, ModuleStatus::LoadFailed(_, _)));
    }
}
