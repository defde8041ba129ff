//! One-shot readiness validation, run before any device connection.
//!
//! Proves that every collection YAML for the target vendor resolves its
//! templates against the search path and that the parser backends are
//! usable. Missing templates come back with nearest-name suggestions from
//! the community collection so a typo is a one-line fix.

use std::path::Path;

use serde::Serialize;
use squall_config::{CollectionCatalog, ParserSpec};
use squall_domain::VendorTag;
use squall_driver::DriverRegistry;
use squall_parser::{ParserChain, TemplateResolver};
use tracing::{debug, info};

/// Outcome of a preflight run. `ok` is false only on errors; warnings are
/// advisory.
#[derive(Debug, Clone, Serialize)]
pub struct PreflightReport {
    pub ok: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Human-readable record of what passed.
    pub checks: Vec<String>,
}

impl PreflightReport {
    fn new() -> Self {
        Self {
            ok: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            checks: Vec::new(),
        }
    }

    fn check(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        debug!("preflight: {}", msg);
        self.checks.push(msg);
    }

    fn warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    fn error(&mut self, msg: impl Into<String>) {
        self.ok = false;
        self.errors.push(msg.into());
    }
}

/// Validate parser-chain readiness for a vendor without connecting.
pub fn run_preflight(
    vendor: &VendorTag,
    catalog: &CollectionCatalog,
    resolver: &TemplateResolver,
    registry: &DriverRegistry,
) -> PreflightReport {
    let mut report = PreflightReport::new();
    info!(vendor = %vendor, "preflight: parser chain readiness");

    // 1. Backend availability.
    let chain = ParserChain::new(resolver.clone());
    let caps = chain.capabilities();
    report.check("textfsm backend available");
    report.check("ttp backend available");
    match &caps.community_templates {
        Some(path) => report.check(format!("community templates at {}", path)),
        None => report.warning(
            "community template directory not configured — local overrides and regex only"
                .to_string(),
        ),
    }

    // 2. Vendor driver.
    if registry.has_driver(vendor) {
        report.check(format!("vendor driver registered for {}", vendor));
    } else {
        report.warning(format!(
            "no dedicated driver for '{}' — using base driver (registered: {})",
            vendor,
            registry.registered_tags().join(", ")
        ));
    }

    // 3. Collection configs.
    let collections = catalog.list_collections(vendor);
    if collections.is_empty() {
        report.error(format!("no collection configs found for vendor '{}'", vendor));
        return report;
    }
    report.check(format!(
        "{} collection configs for {}: {}",
        collections.len(),
        vendor,
        collections.join(", ")
    ));

    // 4. Template resolution + schema presence.
    for collection in &collections {
        let Some(spec) = catalog.spec(collection, vendor) else {
            continue;
        };

        if catalog.schema(collection).is_none() {
            report.warning(format!("[{}] missing _schema.yaml — no type coercion", collection));
        }

        if spec.parsers.is_empty() {
            report.error(format!("[{}] no parsers defined", collection));
            continue;
        }

        for parser in &spec.parsers {
            match parser {
                ParserSpec::TextFsm { templates } | ParserSpec::Ttp { templates } => {
                    for name in templates {
                        match resolver.resolve(name, None) {
                            Some(path) => report.check(format!(
                                "[{}] {} → {} ({})",
                                collection,
                                parser.kind(),
                                name,
                                path.display()
                            )),
                            None => {
                                report.error(format!(
                                    "[{}] {} template NOT FOUND: {}",
                                    collection,
                                    parser.kind(),
                                    name
                                ));
                                for suggestion in
                                    suggest_templates(name, resolver.community_dir())
                                {
                                    report.error(format!("      did you mean: {}", suggestion));
                                }
                            }
                        }
                    }
                }
                ParserSpec::Regex { pattern, .. } => {
                    if pattern.is_empty() {
                        report.warning(format!("[{}] regex parser has no pattern", collection));
                    } else {
                        report.check(format!("[{}] regex fallback defined", collection));
                    }
                }
            }
        }
    }

    report
}

/// Suggest similar template names from the community directory: same
/// platform prefix, first two command words contained in the candidate.
fn suggest_templates(target: &str, community_dir: Option<&Path>) -> Vec<String> {
    let Some(dir) = community_dir else {
        return Vec::new();
    };
    let stem = target.trim_end_matches(".textfsm").trim_end_matches(".ttp");
    let Some((platform, command)) = stem.split_once("_show_") else {
        return Vec::new();
    };
    let command_words: Vec<&str> = command.split('_').take(2).collect();

    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut matches: Vec<String> = entries
        .flatten()
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|name| {
            let candidate = name.trim_end_matches(".textfsm");
            candidate.starts_with(platform)
                && candidate.contains("_show_")
                && command_words.iter().all(|w| candidate.contains(w))
        })
        .collect();
    matches.sort();
    matches.truncate(3);
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn catalog_with_cpu(template_line: &str) -> (tempfile::TempDir, CollectionCatalog) {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir.path().join("cpu/cisco_ios.yaml"),
            &format!(
                "command: show processes cpu sorted\nparsers:\n  - type: textfsm\n    templates:\n      - {}\n  - type: regex\n    pattern: 'CPU.*'\n    flags: DOTALL\n",
                template_line
            ),
        );
        write(&dir.path().join("cpu/_schema.yaml"), "fields: {}\n");
        let catalog = CollectionCatalog::open(dir.path());
        (dir, catalog)
    }

    #[test]
    fn passes_when_templates_resolve() {
        let (_cat_dir, catalog) = catalog_with_cpu("cisco_ios_show_processes_cpu.textfsm");

        let tmpl_dir = tempfile::tempdir().unwrap();
        fs::write(
            tmpl_dir.path().join("cisco_ios_show_processes_cpu.textfsm"),
            "Value X (.*)\n\nStart\n  ^${X} -> Record\n",
        )
        .unwrap();

        let resolver =
            TemplateResolver::with_community([tmpl_dir.path().to_path_buf()], None);
        let registry = DriverRegistry::with_builtins();
        let report = run_preflight(&VendorTag::new("cisco_ios"), &catalog, &resolver, &registry);

        assert!(report.ok, "errors: {:?}", report.errors);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn missing_template_fails_with_suggestion() {
        let (_cat_dir, catalog) = catalog_with_cpu("cisco_ios_show_processes_cpu_sorted.textfsm");

        let community = tempfile::tempdir().unwrap();
        fs::write(
            community.path().join("cisco_ios_show_processes_cpu.textfsm"),
            "x",
        )
        .unwrap();

        let resolver = TemplateResolver::with_community(
            Vec::<PathBuf>::new(),
            Some(community.path().to_path_buf()),
        );
        let registry = DriverRegistry::with_builtins();
        let report = run_preflight(&VendorTag::new("cisco_ios"), &catalog, &resolver, &registry);

        // The community dir itself is searched too, so resolution should
        // only fail when the exact name is absent everywhere.
        assert!(!report.ok);
        assert!(report.errors.iter().any(|e| e.contains("NOT FOUND")));
        assert!(
            report.errors.iter().any(|e| e.contains("did you mean")),
            "expected a suggestion, errors: {:?}",
            report.errors
        );
    }

    #[test]
    fn unknown_vendor_has_no_collections() {
        let (_cat_dir, catalog) = catalog_with_cpu("t.textfsm");
        let resolver = TemplateResolver::with_community(Vec::<PathBuf>::new(), None);
        let registry = DriverRegistry::with_builtins();

        let report = run_preflight(&VendorTag::new("hp_procurve"), &catalog, &resolver, &registry);
        assert!(!report.ok);
        assert!(report.warnings.iter().any(|w| w.contains("base driver")));
    }

    #[test]
    fn suggestions_match_first_two_command_words() {
        let community = tempfile::tempdir().unwrap();
        for name in [
            "cisco_ios_show_ip_interface_brief.textfsm",
            "cisco_ios_show_ip_bgp_summary.textfsm",
            "arista_eos_show_ip_interface.textfsm",
        ] {
            fs::write(community.path().join(name), "x").unwrap();
        }

        let suggestions = suggest_templates(
            "cisco_ios_show_ip_interface_breif.textfsm",
            Some(community.path()),
        );
        assert_eq!(suggestions, vec!["cisco_ios_show_ip_interface_brief.textfsm"]);
    }
}
