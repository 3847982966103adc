//! Subcommand implementations for the `mrf` binary: JSON schema validation
//! against a stored schema version, with optional download of the data file
//! and chained validation of the files it references.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde_json::Value;

use fetch::RemoteSource;
use mrf_core::extract;
use mrf_core::json::{DocumentReport, JsonDataError, JsonSchemaError, JsonValidator};
use mrf_core::Locations;
use schemas::{SchemaStore, StoreError, KNOWN_TARGETS};

pub struct ValidateOptions {
    pub target: String,
    pub strict: bool,
    pub fail_fast: bool,
    pub out: Option<PathBuf>,
    pub follow_references: bool,
    pub always_yes: bool,
}

/// Validate a local JSON data file against a stored schema version.
pub async fn validate(
    data_file: &Path,
    schema_version: &str,
    repo_dir: &Path,
    source: &dyn RemoteSource,
    opts: &ValidateOptions,
) -> Result<u8> {
    if !known_target(&opts.target) {
        return Ok(1);
    }
    if !data_file.exists() {
        eprintln!("Could not find data file: {}", data_file.display());
        return Ok(1);
    }
    let Some(mut store) = open_version(repo_dir, schema_version)? else {
        return Ok(1);
    };
    validate_with_store(&mut store, data_file, source, opts).await
}

/// Download a data file, then validate it like [`validate`].
pub async fn validate_url(
    data_url: &str,
    schema_version: &str,
    repo_dir: &Path,
    source: &dyn RemoteSource,
    opts: &ValidateOptions,
) -> Result<u8> {
    if !known_target(&opts.target) {
        return Ok(1);
    }
    let Some(mut store) = open_version(repo_dir, schema_version)? else {
        return Ok(1);
    };
    let dir = tempfile::tempdir()?;
    let data_file = dir.path().join("data.json");
    if let Err(err) = fetch_data(source, data_url, &data_file, opts.always_yes).await {
        eprintln!("{err:#}");
        return Ok(1);
    }
    validate_with_store(&mut store, &data_file, source, opts).await
}

/// List schema versions, and the targets of one version when given.
pub fn list_schemas(repo_dir: &Path, version: Option<&str>) -> Result<u8> {
    let mut store = SchemaStore::open(repo_dir)?;
    let versions = store.list_versions()?;
    if versions.is_empty() {
        eprintln!("No schema versions found in {}", repo_dir.display());
        return Ok(1);
    }
    println!("Available versions:");
    for v in &versions {
        println!("  {v}");
    }
    if let Some(version) = version {
        if let Err(err) = store.use_version(version) {
            eprintln!("{err}");
            return Ok(1);
        }
        println!("Targets in {version}:");
        for target in store.available_targets()? {
            println!("  {target}");
            let xsd = repo_dir
                .join(version)
                .join("schemas")
                .join(&target)
                .join(format!("{target}.xsd"));
            if xsd.is_file() {
                match schemas::describe_xsd(&xsd) {
                    Ok(summary) => {
                        if let Some(ns) = summary.target_namespace {
                            println!("    namespace: {ns}");
                        }
                        if !summary.root_elements.is_empty() {
                            println!("    elements: {}", summary.root_elements.join(", "));
                        }
                    }
                    Err(err) => {
                        tracing::warn!("could not inspect xsd for {target}: {err}");
                    }
                }
            }
        }
    }
    Ok(0)
}

fn known_target(target: &str) -> bool {
    if KNOWN_TARGETS.contains(&target) {
        true
    } else {
        eprintln!(
            "Unknown target \"{target}\". Known targets are: {}",
            KNOWN_TARGETS.join(", ")
        );
        false
    }
}

fn open_version(repo_dir: &Path, version: &str) -> Result<Option<SchemaStore>> {
    let mut store = SchemaStore::open(repo_dir)?;
    match store.use_version(version) {
        Ok(()) => Ok(Some(store)),
        Err(err @ StoreError::UnknownVersion { .. }) => {
            eprintln!("{err}");
            eprintln!("No schema available - not validating.");
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

async fn validate_with_store(
    store: &mut SchemaStore,
    data_file: &Path,
    source: &dyn RemoteSource,
    opts: &ValidateOptions,
) -> Result<u8> {
    let Some(validator) = compile_target_schema(store, &opts.target, opts.strict)? else {
        return Ok(1);
    };
    let doc = match mrf_core::json::load_document(data_file) {
        Ok(doc) => doc,
        Err(JsonDataError::NotFound { .. }) => {
            eprintln!("JSON file '{}' not found", data_file.display());
            return Ok(1);
        }
        Err(JsonDataError::Parse {
            line,
            column,
            message,
        }) => {
            eprintln!("Input is not a valid JSON");
            eprintln!("Error(line {line}, column {column}): {message}");
            return Ok(1);
        }
    };
    let report = validator.validate_value(&doc, opts.fail_fast);
    if let Some(dir) = &opts.out {
        fs::create_dir_all(dir)
            .with_context(|| format!("could not create output directory {}", dir.display()))?;
    }
    write_result(&report, &doc, &opts.target, opts.out.as_deref())?;
    let locations = extract::collect_locations(&doc, &opts.target);
    let mut exit = u8::from(!report.valid);
    if report.valid && opts.follow_references && !locations.is_empty() {
        let follow_exit = follow_references(store, source, &locations, opts).await?;
        exit = exit.max(follow_exit);
    }
    Ok(exit)
}

fn compile_target_schema(
    store: &mut SchemaStore,
    target: &str,
    strict: bool,
) -> Result<Option<JsonValidator>> {
    let schema_path = match store.prepare(target, strict) {
        Ok(path) => path,
        Err(err @ StoreError::MissingSchema { .. }) => {
            eprintln!("{err}");
            eprintln!("No schema available - not validating.");
            return Ok(None);
        }
        Err(err) => return Err(err.into()),
    };
    match JsonValidator::compile(&schema_path) {
        Ok(validator) => Ok(Some(validator)),
        Err(JsonSchemaError::NotFound { .. }) => {
            eprintln!("Schema file '{}' not found", schema_path.display());
            Ok(None)
        }
        Err(JsonSchemaError::Parse {
            line,
            column,
            message,
        }) => {
            eprintln!("Schema file '{}' is not a valid JSON", schema_path.display());
            eprintln!("Error(line {line}, column {column}): {message}");
            Ok(None)
        }
        Err(JsonSchemaError::Compile { message }) => {
            eprintln!("{message}");
            Ok(None)
        }
    }
}

fn write_result(
    report: &DocumentReport,
    doc: &Value,
    target: &str,
    out_dir: Option<&Path>,
) -> Result<()> {
    let verdict = verdict_text(report);
    println!("{verdict}");
    for violation in &report.violations {
        eprintln!("{violation}");
    }
    if let Some(dir) = out_dir {
        fs::write(dir.join("output.txt"), format!("{verdict}\n"))?;
        fs::write(
            dir.join("errors.json"),
            serde_json::to_string_pretty(&report.violations)?,
        )?;
        extract::write_reports(doc, target, dir)?;
        tracing::debug!(dir = %dir.display(), "wrote validation reports");
    }
    Ok(())
}

fn verdict_text(report: &DocumentReport) -> &'static str {
    if report.valid {
        "Input JSON is valid."
    } else {
        "Input JSON is invalid."
    }
}

async fn fetch_data(
    source: &dyn RemoteSource,
    url: &str,
    dest: &Path,
    always_yes: bool,
) -> Result<()> {
    let probe = source.probe(url).await?;
    if probe.needs_confirmation() && !always_yes {
        match probe.size_mb() {
            Some(mb) => bail!("Data file is {mb:.2} MB in size; rerun with --yes to download it"),
            None => bail!("Data file size is unknown; rerun with --yes to download it"),
        }
    }
    source.download(url, dest).await?;
    Ok(())
}

async fn follow_references(
    store: &mut SchemaStore,
    source: &dyn RemoteSource,
    locations: &Locations,
    opts: &ValidateOptions,
) -> Result<u8> {
    announce_references(locations, &opts.target);
    let dir = tempfile::tempdir()?;
    let mut exit = 0u8;
    let mut provider_references = locations.provider_reference.clone();
    let mut counter = 0usize;
    for (urls, target) in [
        (&locations.in_network, "in-network-rates"),
        (&locations.allowed_amount, "allowed-amounts"),
    ] {
        for url in urls {
            counter += 1;
            match validate_referenced(store, source, url, target, dir.path(), counter, opts).await {
                Ok(outcome) => {
                    if !outcome.pass {
                        exit = 1;
                    }
                    provider_references.extend(outcome.locations.provider_reference);
                }
                Err(err) => {
                    eprintln!("Problem validating referenced {target} file: {err:#}");
                    exit = 1;
                }
            }
        }
    }
    provider_references.sort();
    provider_references.dedup();
    if !provider_references.is_empty() {
        println!("In-network file(s) refer to these files:");
        println!("== Provider Reference ==");
        for url in &provider_references {
            println!("* {url}");
        }
    }
    for url in &provider_references {
        counter += 1;
        match validate_referenced(
            store,
            source,
            url,
            "provider-reference",
            dir.path(),
            counter,
            opts,
        )
        .await
        {
            Ok(outcome) => {
                if !outcome.pass {
                    exit = 1;
                }
            }
            Err(err) => {
                eprintln!("Problem validating referenced provider-reference file: {err:#}");
                exit = 1;
            }
        }
    }
    Ok(exit)
}

fn announce_references(locations: &Locations, target: &str) {
    if target != "table-of-contents" {
        return;
    }
    let total = locations.in_network.len() + locations.allowed_amount.len();
    if total == 0 {
        return;
    }
    let file_text = if total == 1 { "this file" } else { "these files" };
    println!("Table of contents refers to {file_text}:");
    if !locations.in_network.is_empty() {
        println!("== In-Network Rates ==");
        for url in &locations.in_network {
            println!("* {url}");
        }
    }
    if !locations.allowed_amount.is_empty() {
        println!("== Allowed Amounts ==");
        for url in &locations.allowed_amount {
            println!("* {url}");
        }
    }
}

struct ReferencedOutcome {
    pass: bool,
    locations: Locations,
}

async fn validate_referenced(
    store: &mut SchemaStore,
    source: &dyn RemoteSource,
    url: &str,
    target: &str,
    work_dir: &Path,
    index: usize,
    opts: &ValidateOptions,
) -> Result<ReferencedOutcome> {
    println!("File: {url}");
    let dest = work_dir.join(format!("data-{index}.json"));
    fetch_data(source, url, &dest, opts.always_yes).await?;
    let schema_path = store.prepare(target, opts.strict)?;
    let validator = JsonValidator::compile(&schema_path)?;
    let doc = mrf_core::json::load_document(&dest)?;
    let report = validator.validate_value(&doc, opts.fail_fast);
    let verdict = verdict_text(&report);
    println!("{verdict}");
    for violation in &report.violations {
        eprintln!("{violation}");
    }
    if let Some(out) = &opts.out {
        append_result(out, url, target, verdict)?;
    }
    Ok(ReferencedOutcome {
        pass: report.valid,
        locations: extract::collect_locations(&doc, target),
    })
}

fn append_result(out_dir: &Path, url: &str, target: &str, verdict: &str) -> Result<()> {
    let path = out_dir.join("output.txt");
    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    writeln!(file, "{url} - {target}")?;
    writeln!(file, "{verdict}")?;
    Ok(())
}
