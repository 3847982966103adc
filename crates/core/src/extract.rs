use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Marker segment: descend into every element of an array.
const ARRAY: &str = "[]";

/// A report file fed from one path in a validated document.
pub struct ReportSpec {
    pub file_name: &'static str,
    pub path: &'static [&'static str],
}

const IN_NETWORK_RATES_REPORTS: &[ReportSpec] = &[
    ReportSpec {
        file_name: "additionalInfo.json",
        path: &[
            "in_network",
            ARRAY,
            "negotiated_rates",
            ARRAY,
            "negotiated_prices",
            ARRAY,
            "additional_information",
        ],
    },
    ReportSpec {
        file_name: "negotiatedType.json",
        path: &[
            "in_network",
            ARRAY,
            "negotiated_rates",
            ARRAY,
            "negotiated_prices",
            ARRAY,
            "negotiated_type",
        ],
    },
    ReportSpec {
        file_name: "providerGroups.json",
        path: &["in_network", ARRAY, "negotiated_rates", ARRAY, "provider_groups"],
    },
    ReportSpec {
        file_name: "providerReferences.json",
        path: &["provider_references", ARRAY, "location"],
    },
    ReportSpec {
        file_name: "lastUpdated.json",
        path: &["last_updated_on"],
    },
];

const ALLOWED_AMOUNTS_REPORTS: &[ReportSpec] = &[ReportSpec {
    file_name: "lastUpdated.json",
    path: &["last_updated_on"],
}];

const TABLE_OF_CONTENTS_REPORTS: &[ReportSpec] = &[
    ReportSpec {
        file_name: "allowedAmountFiles.json",
        path: &["reporting_structure", ARRAY, "allowed_amount_file"],
    },
    ReportSpec {
        file_name: "inNetworkFiles.json",
        path: &["reporting_structure", ARRAY, "in_network_files"],
    },
];

pub fn report_specs(target: &str) -> &'static [ReportSpec] {
    match target {
        "in-network-rates" => IN_NETWORK_RATES_REPORTS,
        "allowed-amounts" => ALLOWED_AMOUNTS_REPORTS,
        "table-of-contents" => TABLE_OF_CONTENTS_REPORTS,
        _ => &[],
    }
}

/// File URLs referenced by a validated document, used to chain validation
/// of the files a table of contents or an in-network file points at.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Locations {
    #[serde(rename = "inNetwork")]
    pub in_network: Vec<String>,
    #[serde(rename = "allowedAmount")]
    pub allowed_amount: Vec<String>,
    #[serde(rename = "providerReference")]
    pub provider_reference: Vec<String>,
}

impl Locations {
    pub fn is_empty(&self) -> bool {
        self.in_network.is_empty()
            && self.allowed_amount.is_empty()
            && self.provider_reference.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Extract every value reachable through the spec's path, keyed by the
/// concrete dotted path with array indices (`provider_references.0.location`).
pub fn extract_report(doc: &Value, spec: &ReportSpec) -> Map<String, Value> {
    let mut out = Map::new();
    let mut prefix = Vec::new();
    walk(doc, spec.path, &mut prefix, &mut out);
    out
}

fn walk(value: &Value, segments: &[&str], prefix: &mut Vec<String>, out: &mut Map<String, Value>) {
    let Some((seg, rest)) = segments.split_first() else {
        out.insert(prefix.join("."), value.clone());
        return;
    };
    if *seg == ARRAY {
        if let Value::Array(items) = value {
            for (i, item) in items.iter().enumerate() {
                prefix.push(i.to_string());
                walk(item, rest, prefix, out);
                prefix.pop();
            }
        }
    } else if let Some(child) = value.get(*seg) {
        prefix.push((*seg).to_string());
        walk(child, rest, prefix, out);
        prefix.pop();
    }
}

pub fn collect_locations(doc: &Value, target: &str) -> Locations {
    let mut locations = Locations::default();
    match target {
        "in-network-rates" => {
            gather(
                doc,
                &["provider_references", ARRAY, "location"],
                &mut locations.provider_reference,
            );
        }
        "table-of-contents" => {
            gather(
                doc,
                &["reporting_structure", ARRAY, "in_network_files"],
                &mut locations.in_network,
            );
            gather(
                doc,
                &["reporting_structure", ARRAY, "allowed_amount_file"],
                &mut locations.allowed_amount,
            );
        }
        _ => {}
    }
    locations
}

fn gather(doc: &Value, segments: &[&str], out: &mut Vec<String>) {
    let mut matches = Map::new();
    let mut prefix = Vec::new();
    walk(doc, segments, &mut prefix, &mut matches);
    for value in matches.values() {
        location_strings(value, out);
    }
}

fn location_strings(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Array(items) => {
            for item in items {
                location_strings(item, out);
            }
        }
        Value::Object(map) => {
            if let Some(Value::String(s)) = map.get("location") {
                out.push(s.clone());
            }
        }
        _ => {}
    }
}

/// Write the per-path report files and, when the document references other
/// files, a `locations.json` summary. Returns the paths written.
pub fn write_reports(doc: &Value, target: &str, out_dir: &Path) -> Result<Vec<PathBuf>, ExtractError> {
    let mut written = Vec::new();
    for spec in report_specs(target) {
        let map = extract_report(doc, spec);
        let path = out_dir.join(spec.file_name);
        fs::write(&path, serde_json::to_string_pretty(&Value::Object(map))?)?;
        written.push(path);
    }
    let locations = collect_locations(doc, target);
    if !locations.is_empty() {
        let path = out_dir.join("locations.json");
        fs::write(&path, serde_json::to_string_pretty(&locations)?)?;
        written.push(path);
    }
    Ok(written)
}
