//! Rule recommending static port forwarding for deployed resources.
//!
//! # Rationale
//!
//! Without a `portForward` stanza, forwarded ports are picked dynamically
//! and change between runs. Pinning them keeps bookmarks, scripts and
//! debugger configurations stable.
//!
//! # Detected Patterns
//!
//! A descriptor document without a top-level `portForward` field. The
//! recommended stanza is filled from the kubectl manifests the unit deploys.

use deploylint_core::utils::{self, yaml};
use deploylint_core::{
    Action, ArtifactKind, CatalogError, FieldFilter, FieldMap, Filter, LintInput,
    RecommendedTemplate, Rule, RuleError, RuleId,
};
use serde_yaml::Value;
use std::fmt::Write;
use std::path::Path;
use tracing::{debug, info};

/// Rule id for use-static-port.
pub const ID: RuleId = RuleId::new("DL002", "use-static-port");

const DEFAULT_TYPE: &str = "<TYPE-OF-DEPLOYED-RESOURCE>";
const DEFAULT_NAME: &str = "<NAME-OF-DEPLOYED-RESOURCE>";
const DEFAULT_PORT: &str = "<PORT-#-OR-NAMED-PORT-FOR-DEPLOYED-RESOURCE>";
const DEFAULT_LOCAL_PORT: &str = "<LOCAL-PORT-FOR-DEPLOYED-RESOURCE>";

/// Builds the rule.
///
/// # Errors
///
/// Returns an error if the field filter cannot be built.
pub fn rule() -> Result<Rule, CatalogError> {
    let filter = FieldFilter::new("portForward")?.inverted();
    Ok(Rule::new(ID, ArtifactKind::Pipeline, Filter::Field(filter))
        .with_description("Recommends a static portForward stanza for deployed resources")
        .with_explanation(
            "Found no static port (vs one chosen dynamically) for port forwarding on deployed \
             resources, so forwarded addresses change between runs. It is recommended to add the \
             following stanza at the end of your skaffold.yaml:\n\
             {{.FieldMap.stanza}}",
        )
        .with_populator(populate)
        .with_recommendation(RecommendedTemplate::new(
            Action::Add,
            "{{.FieldMap.stanza}}",
        )))
}

/// A deployed resource that can be port-forwarded.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Forward {
    resource_type: String,
    resource_name: String,
    port: String,
    local_port: String,
}

impl Default for Forward {
    fn default() -> Self {
        Self {
            resource_type: DEFAULT_TYPE.to_string(),
            resource_name: DEFAULT_NAME.to_string(),
            port: DEFAULT_PORT.to_string(),
            local_port: DEFAULT_LOCAL_PORT.to_string(),
        }
    }
}

fn populate(input: &LintInput) -> Result<FieldMap, RuleError> {
    let mut forwards = Vec::new();
    if let Some(unit) = input.unit() {
        let base = input.abs_path().parent().unwrap_or_else(|| Path::new("."));
        for pattern in unit.manifests() {
            if utils::is_url(pattern) {
                info!(
                    "Found url manifest when processing rule {} and is skipping it: {}",
                    ID.code, pattern
                );
                continue;
            }
            forwards.extend(manifest_forwards(base, pattern)?);
        }
    }
    if forwards.is_empty() {
        forwards.push(Forward::default());
    }

    let first = forwards[0].clone();
    Ok(FieldMap::from([
        ("resourceType".to_string(), first.resource_type),
        ("resourceName".to_string(), first.resource_name),
        ("port".to_string(), first.port),
        ("localPort".to_string(), first.local_port),
        ("stanza".to_string(), stanza(&forwards)),
    ]))
}

fn manifest_forwards(base: &Path, pattern: &str) -> Result<Vec<Forward>, RuleError> {
    let full = base.join(pattern);
    let full = utils::to_slash(&full);
    let paths = glob::glob(&full)
        .map_err(|e| RuleError::Populate(format!("invalid manifest pattern `{pattern}`: {e}")))?;

    let mut forwards = Vec::new();
    for entry in paths {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                debug!("Skipping manifest path {}: {}", e.path().display(), e.error());
                continue;
            }
        };
        let Ok(text) = std::fs::read_to_string(&path) else {
            debug!("Skipping unreadable manifest {}", path.display());
            continue;
        };
        let Ok(docs) = yaml::parse_documents(&text) else {
            debug!("Skipping unparsable manifest {}", path.display());
            continue;
        };
        forwards.extend(docs.iter().filter_map(|d| forward_for(&d.value)));
    }
    Ok(forwards)
}

fn forward_for(doc: &Value) -> Option<Forward> {
    let kind = doc.get("kind")?.as_str()?;
    let name = yaml::lookup(doc, &["metadata", "name"])
        .first()
        .and_then(|v| yaml::scalar_string(v))?;

    let port_path: &[&str] = match kind {
        "Service" => &["spec", "ports", "*", "port"],
        "Pod" => &["spec", "containers", "*", "ports", "*", "containerPort"],
        "Deployment" | "StatefulSet" | "DaemonSet" | "ReplicaSet" => &[
            "spec",
            "template",
            "spec",
            "containers",
            "*",
            "ports",
            "*",
            "containerPort",
        ],
        _ => return None,
    };
    let port = yaml::lookup(doc, port_path)
        .first()
        .and_then(|v| yaml::scalar_string(v));

    let mut forward = Forward {
        resource_type: kind.to_ascii_lowercase(),
        resource_name: name,
        ..Forward::default()
    };
    if let Some(port) = port {
        forward.local_port = port.clone();
        forward.port = port;
    }
    Some(forward)
}

fn stanza(forwards: &[Forward]) -> String {
    let mut out = String::from("portForward:\n");
    for f in forwards {
        let _ = writeln!(out, "- resourceType: {}", f.resource_type);
        let _ = writeln!(out, "  resourceName: {}", f.resource_name);
        let _ = writeln!(out, "  port: {}", f.port);
        let _ = writeln!(out, "  localPort: {}", f.local_port);
    }
    out
}
