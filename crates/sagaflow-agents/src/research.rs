//! Research agent: discovers candidate libraries for a query and ranks them.
//!
//! Discovery runs against a small built-in catalog so runs are deterministic
//! and need no network access. Callers can supply their own candidates with
//! the `candidates` variable.

#[cfg(test)]
#[path = "research_tests.rs"]
mod tests;

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use sagaflow_core::{StepAgent, StepAgentBuilder};
use sagaflow_protocols::{
    AGENT_TYPE_RESEARCH, ResultKind, Scores, Step, StepError, StepInput, StepOutput, Values,
    get_as,
};

const DISCOVERY_LIMIT: usize = 5;

/// A library considered by the research agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryFinding {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub documentation_url: String,
    #[serde(default)]
    pub license: String,
    #[serde(default)]
    pub registry: String,
    #[serde(default)]
    pub downloads: u64,
    #[serde(default)]
    pub relevance_score: f64,
    #[serde(default)]
    pub confidence_score: f64,
}

struct CatalogEntry {
    keywords: &'static [&'static str],
    name: &'static str,
    version: &'static str,
    description: &'static str,
    registry: &'static str,
    license: &'static str,
    downloads: u64,
    confidence: f64,
}

const CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        keywords: &["http", "client", "web", "rest"],
        name: "reqwest",
        version: "0.12",
        description: "Ergonomic batteries-included HTTP client",
        registry: "crates.io",
        license: "MIT OR Apache-2.0",
        downloads: 250_000_000,
        confidence: 0.92,
    },
    CatalogEntry {
        keywords: &["http", "server", "client", "web"],
        name: "hyper",
        version: "1.5",
        description: "Fast and correct HTTP implementation",
        registry: "crates.io",
        license: "MIT",
        downloads: 300_000_000,
        confidence: 0.9,
    },
    CatalogEntry {
        keywords: &["http", "client", "blocking"],
        name: "ureq",
        version: "2.12",
        description: "Simple blocking HTTP client",
        registry: "crates.io",
        license: "MIT OR Apache-2.0",
        downloads: 40_000_000,
        confidence: 0.82,
    },
    CatalogEntry {
        keywords: &["async", "runtime", "io", "networking"],
        name: "tokio",
        version: "1.43",
        description: "Event-driven, non-blocking I/O platform",
        registry: "crates.io",
        license: "MIT",
        downloads: 350_000_000,
        confidence: 0.95,
    },
    CatalogEntry {
        keywords: &["async", "runtime"],
        name: "async-std",
        version: "1.13",
        description: "Async version of the Rust standard library",
        registry: "crates.io",
        license: "MIT OR Apache-2.0",
        downloads: 40_000_000,
        confidence: 0.75,
    },
    CatalogEntry {
        keywords: &["async", "runtime", "small"],
        name: "smol",
        version: "2.0",
        description: "Small and fast async runtime",
        registry: "crates.io",
        license: "MIT OR Apache-2.0",
        downloads: 15_000_000,
        confidence: 0.78,
    },
    CatalogEntry {
        keywords: &["sqlite", "database", "sql"],
        name: "rusqlite",
        version: "0.32",
        description: "Ergonomic wrapper for SQLite",
        registry: "crates.io",
        license: "MIT",
        downloads: 40_000_000,
        confidence: 0.9,
    },
    CatalogEntry {
        keywords: &["sqlite", "postgres", "mysql", "database", "sql", "async"],
        name: "sqlx",
        version: "0.8",
        description: "Async SQL toolkit with compile-time checked queries",
        registry: "crates.io",
        license: "MIT OR Apache-2.0",
        downloads: 50_000_000,
        confidence: 0.88,
    },
    CatalogEntry {
        keywords: &["json", "serialization", "serde"],
        name: "serde_json",
        version: "1.0",
        description: "JSON serialization for serde",
        registry: "crates.io",
        license: "MIT OR Apache-2.0",
        downloads: 400_000_000,
        confidence: 0.96,
    },
    CatalogEntry {
        keywords: &["json", "simd", "performance"],
        name: "simd-json",
        version: "0.14",
        description: "SIMD-accelerated JSON parser",
        registry: "crates.io",
        license: "MIT OR Apache-2.0",
        downloads: 8_000_000,
        confidence: 0.8,
    },
    CatalogEntry {
        keywords: &["cli", "args", "arguments", "command"],
        name: "clap",
        version: "4.5",
        description: "Command line argument parser",
        registry: "crates.io",
        license: "MIT OR Apache-2.0",
        downloads: 300_000_000,
        confidence: 0.94,
    },
    CatalogEntry {
        keywords: &["logging", "tracing", "observability"],
        name: "tracing",
        version: "0.1",
        description: "Application-level tracing framework",
        registry: "crates.io",
        license: "MIT",
        downloads: 250_000_000,
        confidence: 0.93,
    },
    CatalogEntry {
        keywords: &["http", "client"],
        name: "axios",
        version: "1.7",
        description: "Promise based HTTP client",
        registry: "npm",
        license: "MIT",
        downloads: 2_000_000_000,
        confidence: 0.9,
    },
    CatalogEntry {
        keywords: &["http", "server", "web"],
        name: "express",
        version: "4.21",
        description: "Minimalist web framework",
        registry: "npm",
        license: "MIT",
        downloads: 1_500_000_000,
        confidence: 0.9,
    },
    CatalogEntry {
        keywords: &["http", "client"],
        name: "requests",
        version: "2.32",
        description: "HTTP for humans",
        registry: "pypi",
        license: "Apache-2.0",
        downloads: 1_000_000_000,
        confidence: 0.93,
    },
];

/// Registry searched for an ecosystem name; `None` searches all of them.
fn ecosystem_registry(ecosystem: &str) -> Option<&'static str> {
    match ecosystem.to_lowercase().as_str() {
        "rust" | "cargo" => Some("crates.io"),
        "node" | "npm" | "javascript" | "typescript" => Some("npm"),
        "python" | "pypi" => Some("pypi"),
        _ => None,
    }
}

fn query_terms(query: &str) -> Vec<String> {
    query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Catalog libraries matching `query`, best match first.
pub fn discover(query: &str, ecosystem: Option<&str>) -> Vec<LibraryFinding> {
    let terms = query_terms(query);
    if terms.is_empty() {
        return Vec::new();
    }
    let registry = ecosystem.and_then(ecosystem_registry);

    let mut matches: Vec<(usize, &CatalogEntry)> = CATALOG
        .iter()
        .filter(|entry| registry.is_none_or(|r| entry.registry == r))
        .filter_map(|entry| {
            let hits = terms
                .iter()
                .filter(|t| entry.keywords.contains(&t.as_str()) || entry.name == t.as_str())
                .count();
            (hits > 0).then_some((hits, entry))
        })
        .collect();
    matches.sort_by(|(a_hits, a), (b_hits, b)| {
        b_hits.cmp(a_hits).then(b.downloads.cmp(&a.downloads))
    });

    matches
        .into_iter()
        .take(DISCOVERY_LIMIT)
        .map(|(hits, entry)| LibraryFinding {
            name: entry.name.to_string(),
            version: entry.version.to_string(),
            description: entry.description.to_string(),
            documentation_url: documentation_url(entry.registry, entry.name),
            license: entry.license.to_string(),
            registry: entry.registry.to_string(),
            downloads: entry.downloads,
            relevance_score: hits as f64 / terms.len() as f64,
            confidence_score: entry.confidence,
        })
        .collect()
}

fn documentation_url(registry: &str, name: &str) -> String {
    match registry {
        "crates.io" => format!("https://docs.rs/{}", name),
        "npm" => format!("https://www.npmjs.com/package/{}", name),
        "pypi" => format!("https://pypi.org/project/{}", name),
        _ => String::new(),
    }
}

fn maturity(downloads: u64) -> &'static str {
    match downloads {
        d if d >= 10_000_000 => "mature",
        d if d >= 100_000 => "growing",
        _ => "new",
    }
}

fn is_permissive(license: &str) -> bool {
    ["MIT", "Apache-2.0", "BSD", "ISC"]
        .iter()
        .any(|l| license.contains(l))
}

fn libraries(input: &StepInput) -> Result<Vec<LibraryFinding>, StepError> {
    input.result_as("libraries")
}

async fn library_discovery(input: StepInput) -> Result<StepOutput, StepError> {
    let query = input.require_str("query", "research query is required")?;
    let focus = input.variable_str("focus").unwrap_or("general");
    let ecosystem = input.variable_str("ecosystem").unwrap_or_default();

    let findings = match input.variable("candidates") {
        Some(candidates) => serde_json::from_value::<Vec<LibraryFinding>>(candidates.clone())
            .map_err(|e| StepError::InvalidInput(format!("invalid candidates: {}", e)))?,
        None => discover(query, Some(ecosystem)),
    };
    debug!("Discovered {} libraries for '{}'", findings.len(), query);

    StepOutput::new()
        .with("query", query)
        .with("focus", focus)
        .with("ecosystem", ecosystem)
        .with("libraries_found", findings.len())
        .with_json("libraries", &findings)
}

async fn documentation_analysis(input: StepInput) -> Result<StepOutput, StepError> {
    let findings = libraries(&input)?;

    let mut analysis = Values::new();
    for lib in &findings {
        analysis.insert(
            lib.name.clone(),
            json!({
                "documentation_url": lib.documentation_url,
                "summary": lib.description,
                "note": "automated summary; manual review recommended",
            }),
        );
    }

    Ok(StepOutput::new()
        .with("documentation_analysis", analysis)
        .with("libraries_analyzed", findings.len()))
}

async fn static_analysis(input: StepInput) -> Result<StepOutput, StepError> {
    let findings = libraries(&input)?;

    let analysis: Vec<Value> = findings
        .iter()
        .map(|lib| {
            json!({
                "name": lib.name,
                "version": lib.version,
                "registry": lib.registry,
                "license": lib.license,
                "license_permissive": is_permissive(&lib.license),
                "maturity": maturity(lib.downloads),
            })
        })
        .collect();

    Ok(StepOutput::new()
        .with("static_analysis", analysis)
        .with("analysis_method", "catalog_metadata"))
}

async fn findings_synthesis(input: StepInput) -> Result<StepOutput, StepError> {
    let mut findings = libraries(&input)?;
    findings.sort_by(|a, b| b.downloads.cmp(&a.downloads));

    let recommendations: Vec<Value> = findings
        .iter()
        .map(|lib| {
            json!({
                "library": lib.name,
                "version": lib.version,
                "registry": lib.registry,
                "downloads": lib.downloads,
                "confidence": lib.confidence_score,
            })
        })
        .collect();

    let primary = findings.first().map(|lib| lib.name.as_str()).unwrap_or_default();
    let risk = if findings.is_empty() { "unknown" } else { "low" };
    let sources: BTreeSet<&str> = findings
        .iter()
        .map(|lib| lib.registry.as_str())
        .filter(|r| !r.is_empty())
        .collect();
    let sources: Vec<&str> = if sources.is_empty() {
        vec!["none"]
    } else {
        sources.into_iter().collect()
    };

    Ok(StepOutput::new()
        .with("recommendations", recommendations)
        .with(
            "summary",
            json!({
                "primary_recommendation": primary,
                "reasoning": "ranked by adoption",
                "risk_assessment": risk,
            }),
        )
        .with(
            "analysis_summary",
            json!({
                "total_libraries_found": findings.len(),
                "methodology": "automated_research",
                "sources": sources,
            }),
        ))
}

/// Mean finding confidence, with bonuses for breadth and standout findings.
pub fn score_findings(results: &Values) -> Scores {
    let findings: Vec<LibraryFinding> = get_as(results, "libraries").unwrap_or_default();
    if findings.is_empty() {
        return Scores::new(0.0, 0.0);
    }

    let count = findings.len() as f64;
    let mean = findings.iter().map(|f| f.confidence_score).sum::<f64>() / count;
    let several = findings.len() > 1;
    let standouts = findings.iter().filter(|f| f.confidence_score > 0.9).count() as f64;

    let confidence = if several { mean + 0.05 } else { mean };
    let quality = 7.0 + if several { 1.0 } else { 0.0 } + 0.5 * standouts;
    Scores::new(confidence, quality)
}

pub fn research_agent(id: &str) -> StepAgentBuilder {
    StepAgent::builder(id, AGENT_TYPE_RESEARCH, ResultKind::Findings)
        .capabilities([
            "library_discovery",
            "documentation_analysis",
            "static_analysis",
            "findings_synthesis",
        ])
        .steps([
            Step::from_fn(
                "library_discovery",
                "Discover candidate libraries",
                |_ctx, input| library_discovery(input),
            )
            .with_timeout(Duration::from_secs(5 * 60))
            .with_retries(2),
            Step::from_fn(
                "documentation_analysis",
                "Analyze library documentation",
                |_ctx, input| documentation_analysis(input),
            )
            .with_timeout(Duration::from_secs(10 * 60))
            .with_retries(2),
            Step::from_fn(
                "static_analysis",
                "Inspect library metadata",
                |_ctx, input| static_analysis(input),
            )
            .with_timeout(Duration::from_secs(8 * 60))
            .with_retries(1),
            Step::from_fn(
                "findings_synthesis",
                "Rank findings and recommend",
                |_ctx, input| findings_synthesis(input),
            )
            .with_timeout(Duration::from_secs(5 * 60))
            .with_retries(1),
        ])
        .scorer(score_findings)
        .artifacts([
            "research_findings.json",
            "library_comparison.md",
            "recommendations.md",
        ])
        .timeout(Duration::from_secs(30 * 60))
}
