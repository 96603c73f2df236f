//! Rate limit policy configuration and path matching.
//!
//! A policy table is an ordered list of `(pattern, max_requests,
//! window_seconds)` entries plus a mandatory `default` entry. Patterns are
//! either exact paths or contain a single `*` that matches any run of
//! characters between a literal prefix and suffix.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

use super::key::{EndpointCategory, DEFAULT_CATEGORY};
use crate::error::{Result, VotegateError};

/// The wildcard marker accepted in patterns.
pub const WILDCARD: char = '*';

/// A single rate limit policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyEntry {
    /// Exact path, single-wildcard pattern, or `default`
    pub pattern: String,
    /// Requests allowed inside the window
    pub max_requests: u32,
    /// Length of the sliding window in seconds
    pub window_seconds: u32,
}

impl PolicyEntry {
    pub fn new(pattern: &str, max_requests: u32, window_seconds: u32) -> Self {
        Self {
            pattern: pattern.to_string(),
            max_requests,
            window_seconds,
        }
    }

    fn is_default(&self) -> bool {
        self.pattern == DEFAULT_CATEGORY
    }
}

/// The policy set the voting platform ships with.
pub fn reference_policies() -> Vec<PolicyEntry> {
    vec![
        PolicyEntry::new("/api/v1/responses", 5, 300),
        PolicyEntry::new("/api/v1/responses/anonymous", 3, 300),
        PolicyEntry::new("/api/v1/uploads/images", 20, 300),
        PolicyEntry::new("/api/v1/auth/register", 5, 300),
        PolicyEntry::new("/api/v1/auth/login", 10, 300),
        PolicyEntry::new("/api/v1/auth/token", 10, 300),
        PolicyEntry::new("/api/v1/auth/password-reset/request", 3, 600),
        PolicyEntry::new("/api/v1/auth/password-reset", 3, 600),
        PolicyEntry::new(DEFAULT_CATEGORY, 100, 300),
    ]
}

/// Paths that bypass rate limiting out of the box.
pub fn reference_exclusions() -> Vec<String> {
    ["/health", "/healthz", "/docs", "/openapi.json", "/favicon.ico", "/static/*"]
        .iter()
        .map(|p| p.to_string())
        .collect()
}

/// On-disk layout of a policy file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyFile {
    #[serde(default)]
    pub policies: Vec<PolicyEntry>,
}

/// Compiled form of a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Matcher {
    Exact(String),
    Wildcard { prefix: String, suffix: String },
}

impl Matcher {
    /// Split on the first wildcard. Patterns are validated before this is
    /// called, so at most one is present.
    fn compile(pattern: &str) -> Self {
        match pattern.split_once(WILDCARD) {
            Some((prefix, suffix)) => Matcher::Wildcard {
                prefix: prefix.to_string(),
                suffix: suffix.to_string(),
            },
            None => Matcher::Exact(pattern.to_string()),
        }
    }

    fn matches(&self, path: &str) -> bool {
        match self {
            Matcher::Exact(exact) => path == exact,
            // prefix and suffix must not overlap
            Matcher::Wildcard { prefix, suffix } => {
                path.len() >= prefix.len() + suffix.len()
                    && path.starts_with(prefix.as_str())
                    && path.ends_with(suffix.as_str())
            }
        }
    }
}

fn validate_pattern(pattern: &str) -> Result<()> {
    if pattern.is_empty() {
        return Err(VotegateError::InvalidPolicy("pattern must not be empty".into()));
    }
    if pattern.matches(WILDCARD).count() > 1 {
        return Err(VotegateError::InvalidPolicy(format!(
            "pattern '{}' contains more than one '{}'",
            pattern, WILDCARD
        )));
    }
    Ok(())
}

#[derive(Debug, Clone)]
struct CompiledPolicy {
    matcher: Matcher,
    category: EndpointCategory,
    entry: PolicyEntry,
}

/// Immutable, ordered policy table.
#[derive(Debug, Clone)]
pub struct PolicyTable {
    policies: Vec<CompiledPolicy>,
    default: PolicyEntry,
    default_category: EndpointCategory,
}

impl PolicyTable {
    /// Validate and compile a list of policy entries.
    ///
    /// Exactly one entry must use the `default` pattern. Limits and windows
    /// must be positive, patterns unique, and each may carry at most one
    /// wildcard.
    pub fn new(entries: Vec<PolicyEntry>) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut defaults = 0;

        for entry in &entries {
            validate_pattern(&entry.pattern)?;

            if entry.max_requests == 0 {
                return Err(VotegateError::InvalidPolicy(format!(
                    "'{}': max_requests must be positive",
                    entry.pattern
                )));
            }
            if entry.window_seconds == 0 {
                return Err(VotegateError::InvalidPolicy(format!(
                    "'{}': window_seconds must be positive",
                    entry.pattern
                )));
            }
            if !seen.insert(entry.pattern.as_str()) {
                return Err(VotegateError::InvalidPolicy(format!(
                    "duplicate pattern '{}'",
                    entry.pattern
                )));
            }
            if entry.is_default() {
                defaults += 1;
            }
        }

        if defaults == 0 {
            return Err(VotegateError::InvalidPolicy(format!(
                "a '{}' policy is required",
                DEFAULT_CATEGORY
            )));
        }

        Ok(Self::compile(entries))
    }

    fn compile(entries: Vec<PolicyEntry>) -> Self {
        let mut default = None;
        let mut policies = Vec::with_capacity(entries.len());

        for entry in entries {
            if entry.is_default() {
                default = Some(entry);
            } else {
                policies.push(CompiledPolicy {
                    matcher: Matcher::compile(&entry.pattern),
                    category: EndpointCategory::new(&entry.pattern),
                    entry,
                });
            }
        }

        Self {
            policies,
            default: default.unwrap_or_else(|| PolicyEntry::new(DEFAULT_CATEGORY, 100, 300)),
            default_category: EndpointCategory::default_category(),
        }
    }

    /// Load a policy table from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading rate limit policies");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load a policy table from YAML text with a top-level `policies` list.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let file: PolicyFile = serde_yaml::from_str(yaml).map_err(|e| {
            VotegateError::Config(format!("Failed to parse rate limit policies: {}", e))
        })?;
        Self::new(file.policies)
    }

    /// Resolve the category governing `path`. First match in table order
    /// wins; no match yields the default category.
    pub fn resolve(&self, path: &str) -> EndpointCategory {
        self.policies
            .iter()
            .find(|p| p.matcher.matches(path))
            .map(|p| p.category.clone())
            .unwrap_or_else(|| self.default_category.clone())
    }

    /// The policy for a category, falling back to the default entry.
    pub fn entry(&self, category: &EndpointCategory) -> &PolicyEntry {
        self.policies
            .iter()
            .find(|p| &p.category == category)
            .map(|p| &p.entry)
            .unwrap_or(&self.default)
    }

    /// Resolve `path` and return its category together with its policy.
    pub fn policy_for(&self, path: &str) -> (EndpointCategory, &PolicyEntry) {
        let category = self.resolve(path);
        let entry = self.entry(&category);
        (category, entry)
    }

    pub fn default_entry(&self) -> &PolicyEntry {
        &self.default
    }

    /// All entries in table order, with the default last.
    pub fn entries(&self) -> Vec<PolicyEntry> {
        self.policies
            .iter()
            .map(|p| p.entry.clone())
            .chain(std::iter::once(self.default.clone()))
            .collect()
    }

    /// Number of entries including the default.
    pub fn len(&self) -> usize {
        self.policies.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// The longest window across every entry, in seconds.
    pub fn longest_window(&self) -> u32 {
        self.policies
            .iter()
            .map(|p| p.entry.window_seconds)
            .fold(self.default.window_seconds, u32::max)
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::compile(reference_policies())
    }
}

/// Paths that bypass the limiter entirely, matched like policy patterns.
#[derive(Debug, Clone, Default)]
pub struct ExclusionList {
    patterns: Vec<String>,
    matchers: Vec<Matcher>,
}

impl ExclusionList {
    pub fn new(patterns: &[String]) -> Result<Self> {
        for pattern in patterns {
            validate_pattern(pattern)?;
        }

        Ok(Self {
            patterns: patterns.to_vec(),
            matchers: patterns.iter().map(|p| Matcher::compile(p)).collect(),
        })
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.matchers.iter().any(|m| m.matches(path))
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}
