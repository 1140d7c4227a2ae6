//! Name normalization and skill canonicalization.
//!
//! `normalize_key` defines node identity. `SkillRegistry` maps the many
//! spellings a model produces for the same skill onto one canonical display
//! name, and supplies the related-skill expansions used at query time.
//!
//! Lookup is exact first (canonical names and synonyms), then fuzzy: a
//! near-spelling such as "Kubernets" resolves to the closest known spelling
//! when its normalized edit similarity reaches the registry threshold.

use std::collections::HashMap;

/// Fold a name to its identity key: trimmed, lowercased, single-spaced.
pub fn normalize_key(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Canonical skills and the synonyms that resolve to them.
const CANONICAL_SKILLS: &[(&str, &[&str])] = &[
    // Hard skills
    ("React", &["react.js", "reactjs", "react js"]),
    ("React Native", &["react-native", "reactnative"]),
    ("Node.js", &["node", "nodejs", "node js"]),
    ("Python", &["python3", "py"]),
    ("JavaScript", &["js", "javascript es6", "ecmascript"]),
    ("TypeScript", &["ts"]),
    ("AWS", &["amazon web services"]),
    ("Docker", &["docker engine"]),
    ("Kubernetes", &["k8s"]),
    ("PostgreSQL", &["postgres", "psql"]),
    ("SQL", &["structured query language"]),
    ("GraphQL", &["gql"]),
    ("REST API", &["rest", "restful api", "restful apis", "rest apis"]),
    ("Git", &["github", "gitlab"]),
    ("CI/CD", &["ci", "cd", "continuous integration", "continuous delivery"]),
    ("Terraform", &[]),
    ("scikit-learn", &["sklearn", "scikit learn"]),
    // Soft skills
    ("leadership", &["leading", "lead", "team leadership"]),
    ("communication", &["communicating", "communication skills"]),
    ("problem-solving", &["problem solving", "troubleshooting"]),
    ("project management", &["pm", "managing projects"]),
    ("collaboration", &["team collaboration", "teamwork"]),
    ("mentoring", &["mentorship", "coaching"]),
    ("analytical skills", &["analytical", "analysis", "analytical thinking"]),
    ("strategic thinking", &["strategy"]),
];

/// Related skills searched alongside a requested skill.
const SKILL_EXPANSIONS: &[(&str, &[&str])] = &[
    ("React", &["React Native"]),
    ("Python", &["scikit-learn"]),
    ("JavaScript", &["TypeScript"]),
    ("AWS", &["Terraform"]),
];

/// Similarity a near-spelling needs to resolve to a known skill.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.88;

/// Shorter spellings only ever match exactly.
const MIN_FUZZY_CHARS: usize = 5;

/// Lookup table from normalized spelling to canonical skill name.
#[derive(Debug, Clone)]
pub struct SkillRegistry {
    canonical: HashMap<String, String>,
    expansions: HashMap<String, Vec<String>>,
    fuzzy_threshold: f64,
}

impl Default for SkillRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl SkillRegistry {
    /// The registry shipped with the crate.
    pub fn builtin() -> Self {
        let mut canonical = HashMap::new();
        for (name, synonyms) in CANONICAL_SKILLS {
            canonical.insert(normalize_key(name), (*name).to_string());
            for synonym in *synonyms {
                canonical.insert(normalize_key(synonym), (*name).to_string());
            }
        }

        let expansions = SKILL_EXPANSIONS
            .iter()
            .map(|(name, related)| {
                (
                    normalize_key(name),
                    related.iter().map(|r| (*r).to_string()).collect(),
                )
            })
            .collect();

        Self {
            canonical,
            expansions,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
        }
    }

    /// Minimum similarity in `0.0..=1.0` for a fuzzy match. `1.0` disables it.
    pub fn with_fuzzy_threshold(mut self, threshold: f64) -> Self {
        self.fuzzy_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Register an extra canonical skill with its synonyms.
    pub fn with_skill(mut self, name: &str, synonyms: &[&str]) -> Self {
        self.canonical.insert(normalize_key(name), name.to_string());
        for synonym in synonyms {
            self.canonical
                .insert(normalize_key(synonym), name.to_string());
        }
        self
    }

    /// Canonical display name for a raw skill; unknown skills pass through trimmed.
    pub fn canonicalize(&self, raw: &str) -> String {
        let key = normalize_key(raw);
        if let Some(name) = self.canonical.get(&key) {
            return name.clone();
        }
        if let Some((name, score)) = self.closest(&key) {
            tracing::debug!(raw, canonical = %name, score, "Fuzzy skill match");
            return name.to_string();
        }
        raw.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Best known spelling at or above the threshold. Ties go to the smaller key.
    fn closest(&self, key: &str) -> Option<(&str, f64)> {
        if self.fuzzy_threshold >= 1.0 || key.chars().count() < MIN_FUZZY_CHARS {
            return None;
        }

        let mut best: Option<(&str, &str, f64)> = None;
        for (spelling, name) in &self.canonical {
            let score = strsim::normalized_damerau_levenshtein(key, spelling);
            if score < self.fuzzy_threshold {
                continue;
            }
            let better = match best {
                None => true,
                Some((best_spelling, _, best_score)) => {
                    score > best_score || (score == best_score && spelling.as_str() < best_spelling)
                }
            };
            if better {
                best = Some((spelling.as_str(), name.as_str(), score));
            }
        }
        best.map(|(_, name, score)| (name, score))
    }

    /// Canonicalize a list, dropping blanks and duplicates (first occurrence wins).
    pub fn canonicalize_all(&self, raw: &[String]) -> Vec<String> {
        let mut seen = Vec::new();
        let mut out = Vec::new();
        for skill in raw {
            let name = self.canonicalize(skill);
            let key = normalize_key(&name);
            if key.is_empty() || seen.contains(&key) {
                continue;
            }
            seen.push(key);
            out.push(name);
        }
        out
    }

    /// The requested skills plus their related variations, canonicalized and deduplicated.
    pub fn expand(&self, skills: &[String]) -> Vec<String> {
        let mut expanded = Vec::new();
        for skill in self.canonicalize_all(skills) {
            let key = normalize_key(&skill);
            let related = self.expansions.get(&key).cloned().unwrap_or_default();
            expanded.push(skill);
            expanded.extend(related);
        }
        self.canonicalize_all(&expanded)
    }
}
