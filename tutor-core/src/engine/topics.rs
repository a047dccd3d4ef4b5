//! Keyword-based subject classification.
//!
//! Matching is plain substring containment on the lower-cased message, so
//! "cell" also matches "cellular" (and "atom" matches "anatomy"). The first
//! subject in table order with any hit wins; there is no scoring.

use serde::{Deserialize, Serialize};

/// Subjects with a dedicated response pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    Physics,
    Chemistry,
    Biology,
    Math,
}

impl Subject {
    /// Table order; also the tie-break when several subjects match.
    pub const ALL: [Subject; 4] = [
        Subject::Physics,
        Subject::Chemistry,
        Subject::Biology,
        Subject::Math,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Physics => "physics",
            Self::Chemistry => "chemistry",
            Self::Biology => "biology",
            Self::Math => "math",
        }
    }

    /// Built-in keywords for this subject (lower-case).
    pub fn default_keywords(&self) -> &'static [&'static str] {
        match self {
            Self::Physics => &[
                "physics",
                "gravity",
                "newton",
                "force",
                "motion",
                "velocity",
                "acceleration",
                "momentum",
                "energy",
                "friction",
                "inertia",
                "quantum",
                "relativity",
                "electricity",
                "magnet",
            ],
            Self::Chemistry => &[
                "chemistry",
                "chemical",
                "molecule",
                "atom",
                "element",
                "periodic table",
                "reaction",
                "compound",
                "acid",
                "electron",
                "covalent",
                "ionic",
                "molar",
            ],
            Self::Biology => &[
                "biology",
                "cell",
                "dna",
                "genes",
                "genetic",
                "evolution",
                "organism",
                "photosynthesis",
                "protein",
                "ecosystem",
                "mitosis",
                "enzyme",
                "species",
            ],
            Self::Math => &[
                "math",
                "algebra",
                "equation",
                "calculus",
                "geometry",
                "fraction",
                "derivative",
                "integral",
                "theorem",
                "trigonometry",
                "probability",
                "polynomial",
            ],
        }
    }
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Ordered table of subject keywords.
#[derive(Debug, Clone)]
pub struct TopicClassifier {
    table: Vec<(Subject, Vec<String>)>,
}

impl Default for TopicClassifier {
    fn default() -> Self {
        Self {
            table: Subject::ALL
                .into_iter()
                .map(|subject| {
                    let keywords = subject
                        .default_keywords()
                        .iter()
                        .map(|k| k.to_string())
                        .collect();
                    (subject, keywords)
                })
                .collect(),
        }
    }
}

impl TopicClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a classifier from an explicit table. Keywords are lower-cased
    /// and blank ones dropped; iteration order is preserved.
    pub fn with_table(table: Vec<(Subject, Vec<String>)>) -> Self {
        let table = table
            .into_iter()
            .map(|(subject, keywords)| {
                let keywords = keywords
                    .into_iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect();
                (subject, keywords)
            })
            .collect();
        Self { table }
    }

    /// First subject whose keywords appear anywhere in the message.
    pub fn classify(&self, message: &str) -> Option<Subject> {
        let lowered = message.to_lowercase();
        self.table
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k.as_str())))
            .map(|(subject, _)| *subject)
    }

    /// Keywords from `subject` found in the message, for diagnostics.
    pub fn matched_keywords(&self, message: &str, subject: Subject) -> Vec<&str> {
        let lowered = message.to_lowercase();
        self.table
            .iter()
            .filter(|(s, _)| *s == subject)
            .flat_map(|(_, keywords)| keywords.iter())
            .filter(|k| lowered.contains(k.as_str()))
            .map(String::as_str)
            .collect()
    }
}
