//! Canned explanation pools and random template selection.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::random::{RandomSource, ThreadRandom};
use super::topics::Subject;

/// Which pool a canned reply is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolKind {
    Subject(Subject),
    General,
}

impl From<Option<Subject>> for PoolKind {
    fn from(subject: Option<Subject>) -> Self {
        subject.map_or(PoolKind::General, PoolKind::Subject)
    }
}

/// A fixed set of templates plus the framing wrapped around them.
#[derive(Debug, Clone, Copy)]
pub struct ResponsePool {
    pub kind: PoolKind,
    pub preamble: &'static str,
    pub templates: &'static [&'static str],
    pub study_advice: &'static [&'static str],
}

static PHYSICS_POOL: ResponsePool = ResponsePool {
    kind: PoolKind::Subject(Subject::Physics),
    preamble: "Great physics question! Let's break it down.",
    templates: &[
        "Physics describes how matter and energy behave. Newton's three laws are a good anchor: an object keeps its state of motion unless a net force acts on it, force equals mass times acceleration (F = ma), and every action has an equal and opposite reaction.",
        "Most mechanics problems come down to forces. Draw a free-body diagram, list every force acting on the object, and add them up. The net force tells you how the motion will change.",
        "Energy is never created or destroyed, only converted. Kinetic energy (½mv²) and potential energy (mgh) trade back and forth, which is why a swinging pendulum speeds up at the bottom and slows down at the top.",
        "Gravity pulls every mass toward every other mass. Near Earth's surface that pull gives an acceleration of about 9.8 m/s², no matter how heavy the falling object is (ignoring air resistance).",
    ],
    study_advice: &[
        "Sketch the situation before writing any equations",
        "Keep track of units at every step",
        "Check that your answer makes physical sense",
    ],
};

static CHEMISTRY_POOL: ResponsePool = ResponsePool {
    kind: PoolKind::Subject(Subject::Chemistry),
    preamble: "Chemistry is all about how matter is built and how it changes. Here's the idea:",
    templates: &[
        "Everything is made of atoms, and the periodic table organizes elements by their number of protons. Elements in the same column share similar chemical behavior because they have the same number of outer electrons.",
        "Chemical reactions rearrange atoms; they never create or destroy them. That's why equations must be balanced: count each element on both sides and adjust the coefficients until they match.",
        "Atoms bond to reach a stable arrangement of electrons. Ionic bonds transfer electrons between atoms, while covalent bonds share them.",
        "Acids release hydrogen ions in water and bases accept them. The pH scale runs from 0 to 14, with 7 being neutral.",
    ],
    study_advice: &[
        "Memorize the first twenty elements and their symbols",
        "Practice balancing equations until it feels automatic",
        "Link every reaction to what happens to the electrons",
    ],
};

static BIOLOGY_POOL: ResponsePool = ResponsePool {
    kind: PoolKind::Subject(Subject::Biology),
    preamble: "Let's explore how living things work.",
    templates: &[
        "The cell is the basic unit of life. Every organism is built from one or more cells, and each cell carries DNA with the instructions it needs to grow and divide.",
        "Photosynthesis lets plants turn light energy into chemical energy: carbon dioxide and water become glucose and oxygen inside the chloroplasts.",
        "Evolution by natural selection explains how species change over time. Individuals with traits that suit their environment survive and reproduce more, passing those traits on.",
        "DNA is read in two steps: transcription copies a gene into RNA, and translation uses that RNA to build a protein.",
    ],
    study_advice: &[
        "Draw and label diagrams of the structures you study",
        "Connect each structure to its function",
        "Use flashcards for key vocabulary",
    ],
};

static MATH_POOL: ResponsePool = ResponsePool {
    kind: PoolKind::Subject(Subject::Math),
    preamble: "Let's reason through this mathematically.",
    templates: &[
        "Solving an equation means keeping it balanced: whatever you do to one side you must do to the other, step by step, until the unknown stands alone.",
        "Fractions describe parts of a whole. To add them, rewrite both with a common denominator first, then add the numerators.",
        "In geometry, start from what you know for sure: the angles of a triangle add up to 180°, and the Pythagorean theorem (a² + b² = c²) links the sides of a right triangle.",
        "A derivative measures how fast something changes. If you picture a curve, the derivative at a point is the slope of the line just touching it there.",
    ],
    study_advice: &[
        "Work through examples by hand before checking the answer",
        "Write down every step so you can find mistakes",
        "Redo problems you got wrong a few days later",
    ],
};

static GENERAL_POOL: ResponsePool = ResponsePool {
    kind: PoolKind::General,
    preamble: "That's a great question! Let me help you think it through.",
    templates: &[
        "Learning works best when you break a big idea into smaller pieces. Tell me which part feels unclear and we can go through it together.",
        "A good way to understand something new is to explain it in your own words. Try summarizing what you already know, and we can fill in the gaps.",
        "I can help with physics, chemistry, biology, and math, or work through a calculation with you. What would you like to dig into?",
        "Every expert started as a beginner. Let's find the key concept behind your question and build up from there.",
    ],
    study_advice: &[
        "Study in short, focused sessions",
        "Test yourself instead of just rereading notes",
        "Ask questions whenever something doesn't make sense",
    ],
};

impl ResponsePool {
    /// The built-in pool for a kind.
    pub fn for_kind(kind: PoolKind) -> &'static ResponsePool {
        match kind {
            PoolKind::Subject(Subject::Physics) => &PHYSICS_POOL,
            PoolKind::Subject(Subject::Chemistry) => &CHEMISTRY_POOL,
            PoolKind::Subject(Subject::Biology) => &BIOLOGY_POOL,
            PoolKind::Subject(Subject::Math) => &MATH_POOL,
            PoolKind::General => &GENERAL_POOL,
        }
    }

    /// Wrap a template in this pool's preamble and study advice.
    pub fn frame(&self, template: &str) -> String {
        let advice = self
            .study_advice
            .iter()
            .map(|line| format!("• {}", line))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "{}\n\n{}\n\nTo make it stick:\n{}",
            self.preamble, template, advice
        )
    }
}

/// A template drawn from a pool, already framed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CannedResponse {
    pub pool: PoolKind,
    pub template_index: usize,
    pub body: String,
}

/// Picks a template uniformly at random from a pool.
#[derive(Clone)]
pub struct ResponseSelector {
    random: Arc<dyn RandomSource>,
}

impl Default for ResponseSelector {
    fn default() -> Self {
        Self::new(Arc::new(ThreadRandom))
    }
}

impl std::fmt::Debug for ResponseSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseSelector").finish_non_exhaustive()
    }
}

impl ResponseSelector {
    pub fn new(random: Arc<dyn RandomSource>) -> Self {
        Self { random }
    }

    /// Select and frame a template from the pool for `kind`.
    pub fn select(&self, kind: PoolKind) -> CannedResponse {
        let pool = ResponsePool::for_kind(kind);
        let template_index = match pool.templates.len() {
            0 | 1 => 0,
            len => self.random.pick_index(len),
        };
        let template = pool.templates.get(template_index).copied().unwrap_or_default();

        CannedResponse {
            pool: kind,
            template_index,
            body: pool.frame(template),
        }
    }
}
