// Minimum expected CPU throughput per processor model
//
// Lookup picks the longest table key contained in the model string, so
// "Intel(R) Xeon(R) CPU E5-2650 v2 @ 2.60GHz" grades against the
// "Intel(R) Xeon(R) CPU E5-2650" entry and an unlisted E5 part falls back to
// the generic "Intel(R) Xeon(R) CPU E5" entry.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// CPU benchmark a reference minimum applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    LoopsPerSec,
    Bogomips,
}

impl ReferenceKind {
    /// Map a metric mode name to its reference kind
    pub fn from_mode(mode: &str) -> Option<Self> {
        if mode.contains("loops_per_sec") {
            Some(ReferenceKind::LoopsPerSec)
        } else if mode.contains("bogomips") {
            Some(ReferenceKind::Bogomips)
        } else {
            None
        }
    }
}

/// Result of grading a group mean against the table
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "grade", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferenceGrade {
    Pass { expected_min: f64 },
    Fail { expected_min: f64 },
    NoEntry { model: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceTable {
    entries: BTreeMap<ReferenceKind, BTreeMap<String, f64>>,
}

const XEON: &str = "Intel(R) Xeon(R) CPU";
const X5675: &str = "Intel(R) Xeon(R) CPU X5675 @ 3.07GHz";
const E5_2650_0: &str = "Intel(R) Xeon(R) CPU E5-2650 0 @ 2.00GHz";
const E5_2630_0: &str = "Intel(R) Xeon(R) CPU E5-2630 0 @ 2.30GHz";
const E5_2650: &str = "Intel(R) Xeon(R) CPU E5-2650";
const E5: &str = "Intel(R) Xeon(R) CPU E5";

impl ReferenceTable {
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Known minimums for the Xeon families seen in the field
    pub fn builtin() -> Self {
        let mut table = Self::empty();

        for (model, min) in [
            (XEON, 300.0),
            (X5675, 680.0),
            (E5_2650_0, 450.0),
            (E5_2630_0, 460.0),
            (E5_2650, 420.0),
            (E5, 400.0),
        ] {
            table.insert(ReferenceKind::LoopsPerSec, model, min);
        }

        for (model, min) in [
            (XEON, 3000.0),
            (X5675, 6130.0),
            (E5_2650_0, 3900.0),
            (E5_2630_0, 4580.0),
            (E5_2650, 3900.0),
            (E5, 3500.0),
        ] {
            table.insert(ReferenceKind::Bogomips, model, min);
        }

        table
    }

    pub fn insert(&mut self, kind: ReferenceKind, model: impl Into<String>, min: f64) {
        self.entries.entry(kind).or_default().insert(model.into(), min);
    }

    /// Minimum for the longest key contained in `model`
    pub fn lookup(&self, kind: ReferenceKind, model: &str) -> Option<f64> {
        let model = model.trim();
        self.entries
            .get(&kind)?
            .iter()
            .filter(|(key, _)| !key.is_empty() && model.contains(key.as_str()))
            .max_by_key(|(key, _)| key.len())
            .map(|(_, min)| *min)
    }

    pub fn grade(&self, kind: ReferenceKind, model: &str, mean: f64) -> ReferenceGrade {
        match self.lookup(kind, model) {
            Some(expected_min) if mean >= expected_min => ReferenceGrade::Pass { expected_min },
            Some(expected_min) => ReferenceGrade::Fail { expected_min },
            None => ReferenceGrade::NoEntry {
                model: model.to_string(),
            },
        }
    }
}

impl Default for ReferenceTable {
    fn default() -> Self {
        Self::builtin()
    }
}
