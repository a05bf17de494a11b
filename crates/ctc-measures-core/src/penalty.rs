use serde::{Deserialize, Serialize};

/// Weights of the six primitive graph-edit operations.
///
/// This is a plain value: build it once and hand copies to whichever measure
/// needs it. The fields are public, so the scorers call [`Self::validate`]
/// before using them.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PenaltyConfig {
    /// Splitting a RES vertex that covers several GT vertices (per extra GT vertex).
    pub split_op: f64,
    /// Adding a GT vertex that no RES vertex covers.
    pub fn_vertex: f64,
    /// Deleting a RES vertex that covers no GT vertex.
    pub fp_vertex: f64,
    /// Deleting a RES edge with no GT counterpart.
    pub redundant_edge: f64,
    /// Adding a GT edge with no RES counterpart.
    pub missing_edge: f64,
    /// Flipping an edge between temporal and parental semantics.
    pub wrong_semantics_edge: f64,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PenaltyError {
    #[error("penalty '{name}' must be finite and non-negative, got {value}")]
    InvalidWeight { name: &'static str, value: f64 },
}

impl Default for PenaltyConfig {
    fn default() -> Self {
        Self::ctc()
    }
}

impl PenaltyConfig {
    /// Validated constructor, weights in the order of the published measure.
    pub fn new(
        split_op: f64,
        fn_vertex: f64,
        fp_vertex: f64,
        redundant_edge: f64,
        missing_edge: f64,
        wrong_semantics_edge: f64,
    ) -> Result<Self, PenaltyError> {
        Self::from_array([
            split_op,
            fn_vertex,
            fp_vertex,
            redundant_edge,
            missing_edge,
            wrong_semantics_edge,
        ])
    }

    /// Weights used by the Cell Tracking Challenge TRA measure.
    pub const fn ctc() -> Self {
        Self {
            split_op: 5.0,
            fn_vertex: 10.0,
            fp_vertex: 1.0,
            redundant_edge: 1.0,
            missing_edge: 1.5,
            wrong_semantics_edge: 1.0,
        }
    }

    /// Vertex-only weights used by the DET measure.
    pub const fn det() -> Self {
        Self {
            split_op: 5.0,
            fn_vertex: 10.0,
            fp_vertex: 1.0,
            redundant_edge: 0.0,
            missing_edge: 0.0,
            wrong_semantics_edge: 0.0,
        }
    }

    pub fn from_array(w: [f64; 6]) -> Result<Self, PenaltyError> {
        const NAMES: [&str; 6] = [
            "split_op",
            "fn_vertex",
            "fp_vertex",
            "redundant_edge",
            "missing_edge",
            "wrong_semantics_edge",
        ];
        if let Some((name, value)) = NAMES
            .into_iter()
            .zip(w)
            .find(|(_, v)| !v.is_finite() || *v < 0.0)
        {
            return Err(PenaltyError::InvalidWeight { name, value });
        }
        Ok(Self {
            split_op: w[0],
            fn_vertex: w[1],
            fp_vertex: w[2],
            redundant_edge: w[3],
            missing_edge: w[4],
            wrong_semantics_edge: w[5],
        })
    }

    /// Every weight finite and non-negative.
    pub fn validate(&self) -> Result<(), PenaltyError> {
        Self::from_array(self.to_array()).map(|_| ())
    }

    pub fn to_array(&self) -> [f64; 6] {
        [
            self.split_op,
            self.fn_vertex,
            self.fp_vertex,
            self.redundant_edge,
            self.missing_edge,
            self.wrong_semantics_edge,
        ]
    }

    /// Same config with only the vertex weights kept.
    pub fn vertices_only(&self) -> Self {
        Self {
            redundant_edge: 0.0,
            missing_edge: 0.0,
            wrong_semantics_edge: 0.0,
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_match_published_weights() {
        assert_eq!(PenaltyConfig::ctc().to_array(), [5.0, 10.0, 1.0, 1.0, 1.5, 1.0]);
        assert_eq!(PenaltyConfig::det(), PenaltyConfig::ctc().vertices_only());
    }

    #[test]
    fn rejects_negative_and_nan() {
        assert!(PenaltyConfig::new(1.0, -1.0, 1.0, 1.0, 1.0, 1.0).is_err());
        let err = PenaltyConfig::from_array([0.0, 0.0, 0.0, f64::NAN, 0.0, 0.0]).unwrap_err();
        assert!(matches!(
            err,
            PenaltyError::InvalidWeight {
                name: "redundant_edge",
                ..
            }
        ));
    }

    #[test]
    fn hand_built_configs_are_validated() {
        assert_eq!(PenaltyConfig::det().validate(), Ok(()));
        let edited = PenaltyConfig {
            fp_vertex: f64::INFINITY,
            ..PenaltyConfig::ctc()
        };
        assert_eq!(
            edited.validate(),
            Err(PenaltyError::InvalidWeight {
                name: "fp_vertex",
                value: f64::INFINITY,
            })
        );
    }
}
