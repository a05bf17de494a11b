use crate::lineage::{EdgeKind, LabeledObject};
use ctc_measures_core::{Frame, Label, PenaltyConfig};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};

/// The six primitive graph-edit operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    SplitOperation,
    FalseNegativeVertex,
    FalsePositiveVertex,
    RedundantEdge,
    MissingEdge,
    WrongSemanticsEdge,
}

impl OperationKind {
    pub const ALL: [OperationKind; 6] = [
        OperationKind::SplitOperation,
        OperationKind::FalseNegativeVertex,
        OperationKind::FalsePositiveVertex,
        OperationKind::RedundantEdge,
        OperationKind::MissingEdge,
        OperationKind::WrongSemanticsEdge,
    ];

    pub fn weight(self, penalty: &PenaltyConfig) -> f64 {
        match self {
            OperationKind::SplitOperation => penalty.split_op,
            OperationKind::FalseNegativeVertex => penalty.fn_vertex,
            OperationKind::FalsePositiveVertex => penalty.fp_vertex,
            OperationKind::RedundantEdge => penalty.redundant_edge,
            OperationKind::MissingEdge => penalty.missing_edge,
            OperationKind::WrongSemanticsEdge => penalty.wrong_semantics_edge,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            OperationKind::SplitOperation => "Splitting Operations",
            OperationKind::FalseNegativeVertex => "False Negative Vertices",
            OperationKind::FalsePositiveVertex => "False Positive Vertices",
            OperationKind::RedundantEdge => "Redundant Edges To Be Deleted",
            OperationKind::MissingEdge => "Edges To Be Added",
            OperationKind::WrongSemanticsEdge => "Edges with Wrong Semantics",
        }
    }
}

/// One edit operation with the coordinates needed to locate it.
///
/// Edge records of RES-side operations (redundant, wrong semantics) carry RES
/// objects, missing edges carry GT objects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op")]
pub enum OperationRecord {
    SplitOperation {
        frame: Frame,
        res: Label,
        gt: Vec<Label>,
    },
    FalseNegativeVertex {
        frame: Frame,
        gt: Label,
    },
    FalsePositiveVertex {
        frame: Frame,
        res: Label,
    },
    RedundantEdge {
        from: LabeledObject,
        to: LabeledObject,
    },
    MissingEdge {
        from: LabeledObject,
        to: LabeledObject,
    },
    WrongSemanticsEdge {
        from: LabeledObject,
        to: LabeledObject,
        res_kind: EdgeKind,
    },
}

impl OperationRecord {
    pub fn kind(&self) -> OperationKind {
        match self {
            OperationRecord::SplitOperation { .. } => OperationKind::SplitOperation,
            OperationRecord::FalseNegativeVertex { .. } => OperationKind::FalseNegativeVertex,
            OperationRecord::FalsePositiveVertex { .. } => OperationKind::FalsePositiveVertex,
            OperationRecord::RedundantEdge { .. } => OperationKind::RedundantEdge,
            OperationRecord::MissingEdge { .. } => OperationKind::MissingEdge,
            OperationRecord::WrongSemanticsEdge { .. } => OperationKind::WrongSemanticsEdge,
        }
    }
}

fn edge(f: &mut fmt::Formatter<'_>, from: &LabeledObject, to: &LabeledObject) -> fmt::Result {
    write!(
        f,
        "[T={} Label={}] -> [T={} Label={}]",
        from.frame, from.label, to.frame, to.label
    )
}

impl fmt::Display for OperationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationRecord::SplitOperation { frame, res, gt } => {
                write!(f, "T={frame} Label={res} covers GT {gt:?}")
            }
            OperationRecord::FalseNegativeVertex { frame, gt } => {
                write!(f, "T={frame} GT_label={gt}")
            }
            OperationRecord::FalsePositiveVertex { frame, res } => {
                write!(f, "T={frame} Label={res}")
            }
            OperationRecord::RedundantEdge { from, to } | OperationRecord::MissingEdge { from, to } => {
                edge(f, from, to)
            }
            OperationRecord::WrongSemanticsEdge { from, to, res_kind } => {
                edge(f, from, to)?;
                write!(f, " ({res_kind:?} in RES)")
            }
        }
    }
}

/// Render records as the categorized text log, one section per operation kind.
pub fn render_operation_log(records: &[OperationRecord], penalty: &PenaltyConfig) -> String {
    let mut out = String::new();
    for kind in OperationKind::ALL {
        let _ = writeln!(
            out,
            "----------{} (Penalty={})----------",
            kind.title(),
            kind.weight(penalty)
        );
        for r in records.iter().filter(|r| r.kind() == kind) {
            let _ = writeln!(out, "{r}");
        }
    }
    out
}
