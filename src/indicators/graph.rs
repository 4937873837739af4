//! The fixed formula graph: every indexed indicator and normalizing constant, with the direct
//! inputs each one reads. The graph is static, so evaluation order is a property of this file.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::data::TableName;

/// Indicators evaluated per (year, country).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Indicator {
    ROpenT,
    POpenT,
    ROpen,
    RInclT,
    PInclT,
    RIncl,
    ROa,
    F1,
    F2,
    F3,
    SOdT,
    AOdT,
    ROd,
    ROaBar,
    ROdBar,
    ROpBar,
    R,
}

/// Zero-argument indicators: historical ceilings and global maxima.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Constant {
    ROpenT1,
    POpenT1,
    RInclT1,
    PInclT1,
    SOdT1,
    AOdT1,
    ROaMax,
    ROdMax,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Node {
    Table(TableName),
    Indicator(Indicator),
    Constant(Constant),
}

use Node::{Constant as C, Indicator as I, Table as T};

impl Indicator {
    /// Materialization order; every indicator appears after the indicators it reads.
    pub const BATCH_ORDER: [Indicator; 17] = [
        Indicator::ROpenT,
        Indicator::POpenT,
        Indicator::ROpen,
        Indicator::RInclT,
        Indicator::PInclT,
        Indicator::RIncl,
        Indicator::ROa,
        Indicator::F1,
        Indicator::F2,
        Indicator::F3,
        Indicator::SOdT,
        Indicator::AOdT,
        Indicator::ROd,
        Indicator::ROaBar,
        Indicator::ROdBar,
        Indicator::ROpBar,
        Indicator::R,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::ROpenT => "r_open_t",
            Self::POpenT => "P_open_t",
            Self::ROpen => "R_open",
            Self::RInclT => "r_incl_t",
            Self::PInclT => "P_incl_t",
            Self::RIncl => "R_incl",
            Self::ROa => "R_oa",
            Self::F1 => "f1",
            Self::F2 => "f2",
            Self::F3 => "f3",
            Self::SOdT => "S_od_t",
            Self::AOdT => "A_od_t",
            Self::ROd => "R_od",
            Self::ROaBar => "R_oa_bar",
            Self::ROdBar => "R_od_bar",
            Self::ROpBar => "R_op_bar",
            Self::R => "R",
        }
    }

    pub fn from_name(name: &str) -> Option<Indicator> {
        Self::BATCH_ORDER.into_iter().find(|i| i.name() == name)
    }

    pub fn dependencies(&self) -> &'static [Node] {
        match self {
            Self::ROpenT => &[T(TableName::Oa), T(TableName::Total)],
            Self::POpenT => &[T(TableName::Oa)],
            Self::ROpen => &[
                I(Indicator::ROpenT),
                I(Indicator::POpenT),
                C(Constant::ROpenT1),
                C(Constant::POpenT1),
            ],
            Self::RInclT => &[T(TableName::Cooperation), T(TableName::Total)],
            Self::PInclT => &[T(TableName::Cooperation)],
            Self::RIncl => &[
                I(Indicator::RInclT),
                I(Indicator::PInclT),
                C(Constant::RInclT1),
                C(Constant::PInclT1),
            ],
            Self::ROa => &[I(Indicator::ROpen), I(Indicator::RIncl)],
            Self::F1 => &[
                T(TableName::Fwci),
                T(TableName::Scientist),
                T(TableName::WorldTotal),
            ],
            Self::F2 => &[T(TableName::F2)],
            Self::F3 => &[T(TableName::F3)],
            Self::SOdT => &[
                I(Indicator::F1),
                I(Indicator::F2),
                I(Indicator::F3),
                T(TableName::Total),
            ],
            Self::AOdT => &[
                T(TableName::WorldTotal),
                T(TableName::AlphaL),
                T(TableName::AlphaF),
                T(TableName::AlphaI),
            ],
            Self::ROd => &[
                I(Indicator::SOdT),
                I(Indicator::AOdT),
                C(Constant::SOdT1),
                C(Constant::AOdT1),
            ],
            Self::ROaBar => &[I(Indicator::ROa), C(Constant::ROaMax)],
            Self::ROdBar => &[I(Indicator::ROd), C(Constant::ROdMax)],
            Self::ROpBar => &[T(TableName::Op)],
            Self::R => &[
                I(Indicator::ROaBar),
                I(Indicator::ROdBar),
                I(Indicator::ROpBar),
                T(TableName::Weight),
            ],
        }
    }
}

impl Constant {
    pub const ALL: [Constant; 8] = [
        Constant::ROpenT1,
        Constant::POpenT1,
        Constant::RInclT1,
        Constant::PInclT1,
        Constant::SOdT1,
        Constant::AOdT1,
        Constant::ROaMax,
        Constant::ROdMax,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::ROpenT1 => "r_open_t1",
            Self::POpenT1 => "P_open_t1",
            Self::RInclT1 => "r_incl_t1",
            Self::PInclT1 => "P_incl_t1",
            Self::SOdT1 => "S_od_t1",
            Self::AOdT1 => "A_od_t1",
            Self::ROaMax => "R_oa_max",
            Self::ROdMax => "R_od_max",
        }
    }

    pub fn from_name(name: &str) -> Option<Constant> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    /// The per-cell indicator a constant aggregates, and the table whose years/countries it scans.
    pub fn dependencies(&self) -> &'static [Node] {
        match self {
            Self::ROpenT1 => &[I(Indicator::ROpenT), T(TableName::Oa)],
            Self::POpenT1 => &[I(Indicator::POpenT), T(TableName::Oa)],
            Self::RInclT1 => &[I(Indicator::RInclT), T(TableName::Cooperation)],
            Self::PInclT1 => &[I(Indicator::PInclT), T(TableName::Cooperation)],
            Self::SOdT1 => &[I(Indicator::SOdT), T(TableName::Total)],
            Self::AOdT1 => &[
                I(Indicator::AOdT),
                T(TableName::WorldTotal),
                T(TableName::AlphaL),
            ],
            Self::ROaMax => &[I(Indicator::ROa), T(TableName::Oa)],
            Self::ROdMax => &[I(Indicator::ROd), T(TableName::Total)],
        }
    }
}

impl Node {
    pub fn name(&self) -> &'static str {
        match self {
            Node::Table(t) => t.as_str(),
            Node::Indicator(i) => i.name(),
            Node::Constant(c) => c.name(),
        }
    }

    pub fn dependencies(&self) -> &'static [Node] {
        match self {
            Node::Table(_) => &[],
            Node::Indicator(i) => i.dependencies(),
            Node::Constant(c) => c.dependencies(),
        }
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Indicator {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl Serialize for Constant {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("'{indicator}' is listed before '{dependency}', which it reads")]
    OutOfOrder {
        indicator: &'static str,
        dependency: &'static str,
    },
    #[error("'{0}' is listed more than once")]
    Duplicate(&'static str),
}

/// Every indicator reachable from `node`, following constants through to the cells they scan.
pub fn indicator_closure(node: Node) -> HashSet<Indicator> {
    let mut seen = HashSet::new();
    let mut stack: Vec<Node> = node.dependencies().to_vec();
    let mut visited = HashSet::new();
    while let Some(next) = stack.pop() {
        if !visited.insert(next) {
            continue;
        }
        if let Node::Indicator(i) = next {
            seen.insert(i);
        }
        stack.extend_from_slice(next.dependencies());
    }
    seen
}

/// Reject an evaluation order in which an indicator precedes another listed indicator it reads.
/// Indicators left out of the order are fine; they are computed on demand.
pub fn check_order(order: &[Indicator]) -> Result<(), GraphError> {
    let mut placed: HashSet<Indicator> = HashSet::new();
    for (pos, indicator) in order.iter().enumerate() {
        if !placed.insert(*indicator) {
            return Err(GraphError::Duplicate(indicator.name()));
        }
        let later = &order[pos + 1..];
        let needs = indicator_closure(Node::Indicator(*indicator));
        if let Some(dep) = later.iter().find(|l| needs.contains(*l)) {
            return Err(GraphError::OutOfOrder {
                indicator: indicator.name(),
                dependency: dep.name(),
            });
        }
    }
    Ok(())
}

/// Depth-first post-order over every indicator and constant: each node after its inputs.
pub fn topological_order() -> Vec<Node> {
    let roots = Indicator::BATCH_ORDER
        .into_iter()
        .map(Node::Indicator)
        .chain(Constant::ALL.into_iter().map(Node::Constant));
    let mut order = Vec::new();
    let mut done = HashSet::new();
    for root in roots {
        visit(root, &mut done, &mut order);
    }
    order
}

fn visit(node: Node, done: &mut HashSet<Node>, order: &mut Vec<Node>) {
    if matches!(node, Node::Table(_)) || !done.insert(node) {
        return;
    }
    for dep in node.dependencies() {
        visit(*dep, done, order);
    }
    order.push(node);
}
