//! Per-cell formulas. Every input is fetched through the evaluator, so shared sub-results are
//! computed once per generation. Any missing operand or zero denominator yields `None`.

use crate::data::{TableName, Value};
use crate::indicators::eval::Evaluator;
use crate::indicators::graph::{Constant, Indicator};

/// First year in which f1 blends in the scientist share.
pub const F1_BLEND_FROM_YEAR: i32 = 2014;
pub const F1_FWCI_WEIGHT: f64 = 0.8;
pub const F1_SHARE_WEIGHT: f64 = 0.2;

pub const WORLD_OA_TOTAL_KEY: &str = "world_oa_total";
pub const WORLD_SCIENTIST_KEY: &str = "world_scientist";
/// Key used by existing `world_total.json` files.
pub const LEGACY_WORLD_SCIENTIST_KEY: &str = "word_scientist";

pub(crate) fn compute(ev: &mut Evaluator<'_>, indicator: Indicator, year: i32, country: &str) -> Value {
    let snap = ev.snapshot();
    match indicator {
        Indicator::ROpBar => {
            let row = snap.row(TableName::Op, year)?;
            let own = row.get(country).copied().flatten()?;
            let peak = max_of(row.values().filter_map(|v| *v))?;
            ratio(Some(own), Some(peak))
        }
        Indicator::ROpenT => ratio(
            snap.get(TableName::Oa, year, country),
            snap.get(TableName::Total, year, country),
        ),
        Indicator::POpenT => snap.get(TableName::Oa, year, country),
        Indicator::ROpen => blend_half(
            ev,
            (Indicator::ROpenT, Constant::ROpenT1),
            (Indicator::POpenT, Constant::POpenT1),
            year,
            country,
        ),
        Indicator::RInclT => ratio(
            snap.get(TableName::Cooperation, year, country),
            snap.get(TableName::Total, year, country),
        ),
        Indicator::PInclT => snap.get(TableName::Cooperation, year, country),
        Indicator::RIncl => blend_half(
            ev,
            (Indicator::RInclT, Constant::RInclT1),
            (Indicator::PInclT, Constant::PInclT1),
            year,
            country,
        ),
        Indicator::ROa => {
            let open = ev.value(Indicator::ROpen, year, country)?;
            let incl = ev.value(Indicator::RIncl, year, country)?;
            Some(open.hypot(incl))
        }
        Indicator::ROaBar => ratio(
            ev.value(Indicator::ROa, year, country),
            ev.constant(Constant::ROaMax),
        ),
        Indicator::F1 => f1(ev, year, country),
        Indicator::F2 => Some(snap.get(TableName::F2, year, country)? / 4.0),
        Indicator::F3 => snap.get(TableName::F3, year, country),
        Indicator::SOdT => {
            let f1 = ev.value(Indicator::F1, year, country)?;
            let f2 = ev.value(Indicator::F2, year, country)?;
            let f3 = ev.value(Indicator::F3, year, country)?;
            let total = snap.get(TableName::Total, year, country)?;
            Some((f1 + f2 + f3) / 3.0 * total)
        }
        Indicator::AOdT => {
            let world = snap.get(TableName::WorldTotal, year, WORLD_OA_TOTAL_KEY)?;
            let lang = snap.get(TableName::AlphaL, year, country)?;
            let fund = snap.get(TableName::AlphaF, year, country)?;
            let intl = snap.get(TableName::AlphaI, year, country)?;
            Some(world * lang * fund * intl)
        }
        Indicator::ROd => {
            let s = ratio(
                ev.value(Indicator::SOdT, year, country),
                ev.constant(Constant::SOdT1),
            )?;
            let a = ratio(
                ev.value(Indicator::AOdT, year, country),
                ev.constant(Constant::AOdT1),
            )?;
            Some(s.hypot(a))
        }
        Indicator::ROdBar => ratio(
            ev.value(Indicator::ROd, year, country),
            ev.constant(Constant::ROdMax),
        ),
        Indicator::R => {
            let oa = ev.value(Indicator::ROaBar, year, country)?;
            let od = ev.value(Indicator::ROdBar, year, country)?;
            let op = ev.value(Indicator::ROpBar, year, country)?;
            let w_oa = snap.weight("W_OA")?;
            let w_od = snap.weight("W_OD")?;
            let w_op = snap.weight("W_OP")?;
            Some(w_oa * oa + w_od * od + w_op * op)
        }
    }
}

/// 0.5 × (ratio / its ceiling + count / its ceiling).
fn blend_half(
    ev: &mut Evaluator<'_>,
    (ratio_ind, ratio_ceiling): (Indicator, Constant),
    (count_ind, count_ceiling): (Indicator, Constant),
    year: i32,
    country: &str,
) -> Value {
    let r = ev.value(ratio_ind, year, country)?;
    let p = ev.value(count_ind, year, country)?;
    let r1 = ev.constant(ratio_ceiling)?;
    let p1 = ev.constant(count_ceiling)?;
    Some(0.5 * (ratio(Some(r), Some(r1))? + ratio(Some(p), Some(p1))?))
}

fn f1(ev: &mut Evaluator<'_>, year: i32, country: &str) -> Value {
    let snap = ev.snapshot();
    let fwci = snap.get(TableName::Fwci, year, country)?;
    if year < F1_BLEND_FROM_YEAR {
        return Some(fwci);
    }
    match relative_scientist_share(ev, year, country) {
        Some(relative) => Some(F1_FWCI_WEIGHT * fwci + F1_SHARE_WEIGHT * relative),
        None => Some(fwci),
    }
}

/// The country's share of world scientists divided by the mean share of all countries with data.
fn relative_scientist_share(ev: &Evaluator<'_>, year: i32, country: &str) -> Option<f64> {
    let snap = ev.snapshot();
    let world = snap
        .get(TableName::WorldTotal, year, WORLD_SCIENTIST_KEY)
        .or_else(|| snap.get(TableName::WorldTotal, year, LEGACY_WORLD_SCIENTIST_KEY))
        .filter(|w| *w > 0.0)?;
    let own = snap.get(TableName::Scientist, year, country)?;
    let row = snap.row(TableName::Scientist, year)?;
    let average = mean(row.values().filter_map(|v| v.map(|s| s / world)))?;
    if average == 0.0 {
        return None;
    }
    Some((own / world) / average)
}

pub(crate) fn ratio(numerator: Value, denominator: Value) -> Value {
    let (n, d) = (numerator?, denominator?);
    if d == 0.0 {
        None
    } else {
        Some(n / d)
    }
}

pub(crate) fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

pub(crate) fn max_of(values: impl Iterator<Item = f64>) -> Option<f64> {
    values.fold(None, |best: Option<f64>, v| {
        Some(best.map_or(v, |b| b.max(v)))
    })
}
