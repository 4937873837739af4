//! Zero-argument indicators. Ceilings are "best year's country average" of a per-cell indicator;
//! the two global maxima scan every (year, country) pair once per generation.

use crate::data::{TableName, Value};
use crate::indicators::eval::Evaluator;
use crate::indicators::formulas::{max_of, mean, WORLD_OA_TOTAL_KEY};
use crate::indicators::graph::{Constant, Indicator};

pub(crate) fn compute(ev: &mut Evaluator<'_>, constant: Constant) -> Value {
    match constant {
        Constant::ROpenT1 => best_year_mean(ev, Indicator::ROpenT, TableName::Oa),
        Constant::POpenT1 => best_year_mean(ev, Indicator::POpenT, TableName::Oa),
        Constant::RInclT1 => best_year_mean(ev, Indicator::RInclT, TableName::Cooperation),
        Constant::PInclT1 => best_year_mean(ev, Indicator::PInclT, TableName::Cooperation),
        Constant::SOdT1 => best_year_mean(ev, Indicator::SOdT, TableName::Total),
        Constant::AOdT1 => a_od_t1(ev),
        Constant::ROaMax => global_max(ev, Indicator::ROa, TableName::Oa),
        Constant::ROdMax => global_max(ev, Indicator::ROd, TableName::Total),
    }
}

/// max over the years of `domain` of the mean of the available `indicator` values across that
/// year's countries in `domain`.
fn best_year_mean(ev: &mut Evaluator<'_>, indicator: Indicator, domain: TableName) -> Value {
    let snap = ev.snapshot();
    let mut year_means = Vec::new();
    for (year, row) in snap.year_table(domain) {
        let mut values = Vec::with_capacity(row.len());
        for country in row.keys() {
            if let Some(v) = ev.value(indicator, *year, country) {
                values.push(v);
            }
        }
        if let Some(m) = mean(values.into_iter()) {
            year_means.push(m);
        }
    }
    max_of(year_means.into_iter())
}

/// Like [best_year_mean] over `world_total`'s years, but with the country set fixed to the
/// `alpha_L` countries of the earliest `world_total` year, and skipping years with no world
/// open-access total.
fn a_od_t1(ev: &mut Evaluator<'_>) -> Value {
    let snap = ev.snapshot();
    let world = snap.year_table(TableName::WorldTotal);
    let first_year = *world.keys().next()?;
    let countries: Vec<&String> = snap.row(TableName::AlphaL, first_year)?.keys().collect();

    let mut year_means = Vec::new();
    for year in world.keys() {
        if snap.get(TableName::WorldTotal, *year, WORLD_OA_TOTAL_KEY).is_none() {
            continue;
        }
        let mut values = Vec::with_capacity(countries.len());
        for country in &countries {
            if let Some(v) = ev.value(Indicator::AOdT, *year, country) {
                values.push(v);
            }
        }
        if let Some(m) = mean(values.into_iter()) {
            year_means.push(m);
        }
    }
    max_of(year_means.into_iter())
}

fn global_max(ev: &mut Evaluator<'_>, indicator: Indicator, domain: TableName) -> Value {
    let snap = ev.snapshot();
    let mut best: Value = None;
    for (year, row) in snap.year_table(domain) {
        for country in row.keys() {
            if let Some(v) = ev.value(indicator, *year, country) {
                best = Some(best.map_or(v, |b: f64| b.max(v)));
            }
        }
    }
    tracing::debug!(indicator = %indicator, domain = %domain, ?best, "global maximum scanned");
    best
}
