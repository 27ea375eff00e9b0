//! Scenario catalog for the sales workload.
//!
//! Every scenario carries the same four variants, in this order:
//! `sqlx:tracking`, `sqlx:no_tracking`, `sqlx:raw_sql`, `rusqlite`.

use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;
use std::str::FromStr;

use querybench_core::{BenchError, QueryError, Scenario, Variant};

use crate::backends::{MicroBackend, OrmBackend, OrmMode};

/// Label of the sqlx variants; the query mode is attached as a flag.
pub const ORM_LABEL: &str = "sqlx";

/// Label of the rusqlite variant.
pub const MICRO_LABEL: &str = "rusqlite";

/// The sales scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SalesScenario {
    /// Every row of the table.
    GetAll,
    /// Filtered rows sorted by product, newest first.
    FilterAndSort,
    /// Price totals grouped by order.
    OrderPrices,
}

impl SalesScenario {
    pub const ALL: [SalesScenario; 3] = [
        SalesScenario::GetAll,
        SalesScenario::FilterAndSort,
        SalesScenario::OrderPrices,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SalesScenario::GetAll => "get_all",
            SalesScenario::FilterAndSort => "filter_and_sort",
            SalesScenario::OrderPrices => "order_prices",
        }
    }
}

impl fmt::Display for SalesScenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SalesScenario {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SalesScenario::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| {
                let known: Vec<_> = SalesScenario::ALL.iter().map(|k| k.name()).collect();
                BenchError::config(format!(
                    "unknown scenario '{}' (expected one of: {})",
                    s,
                    known.join(", ")
                ))
            })
    }
}

/// Resolve a database URL to a file path.
///
/// Accepts `sqlite://path`, `sqlite:path` or a bare path. Query strings are
/// ignored. In-memory databases are rejected since each variant opens its
/// own connections.
pub fn parse_database_url(url: &str) -> Result<PathBuf, BenchError> {
    let url = url.trim();
    let rest = if let Some(rest) = url.strip_prefix("sqlite://") {
        rest
    } else if let Some(rest) = url.strip_prefix("sqlite:") {
        rest
    } else if url.contains("://") {
        return Err(BenchError::config(format!(
            "unsupported database url '{}': only sqlite is supported",
            url
        )));
    } else {
        url
    };

    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() {
        return Err(BenchError::config("database url has no path"));
    }
    if path == ":memory:" {
        return Err(BenchError::config(
            "in-memory databases cannot be shared between variants",
        ));
    }
    Ok(PathBuf::from(path))
}

/// Both backends connected to one database.
pub struct SalesWorkload {
    orm: Rc<OrmBackend>,
    micro: Rc<MicroBackend>,
}

impl SalesWorkload {
    /// Connect both backends. Unreachable databases are connection errors.
    pub fn connect(url: &str, pool_size: u32) -> Result<Self, BenchError> {
        let path = parse_database_url(url)?;
        tracing::debug!(path = %path.display(), pool_size, "connecting backends");

        let orm = OrmBackend::connect(&path, pool_size).map_err(|e| {
            BenchError::Connection(format!("sqlx could not open {}: {}", path.display(), e))
        })?;
        let micro = MicroBackend::open(&path).map_err(|e| {
            BenchError::Connection(format!("rusqlite could not open {}: {}", path.display(), e))
        })?;

        Ok(Self {
            orm: Rc::new(orm),
            micro: Rc::new(micro),
        })
    }

    pub fn orm(&self) -> &OrmBackend {
        &self.orm
    }

    pub fn micro(&self) -> &MicroBackend {
        &self.micro
    }

    /// Build one scenario with its four variants.
    pub fn scenario(&self, kind: SalesScenario) -> Scenario {
        let mut scenario = Scenario::new(kind.name());

        for mode in OrmMode::ALL {
            let orm = Rc::clone(&self.orm);
            let variant = match kind {
                SalesScenario::GetAll => Variant::new(ORM_LABEL, move || {
                    orm.get_all(mode).map_err(QueryError::from)
                }),
                SalesScenario::FilterAndSort => Variant::new(ORM_LABEL, move || {
                    orm.filter_and_sort(mode).map_err(QueryError::from)
                }),
                SalesScenario::OrderPrices => Variant::new(ORM_LABEL, move || {
                    orm.order_prices(mode).map_err(QueryError::from)
                }),
            };
            scenario.push(variant.with_flag(mode.flag()));
        }

        let micro = Rc::clone(&self.micro);
        scenario.push(match kind {
            SalesScenario::GetAll => {
                Variant::new(MICRO_LABEL, move || micro.get_all().map_err(QueryError::from))
            }
            SalesScenario::FilterAndSort => Variant::new(MICRO_LABEL, move || {
                micro.filter_and_sort().map_err(QueryError::from)
            }),
            SalesScenario::OrderPrices => Variant::new(MICRO_LABEL, move || {
                micro.order_prices().map_err(QueryError::from)
            }),
        });

        scenario
    }

    /// Build the given scenarios, in order.
    pub fn scenarios(&self, kinds: &[SalesScenario]) -> Vec<Scenario> {
        kinds.iter().map(|&kind| self.scenario(kind)).collect()
    }
}
