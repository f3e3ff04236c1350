//! Key usage reports and their loot
//!
//! A report records one use of a key and everything looted behind it. The
//! value of a report is the summed value of its loot in the report's game
//! mode. One use costs the key's value in that mode divided by its use
//! count, and the profit is what the loot is worth beyond that cost.

use crate::database::Database;
use crate::error::{Result, SyncError};
use crate::repository::{
    insert_row, insert_sequenced, Condition, ItemRepository, KeyReport, KeyReportRepository,
    KeyRepository, LootReport, LootReportRepository, ReadOnlyRepository, SequencedWriteRepository,
};
use crate::valuation::ItemValuer;
use chrono::Utc;
use std::collections::BTreeMap;
use tarkov_common::GameMode;

/// One looted item and how many of it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LootLine {
    pub item_id: i64,
    pub count: i64,
}

impl LootLine {
    pub fn new(item_id: i64, count: i64) -> Self {
        Self { item_id, count }
    }
}

/// Rouble value of a stored report
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportValuation {
    pub report_id: i64,
    pub game_mode: GameMode,
    /// Summed value of the loot
    pub total: i64,
    /// Key value divided by its uses, truncated; `None` for keys without uses
    pub price_per_use: Option<i64>,
    /// `total - price_per_use`
    pub profit: Option<i64>,
    /// `total / price_per_use` in percent; `None` when one use costs nothing
    pub profit_percent: Option<f64>,
}

pub struct ReportService {
    db: Database,
    items: ItemRepository,
    keys: KeyRepository,
    key_reports: KeyReportRepository,
    loot_reports: LootReportRepository,
}

impl ReportService {
    pub fn new(db: &Database) -> Self {
        Self {
            db: db.clone(),
            items: ItemRepository::new(db.clone()),
            keys: KeyRepository::new(db.clone()),
            key_reports: KeyReportRepository::new(db.clone()),
            loot_reports: LootReportRepository::new(db.clone()),
        }
    }

    /// Store a report and its loot, returning the report id.
    ///
    /// Repeated item ids are merged. Nothing is written if the key, any item
    /// or any count is invalid.
    pub fn submit(
        &self,
        reported_by: i64,
        key_item_id: i64,
        game_mode: GameMode,
        loot: &[LootLine],
    ) -> Result<i64> {
        if !self.keys.exists_by_item_id(key_item_id)? {
            return Err(SyncError::InvalidReport(format!(
                "item {} is not a known key",
                key_item_id
            )));
        }

        let mut merged: BTreeMap<i64, i64> = BTreeMap::new();
        for line in loot {
            if line.count <= 0 {
                return Err(SyncError::InvalidReport(format!(
                    "count of item {} must be positive, got {}",
                    line.item_id, line.count
                )));
            }
            *merged.entry(line.item_id).or_insert(0) += line.count;
        }

        for item_id in merged.keys() {
            if !self.items.exists(&[Condition::eq("id", *item_id)])? {
                return Err(SyncError::InvalidReport(format!("unknown item {}", item_id)));
            }
        }

        let reported_at = Utc::now();
        let report_id = self.db.transaction(|tx| {
            let report_id = insert_sequenced::<KeyReport, _>(tx, |report| KeyReport {
                reported_by,
                key_id: key_item_id,
                game_mode,
                reported_at,
                ..report
            })?;
            for (&item_id, &count) in &merged {
                insert_row(
                    tx,
                    &LootReport {
                        key_report_id: report_id,
                        item_id,
                        count,
                    },
                )?;
            }
            Ok(report_id)
        })?;

        log::info!(
            "Stored report {} for key {} ({}) with {} loot line(s)",
            report_id,
            key_item_id,
            game_mode,
            merged.len()
        );
        Ok(report_id)
    }

    /// Value a stored report in its own game mode
    pub fn valuate(&self, report_id: i64, valuer: &ItemValuer) -> Result<ReportValuation> {
        let report = self.key_reports.find_by_id(report_id)?;

        let mut total = 0;
        for line in self.loot_reports.find_by_report(report_id)? {
            let item = self.items.find_by_id(line.item_id)?;
            total += valuer.item_value(&item, report.game_mode) * line.count;
        }

        let price_per_use = match self.keys.find_by_item_id(report.key_id)? {
            Some(key) if key.uses > 0 => {
                let key_item = self.items.find_by_id(key.item_id)?;
                Some(valuer.item_value(&key_item, report.game_mode) / key.uses)
            }
            _ => None,
        };
        let profit = price_per_use.map(|cost| total - cost);
        let profit_percent = price_per_use
            .filter(|&cost| cost > 0)
            .map(|cost| total as f64 / cost as f64 * 100.0);

        Ok(ReportValuation {
            report_id,
            game_mode: report.game_mode,
            total,
            price_per_use,
            profit,
            profit_percent,
        })
    }

    /// All reports for one key, oldest first
    pub fn reports_for_key(&self, key_item_id: i64) -> Result<Vec<KeyReport>> {
        Ok(self.key_reports.find_by_key(key_item_id)?)
    }

    pub fn loot(&self, report_id: i64) -> Result<Vec<LootReport>> {
        Ok(self.loot_reports.find_by_report(report_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{Item, Key, WriteRepository};
    use crate::valuation::{CurrencyRates, ValuationPolicy};
    use tarkov_common::Currency;

    struct Fixture {
        db: Database,
        service: ReportService,
        key_id: i64,
        bolts: i64,
        gpu: i64,
    }

    fn fixture(uses: i64) -> Fixture {
        let db = Database::open_in_memory().unwrap();
        let items = ItemRepository::new(db.clone());
        let keys = KeyRepository::new(db.clone());

        let key_id = items
            .insert_with_id(|item| {
                Item {
                    tarkov_id: "key".to_string(),
                    name: "Dorm room 314 marked key".to_string(),
                    ..item
                }
                .with_flea_state(GameMode::Pvp, Some(40_000), false)
                .with_flea_state(GameMode::Pve, Some(20_000), false)
            })
            .unwrap();
        keys.insert(|_| Key { item_id: key_id, uses }).unwrap();

        let bolts = items
            .insert_with_id(|item| {
                Item {
                    tarkov_id: "bolts".to_string(),
                    ..item
                }
                .with_flea_state(GameMode::Pvp, Some(1000), false)
                .with_flea_state(GameMode::Pve, Some(3000), false)
            })
            .unwrap();
        let gpu = items
            .insert_with_id(|item| {
                Item {
                    tarkov_id: "gpu".to_string(),
                    trader_price: 10,
                    trader_currency: Currency::Dollar,
                    ..item
                }
                .with_flea_state(GameMode::Pvp, None, true)
            })
            .unwrap();

        Fixture {
            service: ReportService::new(&db),
            db,
            key_id,
            bolts,
            gpu,
        }
    }

    fn valuer() -> ItemValuer {
        ItemValuer::new(CurrencyRates { usd: 95, eur: 105 }, ValuationPolicy::FleaOnly)
    }

    #[test]
    fn submit_stores_report_and_loot() {
        let f = fixture(10);
        let id = f
            .service
            .submit(7, f.key_id, GameMode::Pvp, &[LootLine::new(f.bolts, 2), LootLine::new(f.gpu, 1)])
            .unwrap();

        let reports = f.service.reports_for_key(f.key_id).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].id, id);
        assert_eq!(reports[0].reported_by, 7);
        assert_eq!(reports[0].game_mode, GameMode::Pvp);
        assert_eq!(f.service.loot(id).unwrap().len(), 2);
    }

    #[test]
    fn submit_merges_repeated_items() {
        let f = fixture(10);
        let id = f
            .service
            .submit(1, f.key_id, GameMode::Pvp, &[LootLine::new(f.bolts, 2), LootLine::new(f.bolts, 3)])
            .unwrap();

        let loot = f.service.loot(id).unwrap();
        assert_eq!(loot, vec![LootReport { key_report_id: id, item_id: f.bolts, count: 5 }]);
    }

    #[test]
    fn submit_rejects_invalid_input_without_writing() {
        let f = fixture(10);

        let not_a_key = f.service.submit(1, f.bolts, GameMode::Pvp, &[]);
        assert!(matches!(not_a_key, Err(SyncError::InvalidReport(_))));

        let zero = f.service.submit(1, f.key_id, GameMode::Pvp, &[LootLine::new(f.bolts, 0)]);
        assert!(matches!(zero, Err(SyncError::InvalidReport(_))));

        let unknown = f.service.submit(1, f.key_id, GameMode::Pvp, &[LootLine::new(999, 1)]);
        assert!(matches!(unknown, Err(SyncError::InvalidReport(_))));

        assert!(f.service.reports_for_key(f.key_id).unwrap().is_empty());
    }

    #[test]
    fn report_ids_are_sequenced() {
        let f = fixture(10);
        let first = f.service.submit(1, f.key_id, GameMode::Pvp, &[]).unwrap();
        let second = f.service.submit(2, f.key_id, GameMode::Pve, &[]).unwrap();
        assert_eq!(second, first + 1);
    }

    fn assert_percent(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("profit percent");
        assert!((actual - expected).abs() < 1e-9, "{} != {}", actual, expected);
    }

    #[test]
    fn submit_writes_nothing_when_loot_insert_fails() {
        let f = fixture(10);
        f.db
            .with_connection(|conn| conn.execute_batch("DROP TABLE loot_reports"))
            .unwrap();

        let result = f.service.submit(1, f.key_id, GameMode::Pvp, &[LootLine::new(f.bolts, 1)]);
        assert!(matches!(result, Err(SyncError::Repository(_))));
        assert!(f.service.reports_for_key(f.key_id).unwrap().is_empty());

        // The drawn id was rolled back with the report
        f.db.with_connection(crate::database::init_schema).unwrap();
        let id = f
            .service
            .submit(1, f.key_id, GameMode::Pvp, &[LootLine::new(f.bolts, 1)])
            .unwrap();
        assert_eq!(id, 1);
    }

    #[test]
    fn valuate_sums_loot_in_report_mode() {
        let f = fixture(4);
        let pvp = f
            .service
            .submit(1, f.key_id, GameMode::Pvp, &[LootLine::new(f.bolts, 2), LootLine::new(f.gpu, 1)])
            .unwrap();
        let pve = f
            .service
            .submit(1, f.key_id, GameMode::Pve, &[LootLine::new(f.bolts, 2)])
            .unwrap();

        let valuation = f.service.valuate(pvp, &valuer()).unwrap();
        // 2 x 1000 flea + 10$ x 95 banned
        assert_eq!(valuation.total, 2950);
        assert_eq!(valuation.price_per_use, Some(10_000));
        assert_eq!(valuation.profit, Some(-7050));
        assert_percent(valuation.profit_percent, 29.5);

        let valuation = f.service.valuate(pve, &valuer()).unwrap();
        assert_eq!(valuation.game_mode, GameMode::Pve);
        assert_eq!(valuation.total, 6000);
        assert_eq!(valuation.price_per_use, Some(5000));
        assert_eq!(valuation.profit, Some(1000));
        assert_percent(valuation.profit_percent, 120.0);
    }

    #[test]
    fn price_per_use_splits_key_value_not_loot() {
        let f = fixture(4);
        let id = f
            .service
            .submit(1, f.key_id, GameMode::Pvp, &[LootLine::new(f.bolts, 3)])
            .unwrap();

        let valuation = f.service.valuate(id, &valuer()).unwrap();
        assert_eq!(valuation.total, 3000);
        assert_eq!(valuation.price_per_use, Some(10_000));
        assert_eq!(valuation.profit, Some(-7000));
    }

    #[test]
    fn price_per_use_truncates() {
        let f = fixture(3);
        let id = f.service.submit(1, f.key_id, GameMode::Pvp, &[]).unwrap();

        let valuation = f.service.valuate(id, &valuer()).unwrap();
        assert_eq!(valuation.total, 0);
        assert_eq!(valuation.price_per_use, Some(13_333));
        assert_eq!(valuation.profit, Some(-13_333));
        assert_percent(valuation.profit_percent, 0.0);
    }

    #[test]
    fn valuate_without_uses_has_no_per_use_price() {
        let f = fixture(0);
        let id = f
            .service
            .submit(1, f.key_id, GameMode::Pvp, &[LootLine::new(f.bolts, 1)])
            .unwrap();
        let valuation = f.service.valuate(id, &valuer()).unwrap();
        assert_eq!(valuation.total, 1000);
        assert_eq!(valuation.price_per_use, None);
        assert_eq!(valuation.profit, None);
        assert_eq!(valuation.profit_percent, None);
    }

    #[test]
    fn valuate_unknown_report_is_not_found() {
        let f = fixture(1);
        match f.service.valuate(42, &valuer()) {
            Err(SyncError::Repository(e)) => assert!(e.is_not_found()),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }
}
