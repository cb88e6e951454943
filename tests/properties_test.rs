//! Property tests for pipeline invariants.
//!
//! Uses proptest to verify:
//! 1. Equity accounting: cash plus marked holdings equals total equity every day
//! 2. Cash floor: clipped runs never spend below the floor
//! 3. Determinism: identical inputs give identical outputs
//! 4. No lookahead: changing the last day never changes earlier states

mod common;

use common::*;
use proptest::prelude::*;
use sigfolio::domain::backtest::{run_backtest, BacktestConfig, BacktestResult};
use sigfolio::domain::cost::Commission;
use sigfolio::domain::portfolio::SimulatorConfig;
use sigfolio::domain::price::PriceFrame;
use sigfolio::domain::signal::{Direction, Signal};
use sigfolio::domain::sizing::{SizingConfig, SizingPolicy};
use sigfolio::domain::strategy::SignalTable;

const INSTRUMENTS: [&str; 2] = ["AAA", "BBB"];

type Market = Vec<Vec<(f64, i64)>>;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_market() -> impl Strategy<Value = Market> {
    let price = (1.0..500.0_f64).prop_map(|p| (p * 100.0).round() / 100.0);
    prop::collection::vec(prop::collection::vec((price, -1i64..=1), 2), 2..30)
}

fn arb_config() -> impl Strategy<Value = BacktestConfig> {
    (
        100.0..1_000_000.0_f64,
        0.01..=1.0_f64,
        0.0..5.0_f64,
        0.0..1.0_f64,
        prop::bool::ANY,
    )
        .prop_map(|(initial_cash, fraction, per_trade, slippage_pct, whole_units)| BacktestConfig {
            initial_cash,
            sizing: SizingConfig {
                policy: SizingPolicy::FixedFraction { fraction },
                whole_units,
                allow_shorting: true,
            },
            execution: SimulatorConfig {
                slippage_pct,
                whole_units,
                ..SimulatorConfig::default()
            },
            commission: Commission {
                per_trade,
                pct: 0.1,
            },
            ..BacktestConfig::default()
        })
}

fn build(market: &Market) -> (PriceFrame, Vec<Signal>) {
    let mut prices = PriceFrame::new();
    let mut signals = Vec::new();
    for (n, row) in market.iter().enumerate() {
        for (code, &(price, signal)) in INSTRUMENTS.iter().zip(row) {
            prices.insert(day(n), code, price).unwrap();
            signals.push(Signal::new(day(n), code, Direction::try_from(signal).unwrap()));
        }
    }
    (prices, signals)
}

fn run(market: &Market, config: &BacktestConfig) -> (PriceFrame, BacktestResult) {
    let (prices, signals) = build(market);
    let strategy = SignalTable::from_signals(&signals).unwrap();
    let result = run_backtest(&strategy, &prices, config).unwrap();
    (prices, result)
}

// ── 1. Equity Accounting ─────────────────────────────────────────────

proptest! {
    #[test]
    fn equity_is_cash_plus_marked_holdings(market in arb_market(), config in arb_config()) {
        let (prices, result) = run(&market, &config);
        prop_assert_eq!(result.states.len(), market.len());
        prop_assert_eq!(result.report.returns.len(), market.len() - 1);
        assert_equity_invariant(&result, &prices);
    }
}

// ── 2. Cash Floor ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn cash_never_drops_below_floor(market in arb_market(), config in arb_config()) {
        let (_, result) = run(&market, &config);
        let floor = config.execution.cash_floor.unwrap_or(f64::NEG_INFINITY);
        for state in &result.states {
            prop_assert!(state.cash >= floor - 1e-6, "cash {} below floor {}", state.cash, floor);
        }
    }
}

// ── 3. Determinism ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn reruns_are_identical(market in arb_market(), config in arb_config()) {
        let (_, first) = run(&market, &config);
        let (_, second) = run(&market, &config);
        prop_assert_eq!(&first.positions, &second.positions);
        prop_assert_eq!(&first.states, &second.states);
        prop_assert_eq!(first.report.final_equity, second.report.final_equity);
    }
}

// ── 4. No Lookahead ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn last_day_does_not_leak_backwards(
        market in arb_market(),
        config in arb_config(),
        factor in 0.5..2.0_f64,
        flipped in -1i64..=1,
    ) {
        let (_, baseline) = run(&market, &config);

        let mut perturbed = market.clone();
        if let Some(last) = perturbed.last_mut() {
            for cell in last.iter_mut() {
                *cell = (cell.0 * factor, flipped);
            }
        }
        let (_, changed) = run(&perturbed, &config);

        let settled = market.len() - 1;
        prop_assert_eq!(&baseline.states[..settled], &changed.states[..settled]);

        let cutoff = day(settled);
        let before = |r: &BacktestResult| {
            r.positions.iter().filter(|p| p.date < cutoff).cloned().collect::<Vec<_>>()
        };
        prop_assert_eq!(before(&baseline), before(&changed));
    }
}
