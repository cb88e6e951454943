//! Transaction cost models.

/// Cost charged for trading `quantity` units (signed) at `price`.
///
/// Implementations must return a finite, non-negative amount. Any
/// `Fn(f64, f64) -> f64` closure is a cost model.
pub trait CostModel {
    fn cost(&self, quantity: f64, price: f64) -> f64;
}

impl<F> CostModel for F
where
    F: Fn(f64, f64) -> f64,
{
    fn cost(&self, quantity: f64, price: f64) -> f64 {
        self(quantity, price)
    }
}

/// Frictionless trading.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ZeroCost;

impl CostModel for ZeroCost {
    fn cost(&self, _quantity: f64, _price: f64) -> f64 {
        0.0
    }
}

/// Broker commission: `per_trade + |quantity| * price * pct / 100`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Commission {
    pub per_trade: f64,
    pub pct: f64,
}

impl CostModel for Commission {
    fn cost(&self, quantity: f64, price: f64) -> f64 {
        if quantity == 0.0 {
            return 0.0;
        }
        self.per_trade + quantity.abs() * price * self.pct / 100.0
    }
}
