use serde::{Deserialize, Serialize};

/// Fraction kept after the exchange fee on each side of the trade
const FEE_FACTOR: f64 = 0.999;

/// Projected outcome of buying with local-currency capital and selling later
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfitEstimate {
    pub usdt_spent: f64,
    pub coin_amount: f64,
    pub proceeds_vnd: f64,
    pub pnl_vnd: f64,
    pub pnl_pct: f64,
}

/// Estimate P&L for a round trip
///
/// Capital is converted to USDT at `usdt_rate`, a fee is taken on the way in
/// and on the way out. Returns `None` unless every input is positive.
pub fn estimate_profit(
    capital_vnd: f64,
    usdt_rate: f64,
    buy_price: f64,
    sell_price: f64,
) -> Option<ProfitEstimate> {
    let inputs = [capital_vnd, usdt_rate, buy_price, sell_price];
    if inputs.iter().any(|v| !v.is_finite() || *v <= 0.0) {
        return None;
    }

    let usdt_spent = capital_vnd * FEE_FACTOR / usdt_rate;
    let coin_amount = usdt_spent / buy_price;
    let proceeds_vnd = coin_amount * sell_price * usdt_rate * FEE_FACTOR;
    let pnl_vnd = proceeds_vnd - capital_vnd;

    Some(ProfitEstimate {
        usdt_spent,
        coin_amount,
        proceeds_vnd,
        pnl_vnd,
        pnl_pct: pnl_vnd / capital_vnd * 100.0,
    })
}
