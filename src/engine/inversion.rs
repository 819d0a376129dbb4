//! Inverse-quoted markets.
//!
//! The fold runs in the market's native terms. Afterwards every record is
//! flipped into the quote the caller sees: prices reciprocated, position and
//! order size negated. Must run exactly once per sequence.

use super::results::TradeRecord;

pub fn invert_trades(trades: &mut [TradeRecord]) {
    for record in trades.iter_mut() {
        record.neutral_price = 1.0 / record.neutral_price;
        record.open_price = 1.0 / record.open_price;
        record.position = -record.position;
        record.price.price = 1.0 / record.price.price;
        record.order_size = -record.order_size;
    }
}
