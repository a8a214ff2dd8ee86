use bt_money::Micros;

/// Pluggable commission pricing, mirroring the pricing-strategy seam the
/// teacher's execution engine uses for broker-side price conversion — here
/// repurposed for the one thing the backtest engine actually needs priced.
pub trait CommissionModel: Send + Sync {
    fn commission(&self, quantity: i64, price: Micros) -> Micros;
}

/// Default model: a flat fee regardless of order size or price.
pub struct FlatFee(pub Micros);

impl FlatFee {
    pub fn units(units: i64) -> Self {
        Self(Micros::from_units(units))
    }
}

impl Default for FlatFee {
    fn default() -> Self {
        Self::units(5)
    }
}

impl CommissionModel for FlatFee {
    fn commission(&self, _quantity: i64, _price: Micros) -> Micros {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_fee_ignores_order_size() {
        let model = FlatFee::default();
        assert_eq!(model.commission(1, Micros::from_units(10)), Micros::from_units(5));
        assert_eq!(model.commission(1_000, Micros::from_units(999)), Micros::from_units(5));
    }
}
