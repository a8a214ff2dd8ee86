use bt_money::Micros;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

/// One day's trading intent for one symbol. The driver is responsible for
/// turning this into an order and routing it through execution; the
/// strategy never touches the account or position stores directly.
#[derive(Clone, Debug, PartialEq)]
pub struct Signal {
    pub symbol: String,
    pub side: Side,
    pub quantity: i64,
    pub stop_loss_price: Option<Micros>,
    pub stop_loss_days: Option<i64>,
    pub reason: Option<String>,
}

impl Signal {
    pub fn buy(symbol: impl Into<String>, quantity: i64) -> Self {
        Self {
            symbol: symbol.into(),
            side: Side::Buy,
            quantity,
            stop_loss_price: None,
            stop_loss_days: None,
            reason: None,
        }
    }

    pub fn sell(symbol: impl Into<String>, quantity: i64) -> Self {
        Self {
            symbol: symbol.into(),
            side: Side::Sell,
            quantity,
            stop_loss_price: None,
            stop_loss_days: None,
            reason: None,
        }
    }

    pub fn with_stop_loss(mut self, price: Option<Micros>, days: Option<i64>) -> Self {
        self.stop_loss_price = price;
        self.stop_loss_days = days;
        self
    }
}
