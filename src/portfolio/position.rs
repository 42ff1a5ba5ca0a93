use serde::{Deserialize, Serialize};

//net share holding in one symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,

    //net shares (positive for long, negative for short, 0 for flat)
    pub net_qty: i64,

    //average entry price
    pub avg_entry_price: f64,

    //realized pnl from closed shares, before commission
    pub realized_pnl: f64,

    //gross pnl and commission of the round trip currently open
    pub trip_pnl: f64,
    pub trip_commission: f64,
}

impl Holding {
    //creates a new flat holding
    pub fn new(symbol: String) -> Self {
        Holding {
            symbol,
            net_qty: 0,
            avg_entry_price: 0.0,
            realized_pnl: 0.0,
            trip_pnl: 0.0,
            trip_commission: 0.0,
        }
    }

    //signed market value, negative for shorts
    pub fn market_value(&self, current_price: f64) -> f64 {
        current_price * self.net_qty as f64
    }

    pub fn is_flat(&self) -> bool {
        self.net_qty == 0
    }

    //updates the holding with a signed fill
    //returns the realized pnl from this fill (if it closes/reduces the holding)
    pub fn update_with_fill(&mut self, fill_qty: i64, fill_price: f64) -> f64 {
        //if flat, just establish the new holding
        if self.net_qty == 0 {
            self.net_qty = fill_qty;
            self.avg_entry_price = fill_price;
            return 0.0;
        }

        let same_direction = self.net_qty.signum() == fill_qty.signum();

        if same_direction {
            //adding - update average entry price
            let total_qty = self.net_qty + fill_qty;
            let total_cost =
                self.avg_entry_price * self.net_qty as f64 + fill_price * fill_qty as f64;
            self.avg_entry_price = total_cost / total_qty as f64;
            self.net_qty = total_qty;
            return 0.0;
        }

        //reducing or reversing
        let close_qty = fill_qty.abs().min(self.net_qty.abs());
        let price_diff = if self.net_qty > 0 {
            fill_price - self.avg_entry_price
        } else {
            self.avg_entry_price - fill_price
        };

        let realized_pnl = price_diff * close_qty as f64;
        self.realized_pnl += realized_pnl;
        self.trip_pnl += realized_pnl;

        self.net_qty += fill_qty;

        //reversed through zero, the remainder opens at the fill price
        if self.net_qty != 0 && self.net_qty.signum() == fill_qty.signum() {
            self.avg_entry_price = fill_price;
        }

        if self.net_qty == 0 {
            self.avg_entry_price = 0.0;
        }

        realized_pnl
    }
}
