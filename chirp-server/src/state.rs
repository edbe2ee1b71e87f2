use crate::db::Database;
use crate::engine::engagement::DEFAULT_TRANSFER_AMOUNT;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    /// Points moved by one `/points/transfer` call
    pub transfer_amount: i64,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            transfer_amount: DEFAULT_TRANSFER_AMOUNT,
        }
    }

    pub fn with_transfer_amount(mut self, amount: i64) -> Self {
        self.transfer_amount = amount;
        self
    }
}
