#![allow(dead_code)]

use std::sync::Arc;
use tempfile::TempDir;
use tradejournal::config::Config;
use tradejournal::db::init_db;
use tradejournal::domain::UserId;
use tradejournal::{api, Repository, TradeJournal};

pub const HEADER: &str = "Account,T/D,S/D,Currency,Type,Side,Symbol,Qty,Price,Exec Time,\
Comm,SEC,TAF,NSCC,Nasdaq,ECN Remove,ECN Add,Gross Proceeds,Net Proceeds,Clr Broker,Liq";

/// Buy 100 AAPL @ 234.10 on 2023-08-09, costs 2.02.
pub const BUY_AAPL: &str = "TRZ0001,45147,45149,USD,2,B,AAPL,100,234.10,09:30:00,\
1,0,0.02,0.5,0.5,0,0,-23410,-23412.02,VELO,A";

/// Sell 100 AAPL @ 240.00 on 2023-08-10, costs 2.02.
pub const SELL_AAPL: &str = "TRZ0001,45148,45150,USD,2,S,AAPL,100,240.00,10:15:00,\
1,0.42,0.1,0.25,0.25,0,0,24000,23997.98,VELO,R";

/// Buy 50 AAPL @ 235.00 on 2023-08-09, after `BUY_AAPL`.
pub const ADD_AAPL: &str = "TRZ0001,45147,45149,USD,2,B,AAPL,50,235.00,09:40:00,\
1,0,0.01,0.25,0.25,0,0,-11750,-11751.51,VELO,A";

/// Sell 50 AAPL @ 236.00 on 2023-08-09, after `ADD_AAPL`.
pub const TRIM_AAPL: &str = "TRZ0001,45147,45149,USD,2,S,AAPL,50,236.00,11:00:00,\
1,0.21,0.05,0.25,0.25,0,0,11800,11798.24,VELO,R";

/// Buy 10 MSFT @ 320.00 on 2023-08-10.
pub const BUY_MSFT: &str = "TRZ0001,45148,45150,USD,2,B,MSFT,10,320.00,11:00:00,\
1,0,0.01,0.1,0.1,0,0,-3200,-3201.21,VELO,A";

pub fn csv(rows: &[&str]) -> Vec<u8> {
    let mut out = String::from(HEADER);
    for row in rows {
        out.push('\n');
        out.push_str(row);
    }
    out.push('\n');
    out.into_bytes()
}

pub struct TestJournal {
    pub journal: Arc<TradeJournal>,
    pub db_path: String,
    _temp: TempDir,
}

impl TestJournal {
    pub fn repo(&self) -> &Repository {
        self.journal.repository()
    }

    pub async fn user(&self, email: &str) -> UserId {
        self.journal.create_user(email).await.expect("create user").id
    }

    pub fn router(&self) -> axum::Router {
        let config = Config {
            port: 0,
            database_path: self.db_path.clone(),
            max_upload_bytes: 64 * 1024,
            conflict_retries: 1,
        };
        api::create_router(api::AppState::new(self.journal.clone(), config))
    }
}

pub async fn setup() -> TestJournal {
    setup_with_retries(1).await
}

pub async fn setup_with_retries(conflict_retries: u32) -> TestJournal {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    TestJournal {
        journal: Arc::new(TradeJournal::new(Repository::new(pool), conflict_retries)),
        db_path,
        _temp: temp_dir,
    }
}
