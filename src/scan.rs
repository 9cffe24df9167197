//! Scan pipeline as seen by a scanner screen: raw input in, an outcome and
//! the next step to offer the user out.
use std::fmt;
use tracing::info;

use crate::barcode::Barcode;
use crate::lookup::Dispatcher;
use crate::model::FoodItem;

#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    /// Input did not normalize to 8-14 digits; nothing was sent.
    Invalid { raw: String },
    Found { barcode: Barcode, food: FoodItem },
    NotFound { barcode: Barcode },
    /// Provider whitelist rejection, message meant to be shown verbatim.
    ProviderMisconfigured { barcode: Barcode, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    ProductDetails,
    ManualEntryOrRescan,
    ManualEntryOnly,
    Rescan,
}

impl ScanOutcome {
    pub fn next_step(&self) -> NextStep {
        match self {
            ScanOutcome::Invalid { .. } => NextStep::Rescan,
            ScanOutcome::Found { .. } => NextStep::ProductDetails,
            ScanOutcome::NotFound { .. } => NextStep::ManualEntryOrRescan,
            ScanOutcome::ProviderMisconfigured { .. } => NextStep::ManualEntryOnly,
        }
    }

    pub fn food(&self) -> Option<&FoodItem> {
        match self {
            ScanOutcome::Found { food, .. } => Some(food),
            _ => None,
        }
    }
}

impl fmt::Display for NextStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NextStep::ProductDetails => "show product details",
            NextStep::ManualEntryOrRescan => "enter food manually or scan again",
            NextStep::ManualEntryOnly => "enter food manually",
            NextStep::Rescan => "scan again",
        };
        f.write_str(s)
    }
}

pub async fn scan(raw: &str, dispatcher: &Dispatcher) -> ScanOutcome {
    let barcode = match Barcode::parse(raw) {
        Ok(code) => code,
        Err(err) => {
            info!(%err, "ignoring scan");
            return ScanOutcome::Invalid {
                raw: raw.to_string(),
            };
        }
    };

    match dispatcher.lookup(&barcode).await {
        Ok(Some(food)) => ScanOutcome::Found { barcode, food },
        Ok(None) => ScanOutcome::NotFound { barcode },
        Err(err) => ScanOutcome::ProviderMisconfigured {
            barcode,
            message: err.to_string(),
        },
    }
}
