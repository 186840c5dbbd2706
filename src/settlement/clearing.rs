//! Phase C: clearing and netting of interbank overnight positions (§4.5, L10).

use crate::error::ValidationError;
use crate::models::event::{Event, Phase};
use crate::models::ledger::LedgerState;
use crate::models::InstrumentKind;
use crate::ops;
use std::collections::BTreeMap;

struct Overnight {
    id: String,
    debtor_bank: String,
    creditor_bank: String,
    amount: i64,
}

fn remove_overnight(ledger: &mut LedgerState, overnight: &Overnight) {
    ledger.remove_instrument(&overnight.id);
    if let Ok(agent) = ledger.agent_mut(&overnight.creditor_bank) {
        agent.remove_asset(&overnight.id);
    }
    if let Ok(agent) = ledger.agent_mut(&overnight.debtor_bank) {
        agent.remove_liability(&overnight.id);
    }
}

/// Net every bank pair with offsetting `interbank_overnight` instruments due
/// today: subtract the smaller side from the larger, remove both sides of
/// the offset, and if a residual remains settle it immediately with a
/// reserve transfer (§4.5; the T+0 clearing design noted in §9).
pub fn run_clearing(ledger: &mut LedgerState, day: u64) -> Result<(), ValidationError> {
    let overnights: Vec<Overnight> = ledger
        .instruments()
        .filter(|i| i.kind() == InstrumentKind::InterbankOvernight && i.due_day() == Some(day))
        .map(|i| Overnight {
            id: i.id().to_string(),
            debtor_bank: i.debtor_bank_id().unwrap_or_default().to_string(),
            creditor_bank: i.creditor_bank_id().unwrap_or_default().to_string(),
            amount: i.amount(),
        })
        .collect();

    let mut pairs: BTreeMap<(String, String), Vec<Overnight>> = BTreeMap::new();
    for overnight in overnights {
        let key = if overnight.debtor_bank <= overnight.creditor_bank {
            (overnight.debtor_bank.clone(), overnight.creditor_bank.clone())
        } else {
            (overnight.creditor_bank.clone(), overnight.debtor_bank.clone())
        };
        pairs.entry(key).or_default().push(overnight);
    }

    for ((bank_x, bank_y), group) in pairs {
        let x_owes_y: i64 = group.iter().filter(|o| o.debtor_bank == bank_x && o.creditor_bank == bank_y).map(|o| o.amount).sum();
        let y_owes_x: i64 = group.iter().filter(|o| o.debtor_bank == bank_y && o.creditor_bank == bank_x).map(|o| o.amount).sum();

        for overnight in &group {
            remove_overnight(ledger, overnight);
        }

        let (net_debtor, net_creditor, net_amount) = if x_owes_y > y_owes_x {
            (bank_x.clone(), bank_y.clone(), x_owes_y - y_owes_x)
        } else if y_owes_x > x_owes_y {
            (bank_y.clone(), bank_x.clone(), y_owes_x - x_owes_y)
        } else {
            (bank_x.clone(), bank_y.clone(), 0)
        };

        if net_amount > 0 {
            ops::transfer_reserves(ledger, &net_debtor, &net_creditor, net_amount)?;
            ledger.log(Event::InterbankCleared {
                day,
                phase: Phase::C,
                debtor_bank: net_debtor,
                creditor_bank: net_creditor,
                net_amount,
            });
        }
    }

    Ok(())
}
