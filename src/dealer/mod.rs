//! The dealer-ring subsystem (D1-D5, §4.7-§4.11): a bucketed inventory
//! pricing kernel, a customer trade executor with interior/passthrough
//! routing, adaptive outside-quote anchors, and the ticket
//! rebucketing/maturity pipeline. Plugs into the daily loop at Phase "dealer"
//! (§4.6) and is optional — a scenario with no `dealer` block never touches
//! this module.

pub mod anchor;
pub mod bridge;
pub mod daily_phase;
pub mod executor;
pub mod kernel;
pub mod metrics;
pub mod state;
pub mod ticket;

pub use daily_phase::{run_anchor_update, run_dealer_phase};
pub use state::DealerState;
pub use ticket::{bucket_for, BucketDef, Ticket};

use crate::error::ValidationError;
use crate::models::ledger::LedgerState;
use crate::models::{Agent, AgentKind, InstrumentKind};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One configured maturity band plus its VBT's starting anchors (§6
/// `dealer.buckets`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketSpec {
    pub name: String,
    pub tau_min: u64,
    pub tau_max: Option<u64>,
    pub mid: Decimal,
    pub spread: Decimal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OrderFlowConfig {
    pub pi_sell: Decimal,
    pub n_max: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TraderPolicyConfig {
    pub horizon_h: u64,
    pub buffer_b: i64,
}

/// All dealer-subsystem knobs, built once from the scenario's `dealer` block
/// (§6, §9 "Dynamic config objects").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealerConfig {
    pub ticket_size: Decimal,
    pub guard_m_min: Decimal,
    pub buckets: Vec<BucketSpec>,
    pub dealer_share: Decimal,
    pub vbt_share: Decimal,
    pub phi_m: Decimal,
    pub phi_o: Decimal,
    pub o_min: Decimal,
    pub clip_bid_zero: bool,
    pub order_flow: OrderFlowConfig,
    pub trader_policy: TraderPolicyConfig,
}

fn dealer_agent_id(bucket: &str) -> String {
    format!("DEALER_{bucket}")
}

fn vbt_agent_id(bucket: &str) -> String {
    format!("VBT_{bucket}")
}

/// Build the initial [`DealerState`]: one dealer agent and one VBT agent per
/// configured bucket, seeded with starting cash of zero, then convert every
/// existing payable into a ticket (1-to-1 face, §4.7) and split initial
/// holdings across {dealer, VBT, trader} by the configured shares.
pub fn init_from_payables(ledger: &mut LedgerState, config: &DealerConfig) -> Result<(), ValidationError> {
    let buckets: Vec<ticket::BucketDef> = config.buckets.iter().map(|b| ticket::BucketDef::new(&b.name, b.tau_min, b.tau_max)).collect();
    let mut state = DealerState::new(buckets.clone(), config.ticket_size, config.guard_m_min);

    for spec in &config.buckets {
        let dealer_id = dealer_agent_id(&spec.name);
        let vbt_id = vbt_agent_id(&spec.name);
        ledger.insert_agent(Agent::new(&dealer_id, format!("Dealer ({})", spec.name), AgentKind::Dealer));
        ledger.insert_agent(Agent::new(&vbt_id, format!("VBT ({})", spec.name), AgentKind::Vbt));

        let quote = kernel::compute_quote(0, Decimal::ZERO, config.ticket_size, spec.mid, spec.spread, config.guard_m_min, config.clip_bid_zero);
        state.dealers.insert(
            spec.name.clone(),
            state::DealerBucketRecord { bucket: spec.name.clone(), agent_id: dealer_id, cash: Decimal::ZERO, ticket_ids: Vec::new(), quote },
        );
        state.vbts.insert(
            spec.name.clone(),
            state::VbtBucketRecord {
                bucket: spec.name.clone(),
                agent_id: vbt_id,
                mid: spec.mid,
                spread: spec.spread,
                phi_m: config.phi_m,
                phi_o: config.phi_o,
                o_min: config.o_min,
                clip_bid_zero: config.clip_bid_zero,
                ticket_ids: Vec::new(),
                cash: Decimal::ZERO,
            },
        );
    }

    let day = ledger.day();
    let payable_ids: Vec<String> = ledger.instruments().filter(|i| i.kind() == InstrumentKind::Payable).map(|i| i.id().to_string()).collect();

    // Deterministic per-bucket rotation so that dealer/VBT shares are spread
    // evenly across buckets rather than front-loading the first few payables.
    let mut bucket_counts: std::collections::BTreeMap<String, (usize, usize)> = std::collections::BTreeMap::new();
    let mut bucket_payables: std::collections::BTreeMap<String, Vec<String>> = std::collections::BTreeMap::new();
    for payable_id in &payable_ids {
        let instrument = ledger.instrument(payable_id)?;
        let due_day = instrument.due_day().unwrap_or(day);
        let remaining_tau = due_day.saturating_sub(day);
        if let Some(bucket) = ticket::bucket_for(&buckets, remaining_tau) {
            bucket_payables.entry(bucket).or_default().push(payable_id.clone());
        }
    }

    for (bucket, ids) in &bucket_payables {
        let total = ids.len();
        let dealer_target = (Decimal::from(total as i64) * config.dealer_share).floor().to_string().parse::<usize>().unwrap_or(0);
        let vbt_target = (Decimal::from(total as i64) * config.vbt_share).floor().to_string().parse::<usize>().unwrap_or(0);
        bucket_counts.insert(bucket.clone(), (dealer_target, vbt_target));

        for (index, payable_id) in ids.iter().enumerate() {
            let instrument = ledger.instrument(payable_id)?;
            let issuer = instrument.liability_issuer_id().to_string();
            let original_holder = instrument.effective_creditor().to_string();
            let face = instrument.amount();
            let maturity_day = instrument.due_day().unwrap_or(day);

            let target_holder = if index < dealer_target {
                state.dealers.get(bucket).map(|d| d.agent_id.clone())
            } else if index < dealer_target + vbt_target {
                state.vbts.get(bucket).map(|v| v.agent_id.clone())
            } else {
                None
            };

            let serial = state.next_serial();
            let ticket_id = format!("tk_{:08}", serial);
            let owner = target_holder.clone().unwrap_or_else(|| original_holder.clone());
            let ticket = ticket::Ticket::new(&ticket_id, &issuer, &owner, face, maturity_day, day, serial, &buckets);
            state.tickets.insert(ticket_id.clone(), ticket);
            state.source_payable.insert(ticket_id.clone(), payable_id.clone());
            state.payable_to_ticket.insert(payable_id.clone(), ticket_id.clone());

            if let Some(holder) = &target_holder {
                crate::ops::transfer_claim(ledger, payable_id, holder)?;
                if holder.starts_with("DEALER_") {
                    state.dealers.get_mut(bucket).unwrap().ticket_ids.push(ticket_id.clone());
                } else {
                    state.vbts.get_mut(bucket).unwrap().ticket_ids.push(ticket_id.clone());
                }
            }
        }
        state.recompute_quote(bucket);
    }

    ledger.install_dealer(state);
    Ok(())
}

/// Liquidate every live ticket `debtor` currently holds into cash via the
/// trade executor, at each ticket's bucket's prevailing bid — the
/// partial-recovery waterfall's "tickets/claims liquidated at the prevailing
/// dealer bid" step (§4.4). Matured tickets (no bucket) are skipped; they
/// settle through the ordinary Phase B2 path instead. Returns the total cash
/// minor units credited to `debtor`, or `Ok(0)` if no dealer subsystem is
/// installed or `debtor` holds no live ticket.
pub fn liquidate_debtor_tickets(ledger: &mut LedgerState, debtor: &str) -> Result<i64, ValidationError> {
    let state = match ledger.dealer() {
        Some(s) => s,
        None => return Ok(0),
    };
    let ticket_ids: Vec<String> = ledger
        .agent(debtor)?
        .asset_ids()
        .iter()
        .filter_map(|payable_id| state.payable_to_ticket.get(payable_id))
        .cloned()
        .collect();

    let mut total = 0i64;
    for ticket_id in ticket_ids {
        let bucket = match ledger.dealer().and_then(|s| s.ticket(&ticket_id)).and_then(|t| t.bucket()) {
            Some(bucket) => bucket.to_string(),
            None => continue,
        };
        let outcome = executor::execute_sell(ledger, debtor, &bucket, &ticket_id)?;
        total += outcome.amount_minor;
    }
    Ok(total)
}
